//! # Utility Functions (`utils`)
//!
//! Provides helper functions for object persistence and parallelism.

pub mod parallel;
pub mod serialization;

pub use serialization::{load_object, save_object};
