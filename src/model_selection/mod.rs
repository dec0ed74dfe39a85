//! # Model Selection (`model_selection`)
//!
//! Cross-validation splitting and exhaustive hyperparameter search.

pub mod kfold;
pub mod search;

pub use kfold::{Fold, KFold};
pub use search::{CandidateResult, ErrorScore, GridSearch, SearchResult};
