//! # Error Types
//!
//! `ModelError` covers estimator, metric and search failures. `PipelineError`
//! is what the pipeline helpers surface: it wraps any underlying cause together
//! with the source location where the failure was observed.

use std::fmt;
use std::panic::Location;

// --- Estimator / Search Errors ---
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("{model} is not fitted yet; call `fit` before using this estimator")]
    NotFitted { model: &'static str },
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Insufficient data: required at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("Invalid parameter '{name}' for estimator {model}")]
    UnknownParam { model: &'static str, name: String },
    #[error("Singular matrix encountered while solving the normal equations")]
    Singular,
    #[error("All the {fits} fits failed; first failure: {first}")]
    AllFitsFailed { fits: usize, first: Box<ModelError> },
    #[error("Fit failed: {0}")]
    Fit(String),
    #[error("Could not build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ModelError {
    pub fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}

// --- Pipeline Error ---

/// Underlying cause of a [`PipelineError`].
#[derive(thiserror::Error, Debug)]
pub enum PipelineErrorKind {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error (Bincode): {0}")]
    Encode(#[from] bincode::Error),
    #[error("{0}")]
    Model(#[from] ModelError),
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("No search space provided for model '{0}'")]
    MissingSearchSpace(String),
}

/// Error raised by the pipeline helpers.
///
/// Carries the original cause plus the file and line where it surfaced. The
/// location is captured with `#[track_caller]`, so converting with `?` records
/// the call site of the `?`.
#[derive(Debug)]
pub struct PipelineError {
    kind: PipelineErrorKind,
    location: &'static Location<'static>,
}

impl PipelineError {
    #[track_caller]
    pub fn new(kind: impl Into<PipelineErrorKind>) -> Self {
        Self {
            kind: kind.into(),
            location: Location::caller(),
        }
    }

    pub fn kind(&self) -> &PipelineErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> PipelineErrorKind {
        self.kind
    }

    /// Source file where the error was raised.
    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error occurred in file [{}] line number [{}] error message [{}]",
            self.location.file(),
            self.location.line(),
            self.kind
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<PipelineErrorKind> for PipelineError {
    #[track_caller]
    fn from(kind: PipelineErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for PipelineError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(err)
    }
}

impl From<bincode::Error> for PipelineError {
    #[track_caller]
    fn from(err: bincode::Error) -> Self {
        Self::new(err)
    }
}

impl From<ModelError> for PipelineError {
    #[track_caller]
    fn from(err: ModelError) -> Self {
        Self::new(err)
    }
}
