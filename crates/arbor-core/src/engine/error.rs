//! Error types for plan building and execution.
//!
//! | Category   | Variants                                   | Handling                        |
//! |------------|--------------------------------------------|---------------------------------|
//! | Validation | `Validation`                               | Aborts before anything executes |
//! | Resolution | `MissingParameter`, `InvalidParameter`     | Aborts the enclosing group      |
//! | Lookup     | `UnknownExecutor`, `MissingExecutor`       | Aborts the enclosing group      |
//! | Lifecycle  | `GroupAlreadyExecuted`, `Cancelled`, `Join`| Aborts the enclosing group      |
//! | System     | `Config`, `Io`                             | Fatal                           |
//!
//! A subprocess that fails to start is not an error: process executors turn
//! it into a sentinel exit code.

use std::fmt;

/// An invocation-level failure. The message is the final user-facing text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn not_executable(name: &str) -> Self {
        Self::new(format!("{} is not executable.", name))
    }

    pub fn unrecognized(token: &str) -> Self {
        Self::new(format!("Unrecognized command or argument '{}'.", token))
    }
}

/// The type a parameter was expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    String,
    Bool,
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedType::String => write!(f, "a string"),
            ExpectedType::Bool => write!(f, "a boolean"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Required parameter '{parameter}' was not provided for '{path}'.")]
    MissingParameter { parameter: String, path: String },

    #[error("Parameter '{parameter}' for '{path}' must be {expected}.")]
    InvalidParameter {
        parameter: String,
        path: String,
        expected: ExpectedType,
    },

    #[error("Executor '{executor}' is not registered.")]
    UnknownExecutor { executor: String },

    #[error("No executor is configured for '{path}'.")]
    MissingExecutor { path: String },

    #[error("Execution group '{name}' has already been executed.")]
    GroupAlreadyExecuted { name: String },

    #[error("Execution was cancelled.")]
    Cancelled,

    #[error("Execution task failed: {0}")]
    Join(String),

    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
