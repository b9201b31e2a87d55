//! Error types for the optimization core.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigField;

/// Message used when a failed search carries no description of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Top-level error for optimizer operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFieldError),

    #[error("Search execution failed: {0}")]
    Search(#[from] SearchError),

    #[error("Optimization already running: {run_id}")]
    AlreadyRunning { run_id: Uuid },

    #[error("No completed optimization run")]
    NoCompletedRun,

    #[error("No optimization result at index {index}")]
    ResultNotFound { index: usize },
}

/// Problems with the parameter ranges handed to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("no parameter ranges to optimize")]
    EmptyRanges,

    #[error("parameter range {index} has no name")]
    EmptyName { index: usize },

    #[error("parameter range {name} has a non-finite bound or step")]
    NonFinite { name: String },

    #[error("parameter range {name}: min {min} is greater than max {max}")]
    InvertedBounds { name: String, min: f64, max: f64 },

    #[error("parameter range {name}: step {step} must be positive")]
    NonPositiveStep { name: String, step: f64 },
}

/// A rejected configuration edit. The previous value is kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigFieldError {
    #[error("{field} = {value} is out of range, expected {expected}")]
    OutOfRange {
        field: ConfigField,
        value: f64,
        expected: &'static str,
    },

    #[error("{field} = {value} must be a whole number")]
    NotAnInteger { field: ConfigField, value: f64 },

    #[error("unknown configuration field: {0}")]
    UnknownField(String),

    #[error("unknown optimization method: {0}")]
    UnknownMethod(String),
}

/// Rejection reported by an external search backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct SearchError {
    message: Option<String>,
}

impl SearchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A failure without any description.
    pub fn unknown() -> Self {
        Self { message: None }
    }

    /// The backend's message, or a generic one when it gave none.
    pub fn message(&self) -> &str {
        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => message,
            _ => UNKNOWN_ERROR_MESSAGE,
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<String> for SearchError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SearchError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Result alias for optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;
