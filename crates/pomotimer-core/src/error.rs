//! Core error types for pomotimer-core.
//!
//! The timer engine itself never fails. These types cover the ambient
//! surfaces around it: configuration I/O, runtime discovery and front-end
//! input validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while wiring the engine to its host.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A tokio scheduler was requested outside a runtime
    #[error("no tokio runtime is available to drive the timer")]
    NoRuntime,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be prepared
    #[error("Failed to prepare config directory {path}: {source}")]
    DirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Input validation errors raised by front-ends before calling the engine.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Value out of the accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Value could not be interpreted
    #[error("invalid {field}: {message}")]
    InvalidValue { field: String, message: String },
}
