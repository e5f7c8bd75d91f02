// src/error.rs

//! Unified error handling for the monitor.
//!
//! `AppError` is the crate-wide error. The narrower enums describe the
//! failure domains the sweep loop branches on:
//!
//! - [`ConfigError`]: startup configuration, always fatal
//! - [`QueryError`]: a single provider query, contained to that provider
//! - [`NotifyError`]: notification delivery, logged and ignored

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Provider or credentials configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Runtime settings rejected by validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Notification could not be delivered
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// A query resource (browser session) could not be set up
    #[error("Query setup failed: {0}")]
    Query(#[from] QueryError),

    /// Status snapshot could not be written
    #[error("Failed to persist {path}: {message}")]
    Persist { path: String, message: String },
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a persistence error for the given path.
    pub fn persist(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persist {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Configuration input could not be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The input file does not exist
    #[error("{0} not found")]
    Missing(String),

    /// The input exists but is unusable
    #[error("Invalid configuration in {source_name}: {message}")]
    Invalid {
        source_name: String,
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid-configuration error.
    pub fn invalid(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Invalid {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

/// A single provider query failed.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Network or wait deadline exceeded
    #[error("timed out: {0}")]
    Timeout(String),

    /// Transport failure or non-success HTTP status
    #[error("request failed: {0}")]
    Http(String),

    /// The response arrived but its shape was unexpected
    #[error("unexpected response: {0}")]
    Classification(String),

    /// A scripted browser step failed
    #[error("navigation failed at {step}: {message}")]
    Navigation { step: String, message: String },

    /// The automation session itself failed
    #[error("browser session error: {0}")]
    Session(String),
}

impl QueryError {
    /// Create a navigation error for a named script step.
    pub fn navigation(step: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Navigation {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// Whether the sweep should skip this provider and keep its prior state.
    ///
    /// Classification failures are the one kind that still yields a status.
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::Classification(_))
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Classification(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// A notification could not be delivered.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Message could not be assembled (bad address, etc.)
    #[error("failed to build message: {0}")]
    Build(String),

    /// The transport refused or dropped the message
    #[error("failed to deliver message: {0}")]
    Delivery(String),
}
