//! Error types for zine-dl
//!
//! The taxonomy follows the run lifecycle:
//! - Configuration problems are fatal at startup
//! - Authentication and extraction problems abort a run before any task is scheduled
//! - Per-task download failures are contained at the task boundary and never
//!   escalate to the batch result
//! - Notification failures are logged and never fail the run

use thiserror::Error;

/// Result type alias for zine-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for zine-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "USERNAME")
        key: Option<String>,
    },

    /// Login or authenticated page fetch was rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The archive document did not have the expected structure
    #[error("link extraction failed: {0}")]
    Extraction(String),

    /// A single download task failed (network or filesystem)
    ///
    /// Caught at the task boundary: logged, counted as completed without
    /// success, and never escalated to the batch result.
    #[error("download of {file_name} failed: {reason}")]
    Download {
        /// Target filename of the failed task
        file_name: String,
        /// What went wrong
        reason: String,
    },

    /// A notification upload failed
    #[error("notification failed: {0}")]
    Notify(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Build a configuration error for a missing or invalid key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}
