//! Error types for Piper.

use thiserror::Error;

/// Result type alias using Piper's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Piper operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A blueprint or engine configuration violates its constraints.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A flow-control call named a location that does not exist.
    #[error("{op}: no segment matching location '{location}'")]
    Unresolved {
        /// The flow-control operation that failed.
        op: &'static str,
        /// The location that could not be resolved.
        location: String,
    },

    /// A handler reported a failure while processing a batch.
    #[error("handler failed in segment '{segment}': {message}")]
    Handler {
        /// Path of the segment whose handler failed.
        segment: String,
        /// Failure description.
        message: String,
    },
}
