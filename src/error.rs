//! Error types for the voice transport and playback core.
//!
//! All errors implement `std::error::Error` and carry enough context to tell a caller
//! whether retrying makes sense.
//!
//! ## Error Categories
//!
//! - **Format Errors**: declared wire lengths inconsistent with the buffer
//! - **Decode Errors**: a short-frame codec unit could not be decoded
//! - **Cancellation**: a playback loop observed its cancellation signal
//! - **Loop Faults**: a playback loop failed for any other reason
//! - **Timeouts**: a bounded wait elapsed
//! - **Configuration Errors**: settings could not be read or parsed
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use skywave::RadioError;
//!
//! let error = RadioError::decode_failed("opus: invalid packet");
//! if !error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! Cancellation is kept apart from faults so a playback loop can unwind with `?`
//! without being reported as broken:
//!
//! ```rust
//! use skywave::RadioError;
//!
//! assert!(RadioError::Cancelled.is_cancellation());
//! assert!(!RadioError::loop_fault("sink closed").is_cancellation());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for transport and playback operations.
pub type Result<T, E = RadioError> = std::result::Result<T, E>;

/// Main error type for the crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RadioError {
    #[error("Malformed voice frame in {context}: {details}")]
    Format { context: String, details: String },

    #[error("Audio decode failed: {details}")]
    Decode { details: String },

    #[error("Playback loop cancelled")]
    Cancelled,

    #[error("Playback loop failed: {reason}")]
    LoopFault {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl RadioError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RadioError::Format { .. } => false,
            RadioError::Decode { .. } => false,
            RadioError::Cancelled => false,
            RadioError::LoopFault { .. } => true,
            RadioError::Timeout { .. } => true,
            RadioError::Config { .. } => false,
            RadioError::Io { .. } => true,
        }
    }

    /// True for the cooperative cancellation outcome.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RadioError::Cancelled)
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RadioError::Format { .. } => vec![
                "Check that the sender speaks the same voice frame layout",
                "Drop the datagram and wait for the next frame",
            ],
            RadioError::Decode { .. } => vec![
                "Treat the frame as silence",
                "Verify the sender's codec configuration",
            ],
            RadioError::Cancelled => vec!["No action needed, playback was stopped on request"],
            RadioError::LoopFault { .. } => vec![
                "Inspect the error source for the failing step",
                "Restart playback",
            ],
            RadioError::Timeout { .. } => vec![
                "Increase the configured timeout",
                "Check that the playback loop observes its cancellation token",
            ],
            RadioError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Remove unknown keys or out-of-range values",
            ],
            RadioError::Io { .. } => vec![
                "Check that the file or socket is readable",
                "Retry the operation",
            ],
        }
    }

    /// Helper constructor for wire format errors.
    pub fn format(context: impl Into<String>, details: impl Into<String>) -> Self {
        RadioError::Format { context: context.into(), details: details.into() }
    }

    /// Helper constructor for decode failures.
    pub fn decode_failed(details: impl Into<String>) -> Self {
        RadioError::Decode { details: details.into() }
    }

    /// Helper constructor for playback loop faults.
    pub fn loop_fault(reason: impl Into<String>) -> Self {
        RadioError::LoopFault { reason: reason.into(), source: None }
    }

    /// Helper constructor for playback loop faults with source.
    pub fn loop_fault_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RadioError::LoopFault { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        RadioError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for RadioError {
    fn from(err: std::io::Error) -> Self {
        RadioError::Io { source: err }
    }
}

impl From<anyhow::Error> for RadioError {
    fn from(err: anyhow::Error) -> Self {
        RadioError::LoopFault { reason: err.to_string(), source: Some(err.into()) }
    }
}
