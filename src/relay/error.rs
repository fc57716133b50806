// ABOUTME: Relay error types for delivering rendered messages to the chat side
// ABOUTME: Covers process I/O failures, non-zero exits and exhausted retries

use std::io;
use thiserror::Error;

/// Error type for relay deliveries
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failed to spawn or talk to the relay target
    #[error("Relay I/O error: {0}")]
    Io(#[from] io::Error),

    /// Relay command ran but exited unsuccessfully
    #[error("Relay command failed with status {status}")]
    CommandFailed { status: String },

    /// Every attempt allowed by the retry policy failed
    #[error("Relay failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<RelayError>,
    },
}

pub type RelayResult<T> = Result<T, RelayError>;
