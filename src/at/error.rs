// ABOUTME: Error types for AT response parsing and line reading
// ABOUTME: Carries the offending modem line so failures can be diagnosed from logs

use crate::codec::PduError;
use std::io;
use thiserror::Error;

/// Errors raised while turning modem output into responses
#[derive(Debug, Error)]
pub enum AtError {
    /// A `+CMGL` header line whose fields could not be parsed
    #[error("Malformed record '{line}': {reason}")]
    MalformedRecord { line: String, reason: String },

    /// The stream ended between a `+CMGL` header and its PDU line
    #[error("Stream ended before the PDU line of '{line}'")]
    Truncated { line: String },

    /// The PDU line following a `+CMGL` header failed to decode
    #[error("Could not decode PDU '{line}': {source}")]
    Decode {
        line: String,
        #[source]
        source: PduError,
    },

    /// Reading from the line source failed
    #[error("Read error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for AT parsing operations
pub type AtResult<T> = Result<T, AtError>;
