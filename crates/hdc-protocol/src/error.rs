//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unknown command tag in a frame header
    #[error("Unknown command tag: {0}")]
    UnknownCommand(u16),

    /// Payload exceeds maximum size
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Header tag does not match the decoded payload
    #[error("Command mismatch: header says {header}, payload is {payload}")]
    CommandMismatch { header: u16, payload: u16 },

    /// Daemon handshake did not carry the expected banner
    #[error("Invalid banner: expected 'OHOS HDC', got {0:?}")]
    InvalidBanner(String),

    /// Deflate stream could not be decoded
    #[error("Compression error: {0}")]
    Compression(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
