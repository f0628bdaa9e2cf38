//! Error types for hdc-rs
//!
//! Every public operation fails with exactly one [`HdcError`] kind.

use hdc_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::DeviceId;

/// Boxed error raised by a consumer callback
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for hdc-rs operations
pub type Result<T> = std::result::Result<T, HdcError>;

/// Top-level error type for client operations
#[derive(Error, Debug)]
pub enum HdcError {
    /// The daemon endpoint could not be connected to
    #[error("Cannot reach daemon at {address}: {source}")]
    DaemonUnreachable {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or unexpected frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A per-device operation was issued with no device bound
    #[error("No active device; call connect_device first")]
    NoActiveDevice,

    /// Tried to bind a device that is not connected
    #[error("Device not found: {0}")]
    UnknownDevice(DeviceId),

    /// A command exchange failed or was cut short
    #[error("Command failed: {0}")]
    Exec(String),

    /// A file transfer was rejected or interrupted
    #[error("Transfer failed: {reason}")]
    Transfer { reason: String },

    /// Receiver saw a different byte count than the sender declared
    #[error("Transfer incomplete: expected {expected} bytes, received {actual}")]
    TransferIncomplete { expected: u64, actual: u64 },

    /// A bounded wait elapsed
    #[error("Operation timed out")]
    Timeout,

    /// Transport-level failure, including the daemon closing a stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied value failed validation before anything was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A streaming consumer callback raised an error
    #[error("Handler error: {0}")]
    Handler(#[source] BoxError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl HdcError {
    pub fn transfer(reason: impl Into<String>) -> Self {
        HdcError::Transfer {
            reason: reason.into(),
        }
    }

    /// Whether this error came from the daemon side going away
    pub fn is_disconnect(&self) -> bool {
        match self {
            HdcError::DaemonUnreachable { .. } => true,
            HdcError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

impl From<ProtocolError> for HdcError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => HdcError::Io(e),
            other => HdcError::Protocol(other.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for HdcError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        HdcError::Timeout
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
