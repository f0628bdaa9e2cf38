//! File transfer requests and options

use serde::{Deserialize, Serialize};

use crate::error::HdcError;

/// Options recognized by the transfer engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Deflate each chunk before it goes on the wire
    pub compress: bool,
    /// Carry the source modification time over to the destination
    pub preserve_timestamp: bool,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compress(mut self, enable: bool) -> Self {
        self.compress = enable;
        self
    }

    pub fn preserve_timestamp(mut self, enable: bool) -> Self {
        self.preserve_timestamp = enable;
        self
    }
}

/// Which way the content moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Host file to device
    Push,
    /// Device file to host
    Pull,
}

/// A single-file transfer between host and device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: String,
    pub destination: String,
    pub direction: TransferDirection,
    pub options: TransferOptions,
}

impl TransferRequest {
    pub fn push(
        local: impl Into<String>,
        remote: impl Into<String>,
        options: TransferOptions,
    ) -> Self {
        Self {
            source: local.into(),
            destination: remote.into(),
            direction: TransferDirection::Push,
            options,
        }
    }

    pub fn pull(
        remote: impl Into<String>,
        local: impl Into<String>,
        options: TransferOptions,
    ) -> Self {
        Self {
            source: remote.into(),
            destination: local.into(),
            direction: TransferDirection::Pull,
            options,
        }
    }

    /// Path on the host side of the transfer
    pub fn local_path(&self) -> &str {
        match self.direction {
            TransferDirection::Push => &self.source,
            TransferDirection::Pull => &self.destination,
        }
    }

    /// Path on the device side of the transfer
    pub fn remote_path(&self) -> &str {
        match self.direction {
            TransferDirection::Push => &self.destination,
            TransferDirection::Pull => &self.source,
        }
    }

    /// Reject empty paths and paths with NUL bytes
    pub fn validate(&self) -> Result<(), HdcError> {
        for (what, path) in [("source", &self.source), ("destination", &self.destination)] {
            if !validate_path(path) {
                return Err(HdcError::transfer(format!("invalid {} path {:?}", what, path)));
            }
        }
        Ok(())
    }
}

/// Validate one path for transfer
pub fn validate_path(path: &str) -> bool {
    !path.is_empty() && !path.contains('\0')
}
