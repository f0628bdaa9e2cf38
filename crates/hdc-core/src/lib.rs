//! hdc-core: Core abstractions and configuration for hdc-rs
//!
//! This crate provides the domain types shared by the client library and
//! the command-line frontend: device identifiers and snapshots, forward
//! rules, transfer and install options, the error taxonomy every public
//! operation reports through, and the TOML client configuration.

pub mod app;
pub mod config;
pub mod error;
pub mod forward;
pub mod time;
pub mod traits;
pub mod transfer;
pub mod types;

pub use app::{InstallOptions, UninstallOptions};
pub use config::ClientConfig;
pub use error::{BoxError, ConfigError, HdcError, Result};
pub use forward::{ForwardDirection, ForwardNode, ForwardRule};
pub use traits::DeviceSource;
pub use transfer::{TransferDirection, TransferOptions, TransferRequest};
pub use types::{DeviceId, DeviceSnapshot, Flow, SnapshotDiff};
