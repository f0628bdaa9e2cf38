//! hdc-client: Async client for the HarmonyOS device connector daemon
//!
//! [`HdcClient`] talks to a local daemon over TCP. Device discovery and
//! selection live in the session registry; once a device is bound, shell
//! commands, port forwards, installs, file transfers and log streams are
//! routed to it.
//!
//! ```no_run
//! # async fn demo() -> hdc_core::Result<()> {
//! use hdc_client::HdcClient;
//! use hdc_core::TransferOptions;
//!
//! let mut client = HdcClient::default();
//! let device = client.wait_for_device(None).await?;
//! client.connect_device(device).await?;
//!
//! println!("{}", client.shell("uname -a").await?);
//! client
//!     .file_send("build/app.hap", "/data/local/tmp/app.hap", TransferOptions::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! With the `blocking` feature (on by default) [`blocking::HdcClient`]
//! offers the same operations for synchronous callers.

#[cfg(feature = "blocking")]
pub mod blocking;
mod client;
mod command;
mod logstream;
pub mod registry;
pub mod transfer;
pub mod transport;

pub use client::HdcClient;
pub use transfer::{TransferMachine, TransferReport, TransferState};
pub use transport::Connection;

pub use hdc_core::{
    DeviceId, DeviceSnapshot, DeviceSource, Flow, HdcError, InstallOptions, Result, SnapshotDiff,
    TransferOptions, TransferRequest, UninstallOptions,
};
pub use tokio_util::sync::CancellationToken;
