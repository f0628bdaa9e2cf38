//! File transfer engine
//!
//! A transfer runs through [`TransferState`]s on one dedicated connection:
//! `FileInit`/`FileAck` negotiation, a stream of `FileData` chunks (each
//! deflated on its own when compression is on), a closing `FileFinish` with
//! the SHA-256 of the uncompressed content, and a `FileVerified` report from
//! the receiving side.

mod engine;
mod state;

pub use state::{TransferMachine, TransferState};

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use hdc_core::time::rate_kbps;
use hdc_core::{Result, TransferDirection, TransferOptions, TransferRequest};

use crate::client::HdcClient;

/// Summary of a finished transfer
///
/// Displays as the status line the daemon's own tools print.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    /// Uncompressed bytes moved
    pub bytes: u64,
    pub elapsed: Duration,
    /// Destination path
    pub path: String,
    /// States the transfer went through
    pub states: Vec<TransferState>,
}

impl TransferReport {
    pub fn rate_kbps(&self) -> f64 {
        rate_kbps(self.bytes, self.elapsed)
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileTransfer finish, Size:{}, File count = 1, time:{}ms rate:{:.2}kB/s {}",
            self.bytes,
            self.elapsed.as_millis(),
            self.rate_kbps(),
            self.path
        )
    }
}

impl HdcClient {
    /// Send a host file to the active device
    pub async fn file_send(
        &self,
        local: &str,
        remote: &str,
        options: TransferOptions,
    ) -> Result<String> {
        self.transfer(TransferRequest::push(local, remote, options))
            .await
    }

    /// Fetch a file from the active device
    ///
    /// When `local` is an existing directory the file keeps its remote name.
    pub async fn file_recv(
        &self,
        remote: &str,
        local: &str,
        options: TransferOptions,
    ) -> Result<String> {
        self.transfer(TransferRequest::pull(remote, local, options))
            .await
    }

    /// Run a transfer and return its status line
    pub async fn transfer(&self, request: TransferRequest) -> Result<String> {
        self.transfer_with_report(request)
            .await
            .map(|report| report.to_string())
    }

    /// Run a transfer and return the full report
    pub async fn transfer_with_report(&self, request: TransferRequest) -> Result<TransferReport> {
        let device = self.device()?;
        let mut machine = TransferMachine::new();
        let started = Instant::now();

        info!(
            device = %device.id(),
            direction = ?request.direction,
            compress = request.options.compress,
            "Transfer {} -> {}",
            request.source,
            request.destination
        );

        let result = match request.direction {
            TransferDirection::Push => engine::push(device, &request, &mut machine).await,
            TransferDirection::Pull => engine::pull(device, &request, &mut machine).await,
        };

        match result {
            Ok(done) => {
                machine.advance(TransferState::Done)?;
                let report = TransferReport {
                    bytes: done.bytes,
                    elapsed: started.elapsed(),
                    path: done.path,
                    states: machine.history().to_vec(),
                };
                info!("{}", report);
                Ok(report)
            }
            Err(e) => {
                warn!(state = %machine.state(), "Transfer failed: {}", e);
                Err(machine.fail(e))
            }
        }
    }
}
