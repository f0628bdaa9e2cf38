//! Daemon transport
//!
//! Every operation opens its own [`Connection`]: TCP connect, daemon
//! handshake, then one request/response exchange.

mod connection;

pub use connection::Connection;
pub(crate) use connection::unexpected;

use std::future::{self, Future};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hdc_core::Result;

/// Run `fut`, failing with `Timeout` once `limit` elapses
pub(crate) async fn with_deadline<T, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await?,
        None => fut.await,
    }
}

/// Resolve once `cancel` fires; never resolves without a token
pub(crate) async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => future::pending().await,
    }
}
