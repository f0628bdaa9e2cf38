//! Device discovery traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::DeviceSnapshot;

/// Anything that can report the set of currently connected devices
///
/// The registry's wait and monitor loops are written against this trait so
/// they can run over a live daemon or a scripted sequence of snapshots.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Capture the current device set
    async fn snapshot(&self) -> Result<DeviceSnapshot>;
}

#[async_trait]
impl<T: DeviceSource + ?Sized> DeviceSource for Arc<T> {
    async fn snapshot(&self) -> Result<DeviceSnapshot> {
        (**self).snapshot().await
    }
}

#[async_trait]
impl<T: DeviceSource + ?Sized> DeviceSource for &T {
    async fn snapshot(&self) -> Result<DeviceSnapshot> {
        (**self).snapshot().await
    }
}
