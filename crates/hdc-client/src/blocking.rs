//! Synchronous wrapper around the async client
//!
//! [`HdcClient`] here owns a current-thread tokio runtime and blocks on each
//! call. It must not be used from inside another tokio runtime.

use std::path::Path;
use std::time::Duration;

use hdc_core::{
    BoxError, ClientConfig, DeviceId, DeviceSnapshot, Flow, InstallOptions, Result, SnapshotDiff,
    TransferOptions, TransferRequest, UninstallOptions,
};
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::client::HdcClient as AsyncClient;

/// Blocking device connector client
pub struct HdcClient {
    runtime: Runtime,
    inner: AsyncClient,
}

impl HdcClient {
    /// Create a client for `address` with default settings
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::with_address(address))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            inner: AsyncClient::with_config(config),
        })
    }

    /// The wrapped async client
    pub fn inner(&self) -> &AsyncClient {
        &self.inner
    }

    pub fn list_targets(&self) -> Result<DeviceSnapshot> {
        self.runtime.block_on(self.inner.list_targets())
    }

    pub fn connect_device(&mut self, device: impl Into<DeviceId>) -> Result<()> {
        self.runtime.block_on(self.inner.connect_device(device))
    }

    pub fn disconnect_device(&mut self) -> Option<DeviceId> {
        self.inner.disconnect_device()
    }

    pub fn active_device(&self) -> Option<&DeviceId> {
        self.inner.active_device()
    }

    pub fn wait_for_device(&self, timeout: Option<Duration>) -> Result<DeviceId> {
        self.runtime.block_on(self.inner.wait_for_device(timeout))
    }

    pub fn monitor_devices<F, E>(&self, interval: Duration, callback: F) -> Result<()>
    where
        F: FnMut(&DeviceSnapshot, &SnapshotDiff) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.runtime
            .block_on(self.inner.monitor_devices(interval, callback))
    }

    /// Monitor until `cancel` fires; cancel from another thread
    pub fn monitor_devices_until<F, E>(
        &self,
        interval: Duration,
        cancel: &CancellationToken,
        callback: F,
    ) -> Result<()>
    where
        F: FnMut(&DeviceSnapshot, &SnapshotDiff) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.runtime
            .block_on(self.inner.monitor_devices_until(interval, cancel, callback))
    }

    pub fn shell(&self, command: &str) -> Result<String> {
        self.runtime.block_on(self.inner.shell(command))
    }

    pub fn fport(&self, local: &str, remote: &str) -> Result<String> {
        self.runtime.block_on(self.inner.fport(local, remote))
    }

    pub fn rport(&self, remote: &str, local: &str) -> Result<String> {
        self.runtime.block_on(self.inner.rport(remote, local))
    }

    pub fn fport_remove(&self, task: &str) -> Result<String> {
        self.runtime.block_on(self.inner.fport_remove(task))
    }

    pub fn fport_list(&self) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.fport_list())
    }

    pub fn install<P: AsRef<Path>>(&self, paths: &[P], options: InstallOptions) -> Result<String> {
        self.runtime.block_on(self.inner.install(paths, options))
    }

    pub fn uninstall(&self, package: &str, options: UninstallOptions) -> Result<String> {
        self.runtime.block_on(self.inner.uninstall(package, options))
    }

    pub fn check_server(&self) -> Result<String> {
        self.runtime.block_on(self.inner.check_server())
    }

    pub fn file_send(&self, local: &str, remote: &str, options: TransferOptions) -> Result<String> {
        self.runtime
            .block_on(self.inner.file_send(local, remote, options))
    }

    pub fn file_recv(&self, remote: &str, local: &str, options: TransferOptions) -> Result<String> {
        self.runtime
            .block_on(self.inner.file_recv(remote, local, options))
    }

    pub fn transfer(&self, request: TransferRequest) -> Result<String> {
        self.runtime.block_on(self.inner.transfer(request))
    }

    pub fn hilog(&self, args: Option<&str>) -> Result<String> {
        self.runtime.block_on(self.inner.hilog(args))
    }

    pub fn hilog_stream<F, E>(&self, args: Option<&str>, handler: F) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.runtime.block_on(self.inner.hilog_stream(args, handler))
    }

    pub fn hilog_stream_until<F, E>(
        &self,
        args: Option<&str>,
        cancel: &CancellationToken,
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.runtime
            .block_on(self.inner.hilog_stream_until(args, cancel, handler))
    }
}
