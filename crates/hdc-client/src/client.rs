//! The async client handle

use hdc_core::{ClientConfig, DeviceId, HdcError, Result};

use crate::transport::Connection;

/// Client bound to one daemon endpoint
///
/// Holds at most one active device. Per-device operations route through
/// that device and fail with [`HdcError::NoActiveDevice`] until
/// [`HdcClient::connect_device`] has bound one.
#[derive(Debug, Clone)]
pub struct HdcClient {
    config: ClientConfig,
    active: Option<DeviceId>,
}

impl HdcClient {
    /// Create a client for `address` with default settings
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::with_address(address))
    }

    /// Create a client from a full configuration
    ///
    /// Transfers re-check the settings with [`ClientConfig::validate`] and
    /// fail with [`HdcError::Config`] before touching the network.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Daemon endpoint this client talks to
    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn set_active(&mut self, device: Option<DeviceId>) -> Option<DeviceId> {
        std::mem::replace(&mut self.active, device)
    }

    pub(crate) fn active(&self) -> Option<&DeviceId> {
        self.active.as_ref()
    }

    /// Routing context for a per-device operation
    pub(crate) fn device(&self) -> Result<DeviceContext<'_>> {
        self.active
            .as_ref()
            .map(|device| DeviceContext {
                client: self,
                device,
            })
            .ok_or(HdcError::NoActiveDevice)
    }

    /// Open a daemon-global connection (empty connect key)
    pub(crate) async fn open_global(&self) -> Result<Connection> {
        Connection::open(&self.config.address, "", self.config.connect_timeout).await
    }
}

impl Default for HdcClient {
    /// Client for the local daemon on its default port
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

/// The active device, borrowed for the length of one operation
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeviceContext<'a> {
    client: &'a HdcClient,
    device: &'a DeviceId,
}

impl<'a> DeviceContext<'a> {
    pub(crate) fn id(&self) -> &'a DeviceId {
        self.device
    }

    pub(crate) fn config(&self) -> &'a ClientConfig {
        &self.client.config
    }

    /// Open a connection routed to this device
    pub(crate) async fn open(&self) -> Result<Connection> {
        let config = &self.client.config;
        Connection::open(&config.address, self.device.as_str(), config.connect_timeout).await
    }
}
