//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_secs_f64, option_duration_secs_f64};
use crate::error::ConfigError;

/// Address of the daemon when none is configured
pub const DEFAULT_DAEMON_ADDRESS: &str = "127.0.0.1:8710";

/// Largest chunk the transfer engine will put in one frame
const MAX_CHUNK_SIZE: usize = 256 * 1024;

/// Configuration for a client instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Daemon endpoint (`host:port`)
    pub address: String,

    /// Time allowed for TCP connect plus handshake
    #[serde(with = "duration_secs_f64")]
    pub connect_timeout: Duration,

    /// Bound on each request/response exchange; streaming calls are never bounded
    #[serde(
        with = "option_duration_secs_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,

    /// Interval between device list polls in `wait_for_device`
    #[serde(with = "duration_secs_f64")]
    pub poll_interval: Duration,

    /// File transfer chunk size in bytes
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DAEMON_ADDRESS.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            poll_interval: Duration::from_secs(1),
            chunk_size: 64 * 1024,
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `address`
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid("address must not be empty".into()));
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be between 1 and {}",
                MAX_CHUNK_SIZE
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll_interval must be positive".into()));
        }
        Ok(())
    }
}
