//! Channel identifier type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the daemon assigns to a connection during the handshake
///
/// Every frame carries the channel id so daemon-side logs can be correlated
/// with a client connection. Frames sent before the handshake completes use
/// [`ChannelId::UNASSIGNED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelId(pub u32);

impl ChannelId {
    /// Channel id used before the daemon has assigned one
    pub const UNASSIGNED: ChannelId = ChannelId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel-{:08x}", self.0)
    }
}

impl From<u32> for ChannelId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
