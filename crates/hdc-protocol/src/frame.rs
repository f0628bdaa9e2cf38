//! Frame header encoding/decoding
//!
//! The frame format uses a 10-byte header:
//! - payload_length: 4 bytes (u32, big-endian)
//! - command: 2 bytes (u16, big-endian)
//! - channel_id: 4 bytes (u32, big-endian)

use bytes::{Buf, BufMut, BytesMut};

use crate::channel::ChannelId;
use crate::error::ProtocolError;
use crate::message::Command;

/// Size of the frame header in bytes
pub const HEADER_SIZE: usize = 10;

/// Maximum payload size (511KB, the daemon's large-transfer packet limit)
pub const MAX_PAYLOAD_SIZE: usize = 511 * 1024;

/// Frame header containing length, command tag and channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the payload in bytes
    pub payload_length: u32,
    /// Command tag of the message in the payload
    pub command: Command,
    /// Channel this frame belongs to
    pub channel_id: ChannelId,
}

impl FrameHeader {
    pub fn new(payload_length: u32, command: Command, channel_id: ChannelId) -> Self {
        Self {
            payload_length,
            command,
            channel_id,
        }
    }

    /// Encode the header into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32(self.payload_length);
        dst.put_u16(self.command.as_u16());
        dst.put_u32(self.channel_id.as_u32());
    }

    /// Decode a header from a byte buffer
    ///
    /// Returns None if there aren't enough bytes in the buffer.
    /// Returns Err if the command tag is unknown; nothing is consumed then.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let tag = u16::from_be_bytes([src[4], src[5]]);
        let command = Command::from_u16(tag).ok_or(ProtocolError::UnknownCommand(tag))?;

        let payload_length = src.get_u32();
        let _ = src.get_u16();
        let channel_id = ChannelId::new(src.get_u32());

        Ok(Some(Self {
            payload_length,
            command,
            channel_id,
        }))
    }
}
