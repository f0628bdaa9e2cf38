//! hdc-protocol: Wire protocol for the hdc-rs device connector client
//!
//! This crate defines the framed binary protocol spoken between the client
//! library and the local device daemon. Every operation runs over its own
//! TCP connection: the daemon opens with a [`Message::Handshake`], the client
//! answers with a [`Message::HandshakeReply`] carrying the routing key, and
//! the request/response exchange for the operation follows.

pub mod channel;
pub mod codec;
pub mod compress;
pub mod error;
pub mod frame;
pub mod message;

pub use channel::ChannelId;
pub use codec::{Frame, FrameCodec};
pub use error::ProtocolError;
pub use frame::{FrameHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{
    Command, ErrorCode, FileMode, FileMtime, Message, CLIENT_VERSION, HANDSHAKE_BANNER,
};
