//! Tokio codec for framed protocol messages

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::channel::ChannelId;
use crate::error::ProtocolError;
use crate::frame::{FrameHeader, MAX_PAYLOAD_SIZE};
use crate::message::Message;

/// A complete frame with header information and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel this frame belongs to
    pub channel_id: ChannelId,
    /// The message payload
    pub message: Message,
}

impl Frame {
    pub fn new(channel_id: ChannelId, message: Message) -> Self {
        Self {
            channel_id,
            message,
        }
    }
}

/// Codec for encoding/decoding protocol frames
///
/// Used by both ends of a connection: the client wraps its `TcpStream` in
/// `Framed<_, FrameCodec>`, and so does any daemon implementation.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Header decoded while waiting for the rest of the payload
    pending_header: Option<FrameHeader>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            pending_header: None,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match FrameHeader::decode(src)? {
                Some(h) => h,
                None => return Ok(None),
            },
        };

        let payload_len = header.payload_length as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        if src.len() < payload_len {
            src.reserve(payload_len - src.len());
            self.pending_header = Some(header);
            return Ok(None);
        }

        let payload = src.split_to(payload_len).freeze();
        let message: Message = bincode::deserialize(&payload)?;

        let actual = message.command();
        if actual != header.command {
            return Err(ProtocolError::CommandMismatch {
                header: header.command.as_u16(),
                payload: actual.as_u16(),
            });
        }

        trace!(
            channel = %header.channel_id,
            command = ?actual,
            len = payload_len,
            "decoded frame"
        );

        Ok(Some(Frame {
            channel_id: header.channel_id,
            message,
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&frame.message)?;
        let payload_len = payload.len();

        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = FrameHeader::new(
            payload_len as u32,
            frame.message.command(),
            frame.channel_id,
        );
        header.encode(dst);
        dst.extend_from_slice(&payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::HEADER_SIZE;
    use crate::message::{Command, FileMode, FileMtime};
    use bytes::Bytes;

    #[test]
    fn test_codec_file_init() {
        let mut codec = FrameCodec::new();

        let frame = Frame::new(
            ChannelId::new(9),
            Message::FileInit {
                mode: FileMode::Send,
                remote_path: "/data/local/tmp/a.bin".to_string(),
                compress: true,
                preserve_timestamp: false,
                size: 4096,
                mtime: Some(FileMtime::new(1_700_000_000, 750_000_000)),
            },
        );

        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_partial_read() {
        let mut codec = FrameCodec::new();

        let frame = Frame::new(
            ChannelId::new(1),
            Message::ShellOutput(Bytes::from_static(b"/data/local/tmp\n")),
        );

        let mut full_buf = BytesMut::new();
        codec.encode(frame, &mut full_buf).unwrap();

        // Header only: the codec parks the header and waits
        let mut partial = full_buf.split_to(HEADER_SIZE + 1);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full_buf);

        let decoded = codec.decode(&mut partial).unwrap().unwrap();
        match decoded.message {
            Message::ShellOutput(data) => assert_eq!(data.as_ref(), b"/data/local/tmp\n"),
            other => panic!("Expected ShellOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_codec_two_frames_in_one_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::new(ChannelId::new(3), Message::ListTargets), &mut buf)
            .unwrap();
        codec
            .encode(Frame::new(ChannelId::new(3), Message::LogEnd), &mut buf)
            .unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.message, Message::ListTargets);
        assert_eq!(second.message, Message::LogEnd);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_rejects_oversized_header() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        FrameHeader::new(
            (MAX_PAYLOAD_SIZE + 1) as u32,
            Command::FileData,
            ChannelId::UNASSIGNED,
        )
        .encode(&mut buf);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_codec_rejects_mismatched_tag() {
        let payload = bincode::serialize(&Message::LogEnd).unwrap();
        let mut buf = BytesMut::new();
        FrameHeader::new(payload.len() as u32, Command::ShellExit, ChannelId::new(1))
            .encode(&mut buf);
        buf.extend_from_slice(&payload);

        let mut codec = FrameCodec::new();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::CommandMismatch {
                header: 2002,
                payload: 1007
            })
        ));
    }
}
