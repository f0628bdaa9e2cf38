//! A single framed connection to the daemon

use std::io;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use hdc_core::{HdcError, Result};
use hdc_protocol::{
    ChannelId, Frame, FrameCodec, Message, ProtocolError, CLIENT_VERSION, HANDSHAKE_BANNER,
};

/// Connection with a completed handshake
///
/// Dropping the value closes the socket.
pub struct Connection {
    framed: Framed<TcpStream, FrameCodec>,
    channel_id: ChannelId,
    daemon_version: String,
}

impl Connection {
    /// Connect to `address` and run the channel handshake
    ///
    /// `connect_key` routes the channel to a device; pass an empty key for
    /// daemon-global requests. Both the TCP connect and the handshake are
    /// bounded by `connect_timeout`.
    pub async fn open(
        address: &str,
        connect_key: &str,
        connect_timeout: Duration,
    ) -> Result<Self> {
        debug!("Connecting to daemon at {}", address);

        let connect = TcpStream::connect(address);
        let stream = match tokio::time::timeout(connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(HdcError::DaemonUnreachable {
                    address: address.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(HdcError::DaemonUnreachable {
                    address: address.to_string(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
        };
        stream.set_nodelay(true)?;

        let framed = Framed::new(stream, FrameCodec::new());
        tokio::time::timeout(connect_timeout, Self::handshake(framed, connect_key)).await?
    }

    async fn handshake(
        mut framed: Framed<TcpStream, FrameCodec>,
        connect_key: &str,
    ) -> Result<Self> {
        let frame = match framed.next().await {
            Some(frame) => frame?,
            None => return Err(eof("handshake")),
        };

        let (channel_id, daemon_version) = match frame.message {
            Message::Handshake {
                banner,
                channel_id,
                version,
            } => {
                if !banner.starts_with(HANDSHAKE_BANNER) {
                    return Err(ProtocolError::InvalidBanner(banner).into());
                }
                (ChannelId::new(channel_id), version)
            }
            other => {
                return Err(HdcError::Protocol(format!(
                    "Expected handshake, got {:?}",
                    other.command()
                )))
            }
        };

        framed
            .send(Frame::new(
                channel_id,
                Message::HandshakeReply {
                    connect_key: connect_key.to_string(),
                    version: CLIENT_VERSION.to_string(),
                },
            ))
            .await?;

        debug!(
            channel = %channel_id,
            daemon = %daemon_version,
            key = connect_key,
            "Handshake complete"
        );

        Ok(Self {
            framed,
            channel_id,
            daemon_version,
        })
    }

    /// Channel id assigned by the daemon
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Version string the daemon sent in its handshake
    pub fn daemon_version(&self) -> &str {
        &self.daemon_version
    }

    /// Send one message on this channel
    pub async fn send(&mut self, message: Message) -> Result<()> {
        trace!(channel = %self.channel_id, command = ?message.command(), "send");
        self.framed
            .send(Frame::new(self.channel_id, message))
            .await?;
        Ok(())
    }

    /// Receive the next message, or `None` once the daemon closes the stream
    pub async fn recv_opt(&mut self) -> Result<Option<Message>> {
        match self.framed.next().await {
            None => Ok(None),
            Some(Err(e)) => Err(e.into()),
            Some(Ok(frame)) => {
                if frame.channel_id != self.channel_id {
                    return Err(HdcError::Protocol(format!(
                        "Frame for {} arrived on {}",
                        frame.channel_id, self.channel_id
                    )));
                }
                Ok(Some(frame.message))
            }
        }
    }

    /// Receive the next message; a closed stream is an `UnexpectedEof` I/O error
    pub async fn recv(&mut self) -> Result<Message> {
        self.recv_opt().await?.ok_or_else(|| eof("reply"))
    }

    /// Flush pending frames and shut down the write side
    pub async fn close(mut self) -> Result<()> {
        self.framed.close().await?;
        Ok(())
    }
}

fn eof(waiting_for: &str) -> HdcError {
    HdcError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("daemon closed the connection while waiting for {}", waiting_for),
    ))
}

/// Error for a frame that has no place in the current exchange
pub(crate) fn unexpected(message: &Message) -> HdcError {
    HdcError::Protocol(format!("Unexpected message: {:?}", message.command()))
}
