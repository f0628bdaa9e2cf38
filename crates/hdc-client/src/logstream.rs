//! Device log streaming

use bytes::BytesMut;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use hdc_core::{BoxError, Flow, HdcError, Result};
use hdc_protocol::Message;

use crate::client::HdcClient;
use crate::transport::{cancelled, unexpected, with_deadline, Connection};

impl HdcClient {
    /// Dump the device log buffer and return it as text
    ///
    /// `args` is passed through to the device log tool as filter arguments.
    pub async fn hilog(&self, args: Option<&str>) -> Result<String> {
        let device = self.device()?;

        with_deadline(self.config().request_timeout, async {
            let mut conn = device.open().await?;
            conn.send(Message::HilogOpen {
                args: args.map(str::to_string),
                follow: false,
            })
            .await?;

            let mut text = BytesMut::new();
            loop {
                match conn.recv().await? {
                    Message::LogChunk(chunk) => text.extend_from_slice(&chunk),
                    Message::LogEnd => break,
                    Message::Error { message, .. } => return Err(HdcError::Exec(message)),
                    other => return Err(unexpected(&other)),
                }
            }
            debug!(bytes = text.len(), "hilog dump finished");
            Ok(String::from_utf8_lossy(&text).into_owned())
        })
        .await
    }

    /// Follow the device log, handing each chunk to `handler` as it arrives
    ///
    /// Returns `Ok(())` when the handler answers `Flow::Stop` or the daemon
    /// ends the stream. A handler error ends the stream with
    /// [`HdcError::Handler`]; a dropped connection with [`HdcError::Io`].
    /// The subscription is closed before this returns.
    pub async fn hilog_stream<F, E>(&self, args: Option<&str>, handler: F) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.follow_log(args, None, handler).await
    }

    /// Same as [`HdcClient::hilog_stream`], also ending when `cancel` fires
    pub async fn hilog_stream_until<F, E>(
        &self,
        args: Option<&str>,
        cancel: &CancellationToken,
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.follow_log(args, Some(cancel), handler).await
    }

    async fn follow_log<F, E>(
        &self,
        args: Option<&str>,
        cancel: Option<&CancellationToken>,
        mut handler: F,
    ) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        let device = self.device()?;
        let mut conn = device.open().await?;
        conn.send(Message::HilogOpen {
            args: args.map(str::to_string),
            follow: true,
        })
        .await?;
        info!(device = %device.id(), "Following device log");

        let mut chunks = 0u64;
        let mut carry = Utf8Carry::default();
        let result = loop {
            let message = tokio::select! {
                biased;
                _ = cancelled(cancel) => break Ok(()),
                message = conn.recv_opt() => message,
            };

            match message {
                Ok(Some(Message::LogChunk(chunk))) => {
                    chunks += 1;
                    let text = carry.push(&chunk);
                    if text.is_empty() {
                        continue;
                    }
                    match handler(&text) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => break Ok(()),
                        Err(e) => break Err(HdcError::Handler(e.into())),
                    }
                }
                Ok(Some(Message::LogEnd)) => break flush(&mut carry, &mut handler),
                Ok(Some(Message::Error { message, .. })) => break Err(HdcError::Exec(message)),
                Ok(Some(other)) => break Err(unexpected(&other)),
                Ok(None) => {
                    break flush(&mut carry, &mut handler).and_then(|()| {
                        Err(HdcError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "log stream closed by daemon",
                        )))
                    })
                }
                Err(e) => break Err(e),
            }
        };

        debug!(chunks, ok = result.is_ok(), "Log stream ended");
        close_quietly(conn).await;
        result
    }
}

/// Hand any held-back bytes to the handler once the stream has ended
fn flush<F, E>(carry: &mut Utf8Carry, handler: &mut F) -> Result<()>
where
    F: FnMut(&str) -> std::result::Result<Flow, E>,
    E: Into<BoxError>,
{
    match carry.finish() {
        Some(text) => handler(&text)
            .map(|_| ())
            .map_err(|e| HdcError::Handler(e.into())),
        None => Ok(()),
    }
}

/// Reassembles UTF-8 text whose characters straddle chunk boundaries
///
/// An incomplete sequence at the end of a chunk is held back until the next
/// chunk arrives. Bytes that can never become valid are replaced with
/// U+FFFD as usual.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: BytesMut,
}

impl Utf8Carry {
    /// Append `chunk` and take everything up to the last complete character
    fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let ready = self.pending.len() - incomplete_tail(&self.pending);
        let text = self.pending.split_to(ready);
        String::from_utf8_lossy(&text).into_owned()
    }

    /// Whatever is still held back, decoded lossily
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Length of a truncated but so far valid UTF-8 sequence ending `bytes`
fn incomplete_tail(bytes: &[u8]) -> usize {
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(_) => return 0,
            Err(e) => match e.error_len() {
                Some(bad) => rest = &rest[e.valid_up_to() + bad..],
                None => return rest.len() - e.valid_up_to(),
            },
        }
    }
}

async fn close_quietly(conn: Connection) {
    if let Err(e) = conn.close().await {
        debug!("Ignoring error while closing log stream: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carry_joins_split_character() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(&[b'a', 0xC3]), "a");
        assert_eq!(carry.push(&[0xA9, b'\n']), "\u{e9}\n");
        assert_eq!(carry.finish(), None);
    }

    #[test]
    fn test_carry_four_byte_character_in_three_pieces() {
        let crab = "\u{1F980}".as_bytes();
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(&crab[..1]), "");
        assert_eq!(carry.push(&crab[1..3]), "");
        assert_eq!(carry.push(&crab[3..]), "\u{1F980}");
    }

    #[test]
    fn test_invalid_bytes_are_not_held_back() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(&[0xFF, b'x', 0xE4, 0xB8]), "\u{FFFD}x");
        assert_eq!(carry.finish().as_deref(), Some("\u{FFFD}"));
    }

    #[test]
    fn test_incomplete_tail() {
        assert_eq!(incomplete_tail(b"plain"), 0);
        assert_eq!(incomplete_tail(&[b'a', 0xE4, 0xB8]), 2);
        assert_eq!(incomplete_tail(&[0xC3, b'a']), 0);
    }
}
