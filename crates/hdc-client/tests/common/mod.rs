//! In-process daemon used by the integration tests
//!
//! Speaks the real frame codec over a loopback TCP listener and keeps its
//! devices, files, forward rules and log buffer in memory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use sha2::{Digest, Sha256};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use hdc_client::HdcClient;
use hdc_core::ClientConfig;
use hdc_protocol::compress::{deflate_chunk, inflate_chunk};
use hdc_protocol::{
    ChannelId, Command, ErrorCode, FileMode, FileMtime, Frame, FrameCodec, Message,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type Conn = Framed<TcpStream, FrameCodec>;

pub const DAEMON_VERSION: &str = "Ver: 3.1.0e";
pub const DEVICE: &str = "FMR0223C13000649";
const SEND_CHUNK: usize = 7000;

/// A file stored on the fake device
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub data: Vec<u8>,
    pub mtime: Option<FileMtime>,
}

/// Everything the fake daemon knows, shared with the test body
#[derive(Debug, Default)]
pub struct DaemonState {
    pub devices: Vec<String>,
    pub files: HashMap<String, RemoteFile>,
    pub forwards: Vec<String>,
    pub log_lines: Vec<String>,
    /// Sent verbatim as one `LogChunk` each, then the log ends
    pub raw_log: Vec<Vec<u8>>,
    /// Replaces the handshake banner
    pub banner: Option<String>,
    /// Pull: stop one chunk short of the announced total
    pub short_send: bool,
    /// Pull: announce a wrong digest
    pub corrupt_digest: bool,
    /// Push: report one byte fewer than received
    pub under_report: bool,
    /// Connect key of every handshake, in order
    pub connect_keys: Vec<String>,
    /// Tag of every request, in order
    pub requests: Vec<Command>,
    /// `FileVerified` reports received from the client
    pub verified: Vec<(u64, bool)>,
}

pub struct MockDaemon {
    pub address: String,
    state: Arc<Mutex<DaemonState>>,
    handle: JoinHandle<()>,
}

impl MockDaemon {
    /// Daemon with one connected device
    pub async fn start() -> Self {
        Self::with_state(DaemonState {
            devices: vec![DEVICE.to_string()],
            ..DaemonState::default()
        })
        .await
    }

    pub async fn with_state(state: DaemonState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let state = Arc::new(Mutex::new(state));

        let shared = state.clone();
        let handle = tokio::spawn(async move {
            let mut next_channel = 0x100u32;
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                let channel = next_channel;
                next_channel += 1;
                tokio::spawn(async move {
                    let _ = serve(stream, channel, state).await;
                });
            }
        });

        Self {
            address,
            state,
            handle,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, DaemonState> {
        self.state.lock().unwrap()
    }

    pub fn shared(&self) -> Arc<Mutex<DaemonState>> {
        self.state.clone()
    }

    pub fn put_file(&self, path: &str, data: &[u8], mtime: Option<FileMtime>) {
        self.state().files.insert(
            path.to_string(),
            RemoteFile {
                data: data.to_vec(),
                mtime,
            },
        );
    }

    pub fn file(&self, path: &str) -> Option<RemoteFile> {
        self.state().files.get(path).cloned()
    }

    /// Client pointed at this daemon with short timeouts
    pub fn client(&self) -> HdcClient {
        HdcClient::with_config(ClientConfig {
            connect_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(20),
            ..ClientConfig::with_address(self.address.clone())
        })
    }

    /// Client already bound to [`DEVICE`]
    pub async fn bound_client(&self) -> HdcClient {
        let mut client = self.client();
        client.connect_device(DEVICE).await.unwrap();
        client
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn next(conn: &mut Conn) -> Result<Option<Message>, BoxError> {
    Ok(conn.next().await.transpose()?.map(|frame| frame.message))
}

async fn serve(
    stream: TcpStream,
    channel: u32,
    state: Arc<Mutex<DaemonState>>,
) -> Result<(), BoxError> {
    let mut conn = Framed::new(stream, FrameCodec::new());
    let ch = ChannelId::new(channel);

    let banner = state
        .lock()
        .unwrap()
        .banner
        .clone()
        .unwrap_or_else(|| "OHOS HDC".to_string());
    conn.send(Frame::new(
        ch,
        Message::Handshake {
            banner,
            channel_id: channel,
            version: DAEMON_VERSION.to_string(),
        },
    ))
    .await?;

    let key = match next(&mut conn).await? {
        Some(Message::HandshakeReply { connect_key, .. }) => connect_key,
        _ => return Ok(()),
    };
    let Some(request) = next(&mut conn).await? else {
        return Ok(());
    };

    let target_error = {
        let mut st = state.lock().unwrap();
        st.connect_keys.push(key.clone());
        st.requests.push(request.command());
        if key.is_empty() {
            Some(Message::error(ErrorCode::NoTarget, "no target selected"))
        } else if !st.devices.contains(&key) {
            Some(Message::error(
                ErrorCode::DeviceNotFound,
                format!("[Fail]Device not found: {}", key),
            ))
        } else {
            None
        }
    };

    let reply = |message| Frame::new(ch, message);

    match request {
        Message::ListTargets => {
            let devices = state.lock().unwrap().devices.clone();
            conn.send(reply(Message::Targets { devices })).await?;
        }
        Message::ForwardList => {
            let tasks = state.lock().unwrap().forwards.clone();
            conn.send(reply(Message::ForwardTasks { tasks })).await?;
        }
        Message::ForwardRemove { task } => {
            let text = {
                let mut st = state.lock().unwrap();
                let before = st.forwards.len();
                st.forwards.retain(|line| !line.starts_with(&format!("{} ", task)));
                if st.forwards.len() < before {
                    format!("Remove forward ruler success, ruler:{}", task)
                } else {
                    format!("[Fail]Remove forward ruler failed, ruler is not exist {}", task)
                }
            };
            conn.send(reply(Message::Status { text })).await?;
        }
        _ if target_error.is_some() => {
            if let Some(error) = target_error {
                conn.send(reply(error)).await?;
            }
        }
        Message::ShellExec { command } => shell(&mut conn, ch, &command).await?,
        Message::ForwardInit {
            reverse,
            local,
            remote,
        } => {
            let line = if reverse {
                format!("{} {}    [Reverse]", remote, local)
            } else {
                format!("{} {}    [Forward]", local, remote)
            };
            state.lock().unwrap().forwards.push(line);
            conn.send(reply(Message::Status {
                text: "Forwardport result:OK".into(),
            }))
            .await?;
        }
        Message::Install { paths, .. } => {
            if paths.iter().any(|p| p.contains("truncate")) {
                return Ok(());
            }
            let not_package = paths
                .iter()
                .find(|p| !p.ends_with(".hap") && !p.ends_with(".hsp"));
            if let Some(bad) = not_package {
                conn.send(reply(Message::error(
                    ErrorCode::CommandFailed,
                    format!("[Fail]Not a package: {}", bad),
                )))
                .await?;
            } else {
                let text = format!(
                    "[Info]App install path:{}, msg:install bundle successfully.\nAppMod finish",
                    paths.join(" ")
                );
                conn.send(reply(Message::Status { text })).await?;
            }
        }
        Message::Uninstall { package, .. } => {
            let text = format!(
                "[Info]App uninstall path:{}, msg:uninstall bundle successfully.\nAppMod finish",
                package
            );
            conn.send(reply(Message::Status { text })).await?;
        }
        Message::HilogOpen { args, follow } => hilog(&mut conn, ch, &state, args, follow).await?,
        Message::FileInit {
            mode: FileMode::Send,
            remote_path,
            compress,
            preserve_timestamp,
            ..
        } => {
            receive_file(&mut conn, ch, &state, remote_path, compress, preserve_timestamp).await?
        }
        Message::FileInit {
            mode: FileMode::Recv,
            remote_path,
            compress,
            preserve_timestamp,
            ..
        } => {
            send_file(&mut conn, ch, &state, remote_path, compress, preserve_timestamp).await?
        }
        other => {
            conn.send(reply(Message::error(
                ErrorCode::InvalidRequest,
                format!("unexpected {:?}", other.command()),
            )))
            .await?;
        }
    }
    Ok(())
}

async fn shell(conn: &mut Conn, ch: ChannelId, command: &str) -> Result<(), BoxError> {
    let (output, code) = match command.split_once(' ').unwrap_or((command, "")) {
        ("pwd", _) => ("/data/local/tmp\n".to_string(), 0),
        ("echo", rest) => (format!("{}\n", rest), 0),
        ("whoami", _) => ("root\n".to_string(), 0),
        // never answers; exercises request timeouts
        ("sleep", _) => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return Ok(());
        }
        // dies mid-command
        ("crash", _) => {
            conn.send(Frame::new(ch, Message::ShellOutput(Bytes::from_static(b"partial"))))
                .await?;
            return Ok(());
        }
        (other, _) => (format!("/bin/sh: {}: inaccessible or not found\n", other), 127),
    };

    // small chunks so the client has to reassemble
    for piece in output.as_bytes().chunks(4) {
        conn.send(Frame::new(ch, Message::ShellOutput(Bytes::copy_from_slice(piece))))
            .await?;
    }
    conn.send(Frame::new(ch, Message::ShellExit { code: Some(code) }))
        .await?;
    Ok(())
}

async fn hilog(
    conn: &mut Conn,
    ch: ChannelId,
    state: &Arc<Mutex<DaemonState>>,
    args: Option<String>,
    follow: bool,
) -> Result<(), BoxError> {
    let raw = state.lock().unwrap().raw_log.clone();
    if !raw.is_empty() {
        for chunk in raw {
            conn.send(Frame::new(ch, Message::LogChunk(Bytes::from(chunk))))
                .await?;
        }
        conn.send(Frame::new(ch, Message::LogEnd)).await?;
        return Ok(());
    }

    let lines: Vec<String> = state
        .lock()
        .unwrap()
        .log_lines
        .iter()
        .filter(|line| args.as_deref().map_or(true, |filter| line.contains(filter)))
        .cloned()
        .collect();

    for line in lines {
        conn.send(Frame::new(ch, Message::LogChunk(Bytes::from(format!("{}\n", line)))))
            .await?;
    }

    if !follow {
        conn.send(Frame::new(ch, Message::LogEnd)).await?;
        return Ok(());
    }

    // live records until the client goes away
    let mut seq = 0u64;
    loop {
        tokio::time::sleep(Duration::from_millis(5)).await;
        seq += 1;
        let chunk = Bytes::from(format!("live record {}\n", seq));
        if conn.send(Frame::new(ch, Message::LogChunk(chunk))).await.is_err() {
            return Ok(());
        }
    }
}

async fn receive_file(
    conn: &mut Conn,
    ch: ChannelId,
    state: &Arc<Mutex<DaemonState>>,
    remote_path: String,
    compress: bool,
    preserve_timestamp: bool,
) -> Result<(), BoxError> {
    if remote_path.starts_with("/proc") {
        conn.send(Frame::new(
            ch,
            Message::error(
                ErrorCode::PathRejected,
                "[Fail]Error opening file: read-only file system",
            ),
        ))
        .await?;
        return Ok(());
    }
    conn.send(Frame::new(ch, Message::FileAck { size: 0, mtime: None }))
        .await?;

    let mut data = Vec::new();
    let (total, digest, mtime) = loop {
        match next(conn).await? {
            Some(Message::FileData(chunk)) => {
                if compress {
                    data.extend_from_slice(&inflate_chunk(&chunk)?);
                } else {
                    data.extend_from_slice(&chunk);
                }
            }
            Some(Message::FileFinish {
                total,
                digest,
                mtime,
            }) => break (total, digest, mtime),
            _ => return Ok(()),
        }
    };

    let received = data.len() as u64;
    let digest_ok = Sha256::digest(&data).as_slice() == digest.as_slice() && received == total;
    let under_report = {
        let mut st = state.lock().unwrap();
        st.files.insert(
            remote_path,
            RemoteFile {
                data,
                mtime: if preserve_timestamp { mtime } else { None },
            },
        );
        st.under_report
    };

    conn.send(Frame::new(
        ch,
        Message::FileVerified {
            received: if under_report { received - 1 } else { received },
            digest_ok,
        },
    ))
    .await?;
    Ok(())
}

async fn send_file(
    conn: &mut Conn,
    ch: ChannelId,
    state: &Arc<Mutex<DaemonState>>,
    remote_path: String,
    compress: bool,
    preserve_timestamp: bool,
) -> Result<(), BoxError> {
    let (file, short_send, corrupt_digest) = {
        let st = state.lock().unwrap();
        (st.files.get(&remote_path).cloned(), st.short_send, st.corrupt_digest)
    };
    let Some(file) = file else {
        conn.send(Frame::new(
            ch,
            Message::error(
                ErrorCode::PathRejected,
                format!("[Fail]Error opening file: no such file, path:{}", remote_path),
            ),
        ))
        .await?;
        return Ok(());
    };

    let total = file.data.len() as u64;
    let mtime = if preserve_timestamp { file.mtime } else { None };
    conn.send(Frame::new(ch, Message::FileAck { size: total, mtime }))
        .await?;

    let chunks: Vec<&[u8]> = file.data.chunks(SEND_CHUNK).collect();
    let keep = if short_send { chunks.len().saturating_sub(1) } else { chunks.len() };
    for chunk in &chunks[..keep] {
        let payload = if compress {
            Bytes::from(deflate_chunk(chunk)?)
        } else {
            Bytes::copy_from_slice(chunk)
        };
        conn.send(Frame::new(ch, Message::FileData(payload))).await?;
    }

    let mut digest = Sha256::digest(&file.data).to_vec();
    if corrupt_digest {
        digest[0] ^= 0xff;
    }
    conn.send(Frame::new(
        ch,
        Message::FileFinish {
            total,
            digest,
            mtime,
        },
    ))
    .await?;

    if let Some(Message::FileVerified { received, digest_ok }) = next(conn).await? {
        state.lock().unwrap().verified.push((received, digest_ok));
    }
    Ok(())
}
