//! Push and pull over a single connection

use std::path::{Path, PathBuf};

use bytes::Bytes;
use filetime::FileTime;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace, warn};

use hdc_core::time::file_mtime;
use hdc_core::{HdcError, Result, TransferRequest};
use hdc_protocol::compress::{deflate_chunk, inflate_chunk};
use hdc_protocol::{FileMode, Message};

use super::state::{TransferMachine, TransferState};
use crate::client::DeviceContext;
use crate::transport::{unexpected, with_deadline};

/// What a finished transfer moved and where it landed
pub(super) struct Completed {
    pub bytes: u64,
    pub path: String,
}

/// Send a host file to the device
pub(super) async fn push(
    device: DeviceContext<'_>,
    request: &TransferRequest,
    machine: &mut TransferMachine,
) -> Result<Completed> {
    request.validate()?;
    let options = request.options;
    let config = device.config();
    config.validate()?;
    let local = Path::new(request.local_path());
    let remote = request.remote_path();

    let mut file = File::open(local)
        .await
        .map_err(|e| HdcError::transfer(format!("cannot open {}: {}", local.display(), e)))?;
    let meta = file.metadata().await?;
    if !meta.is_file() {
        return Err(HdcError::transfer(format!(
            "{} is not a regular file",
            local.display()
        )));
    }
    let size = meta.len();
    let mtime = if options.preserve_timestamp {
        Some(file_mtime(meta.modified()?))
    } else {
        None
    };

    let mut conn = device.open().await?;
    machine.advance(TransferState::Negotiate)?;
    conn.send(Message::FileInit {
        mode: FileMode::Send,
        remote_path: remote.to_string(),
        compress: options.compress,
        preserve_timestamp: options.preserve_timestamp,
        size,
        mtime,
    })
    .await?;

    match with_deadline(config.request_timeout, conn.recv()).await? {
        Message::FileAck { .. } => {}
        Message::Error { message, .. } => return Err(HdcError::transfer(message)),
        other => return Err(unexpected(&other)),
    }

    machine.advance(TransferState::Streaming)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; config.chunk_size];
    let mut total = 0u64;
    loop {
        let n = read_chunk(&mut file, &mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        hasher.update(chunk);
        total += n as u64;

        let payload = if options.compress {
            Bytes::from(deflate_chunk(chunk)?)
        } else {
            Bytes::copy_from_slice(chunk)
        };
        trace!(len = n, wire = payload.len(), "push chunk");
        conn.send(Message::FileData(payload)).await?;
    }

    if total != size {
        return Err(HdcError::TransferIncomplete {
            expected: size,
            actual: total,
        });
    }

    let digest = hasher.finalize().to_vec();
    debug!(total, sha256 = %hex::encode(&digest), "push stream finished");
    conn.send(Message::FileFinish {
        total,
        digest,
        mtime,
    })
    .await?;

    machine.advance(TransferState::Verify)?;
    match with_deadline(config.request_timeout, conn.recv()).await? {
        Message::FileVerified {
            received,
            digest_ok,
        } => {
            if received != total {
                return Err(HdcError::TransferIncomplete {
                    expected: total,
                    actual: received,
                });
            }
            if !digest_ok {
                return Err(HdcError::transfer("daemon reported a digest mismatch"));
            }
        }
        Message::Error { message, .. } => return Err(HdcError::transfer(message)),
        other => return Err(unexpected(&other)),
    }

    Ok(Completed {
        bytes: total,
        path: remote.to_string(),
    })
}

/// Fetch a device file to the host
///
/// Content lands in a temporary file next to the destination and is only
/// renamed into place once verified, so a failed pull leaves nothing behind.
pub(super) async fn pull(
    device: DeviceContext<'_>,
    request: &TransferRequest,
    machine: &mut TransferMachine,
) -> Result<Completed> {
    request.validate()?;
    let options = request.options;
    let config = device.config();
    config.validate()?;
    let remote = request.remote_path();
    let destination = resolve_destination(Path::new(request.local_path()), remote).await?;

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let temp = tempfile::Builder::new()
        .prefix(".hdc-recv-")
        .tempfile_in(&dir)
        .map_err(|e| HdcError::transfer(format!("cannot write to {}: {}", dir.display(), e)))?;
    let (std_file, temp_path) = temp.into_parts();
    let mut file = File::from_std(std_file);

    let mut conn = device.open().await?;
    machine.advance(TransferState::Negotiate)?;
    conn.send(Message::FileInit {
        mode: FileMode::Recv,
        remote_path: remote.to_string(),
        compress: options.compress,
        preserve_timestamp: options.preserve_timestamp,
        size: 0,
        mtime: None,
    })
    .await?;

    let (declared, ack_mtime) = match with_deadline(config.request_timeout, conn.recv()).await? {
        Message::FileAck { size, mtime } => (size, mtime),
        Message::Error { message, .. } => return Err(HdcError::transfer(message)),
        other => return Err(unexpected(&other)),
    };

    machine.advance(TransferState::Streaming)?;
    let mut hasher = Sha256::new();
    let mut received = 0u64;
    let (total, digest, finish_mtime) = loop {
        match conn.recv().await? {
            Message::FileData(chunk) => {
                let wire = chunk.len();
                let data = if options.compress {
                    Bytes::from(inflate_chunk(&chunk)?)
                } else {
                    chunk
                };
                trace!(len = data.len(), wire, "pull chunk");
                hasher.update(&data);
                received += data.len() as u64;
                file.write_all(&data).await?;
            }
            Message::FileFinish {
                total,
                digest,
                mtime,
            } => break (total, digest, mtime),
            Message::Error { message, .. } => return Err(HdcError::transfer(message)),
            other => return Err(unexpected(&other)),
        }
    };
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    machine.advance(TransferState::Verify)?;
    let digest_ok = hasher.finalize().as_slice() == digest.as_slice();
    conn.send(Message::FileVerified {
        received,
        digest_ok,
    })
    .await?;

    if received != total {
        return Err(HdcError::TransferIncomplete {
            expected: total,
            actual: received,
        });
    }
    if !digest_ok {
        return Err(HdcError::transfer(format!(
            "digest mismatch for {}: expected {}",
            remote,
            hex::encode(&digest)
        )));
    }
    if declared != total {
        warn!(declared, total, "daemon announced a different size than it sent");
    }

    if options.preserve_timestamp {
        if let Some(mtime) = finish_mtime.or(ack_mtime) {
            let stamp = FileTime::from_unix_time(mtime.secs, mtime.nanos);
            filetime::set_file_mtime(&temp_path, stamp)?;
        }
    }

    temp_path.persist(&destination).map_err(|e| {
        HdcError::transfer(format!(
            "cannot move download into {}: {}",
            destination.display(),
            e.error
        ))
    })?;

    Ok(Completed {
        bytes: total,
        path: destination.display().to_string(),
    })
}

/// A directory destination receives the remote file under its own name
async fn resolve_destination(local: &Path, remote: &str) -> Result<PathBuf> {
    let is_dir = tokio::fs::metadata(local)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Ok(local.to_path_buf());
    }

    let name = remote
        .rsplit('/')
        .find(|part| !part.is_empty())
        .ok_or_else(|| {
            HdcError::transfer(format!("cannot name a local file after {:?}", remote))
        })?;
    Ok(local.join(name))
}

/// Fill `buf` as far as the reader allows; a short count means end of file
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
