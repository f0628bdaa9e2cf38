//! Message types for the device connector protocol
//!
//! Messages are serialized with bincode into the payload of a frame; the
//! frame header repeats the message's [`Command`] tag so that a peer can
//! reject unknown traffic before deserializing.
//!
//! # Message Flow
//!
//! Every connection starts the same way:
//!
//! 1. Daemon sends `Handshake` (banner, assigned channel id, version)
//! 2. Client answers `HandshakeReply` with the connect key (device id, or
//!    empty for daemon-global requests)
//!
//! Then exactly one operation runs:
//!
//! - `ListTargets` -> `Targets`
//! - `ShellExec` -> `ShellOutput`* -> `ShellExit`
//! - `ForwardInit` / `ForwardRemove` / `Install` / `Uninstall` -> `Status`
//! - `ForwardList` -> `ForwardTasks`
//! - `HilogOpen` -> `LogChunk`* -> `LogEnd` (never ends when following)
//! - push: `FileInit` -> `FileAck`, `FileData`*, `FileFinish` -> `FileVerified`
//! - pull: `FileInit` -> `FileAck`, `FileData`*, `FileFinish`, then
//!   `FileVerified` from the client
//!
//! Any request may instead be answered with `Error`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Banner prefix every daemon handshake must start with
pub const HANDSHAKE_BANNER: &str = "OHOS HDC";

/// Version string the client reports in its handshake reply
pub const CLIENT_VERSION: &str = concat!("hdc-rs ", env!("CARGO_PKG_VERSION"));

/// Command tag carried in the frame header
///
/// Numbering follows the daemon's command groups: kernel commands below
/// 1000, one-pass commands in the 1000s, shell 2000s, forward 2500s, file
/// 3000s and app 3500s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    Handshake = 1,
    HandshakeReply = 2,
    Error = 3,
    ListTargets = 5,
    Targets = 6,
    Status = 1001,
    HilogOpen = 1005,
    LogChunk = 1006,
    LogEnd = 1007,
    ShellExec = 2000,
    ShellOutput = 2001,
    ShellExit = 2002,
    ForwardInit = 2500,
    ForwardList = 2507,
    ForwardRemove = 2508,
    ForwardTasks = 2510,
    FileInit = 3000,
    FileAck = 3001,
    FileData = 3003,
    FileFinish = 3004,
    FileVerified = 3008,
    Install = 3500,
    Uninstall = 3506,
}

impl Command {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Handshake),
            2 => Some(Self::HandshakeReply),
            3 => Some(Self::Error),
            5 => Some(Self::ListTargets),
            6 => Some(Self::Targets),
            1001 => Some(Self::Status),
            1005 => Some(Self::HilogOpen),
            1006 => Some(Self::LogChunk),
            1007 => Some(Self::LogEnd),
            2000 => Some(Self::ShellExec),
            2001 => Some(Self::ShellOutput),
            2002 => Some(Self::ShellExit),
            2500 => Some(Self::ForwardInit),
            2507 => Some(Self::ForwardList),
            2508 => Some(Self::ForwardRemove),
            2510 => Some(Self::ForwardTasks),
            3000 => Some(Self::FileInit),
            3001 => Some(Self::FileAck),
            3003 => Some(Self::FileData),
            3004 => Some(Self::FileFinish),
            3008 => Some(Self::FileVerified),
            3500 => Some(Self::Install),
            3506 => Some(Self::Uninstall),
            _ => None,
        }
    }
}

/// Error codes for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    /// Unknown error
    Unknown = 0,
    /// The connect key names no connected device
    DeviceNotFound = 1,
    /// A device-scoped request arrived with an empty connect key
    NoTarget = 2,
    /// Request was malformed or arrived out of order
    InvalidRequest = 3,
    /// Remote path could not be read or written
    PathRejected = 4,
    /// Remote command could not be started
    CommandFailed = 5,
}

/// Direction of a file transfer, seen from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    /// Client sends file content to the device
    Send,
    /// Client receives file content from the device
    Recv,
}

/// File modification time with sub-second precision
///
/// `secs` counts from the unix epoch and may be negative; `nanos` is always
/// in `0..1_000_000_000` and adds to `secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileMtime {
    pub secs: i64,
    pub nanos: u32,
}

impl FileMtime {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }
}

/// Protocol messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// First frame on every connection, sent by the daemon
    Handshake {
        /// Must start with [`HANDSHAKE_BANNER`]
        banner: String,
        /// Channel id assigned to this connection
        channel_id: u32,
        /// Daemon version string
        version: String,
    },

    /// Client answer to `Handshake`
    HandshakeReply {
        /// Device id to route this connection to; empty for daemon-global requests
        connect_key: String,
        /// Client version string
        version: String,
    },

    /// Error response
    Error {
        code: ErrorCode,
        message: String,
    },

    /// Request the list of connected devices
    ListTargets,

    /// Connected device ids, one entry per device
    Targets { devices: Vec<String> },

    /// Free-form status text from the daemon
    Status { text: String },

    /// Open a log subscription
    HilogOpen {
        /// Filter arguments passed to the device log tool
        args: Option<String>,
        /// Keep the subscription open for new records
        follow: bool,
    },

    /// A chunk of log text
    LogChunk(Bytes),

    /// End of a bounded log dump
    LogEnd,

    /// Run a shell command on the device
    ShellExec { command: String },

    /// Interleaved stdout/stderr of the running command
    ShellOutput(Bytes),

    /// Remote process finished
    ShellExit { code: Option<i32> },

    /// Create a forward (`reverse == false`) or reverse forward rule
    ForwardInit {
        reverse: bool,
        local: String,
        remote: String,
    },

    /// List all forward rules known to the daemon
    ForwardList,

    /// Forward rules, one `"<local> <remote> [fport|rport]"` line each
    ForwardTasks { tasks: Vec<String> },

    /// Remove the rule identified by `"<local> <remote>"`
    ForwardRemove { task: String },

    /// Negotiate a file transfer
    FileInit {
        mode: FileMode,
        /// Path on the device
        remote_path: String,
        compress: bool,
        preserve_timestamp: bool,
        /// Size of the source file (send only)
        size: u64,
        /// Source modification time (send only)
        mtime: Option<FileMtime>,
    },

    /// Daemon accepted the transfer
    FileAck {
        /// Size of the remote source (recv only)
        size: u64,
        /// Modification time of the remote source (recv only)
        mtime: Option<FileMtime>,
    },

    /// One chunk of file content, deflated when the transfer is compressed
    FileData(Bytes),

    /// Sender finished streaming
    FileFinish {
        /// Uncompressed byte count
        total: u64,
        /// SHA-256 of the uncompressed content
        digest: Vec<u8>,
        /// Modification time to apply on the receiving side
        mtime: Option<FileMtime>,
    },

    /// Receiver's view of the transfer
    FileVerified { received: u64, digest_ok: bool },

    /// Install one or more packages
    Install {
        paths: Vec<String>,
        replace: bool,
        shared: bool,
    },

    /// Uninstall a package
    Uninstall {
        package: String,
        keep_data: bool,
        shared: bool,
    },
}

impl Message {
    /// Get the command tag for this message
    pub fn command(&self) -> Command {
        match self {
            Message::Handshake { .. } => Command::Handshake,
            Message::HandshakeReply { .. } => Command::HandshakeReply,
            Message::Error { .. } => Command::Error,
            Message::ListTargets => Command::ListTargets,
            Message::Targets { .. } => Command::Targets,
            Message::Status { .. } => Command::Status,
            Message::HilogOpen { .. } => Command::HilogOpen,
            Message::LogChunk(_) => Command::LogChunk,
            Message::LogEnd => Command::LogEnd,
            Message::ShellExec { .. } => Command::ShellExec,
            Message::ShellOutput(_) => Command::ShellOutput,
            Message::ShellExit { .. } => Command::ShellExit,
            Message::ForwardInit { .. } => Command::ForwardInit,
            Message::ForwardList => Command::ForwardList,
            Message::ForwardTasks { .. } => Command::ForwardTasks,
            Message::ForwardRemove { .. } => Command::ForwardRemove,
            Message::FileInit { .. } => Command::FileInit,
            Message::FileAck { .. } => Command::FileAck,
            Message::FileData(_) => Command::FileData,
            Message::FileFinish { .. } => Command::FileFinish,
            Message::FileVerified { .. } => Command::FileVerified,
            Message::Install { .. } => Command::Install,
            Message::Uninstall { .. } => Command::Uninstall,
        }
    }

    /// Build an error message
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Message::Error {
            code,
            message: message.into(),
        }
    }
}
