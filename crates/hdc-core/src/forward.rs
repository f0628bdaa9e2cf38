//! Port forwarding rules

use std::fmt;
use std::str::FromStr;

use crate::error::HdcError;

/// One end of a forward rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForwardNode {
    /// TCP port: `tcp:<port>`
    Tcp(u16),
    /// Abstract Unix domain socket: `localabstract:<name>`
    LocalAbstract(String),
    /// Filesystem Unix domain socket: `localfilesystem:<path>`
    LocalFilesystem(String),
    /// Reserved Unix domain socket: `localreserved:<name>`
    LocalReserved(String),
    /// Character device: `dev:<name>`
    Dev(String),
    /// JDWP process, device side only: `jdwp:<pid>`
    Jdwp(u32),
    /// Ark debugger, device side only: `ark:<pid>@<tid>@<debugger>`
    Ark { pid: u32, tid: u32, debugger: String },
}

impl ForwardNode {
    /// Whether this node can only name an endpoint on the device
    pub fn is_device_only(&self) -> bool {
        matches!(self, Self::Jdwp(_) | Self::Ark { .. })
    }
}

fn non_empty(kind: &str, name: &str) -> Result<String, HdcError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(HdcError::InvalidArgument(format!(
            "{} name must be non-empty and contain no whitespace",
            kind
        )));
    }
    Ok(name.to_string())
}

impl FromStr for ForwardNode {
    type Err = HdcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| HdcError::InvalidArgument(format!("Invalid forward node: {}", s)))?;

        match kind {
            "tcp" => rest
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .map(Self::Tcp)
                .ok_or_else(|| HdcError::InvalidArgument(format!("Invalid TCP port: {}", rest))),
            "localabstract" => Ok(Self::LocalAbstract(non_empty(kind, rest)?)),
            "localfilesystem" => Ok(Self::LocalFilesystem(non_empty(kind, rest)?)),
            "localreserved" => Ok(Self::LocalReserved(non_empty(kind, rest)?)),
            "dev" => Ok(Self::Dev(non_empty(kind, rest)?)),
            "jdwp" => rest
                .parse::<u32>()
                .map(Self::Jdwp)
                .map_err(|_| HdcError::InvalidArgument(format!("Invalid JDWP pid: {}", rest))),
            "ark" => {
                let parts: Vec<&str> = rest.split('@').collect();
                let [pid, tid, debugger] = parts.as_slice() else {
                    return Err(HdcError::InvalidArgument(format!(
                        "Invalid ark node, expected pid@tid@debugger: {}",
                        rest
                    )));
                };
                let parse = |v: &str, what: &str| {
                    v.parse::<u32>().map_err(|_| {
                        HdcError::InvalidArgument(format!("Invalid {} in ark node: {}", what, v))
                    })
                };
                Ok(Self::Ark {
                    pid: parse(*pid, "pid")?,
                    tid: parse(*tid, "tid")?,
                    debugger: non_empty("ark debugger", *debugger)?,
                })
            }
            _ => Err(HdcError::InvalidArgument(format!(
                "Unknown forward node type '{}' in {}",
                kind, s
            ))),
        }
    }
}

impl fmt::Display for ForwardNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(port) => write!(f, "tcp:{}", port),
            Self::LocalAbstract(name) => write!(f, "localabstract:{}", name),
            Self::LocalFilesystem(name) => write!(f, "localfilesystem:{}", name),
            Self::LocalReserved(name) => write!(f, "localreserved:{}", name),
            Self::Dev(name) => write!(f, "dev:{}", name),
            Self::Jdwp(pid) => write!(f, "jdwp:{}", pid),
            Self::Ark { pid, tid, debugger } => write!(f, "ark:{}@{}@{}", pid, tid, debugger),
        }
    }
}

/// Which side initiates connections through a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardDirection {
    /// Host connects, traffic goes to the device (`fport`)
    Forward,
    /// Device connects, traffic comes to the host (`rport`)
    Reverse,
}

/// A validated forward or reverse rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForwardRule {
    pub local: ForwardNode,
    pub remote: ForwardNode,
    pub direction: ForwardDirection,
}

impl ForwardRule {
    /// Host-side `local` forwarded to device-side `remote`
    pub fn forward(local: ForwardNode, remote: ForwardNode) -> Result<Self, HdcError> {
        if local.is_device_only() {
            return Err(HdcError::InvalidArgument(format!(
                "{} can only name a device endpoint",
                local
            )));
        }
        Ok(Self {
            local,
            remote,
            direction: ForwardDirection::Forward,
        })
    }

    /// Device-side `remote` forwarded back to host-side `local`
    pub fn reverse(remote: ForwardNode, local: ForwardNode) -> Result<Self, HdcError> {
        if local.is_device_only() {
            return Err(HdcError::InvalidArgument(format!(
                "{} can only name a device endpoint",
                local
            )));
        }
        Ok(Self {
            local,
            remote,
            direction: ForwardDirection::Reverse,
        })
    }

    /// The `"<first> <second>"` pair the daemon keys the rule by
    ///
    /// Forward rules list the host side first, reverse rules the device side.
    pub fn task_string(&self) -> String {
        match self.direction {
            ForwardDirection::Forward => format!("{} {}", self.local, self.remote),
            ForwardDirection::Reverse => format!("{} {}", self.remote, self.local),
        }
    }
}

/// Split and validate a `"<a> <b>"` rule reference
pub fn parse_task_string(task: &str) -> Result<(ForwardNode, ForwardNode), HdcError> {
    let mut parts = task.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a.parse()?, b.parse()?)),
        _ => Err(HdcError::InvalidArgument(format!(
            "Forward rule must be two specs separated by a space, got '{}'",
            task
        ))),
    }
}
