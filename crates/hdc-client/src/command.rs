//! Command channel: shell, forwarding, install and uninstall
//!
//! Each call opens a connection, runs one exchange and closes it. The
//! configured `request_timeout`, when set, bounds the whole exchange.

use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, info, warn};

use hdc_core::forward::parse_task_string;
use hdc_core::{
    ForwardDirection, ForwardRule, HdcError, InstallOptions, Result, UninstallOptions,
};
use hdc_protocol::Message;

use crate::client::HdcClient;
use crate::transport::{unexpected, with_deadline, Connection};

impl HdcClient {
    /// Run `command` on the active device and return its combined output
    ///
    /// Stdout and stderr arrive interleaved in one stream. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub async fn shell(&self, command: &str) -> Result<String> {
        let device = self.device()?;
        if command.trim().is_empty() {
            return Err(HdcError::InvalidArgument("shell command is empty".into()));
        }

        with_deadline(self.config().request_timeout, async {
            let mut conn = device.open().await?;
            debug!(device = %device.id(), "shell: {}", command);
            conn.send(Message::ShellExec {
                command: command.to_string(),
            })
            .await?;

            let mut output = BytesMut::new();
            loop {
                match conn.recv_opt().await? {
                    Some(Message::ShellOutput(chunk)) => output.extend_from_slice(&chunk),
                    Some(Message::ShellExit { code }) => {
                        debug!(?code, bytes = output.len(), "shell finished");
                        break;
                    }
                    Some(Message::Error { message, .. }) => {
                        warn!("Shell rejected by daemon: {}", message);
                        return Err(HdcError::Exec(message));
                    }
                    Some(other) => return Err(unexpected(&other)),
                    None => {
                        return Err(HdcError::Exec(
                            "connection closed before the command exited".into(),
                        ))
                    }
                }
            }

            Ok(String::from_utf8_lossy(&output).into_owned())
        })
        .await
    }

    /// Forward host-side `local` to device-side `remote`
    ///
    /// Returns the daemon's status text unparsed.
    pub async fn fport(&self, local: &str, remote: &str) -> Result<String> {
        let device = self.device()?;
        let rule = ForwardRule::forward(local.parse()?, remote.parse()?)?;
        info!(device = %device.id(), "fport {}", rule.task_string());

        with_deadline(self.config().request_timeout, async {
            let mut conn = device.open().await?;
            conn.send(forward_init(&rule)).await?;
            expect_status(&mut conn, "fport").await
        })
        .await
    }

    /// Forward device-side `remote` back to host-side `local`
    pub async fn rport(&self, remote: &str, local: &str) -> Result<String> {
        let device = self.device()?;
        let rule = ForwardRule::reverse(remote.parse()?, local.parse()?)?;
        info!(device = %device.id(), "rport {}", rule.task_string());

        with_deadline(self.config().request_timeout, async {
            let mut conn = device.open().await?;
            conn.send(forward_init(&rule)).await?;
            expect_status(&mut conn, "rport").await
        })
        .await
    }

    /// Remove the forward rule identified by `"<a> <b>"`
    ///
    /// Forward rules belong to the daemon, so no active device is needed.
    pub async fn fport_remove(&self, task: &str) -> Result<String> {
        let (first, second) = parse_task_string(task)?;
        let task = format!("{} {}", first, second);
        info!("fport rm {}", task);

        with_deadline(self.config().request_timeout, async {
            let mut conn = self.open_global().await?;
            conn.send(Message::ForwardRemove { task }).await?;
            expect_status(&mut conn, "fport rm").await
        })
        .await
    }

    /// List every forward rule the daemon holds, one line per rule
    pub async fn fport_list(&self) -> Result<Vec<String>> {
        with_deadline(self.config().request_timeout, async {
            let mut conn = self.open_global().await?;
            conn.send(Message::ForwardList).await?;
            match conn.recv().await? {
                Message::ForwardTasks { tasks } => Ok(tasks),
                Message::Error { message, .. } => Err(HdcError::Exec(message)),
                other => Err(unexpected(&other)),
            }
        })
        .await
    }

    /// Install one or more host-side packages on the active device
    pub async fn install<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: InstallOptions,
    ) -> Result<String> {
        let device = self.device()?;
        if paths.is_empty() {
            return Err(HdcError::InvalidArgument(
                "install needs at least one package path".into(),
            ));
        }
        let paths: Vec<String> = paths
            .iter()
            .map(|p| p.as_ref().to_string_lossy().into_owned())
            .collect();
        if let Some(bad) = paths.iter().find(|p| p.is_empty() || p.contains('\0')) {
            return Err(HdcError::InvalidArgument(format!(
                "invalid package path {:?}",
                bad
            )));
        }
        info!(device = %device.id(), "install {:?}", paths);

        with_deadline(self.config().request_timeout, async {
            let mut conn = device.open().await?;
            conn.send(Message::Install {
                paths,
                replace: options.replace,
                shared: options.shared,
            })
            .await?;
            expect_status(&mut conn, "install").await
        })
        .await
    }

    /// Remove `package` from the active device
    pub async fn uninstall(&self, package: &str, options: UninstallOptions) -> Result<String> {
        let device = self.device()?;
        if package.trim().is_empty() {
            return Err(HdcError::InvalidArgument("package name is empty".into()));
        }
        info!(device = %device.id(), "uninstall {}", package);

        with_deadline(self.config().request_timeout, async {
            let mut conn = device.open().await?;
            conn.send(Message::Uninstall {
                package: package.to_string(),
                keep_data: options.keep_data,
                shared: options.shared,
            })
            .await?;
            expect_status(&mut conn, "uninstall").await
        })
        .await
    }

    /// Daemon version string, as sent in the channel handshake
    pub async fn check_server(&self) -> Result<String> {
        let conn = self.open_global().await?;
        let version = conn.daemon_version().to_string();
        conn.close().await?;
        Ok(version)
    }
}

fn forward_init(rule: &ForwardRule) -> Message {
    Message::ForwardInit {
        reverse: rule.direction == ForwardDirection::Reverse,
        local: rule.local.to_string(),
        remote: rule.remote.to_string(),
    }
}

/// Wait for the `Status` reply that ends a one-shot command
async fn expect_status(conn: &mut Connection, what: &str) -> Result<String> {
    match conn.recv_opt().await? {
        Some(Message::Status { text }) => {
            debug!("{}: {}", what, text.trim_end());
            Ok(text)
        }
        Some(Message::Error { message, .. }) => {
            warn!("{} rejected by daemon: {}", what, message);
            Err(HdcError::Exec(message))
        }
        Some(other) => Err(unexpected(&other)),
        None => Err(HdcError::Exec(format!(
            "connection closed before {} completed",
            what
        ))),
    }
}
