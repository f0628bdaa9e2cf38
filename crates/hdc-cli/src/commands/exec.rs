//! Shell, install, uninstall and version

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use hdc_client::HdcClient;
use hdc_core::{InstallOptions, UninstallOptions};
use hdc_protocol::CLIENT_VERSION;

use crate::output::print_success;

/// Execute the shell command and echo its output
pub async fn shell_command(client: &HdcClient, command: &str) -> Result<()> {
    let output = client.shell(command).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

pub async fn install_command(
    client: &HdcClient,
    paths: &[PathBuf],
    options: InstallOptions,
) -> Result<()> {
    let status = client
        .install(paths, options)
        .await
        .context("Install failed")?;
    print_success(status.trim_end());
    Ok(())
}

pub async fn uninstall_command(
    client: &HdcClient,
    package: &str,
    options: UninstallOptions,
) -> Result<()> {
    let status = client
        .uninstall(package, options)
        .await
        .with_context(|| format!("Uninstall of {} failed", package))?;
    print_success(status.trim_end());
    Ok(())
}

/// Print the client version, then ask the daemon for its own
pub async fn version_command(client: &HdcClient) -> Result<()> {
    println!("Client: {}", CLIENT_VERSION);
    let daemon = client.check_server().await?;
    println!("Daemon: {}", daemon);
    Ok(())
}
