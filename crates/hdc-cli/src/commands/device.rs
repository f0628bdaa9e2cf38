//! Device discovery and selection

use std::convert::Infallible;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use hdc_client::HdcClient;
use hdc_core::Flow;

use crate::output::{format_devices, print_info, print_success, print_warning};

/// How per-device commands pick their device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `--target` was given
    Explicit(String),
    /// Use the only connected device
    Auto,
}

impl From<Option<String>> for Selection {
    fn from(target: Option<String>) -> Self {
        match target {
            Some(id) => Selection::Explicit(id),
            None => Selection::Auto,
        }
    }
}

/// Bind the client to the selected device
pub async fn select_device(client: &mut HdcClient, selection: &Selection) -> Result<()> {
    let device = match selection {
        Selection::Explicit(id) => id.clone(),
        Selection::Auto => {
            let snapshot = client.list_targets().await?;
            match snapshot.len() {
                0 => bail!("No devices connected"),
                1 => snapshot
                    .first()
                    .map(|id| id.to_string())
                    .context("No devices connected")?,
                n => bail!("{} devices connected; choose one with --target", n),
            }
        }
    };

    client
        .connect_device(device.as_str())
        .await
        .with_context(|| format!("Failed to select device {}", device))
}

/// Execute the list command
pub async fn list_command(client: &HdcClient, json: bool) -> Result<()> {
    let snapshot = client.list_targets().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", format_devices(&snapshot));
    }
    Ok(())
}

/// Execute the wait command
pub async fn wait_command(client: &HdcClient, timeout: Option<Duration>) -> Result<()> {
    print_info("Waiting for a device...");
    let device = client
        .wait_for_device(timeout)
        .await
        .context("No device showed up")?;
    println!("{}", device);
    Ok(())
}

/// Execute the monitor command
pub async fn monitor_command(
    client: &HdcClient,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    print_info("Monitoring devices, Ctrl+C to stop");

    client
        .monitor_devices_until(interval, &cancel, |snapshot, diff| {
            for id in &diff.added {
                print_success(&format!("Device connected: {}", id));
            }
            for id in &diff.removed {
                print_warning(&format!("Device disconnected: {}", id));
            }
            if !diff.is_empty() {
                print_info(&format!("{} device(s) connected", snapshot.len()));
            }
            Ok::<_, Infallible>(Flow::Continue)
        })
        .await?;
    Ok(())
}
