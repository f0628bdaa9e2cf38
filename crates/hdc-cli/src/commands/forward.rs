//! Port forwarding commands

use anyhow::Result;

use hdc_client::HdcClient;

use crate::output::{format_forwards, print_success};

pub async fn fport_command(client: &HdcClient, local: &str, remote: &str) -> Result<()> {
    let status = client.fport(local, remote).await?;
    print_success(status.trim_end());
    Ok(())
}

pub async fn rport_command(client: &HdcClient, remote: &str, local: &str) -> Result<()> {
    let status = client.rport(remote, local).await?;
    print_success(status.trim_end());
    Ok(())
}

/// Execute the fport-ls command
pub async fn fport_list_command(client: &HdcClient, json: bool) -> Result<()> {
    let rules = client.fport_list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        println!("{}", format_forwards(&rules));
    }
    Ok(())
}

pub async fn fport_remove_command(client: &HdcClient, rule: &str) -> Result<()> {
    let status = client.fport_remove(rule).await?;
    print_success(status.trim_end());
    Ok(())
}
