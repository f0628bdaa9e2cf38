//! File transfer commands

use anyhow::Result;

use hdc_client::HdcClient;
use hdc_core::TransferOptions;

use crate::output::print_success;

pub async fn send_command(
    client: &HdcClient,
    local: &str,
    remote: &str,
    options: TransferOptions,
) -> Result<()> {
    let status = client.file_send(local, remote, options).await?;
    print_success(&status);
    Ok(())
}

pub async fn recv_command(
    client: &HdcClient,
    remote: &str,
    local: &str,
    options: TransferOptions,
) -> Result<()> {
    let status = client.file_recv(remote, local, options).await?;
    print_success(&status);
    Ok(())
}
