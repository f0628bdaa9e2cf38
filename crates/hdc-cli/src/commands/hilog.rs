//! Device log commands

use std::io::Write;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use hdc_client::HdcClient;
use hdc_core::Flow;

/// Dump the current log buffer to stdout
pub async fn hilog_command(client: &HdcClient, args: Option<&str>) -> Result<()> {
    let text = client.hilog(args).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Stream new log records to stdout until cancelled
///
/// A closed stdout (e.g. the reader of a pipe exiting) ends the stream.
pub async fn hilog_follow_command(
    client: &HdcClient,
    args: Option<&str>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut stdout = std::io::stdout();

    client
        .hilog_stream_until(args, &cancel, |chunk| {
            stdout.write_all(chunk.as_bytes())?;
            stdout.flush()?;
            Ok::<_, std::io::Error>(Flow::Continue)
        })
        .await?;
    Ok(())
}
