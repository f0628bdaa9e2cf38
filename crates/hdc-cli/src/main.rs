//! hdc-rs CLI
//!
//! Talks to the local device connector daemon:
//! - Device discovery (list, wait, monitor)
//! - Shell, install and uninstall on the selected device
//! - File transfer and port forwarding
//! - Device log dumps and streams

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hdc_cli::commands::{self, Selection};
use hdc_client::HdcClient;
use hdc_core::config;
use hdc_core::{InstallOptions, TransferOptions, UninstallOptions};

#[derive(Parser)]
#[command(name = "hdc-rs")]
#[command(author, version, about = "HarmonyOS device connector client")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Daemon address (overrides config)
    #[arg(long, global = true, env = "HDC_SERVER")]
    address: Option<String>,

    /// Device to run per-device commands on
    #[arg(short, long, global = true)]
    target: Option<String>,

    /// Bound on each request, in seconds (overrides config)
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Device(DeviceCommand),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Commands that talk to the daemon
#[derive(Subcommand)]
enum DeviceCommand {
    /// List connected devices
    /// Alias: targets
    #[command(alias = "targets")]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Wait until a device is connected and print its id
    Wait {
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Watch devices come and go until interrupted
    Monitor {
        /// Poll interval in seconds
        #[arg(short, long, default_value_t = 1.0)]
        interval: f64,
    },

    /// Run a shell command on the device
    Shell {
        /// Command line to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Send a local file to the device
    Send {
        /// Local source path
        local: String,
        /// Remote destination path
        remote: String,
        /// Compress chunks on the wire
        #[arg(short = 'z', long)]
        compress: bool,
        /// Keep the source modification time
        #[arg(short = 'a', long)]
        preserve_timestamp: bool,
    },

    /// Fetch a file from the device
    Recv {
        /// Remote source path
        remote: String,
        /// Local destination path or directory
        local: String,
        /// Compress chunks on the wire
        #[arg(short = 'z', long)]
        compress: bool,
        /// Keep the source modification time
        #[arg(short = 'a', long)]
        preserve_timestamp: bool,
    },

    /// Forward a host port or socket to the device
    Fport {
        /// Host side, e.g. tcp:8080
        local: String,
        /// Device side, e.g. tcp:8080 or localabstract:name
        remote: String,
    },

    /// Forward a device port or socket back to the host
    Rport {
        /// Device side
        remote: String,
        /// Host side
        local: String,
    },

    /// List forward rules
    #[command(name = "fport-ls")]
    FportLs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a forward rule
    #[command(name = "fport-rm")]
    FportRm {
        /// Both halves of the rule, e.g. "tcp:8080 tcp:8081"
        #[arg(required = true, num_args = 1..=2)]
        rule: Vec<String>,
    },

    /// Install packages on the device
    Install {
        /// Package files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Replace an existing application
        #[arg(short, long)]
        replace: bool,
        /// Install a shared bundle
        #[arg(short, long)]
        shared: bool,
    },

    /// Remove a package from the device
    Uninstall {
        /// Bundle name
        package: String,
        /// Keep data and cache directories
        #[arg(short, long)]
        keep_data: bool,
        /// Remove a shared bundle
        #[arg(short, long)]
        shared: bool,
    },

    /// Dump or follow the device log
    Hilog {
        /// Filter arguments for the device log tool
        args: Option<String>,
        /// Keep streaming new records until interrupted
        #[arg(short, long)]
        follow: bool,
    },

    /// Show client and daemon versions
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let command = match cli.command {
        // Config commands work without a reachable daemon
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => commands::config_show(cli.config.as_deref()),
                ConfigAction::Path => commands::config_path(cli.config.as_deref()),
                ConfigAction::Init { force } => {
                    commands::config_init(cli.config.as_deref(), force)
                }
            };
        }
        Commands::Device(command) => command,
    };

    let mut client_config = config::load_client_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(address) = cli.address {
        client_config.address = address;
    }
    if let Some(secs) = cli.timeout {
        client_config.request_timeout = Some(seconds(secs, "--timeout")?);
    }
    client_config
        .validate()
        .context("Invalid configuration after command-line overrides")?;
    let client = HdcClient::with_config(client_config);

    run(client, Selection::from(cli.target), command).await
}

async fn run(mut client: HdcClient, target: Selection, command: DeviceCommand) -> Result<()> {
    match command {
        DeviceCommand::List { json } => commands::list_command(&client, json).await?,

        DeviceCommand::Wait { timeout } => {
            let timeout = timeout.map(|t| seconds(t, "--timeout")).transpose()?;
            commands::wait_command(&client, timeout).await?;
        }

        DeviceCommand::Monitor { interval } => {
            let interval = seconds(interval, "--interval")?;
            commands::monitor_command(&client, interval, shutdown_token()).await?;
        }

        DeviceCommand::Shell { command } => {
            commands::select_device(&mut client, &target).await?;
            commands::shell_command(&client, &command.join(" ")).await?;
        }

        DeviceCommand::Send {
            local,
            remote,
            compress,
            preserve_timestamp,
        } => {
            commands::select_device(&mut client, &target).await?;
            let options = TransferOptions::new()
                .compress(compress)
                .preserve_timestamp(preserve_timestamp);
            commands::send_command(&client, &local, &remote, options).await?;
        }

        DeviceCommand::Recv {
            remote,
            local,
            compress,
            preserve_timestamp,
        } => {
            commands::select_device(&mut client, &target).await?;
            let options = TransferOptions::new()
                .compress(compress)
                .preserve_timestamp(preserve_timestamp);
            commands::recv_command(&client, &remote, &local, options).await?;
        }

        DeviceCommand::Fport { local, remote } => {
            commands::select_device(&mut client, &target).await?;
            commands::fport_command(&client, &local, &remote).await?;
        }

        DeviceCommand::Rport { remote, local } => {
            commands::select_device(&mut client, &target).await?;
            commands::rport_command(&client, &remote, &local).await?;
        }

        DeviceCommand::FportLs { json } => commands::fport_list_command(&client, json).await?,

        DeviceCommand::FportRm { rule } => {
            commands::fport_remove_command(&client, &rule.join(" ")).await?
        }

        DeviceCommand::Install {
            paths,
            replace,
            shared,
        } => {
            commands::select_device(&mut client, &target).await?;
            let options = InstallOptions::new().replace(replace).shared(shared);
            commands::install_command(&client, &paths, options).await?;
        }

        DeviceCommand::Uninstall {
            package,
            keep_data,
            shared,
        } => {
            commands::select_device(&mut client, &target).await?;
            let options = UninstallOptions::new().keep_data(keep_data).shared(shared);
            commands::uninstall_command(&client, &package, options).await?;
        }

        DeviceCommand::Hilog { args, follow } => {
            commands::select_device(&mut client, &target).await?;
            if follow {
                commands::hilog_follow_command(&client, args.as_deref(), shutdown_token())
                    .await?;
            } else {
                commands::hilog_command(&client, args.as_deref()).await?;
            }
        }

        DeviceCommand::Version => commands::version_command(&client).await?,
    }

    Ok(())
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .with_context(|| format!("{} must be a positive number of seconds", flag))
}

/// Token cancelled on Ctrl+C or SIGTERM
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, stopping...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, stopping...");
            }
        }

        cancel_clone.cancel();
    });
    cancel
}
