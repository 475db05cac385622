//! socks5-local - local forwarder
//!
//! Entry point for the local side.

mod common;

use anyhow::Result;
use clap::{Parser, Subcommand};
use socksbridge::config::{render_config, save_config, LocalConfig, LOCAL_SIDE_NAME, MIN_PORT};
use socksbridge::helper::{setup_logging, wait_for_shutdown_signal};
use socksbridge::process::{record_pid, remove_pid, signal_stop};
use socksbridge::{Instance, LocalForwarder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static LOCAL: Instance<LocalForwarder> = Instance::new();

/// socks5-local - forwards local connections to the socks5 server
#[derive(Parser, Debug)]
#[command(name = "socks5-local")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ~/.socks5-local.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// View and modify socks5 local configuration
    Config(ConfigCmd),
    /// Start socks5 local service
    Start,
    /// Stop socks5 local service
    Stop,
}

#[derive(clap::Args, Debug)]
struct ConfigCmd {
    /// Print socks5 local configuration
    #[arg(short = 'v')]
    view: bool,

    /// Address of the socks5 server. eg: 192.168.1.2:15678
    #[arg(short = 'r')]
    remote_address: Option<String>,

    /// Port of local socks5, must be at least 1024. eg: 15679
    #[arg(short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, args.json_log)?;

    let config_path = common::config_path(LOCAL_SIDE_NAME, args.config)?;

    match args.command {
        Command::Config(cmd) => run_config(&config_path, cmd),
        Command::Start => run_start(&config_path).await,
        Command::Stop => signal_stop(&common::pid_path(LOCAL_SIDE_NAME)?).await,
    }
}

fn run_config(path: &Path, cmd: ConfigCmd) -> Result<()> {
    let mut config: LocalConfig = common::load_or_default(path)?;

    // Viewing ignores every other flag
    if cmd.view {
        print!("{}", render_config(&config)?);
        return Ok(());
    }

    if let Some(remote_address) = cmd.remote_address.filter(|r| !r.is_empty()) {
        config.remote_address = remote_address;
    }
    if let Some(port) = cmd.port {
        if port >= MIN_PORT {
            config.port = port;
        } else {
            warn!("Ignoring port {}: must be at least {}", port, MIN_PORT);
        }
    }

    save_config(path, &config)?;
    info!("Successful modification of the configuration file: {:?}", path);
    Ok(())
}

async fn run_start(path: &Path) -> Result<()> {
    let config: LocalConfig = common::load_for_start(LOCAL_SIDE_NAME, path)?;
    config.validate()?;

    info!("Socksbridge v{}", socksbridge::VERSION);
    info!("Configuration loaded from: {:?}", path);
    info!("Forwarding to: {}", config.remote_address);

    let local = LOCAL.get_or_init(|| LocalForwarder::new(config));

    let pid_path = common::pid_path(LOCAL_SIDE_NAME)?;
    record_pid(&pid_path)?;

    tokio::spawn(async {
        if let Err(e) = wait_for_shutdown_signal().await {
            warn!("Failed to listen for shutdown signals: {}", e);
        }
        if let Some(local) = LOCAL.get() {
            local.stop();
        }
    });

    info!("Starting socks5 local service...");
    let result = local.start().await;

    if result.is_ok() {
        tokio::select! {
            _ = local.wait_for_connections() => {}
            _ = wait_for_shutdown_signal() => {
                warn!("Second signal received, exiting without waiting");
            }
        }
    }

    remove_pid(&pid_path)?;
    result
}
