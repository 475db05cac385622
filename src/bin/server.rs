//! socks5-server - SOCKS5 proxy server
//!
//! Entry point for the server side.

mod common;

use anyhow::Result;
use clap::{Parser, Subcommand};
use socksbridge::config::{render_config, save_config, ServerConfig, MIN_PORT, SERVER_SIDE_NAME};
use socksbridge::helper::{setup_logging, wait_for_shutdown_signal};
use socksbridge::process::{record_pid, remove_pid, signal_stop};
use socksbridge::{Instance, Socks5Server};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static SERVER: Instance<Socks5Server> = Instance::new();

/// socks5-server - SOCKS5 proxy server
#[derive(Parser, Debug)]
#[command(name = "socks5-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ~/.socks5-server.toml)
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
    /// View and modify socks5 server configuration
    Config(ConfigCmd),
    /// Start socks5 server service
    Start,
    /// Stop socks5 server service
    Stop,
}

#[derive(clap::Args, Debug)]
struct ConfigCmd {
    /// Print socks5 server configuration
    #[arg(short = 'v')]
    view: bool,

    /// Port of server socks5, must be at least 1024. eg: 15678
    #[arg(short = 'p')]
    port: Option<u16>,

    /// Username for authentication
    #[arg(short = 'u')]
    username: Option<String>,

    /// Password for authentication
    #[arg(short = 'P')]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, args.json_log)?;

    let config_path = common::config_path(SERVER_SIDE_NAME, args.config)?;

    match args.command {
        Command::Config(cmd) => run_config(&config_path, cmd),
        Command::Start => run_start(&config_path).await,
        Command::Stop => signal_stop(&common::pid_path(SERVER_SIDE_NAME)?).await,
    }
}

fn run_config(path: &Path, cmd: ConfigCmd) -> Result<()> {
    let mut config: ServerConfig = common::load_or_default(path)?;

    // Viewing ignores every other flag
    if cmd.view {
        print!("{}", render_config(&config)?);
        return Ok(());
    }

    if let Some(port) = cmd.port {
        if port >= MIN_PORT {
            config.port = port;
        } else {
            warn!("Ignoring port {}: must be at least {}", port, MIN_PORT);
        }
    }
    if let Some(username) = cmd.username.filter(|u| !u.is_empty()) {
        config.username = Some(username);
    }
    if let Some(password) = cmd.password.filter(|p| !p.is_empty()) {
        config.password = Some(password);
    }

    save_config(path, &config)?;
    info!("Successful modification of the configuration file: {:?}", path);
    Ok(())
}

async fn run_start(path: &Path) -> Result<()> {
    let config: ServerConfig = common::load_for_start(SERVER_SIDE_NAME, path)?;
    config.validate()?;

    info!("Socksbridge v{}", socksbridge::VERSION);
    info!("Configuration loaded from: {:?}", path);

    let server = SERVER.get_or_init(|| Socks5Server::new(config));

    let pid_path = common::pid_path(SERVER_SIDE_NAME)?;
    record_pid(&pid_path)?;

    tokio::spawn(async {
        if let Err(e) = wait_for_shutdown_signal().await {
            warn!("Failed to listen for shutdown signals: {}", e);
        }
        if let Some(server) = SERVER.get() {
            server.stop();
        }
    });

    info!("Starting socks5 server service...");
    let result = server.start().await;

    if result.is_ok() {
        info!("Waiting for {} open connection(s)", server.active_connections());
        tokio::select! {
            _ = server.wait_for_connections() => {}
            _ = wait_for_shutdown_signal() => {
                warn!("Second signal received, exiting without waiting");
            }
        }
    }

    remove_pid(&pid_path)?;
    result
}
