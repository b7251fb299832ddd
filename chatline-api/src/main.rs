use anyhow::{Context, Result};
use chatline_api::ApiServer;
use chatline_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use chatline_core::metrics::init_metrics;
use chatline_core::shutdown::install_signal_handlers;
use chatline_core::{ChatService, Config, ShutdownCoordinator};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "chatline-api")]
#[command(about = "Chatline HTTP API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to (overrides the configuration)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level (overrides the configuration)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level.as_str().to_string();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    init_metrics();

    info!(
        users = config.directory.users.len(),
        bind = %config.server.bind_address,
        "Chatline API starting"
    );

    let service = ChatService::from_config(&config).context("failed to build identity directory")?;

    let shutdown = Arc::new(ShutdownCoordinator::new(config.server.shutdown_timeout));
    install_signal_handlers(shutdown.clone());

    ApiServer::new(service, shutdown, config).run().await
}
