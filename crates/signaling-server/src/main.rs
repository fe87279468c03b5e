use anyhow::{Context, Result};
use clap::Parser;
use shopcall_infra_common::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
use shopcall_signaling_server::{SignalingServer, SignalingServerConfig, VERSION};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "shopcall-signaling", version, about = "ShopCall PeerJS signaling relay")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,

    /// Mount path of the relay endpoints
    #[arg(long)]
    path: Option<String>,

    /// Key clients must present
    #[arg(long)]
    key: Option<String>,

    /// Directory with the frontend build
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Do not serve static files
    #[arg(long)]
    no_static: bool,

    /// List connected peers on `{path}/{key}/peers`
    #[arg(long)]
    allow_discovery: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "SHOPCALL_LOG_LEVEL")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, config: &mut SignalingServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(key) = &self.key {
            config.key = key.clone();
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = Some(dir.clone());
        }
        if self.no_static {
            config.static_dir = None;
        }
        if self.allow_discovery {
            config.allow_discovery = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::new(parse_log_level(&args.log_level)?, "shopcall-signaling");
    if args.json_logs {
        logging = logging.with_json();
    }
    setup_logging(logging)?;
    log_welcome("ShopCall Signaling Server", VERSION);

    let mut config = SignalingServerConfig::load(args.config.as_deref())
        .context("loading signaling server configuration")?;
    args.apply(&mut config);
    config.validate().context("validating signaling server configuration")?;

    SignalingServer::new(config).run(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
