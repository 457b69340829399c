//! framecast sender — entry point.
//!
//! ```text
//! framecast-sender                      Stream to the configured viewer
//! framecast-sender --host 10.0.0.5      Override the viewer host
//! framecast-sender --config <path>      Load a custom config TOML
//! framecast-sender --gen-config         Write default config to stdout
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use framecast_core::{CastService, SyntheticCapture, TracingStatus};

use crate::config::SenderConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framecast-sender", about = "framecast frame-streaming sender")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framecast-sender.toml")]
    config: PathBuf,

    /// Viewer host, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Viewer port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&SenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = SenderConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("framecast-sender v{}", env!("CARGO_PKG_VERSION"));
    info!("target: {}", config.connection_info());
    info!("fps: {}, quality: {}", config.stream.fps, config.stream.quality);

    let capture = SyntheticCapture::new(config.stream.width, config.stream.height);
    let service = CastService::new(config.to_cast_config(), Arc::new(TracingStatus));

    service.start(&config.connection_info(), capture).await?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received — shutting down");
    service.stop().await;

    Ok(())
}
