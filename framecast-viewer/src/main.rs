//! framecast viewer — entry point.
//!
//! ```text
//! framecast-viewer                      Listen on the configured port
//! framecast-viewer --record             Record incoming streams
//! framecast-viewer --port 6000          Override the listen port
//! framecast-viewer --config <path>      Load a custom config TOML
//! framecast-viewer --gen-config         Write default config to stdout
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use framecast_core::{
    RawFrame, RecordingController, Renderer, TracingStatus, ViewerServer,
};

use crate::config::ViewerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framecast-viewer", about = "framecast frame-streaming viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framecast-viewer.toml")]
    config: PathBuf,

    /// Listen port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Directory for recordings, overriding the config file.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Start recording as soon as frames arrive.
    #[arg(long)]
    record: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Renderer ─────────────────────────────────────────────────────

/// Headless stand-in for a display widget: counts frames and logs a
/// heartbeat line once a second's worth has arrived.
struct LogRenderer {
    frames: AtomicU64,
}

impl Renderer for LogRenderer {
    fn present(&self, frame: RawFrame) {
        let n = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 30 == 0 {
            info!("presented {n} frames ({}x{})", frame.width, frame.height);
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.listen_port = port;
    }
    if let Some(dir) = cli.output_dir {
        config.recording.output_dir = dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("framecast-viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("listen port: {}", config.network.listen_port);
    info!("recordings: {}", config.recording.output_dir.display());

    let status = Arc::new(TracingStatus);
    let recorder = Arc::new(RecordingController::new(
        config.to_recording_config(),
        status.clone(),
    ));

    let server = ViewerServer::bind(
        format!("0.0.0.0:{}", config.network.listen_port).parse()?,
        recorder.clone(),
        Arc::new(LogRenderer {
            frames: AtomicU64::new(0),
        }),
        status,
    )
    .await?;

    if cli.record {
        recorder.request_start();
    }

    let stop = server.stop_handle();
    let server_task = tokio::spawn(server.run());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received — shutting down");
    recorder.request_stop();
    stop.cancel();
    server_task.await??;

    Ok(())
}
