use std::sync::Arc;

use clap::Parser;
use lifedash_core::LifedashConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use lifedash_server::router::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lifedash goal tracker server", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "lifedash.toml")]
    config: String,

    /// Overrides `[storage] data_dir`
    #[arg(long)]
    data_dir: Option<String>,

    /// Overrides `[http] port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (OPENAI_API_KEY for local runs)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match LifedashConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let state = match AppState::from_config(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    lifedash_server::http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
