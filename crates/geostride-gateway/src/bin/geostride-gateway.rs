//! Geostride Gateway Binary
//!
//! # Usage
//! ```bash
//! geostride-gateway [--config gateway.toml] [--port 8080] [--host 127.0.0.1] [--verbose]
//! ```
//!
//! `GOOGLE_PLACES_API_KEY` and `NARRATOR_API_KEY` are read from the
//! environment or a `.env` file.

use anyhow::Context;
use clap::Parser;
use geostride_gateway::{Gateway, GatewayConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Geostride Gateway - natural-language avatar movement over HTTP
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(short, long, env = "GEOSTRIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the configuration file
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to, overrides the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(args.verbose)
        .with_thread_ids(args.verbose)
        .init();

    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    let config = config.apply_env();

    print_banner(&config);

    let gateway = Gateway::new(config).context("failed to build the movement pipeline")?;

    let state = gateway.state();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received");
            let _ = state.shutdown_tx.send(());
        }
    });

    gateway.start().await?;
    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    println!();
    println!("Geostride gateway v{}", geostride_gateway::VERSION);
    println!();
    println!("HTTP Endpoints on http://{}:{}", config.host, config.port);
    println!("   ├─ POST /move               Execute a movement command");
    println!("   ├─ POST /debug/parse        Dry-run a command");
    println!("   ├─ GET  /health             Health check");
    println!("   ├─ GET  /status             Gateway status");
    println!("   ├─ GET  /actors/:id/stats   Movement statistics");
    println!("   └─ GET  /actors/:id/audit   Recent audit records");
    println!();
    println!(
        "Geocoder: {:?}   Narrator: {:?}",
        config.geocoder.provider, config.narrator.provider
    );
    println!("Press Ctrl+C to stop the gateway");
    println!();
}
