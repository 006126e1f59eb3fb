//! Wallet session demo server
//!
//! Serves a single mocked wallet session to a display layer, either as JSON
//! lines over stdin/stdout or over HTTP with an SSE event stream.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use wallet_dispatch::{HttpTransport, StdioTransport};
use wallet_session::{SettingsManager, WalletSession};

/// Wallet session demo - connect, send and sign against mocked providers
#[derive(Parser, Debug)]
#[command(name = "wallet-session-demo")]
#[command(author = "Symbia Labs")]
#[command(version = "0.1.0")]
#[command(about = "Wallet session demo server with mocked providers")]
struct Args {
    /// Run in stdio mode (JSON lines)
    #[arg(long)]
    stdio: bool,

    /// Run in HTTP mode with specified port
    #[arg(long)]
    http: bool,

    /// Port for HTTP server (default: 3000)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Directory holding settings.json (defaults to the platform config dir)
    #[arg(long, env = "WALLET_SESSION_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Override every mocked provider latency, in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Write the effective settings back to settings.json before serving
    #[arg(long)]
    save_settings: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries the protocol in stdio mode
    if !args.stdio {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .init();
    }

    let mut manager = match &args.config_dir {
        Some(dir) => SettingsManager::new(dir),
        None => SettingsManager::in_default_dir(),
    }
    .map_err(|e| format!("Failed to load settings: {}", e))?;

    let mut settings = manager.get().clone();
    if let Some(ms) = args.latency_ms {
        settings.mock.connect_latency_ms = ms;
        settings.mock.submit_latency_ms = ms;
        settings.mock.sign_latency_ms = ms;
    }

    if args.save_settings {
        manager
            .update(settings.clone())
            .await
            .map_err(|e| format!("Failed to save settings: {}", e))?;
        info!("Saved settings to {}", manager.settings_file().display());
    }

    info!(
        "Loaded {} providers from {}",
        settings.providers.len(),
        manager.settings_file().display()
    );

    let session = Arc::new(WalletSession::from_settings(&settings));

    // stdio wins when both modes are requested; it is also the default
    if args.http && !args.stdio {
        info!("Serving wallet session on http://localhost:{}", args.port);
        HttpTransport::new(session, args.port).run().await?;
    } else {
        StdioTransport::new(session).run().await?;
    }

    Ok(())
}
