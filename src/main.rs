//! Signal Relay - trading-alert webhook to notification fan-out.
//!
//! Receives BUY/SELL signals over HTTP and forwards each one to every
//! configured channel (email, WhatsApp, Discord).

use anyhow::Result;
use clap::Parser;
use signal_relay::{app::App, cli::Cli, config::Config, registry::enabled_channels};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.core.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Signal Relay starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.core.log_level);
    info!("Listen Address: {}", config.server.listen_address());
    info!("Outbound Timeout: {}s", config.http.timeout_seconds);
    if config.metrics.enabled {
        info!("Metrics: enabled on {}", config.metrics.listen_address);
    } else {
        info!("Metrics: disabled");
    }
    let channels = enabled_channels(&config.channels);
    if channels.is_empty() {
        warn!("No notification channels are configured. Check environment variables.");
    }
    for channel in &channels {
        info!("Channel enabled: {} ({:?})", channel.kind(), channel);
    }
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut builder = App::builder(config);
    if let Some(path) = Config::file_path(&cli) {
        builder = builder.watch_config(cli.clone(), path);
    }
    let app = builder.build(shutdown_rx).await?;

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Ctrl-C received, initiating shutdown...");
        let _ = shutdown_tx.send(true);
    });

    app.run().await?;
    info!("Signal Relay shut down.");
    Ok(())
}
