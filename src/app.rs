//! The main application logic, decoupled from the entry point.

use crate::{
    api::{self, AppState},
    cli::Cli,
    config::{Config, SharedConfig},
    config_watcher::ConfigWatcher,
    core::ChannelFactory,
    internal_metrics::{Metrics, MetricsBuilder},
    notification::{dispatcher::Dispatcher, DefaultChannelFactory},
    registry::ChannelRegistry,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    listen_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    config: SharedConfig,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the webhook server is bound to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// The live configuration snapshot, as seen by the request handlers.
    pub fn config(&self) -> SharedConfig {
        self.config.clone()
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        // A dropped sender is treated as a shutdown request.
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;
        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the relay's components from running them and lets
/// tests replace the parts that talk to the outside world.
pub struct AppBuilder {
    config: Config,
    watch: Option<(Cli, PathBuf)>,
    channel_factory_override: Option<Arc<dyn ChannelFactory>>,
    metrics_override: Option<Metrics>,
    listen_addr_override: Option<SocketAddr>,
    reload_notifier: Option<mpsc::Sender<()>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            watch: None,
            channel_factory_override: None,
            metrics_override: None,
            listen_addr_override: None,
            reload_notifier: None,
        }
    }

    /// Reloads the configuration whenever `path` changes. `cli` is replayed on
    /// every reload so its overrides keep winning.
    pub fn watch_config(mut self, cli: Cli, path: PathBuf) -> Self {
        self.watch = Some((cli, path));
        self
    }

    /// Overrides how channel adapters are built, for testing.
    pub fn channel_factory_override(mut self, factory: Arc<dyn ChannelFactory>) -> Self {
        self.channel_factory_override = Some(factory);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Binds the webhook server to `addr` instead of the configured address.
    pub fn listen_addr_override(mut self, addr: SocketAddr) -> Self {
        self.listen_addr_override = Some(addr);
        self
    }

    /// Signals `tx` after every successful configuration reload.
    pub fn reload_notifier(mut self, tx: mpsc::Sender<()>) -> Self {
        self.reload_notifier = Some(tx);
        self
    }

    /// Builds and starts all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Initialize Metrics
        // =========================================================================
        let (metrics, metrics_server_info) = match self.metrics_override {
            Some(m) => (m, None),
            None => MetricsBuilder::new(config.metrics.clone()).build(task_manager.get_shutdown_rx()),
        };

        let metrics_addr = if let Some((server, addr)) = metrics_server_info {
            info!(address = %addr, "Metrics server listening");
            task_manager.spawn("MetricsServer", server.run());
            Some(addr)
        } else {
            None
        };

        // =========================================================================
        // 2. Instantiate Services
        // =========================================================================
        let factory: Arc<dyn ChannelFactory> = match self.channel_factory_override {
            Some(factory) => factory,
            None => Arc::new(DefaultChannelFactory::new(Duration::from_secs(
                config.http.timeout_seconds,
            ))?),
        };

        let requested_addr = self
            .listen_addr_override
            .unwrap_or_else(|| config.server.listen_address());
        let shared_config = config.into_shared();

        let state = AppState {
            registry: ChannelRegistry::new(shared_config.clone()),
            factory,
            dispatcher: Dispatcher::new(metrics.clone()),
            metrics,
        };

        // =========================================================================
        // 3. Configuration Hot Reload
        // =========================================================================
        if let Some((cli, path)) = self.watch {
            let watcher = ConfigWatcher::new(
                cli,
                &path,
                shared_config.clone(),
                task_manager.get_shutdown_rx(),
                self.reload_notifier,
            )?;
            task_manager.spawn("ConfigWatcher", watcher.run());
        }

        // =========================================================================
        // 4. Start the Webhook Server
        // =========================================================================
        let listener = TcpListener::bind(requested_addr)
            .await
            .with_context(|| format!("Failed to bind webhook server to {}", requested_addr))?;
        let listen_addr = listener.local_addr()?;
        info!(address = %listen_addr, "Webhook server listening");

        let router = api::router(state);
        let mut server_shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("HttpServer", async move {
            let shutdown = async move {
                let _ = server_shutdown_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Webhook server error");
            }
        });

        Ok(App {
            task_manager,
            listen_addr,
            metrics_addr,
            config: shared_config,
        })
    }
}
