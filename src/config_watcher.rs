//! Hot reload of the configuration file.
//!
//! The watcher observes the directory containing the config file and, on a
//! modify or create event for that file, reloads the whole layered
//! configuration and swaps it into the shared snapshot. A reload that fails to
//! parse is logged and the previous snapshot stays in effect.

use crate::cli::Cli;
use crate::config::{Config, SharedConfig};
use anyhow::{Context, Result};
use notify::{event::EventKind, Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Watches one configuration file and keeps a [`SharedConfig`] current.
pub struct ConfigWatcher {
    cli: Cli,
    config: SharedConfig,
    file_name: OsString,
    // Dropping the watcher stops the notification thread.
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<Event>,
    shutdown_rx: watch::Receiver<bool>,
    reload_notifier: Option<mpsc::Sender<()>>,
}

impl ConfigWatcher {
    /// Starts watching `path`. Reloads re-read every configuration layer for
    /// `cli`, so environment and command-line overrides keep their precedence.
    pub fn new(
        cli: Cli,
        path: &Path,
        config: SharedConfig,
        shutdown_rx: watch::Receiver<bool>,
        reload_notifier: Option<mpsc::Sender<()>>,
    ) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve config file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("Config path has no file name: {}", path.display()))?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

        let (tx, events) = mpsc::channel(100);
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        debug!(error = %e, "Config watcher event dropped");
                    }
                }
                Err(e) => error!(error = %e, "Config watcher error"),
            },
            NotifyConfig::default(),
        )?;
        // Editors often replace the file rather than write it in place, so the
        // directory is watched instead of the file itself.
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "Watching configuration file for changes");

        Ok(Self {
            cli,
            config,
            file_name,
            _watcher: watcher,
            events,
            shutdown_rx,
            reload_notifier,
        })
    }

    /// Processes file events until shutdown.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut self.shutdown_rx) => {
                    debug!("Config watcher received shutdown signal.");
                    break;
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) if self.should_reload(&event) => self.reload().await,
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        }
        debug!("Config watcher task finished.");
    }

    fn should_reload(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) => event
                .paths
                .iter()
                .any(|path| path.file_name() == Some(self.file_name.as_os_str())),
            _ => false,
        }
    }

    async fn reload(&self) {
        info!("Configuration change detected, reloading...");
        match Config::load(&self.cli) {
            Ok(new_config) => {
                if **self.config.load() == new_config {
                    debug!("Reloaded configuration is unchanged");
                    return;
                }
                self.config.store(Arc::new(new_config));
                info!("Configuration reloaded");
                if let Some(notifier) = &self.reload_notifier {
                    if notifier.send(()).await.is_err() {
                        warn!("Reload notifier channel closed");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to reload configuration; keeping the previous one");
            }
        }
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
