//! Tracks the relay's long-running background tasks.
use futures::future::join_all;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type NamedHandle = (&'static str, JoinHandle<()>);

/// Owns the `JoinHandle` of every spawned service (HTTP server, metrics
/// server, config watcher) and hands out the shared shutdown signal.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<NamedHandle>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns `future` and remembers it under `name`.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.lock().push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of tasks not yet drained by [`TaskManager::shutdown`].
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for all managed tasks to complete. Tasks are expected to watch
    /// the shutdown signal themselves.
    pub async fn shutdown(self) {
        let handles: Vec<NamedHandle> = self.lock().drain(..).collect();
        info!(tasks = handles.len(), "Waiting for background tasks to finish...");

        let (names, handles): (Vec<&'static str>, Vec<JoinHandle<()>>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut panicked = 0;
        for (task_name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    error!(task_name, error = %e, "Task panicked during shutdown.");
                    panicked += 1;
                }
            }
        }

        if panicked > 0 {
            error!(panicked, "Some tasks panicked during shutdown");
        } else {
            info!("All tasks shut down gracefully.");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<NamedHandle>> {
        // A poisoned lock only means a spawn panicked mid-push; the list is
        // still usable.
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}
