//! # Internal Metrics Module
//!
//! Collects and exposes the relay's operational metrics.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: Installs the Prometheus recorder, binds the
//!   scrape listener and constructs the `Metrics` handle.
//!
//! - **`Metrics`**: A cheap, cloneable handle used by the request handlers and
//!   the dispatcher to record what happened.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum` server exposing
//!   `/metrics` for Prometheus to scrape.
//!
//! When metrics are disabled no recorder is installed and every call on
//! `Metrics` is a no-op.

use crate::config::MetricsConfig;
use crate::core::ChannelKind;
use crate::internal_metrics::server::MetricsServer;
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

pub mod server;

/// Where a dispatched signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Webhook,
    SelfTest,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Webhook => "webhook",
            SignalSource::SelfTest => "self_test",
        }
    }
}

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub signals_rejected_total: Counter,
    pub dispatch_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("webhooks_received_total", Unit::Count, "Total number of requests that asked for a dispatch, labeled by source.");
        metrics::describe_counter!("signals_rejected_total", Unit::Count, "Total number of webhook bodies rejected by validation.");
        metrics::describe_counter!("notifications_sent_total", Unit::Count, "Total number of successful channel deliveries, labeled by channel.");
        metrics::describe_counter!("notifications_failed_total", Unit::Count, "Total number of failed channel deliveries, labeled by channel.");
        metrics::describe_histogram!("dispatch_duration_seconds", Unit::Seconds, "The time taken to fan a signal out to every active channel.");

        Self {
            signals_rejected_total: metrics::counter!("signals_rejected_total"),
            dispatch_duration_seconds: metrics::histogram!("dispatch_duration_seconds"),
        }
    }

    /// Creates a `Metrics` instance that performs no operations.
    /// Used when metrics are disabled in the configuration.
    pub fn disabled() -> Self {
        Self {
            signals_rejected_total: metrics::counter!("disabled"),
            dispatch_duration_seconds: metrics::histogram!("disabled"),
        }
    }

    pub fn increment_received(&self, source: SignalSource) {
        metrics::counter!("webhooks_received_total", "source" => source.as_str()).increment(1);
    }

    /// Records the outcome of a single channel delivery.
    pub fn record_delivery(&self, channel: ChannelKind, success: bool) {
        let name = if success {
            "notifications_sent_total"
        } else {
            "notifications_failed_total"
        };
        metrics::counter!(name, "channel" => channel.as_str()).increment(1);
    }

    pub fn record_dispatch_duration(&self, elapsed: Duration) {
        self.dispatch_duration_seconds.record(elapsed.as_secs_f64());
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Initializes the metrics system and returns a `Metrics` handle and an
    /// optional `MetricsServer` together with its bound address.
    ///
    /// Any failure to set up the exporter is logged and degrades to disabled
    /// metrics; the relay keeps serving webhooks.
    pub fn build(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Metrics, Option<(MetricsServer, SocketAddr)>) {
        if !self.config.enabled {
            return (Metrics::disabled(), None);
        }

        let recorder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        ) {
            Ok(builder) => builder.build_recorder(),
            Err(e) => {
                error!(error = %e, "Invalid histogram buckets for metrics exporter");
                return (Metrics::disabled(), None);
            }
        };
        let handle = recorder.handle();

        let (listener, addr) = match bind(self.config.listen_address) {
            Ok(bound) => bound,
            Err(e) => {
                error!(address = %self.config.listen_address, error = %e, "Failed to bind metrics server");
                return (Metrics::disabled(), None);
            }
        };

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!(error = %e, "Failed to install Prometheus recorder");
            return (Metrics::disabled(), None);
        }

        let metrics = Metrics::new();
        let server = MetricsServer::new(listener, handle, shutdown_rx);
        (metrics, Some((server, addr)))
    }
}

fn bind(address: SocketAddr) -> std::io::Result<(TcpListener, SocketAddr)> {
    let listener = std::net::TcpListener::bind(address)?;
    let addr = listener.local_addr()?;
    // The listener must be non-blocking to be used with Tokio.
    listener.set_nonblocking(true)?;
    Ok((TcpListener::from_std(listener)?, addr))
}
