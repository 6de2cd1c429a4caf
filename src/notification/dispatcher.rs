//! Fans a single signal out to every active channel and aggregates the
//! per-channel outcomes.

use crate::core::{
    AggregateResult, DeliveryMode, DispatchOutcome, DispatchReport, NotificationChannel,
    TradeSignal,
};
use crate::internal_metrics::Metrics;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Invokes channels concurrently, one task per channel.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Sends `signal` through every channel exactly once and waits for all of
    /// them.
    ///
    /// A channel that panics is recorded as a failure of that channel only.
    /// The report lists channels in the order they were given.
    #[instrument(skip_all, fields(symbol = %signal.symbol(), channels = channels.len()))]
    pub async fn dispatch(
        &self,
        signal: &TradeSignal,
        channels: Vec<Arc<dyn NotificationChannel>>,
        mode: DeliveryMode,
    ) -> DispatchReport {
        if channels.is_empty() {
            warn!("No notification channels configured; nothing to dispatch");
            return DispatchReport::from_outcomes(&[]);
        }

        let start = Instant::now();
        let shared = Arc::new(signal.clone());
        let kinds: Vec<_> = channels.iter().map(|channel| channel.kind()).collect();

        let handles = channels.into_iter().map(|channel| {
            let signal = Arc::clone(&shared);
            tokio::spawn(async move { channel.send(&signal, mode).await })
        });
        let results = join_all(handles).await;

        let outcomes: Vec<DispatchOutcome> = kinds
            .into_iter()
            .zip(results)
            .map(|(channel, result)| {
                let success = match result {
                    Ok(sent) => sent,
                    Err(e) => {
                        error!(channel = %channel, error = %e, "Channel task panicked");
                        false
                    }
                };
                if success {
                    info!(channel = %channel, "Channel delivered notification");
                } else {
                    warn!(channel = %channel, "Channel failed to deliver notification");
                }
                self.metrics.record_delivery(channel, success);
                DispatchOutcome { channel, success }
            })
            .collect();

        self.metrics.record_dispatch_duration(start.elapsed());
        let report = DispatchReport::from_outcomes(&outcomes);
        if report.result == AggregateResult::AllFailed {
            error!("All notification channels failed");
        }
        report
    }
}
