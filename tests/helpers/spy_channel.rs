#![allow(dead_code)]
//! A channel factory whose adapters record calls instead of sending.

use async_trait::async_trait;
use signal_relay::core::{
    ChannelConfig, ChannelFactory, ChannelKind, DeliveryMode, NotificationChannel, TradeSignal,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One recorded `send` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSend {
    pub channel: ChannelKind,
    pub mode: DeliveryMode,
    pub symbol: String,
}

/// Builds spy channels. Every kind succeeds unless marked as failing.
#[derive(Clone, Default)]
pub struct SpyChannelFactory {
    failing: Arc<Mutex<HashSet<ChannelKind>>>,
    sends: Arc<Mutex<Vec<RecordedSend>>>,
}

impl SpyChannelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every channel of `kind` report failure.
    pub fn failing(self, kind: ChannelKind) -> Self {
        self.failing.lock().unwrap().insert(kind);
        self
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

impl ChannelFactory for SpyChannelFactory {
    fn build(&self, config: &ChannelConfig) -> Arc<dyn NotificationChannel> {
        let kind = config.kind();
        Arc::new(SpyChannel {
            kind,
            succeed: !self.failing.lock().unwrap().contains(&kind),
            sends: self.sends.clone(),
        })
    }
}

struct SpyChannel {
    kind: ChannelKind,
    succeed: bool,
    sends: Arc<Mutex<Vec<RecordedSend>>>,
}

#[async_trait]
impl NotificationChannel for SpyChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, signal: &TradeSignal, mode: DeliveryMode) -> bool {
        self.sends.lock().unwrap().push(RecordedSend {
            channel: self.kind,
            mode,
            symbol: signal.symbol().to_string(),
        });
        self.succeed
    }
}
