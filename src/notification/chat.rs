//! A client for posting signals to a Discord-compatible chat webhook.

use crate::core::{ChannelKind, DeliveryMode, NotificationChannel, TradeSignal};
use crate::formatting::chat_embed;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use tracing::{error, info, instrument};

/// Posts a colour-coded embed to a fixed webhook URL.
pub struct ChatWebhookChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl ChatWebhookChannel {
    /// Creates a new `ChatWebhookChannel`. The client's timeout bounds each post.
    pub fn new(client: reqwest::Client, webhook_url: String) -> Self {
        Self {
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl NotificationChannel for ChatWebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::ChatWebhook
    }

    #[instrument(skip_all, fields(channel = "discord", symbol = %signal.symbol()))]
    async fn send(&self, signal: &TradeSignal, _mode: DeliveryMode) -> bool {
        let payload = chat_embed(signal, Utc::now());

        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(res) => {
                let status = res.status();
                // Discord answers 204 by default and 200 when `?wait=true` is set.
                if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
                    info!("Discord webhook sent successfully.");
                    true
                } else {
                    let body = res.text().await.unwrap_or_default();
                    error!(
                        status = %status,
                        body = %body,
                        "Discord webhook rejected the notification"
                    );
                    false
                }
            }
            Err(e) => {
                error!(error = %e, timeout = e.is_timeout(), "HTTP request to Discord webhook failed");
                false
            }
        }
    }
}
