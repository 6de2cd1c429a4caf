//! Delivers trade signals to the configured notification channels.
//!
//! Each channel kind has its own adapter implementing
//! [`NotificationChannel`](crate::core::NotificationChannel). The
//! [`Dispatcher`](dispatcher::Dispatcher) invokes them concurrently and folds
//! their outcomes into a single report.

pub mod chat;
pub mod dispatcher;
pub mod email;
pub mod messaging;

use crate::core::{ChannelConfig, ChannelFactory, NotificationChannel};
use anyhow::{Context, Result};
use chat::ChatWebhookChannel;
use email::EmailChannel;
use messaging::MessagingChannel;
use std::sync::Arc;
use std::time::Duration;

/// Builds the real adapters, sharing one HTTP client between them.
#[derive(Clone, Debug)]
pub struct DefaultChannelFactory {
    client: reqwest::Client,
    timeout: Duration,
}

impl DefaultChannelFactory {
    /// Creates a factory whose adapters give up on the third party after
    /// `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }
}

impl ChannelFactory for DefaultChannelFactory {
    fn build(&self, config: &ChannelConfig) -> Arc<dyn NotificationChannel> {
        match config.clone() {
            ChannelConfig::Email {
                sender,
                app_password,
                recipient,
                smtp_host,
                smtp_port,
            } => Arc::new(EmailChannel::new(
                sender,
                app_password,
                recipient,
                smtp_host,
                smtp_port,
                self.timeout,
            )),
            ChannelConfig::Messaging {
                account_sid,
                auth_token,
                from,
                to,
                api_base_url,
            } => Arc::new(MessagingChannel::new(
                self.client.clone(),
                account_sid,
                auth_token,
                from,
                to,
                api_base_url,
            )),
            ChannelConfig::ChatWebhook { webhook_url } => {
                Arc::new(ChatWebhookChannel::new(self.client.clone(), webhook_url))
            }
        }
    }
}
