//! Determines which notification channels are usable.
//!
//! A channel kind is enabled only when every one of its required settings is
//! present and non-blank; there is no such thing as a partially configured
//! channel. The derivation is recomputed on every call so that a reloaded
//! configuration takes effect on the next request.

use crate::config::{ChannelsConfig, SharedConfig};
use crate::core::{ChannelConfig, ChannelKind};

/// Returns the enabled channels in a stable order: email, whatsapp, discord.
pub fn enabled_channels(settings: &ChannelsConfig) -> Vec<ChannelConfig> {
    let mut channels = Vec::with_capacity(3);

    let email = &settings.email;
    if let (Some(sender), Some(app_password), Some(recipient)) = (
        present(&email.address),
        present(&email.app_password),
        present(&email.recipient),
    ) {
        channels.push(ChannelConfig::Email {
            sender,
            app_password,
            recipient,
            smtp_host: email.smtp_host.clone(),
            smtp_port: email.smtp_port,
        });
    }

    let whatsapp = &settings.whatsapp;
    if let (Some(account_sid), Some(auth_token), Some(from), Some(to)) = (
        present(&whatsapp.account_sid),
        present(&whatsapp.auth_token),
        present(&whatsapp.from),
        present(&whatsapp.to),
    ) {
        channels.push(ChannelConfig::Messaging {
            account_sid,
            auth_token,
            from,
            to,
            api_base_url: whatsapp.api_base_url.clone(),
        });
    }

    if let Some(webhook_url) = present(&settings.discord.webhook_url) {
        channels.push(ChannelConfig::ChatWebhook { webhook_url });
    }

    channels
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the current configuration snapshot on every call.
#[derive(Clone)]
pub struct ChannelRegistry {
    config: SharedConfig,
}

impl ChannelRegistry {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    /// The channels enabled by the configuration as it is right now.
    pub fn enabled_channels(&self) -> Vec<ChannelConfig> {
        let snapshot = self.config.load();
        enabled_channels(&snapshot.channels)
    }

    /// Identifiers of the currently enabled channels, for health reporting.
    pub fn enabled_kinds(&self) -> Vec<ChannelKind> {
        self.enabled_channels().iter().map(ChannelConfig::kind).collect()
    }
}
