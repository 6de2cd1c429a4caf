//! Core domain types and service traits for the relay
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern how a validated trade signal travels from the webhook endpoint
//! to the notification channels.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The direction of a trade signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Parses an action case-insensitively. Surrounding whitespace is not
    /// stripped, so `" buy "` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated trade alert.
///
/// Instances can only be obtained through validation (see
/// [`crate::validation::SignalPayload::validate`]) or [`TradeSignal::test_signal`],
/// so every price-like field is positive and the symbol is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSignal {
    pub(crate) action: Action,
    pub(crate) symbol: String,
    pub(crate) price: f64,
    pub(crate) stop_loss: f64,
    pub(crate) take_profit_1: f64,
    pub(crate) take_profit_2: f64,
    pub(crate) quantity: u64,
    pub(crate) risk_reward: String,
    pub(crate) timeframe: String,
}

impl TradeSignal {
    /// The fixed signal used by the self-test entry point.
    pub fn test_signal() -> Self {
        Self {
            action: Action::Buy,
            symbol: "AAPL".to_string(),
            price: 185.50,
            stop_loss: 182.30,
            take_profit_1: 190.20,
            take_profit_2: 193.80,
            quantity: 15,
            risk_reward: "2.1".to_string(),
            timeframe: "1H".to_string(),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    pub fn take_profit_1(&self) -> f64 {
        self.take_profit_1
    }

    pub fn take_profit_2(&self) -> f64 {
        self.take_profit_2
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn risk_reward(&self) -> &str {
        &self.risk_reward
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }
}

/// Whether a notification is a live signal or part of a self-test run.
///
/// Adapters use this to mark test notifications in their rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    #[default]
    Live,
    SelfTest,
}

/// The kinds of notification channel the relay knows about.
///
/// The declaration order is the order in which channels are enabled,
/// dispatched and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelKind {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "whatsapp")]
    Messaging,
    #[serde(rename = "discord")]
    ChatWebhook,
}

impl ChannelKind {
    /// The identifier reported to callers and used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Messaging => "whatsapp",
            Self::ChatWebhook => "discord",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The settings of one enabled channel.
///
/// Built fresh from the configuration snapshot on every request by the
/// channel registry. Secrets are never printed by the `Debug` impl.
#[derive(Clone, PartialEq)]
pub enum ChannelConfig {
    Email {
        sender: String,
        app_password: String,
        recipient: String,
        smtp_host: String,
        smtp_port: u16,
    },
    Messaging {
        account_sid: String,
        auth_token: String,
        from: String,
        to: String,
        api_base_url: String,
    },
    ChatWebhook {
        webhook_url: String,
    },
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Email { .. } => ChannelKind::Email,
            Self::Messaging { .. } => ChannelKind::Messaging,
            Self::ChatWebhook { .. } => ChannelKind::ChatWebhook,
        }
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email {
                sender,
                recipient,
                smtp_host,
                smtp_port,
                ..
            } => f
                .debug_struct("Email")
                .field("sender", sender)
                .field("app_password", &"<redacted>")
                .field("recipient", recipient)
                .field("smtp_host", smtp_host)
                .field("smtp_port", smtp_port)
                .finish(),
            Self::Messaging {
                account_sid,
                from,
                to,
                api_base_url,
                ..
            } => f
                .debug_struct("Messaging")
                .field("account_sid", account_sid)
                .field("auth_token", &"<redacted>")
                .field("from", from)
                .field("to", to)
                .field("api_base_url", api_base_url)
                .finish(),
            // Webhook URLs embed their token in the path.
            Self::ChatWebhook { .. } => f
                .debug_struct("ChatWebhook")
                .field("webhook_url", &"<redacted>")
                .finish(),
        }
    }
}

/// The result of attempting a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub channel: ChannelKind,
    pub success: bool,
}

/// The four-way classification of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateResult {
    AllSucceeded,
    PartialSuccess,
    AllFailed,
    NoChannelsConfigured,
}

/// Everything the caller learns about a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub result: AggregateResult,
    pub notified: Vec<ChannelKind>,
    pub failed: Vec<ChannelKind>,
}

impl DispatchReport {
    /// Classifies a set of per-channel outcomes, preserving their order.
    pub fn from_outcomes(outcomes: &[DispatchOutcome]) -> Self {
        let (notified, failed): (Vec<&DispatchOutcome>, Vec<&DispatchOutcome>) =
            outcomes.iter().partition(|o| o.success);
        let notified: Vec<ChannelKind> = notified.into_iter().map(|o| o.channel).collect();
        let failed: Vec<ChannelKind> = failed.into_iter().map(|o| o.channel).collect();

        let result = if outcomes.is_empty() {
            AggregateResult::NoChannelsConfigured
        } else if notified.is_empty() {
            AggregateResult::AllFailed
        } else if failed.is_empty() {
            AggregateResult::AllSucceeded
        } else {
            AggregateResult::PartialSuccess
        };

        Self {
            result,
            notified,
            failed,
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers a trade signal through one notification mechanism.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// The kind of channel, used for reporting, logging and metrics.
    fn kind(&self) -> ChannelKind;

    /// Sends the signal.
    ///
    /// # Returns
    /// * `true` if the third party accepted the notification
    /// * `false` on any failure; implementations log the cause themselves
    ///   and never return errors or panic past this boundary
    async fn send(&self, signal: &TradeSignal, mode: DeliveryMode) -> bool;
}

/// Turns channel settings into ready-to-use channel adapters.
pub trait ChannelFactory: Send + Sync {
    fn build(&self, config: &ChannelConfig) -> Arc<dyn NotificationChannel>;
}
