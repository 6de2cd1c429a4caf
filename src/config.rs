//! Configuration management for the relay
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, an optional `relay.toml` file, prefixed
//! environment variables, the flat variable names used by existing
//! deployments, and finally command-line arguments.

use crate::cli::Cli;
use anyhow::{bail, Result};
use arc_swap::ArcSwap;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "relay.toml";

/// The configuration snapshot shared between the HTTP layer and the config
/// watcher. Readers always see a complete `Config`.
pub type SharedConfig = Arc<ArcSwap<Config>>;

/// Flat environment variable names and the config keys they populate.
const LEGACY_ENV_KEYS: [(&str, &str); 9] = [
    ("GMAIL_ADDRESS", "channels.email.address"),
    ("GMAIL_APP_PASSWORD", "channels.email.app_password"),
    ("EMAIL_RECIPIENT", "channels.email.recipient"),
    ("TWILIO_ACCOUNT_SID", "channels.whatsapp.account_sid"),
    ("TWILIO_AUTH_TOKEN", "channels.whatsapp.auth_token"),
    ("TWILIO_WHATSAPP_FROM", "channels.whatsapp.from"),
    ("WHATSAPP_TO", "channels.whatsapp.to"),
    ("DISCORD_WEBHOOK_URL", "channels.discord.webhook_url"),
    ("PORT", "server.port"),
];

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub core: CoreConfig,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub metrics: MetricsConfig,
    pub channels: ChannelsConfig,
}

/// General application settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoreConfig {
    /// The logging level for the application.
    pub log_level: String,
}

/// Settings for the webhook listener.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Settings shared by the outbound transports.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    /// Upper bound for a single outbound request or SMTP session.
    pub timeout_seconds: u64,
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: SocketAddr,
}

/// Credentials for every channel kind. A kind is enabled only when all of its
/// required settings are present; see [`crate::registry`].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub whatsapp: MessagingSettings,
    #[serde(default)]
    pub discord: ChatWebhookSettings,
}

/// SMTP submission settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmailSettings {
    /// The sender address, also used as the SMTP username.
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub app_password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient: Option<String>,
    /// Relay host, reached over implicit TLS.
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            address: None,
            app_password: None,
            recipient: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
        }
    }
}

/// Twilio-compatible messaging API settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MessagingSettings {
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_sid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub auth_token: Option<String>,
    /// Sender address, e.g. `whatsapp:+14155238886`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: Option<String>,
    pub api_base_url: String,
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from: None,
            to: None,
            api_base_url: "https://api.twilio.com".to_string(),
        }
    }
}

/// Discord-compatible chat webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ChatWebhookSettings {
    #[serde(default, deserialize_with = "lenient_string")]
    pub webhook_url: Option<String>,
}

impl Config {
    /// Loads the application configuration for the given command line.
    ///
    /// The file named by `--config` must exist; without it, `relay.toml` in
    /// the working directory is used when present.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
        }
        if let Some(path) = Self::file_path(cli) {
            figment = figment.merge(Toml::file(path));
        }

        let config = figment
            // e.g. RELAY_SERVER__PORT=8080 or RELAY_CHANNELS__DISCORD__WEBHOOK_URL=...
            .merge(Env::prefixed("RELAY_").split("__"))
            .merge(legacy_env())
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// The configuration file in effect for `cli`, if any.
    pub fn file_path(cli: &Cli) -> Option<PathBuf> {
        match &cli.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                default.exists().then(|| default.to_path_buf())
            }
        }
    }

    /// Wraps the configuration for sharing with the request handlers.
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(ArcSwap::from_pointee(self))
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                log_level: "info".to_string(),
            },
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 8000,
            },
            http: HttpConfig {
                timeout_seconds: 10,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
            },
            channels: ChannelsConfig::default(),
        }
    }
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| *path)
            .unwrap_or_else(|| key.as_str())
            .into()
    })
}

/// Accepts any scalar for a string setting.
///
/// Environment values such as an all-digit token are parsed as numbers by
/// figment before they reach serde.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}
