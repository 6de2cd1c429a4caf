//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the relay using the
//! `clap` crate. These arguments are parsed at startup and then merged on top
//! of the configuration file and environment variables.

use clap::Parser;
use figment::{
    providers::Serialized,
    value::{Dict, Map},
    Error, Figment, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Receives trading-alert webhooks and relays them to email, WhatsApp and Discord.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Port for the webhook listener.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Log level filter (e.g. "info", "debug").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Expose Prometheus metrics.
    #[arg(long)]
    pub metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut figment = Figment::new();

        if let Some(port) = self.port {
            figment = figment.merge(Serialized::default("server.port", port));
        }

        if let Some(level) = &self.log_level {
            figment = figment.merge(Serialized::default("core.log_level", level));
        }

        // Only an explicit flag overrides; absence leaves the file/env value alone.
        if self.metrics {
            figment = figment.merge(Serialized::default("metrics.enabled", true));
        }

        figment.data()
    }
}
