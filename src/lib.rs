//! Signal Relay - receives trading-alert webhooks and fans each validated
//! signal out to email, WhatsApp and Discord concurrently.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod config_watcher;
pub mod core;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod registry;
pub mod task_manager;
pub mod validation;

// Re-export core types for convenience
pub use core::*;
