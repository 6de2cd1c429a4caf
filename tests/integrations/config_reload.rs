//! Integration test for configuration hot reload: channels enabled in the
//! file after startup take effect on the next request without a restart.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::TestAppBuilder;
use helpers::spy_channel::SpyChannelFactory;
use helpers::valid_payload;
use signal_relay::api::HealthResponse;
use signal_relay::cli::Cli;
use signal_relay::config::Config;
use signal_relay::core::ChannelKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[tokio::test]
async fn test_reloaded_channels_apply_to_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "[core]\nlog_level = \"info\"\n").unwrap();

    let cli = Cli {
        config: Some(path.clone()),
        ..Cli::default()
    };
    let config = Config::load(&cli).unwrap();
    let factory = SpyChannelFactory::new();
    let (reload_tx, mut reload_rx) = mpsc::channel(1);

    let app = TestAppBuilder::new()
        .with_config_modifier(|c| c.channels = config.channels.clone())
        .with_channel_factory(Arc::new(factory.clone()))
        .with_config_watch(cli, path.clone(), reload_tx)
        .start()
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let before = client
        .post(app.url("/webhook"))
        .json(&valid_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(before.status(), 500);

    // Give the OS watcher a moment to register.
    tokio::time::sleep(Duration::from_millis(100)).await;
    helpers::replace_file(
        &path,
        "[core]\nlog_level = \"info\"\n[channels.discord]\nwebhook_url = \"https://discord.test/api/webhooks/1/token\"\n",
    );
    timeout(Duration::from_secs(5), reload_rx.recv())
        .await
        .expect("timed out waiting for config reload");

    let health: HealthResponse = client.get(app.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health.enabled_channels, vec![ChannelKind::ChatWebhook]);

    let after = client
        .post(app.url("/webhook"))
        .json(&valid_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 200);
    assert_eq!(factory.call_count(), 1);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_broken_reload_keeps_previous_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(
        &path,
        "[channels.discord]\nwebhook_url = \"https://discord.test/api/webhooks/1/token\"\n",
    )
    .unwrap();

    let cli = Cli {
        config: Some(path.clone()),
        ..Cli::default()
    };
    let config = Config::load(&cli).unwrap();
    let (reload_tx, mut reload_rx) = mpsc::channel(1);

    let app = TestAppBuilder::new()
        .with_config_modifier(|c| c.channels = config.channels.clone())
        .with_channel_factory(Arc::new(SpyChannelFactory::new()))
        .with_config_watch(cli, path.clone(), reload_tx)
        .start()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    helpers::replace_file(&path, "[channels.discord\nwebhook_url = ");

    // A failed reload never signals.
    assert!(timeout(Duration::from_millis(500), reload_rx.recv()).await.is_err());
    assert_eq!(
        app.config.load().channels.discord.webhook_url.as_deref(),
        Some("https://discord.test/api/webhooks/1/token")
    );

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
