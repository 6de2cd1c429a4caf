//! Integration tests for the `GET /test` self-test trigger.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::TestAppBuilder;
use helpers::spy_channel::SpyChannelFactory;
use helpers::valid_payload;
use signal_relay::api::{ErrorBody, WebhookResponse};
use signal_relay::core::{ChannelKind, DeliveryMode};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_self_test_dispatches_marked_sample_signal() {
    let factory = SpyChannelFactory::new();
    let app = TestAppBuilder::new()
        .with_channels(&[ChannelKind::Email, ChannelKind::Messaging])
        .with_channel_factory(Arc::new(factory.clone()))
        .start()
        .await
        .unwrap();

    let res = reqwest::get(app.url("/test")).await.unwrap();
    assert_eq!(res.status(), 200);

    let body: WebhookResponse = res.json().await.unwrap();
    assert_eq!(body.status, "test_completed");
    assert_eq!(body.message, "Test sent to 2 channel(s)");
    assert_eq!(
        body.channels_notified,
        vec![ChannelKind::Email, ChannelKind::Messaging]
    );

    let sends = factory.sends();
    assert_eq!(sends.len(), 2);
    assert!(sends
        .iter()
        .all(|s| s.mode == DeliveryMode::SelfTest && s.symbol == "AAPL"));

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_self_test_reports_failures_without_erroring() {
    let factory = SpyChannelFactory::new().failing(ChannelKind::ChatWebhook);
    let app = TestAppBuilder::new()
        .with_channels(&[ChannelKind::ChatWebhook])
        .with_channel_factory(Arc::new(factory))
        .start()
        .await
        .unwrap();

    let res = reqwest::get(app.url("/test")).await.unwrap();
    assert_eq!(res.status(), 200);

    let body: WebhookResponse = res.json().await.unwrap();
    assert_eq!(body.status, "test_completed");
    assert_eq!(body.message, "Test sent to 0 channel(s)");
    assert_eq!(body.channels_failed, vec![ChannelKind::ChatWebhook]);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_self_test_without_channels_matches_webhook_error() {
    let factory = SpyChannelFactory::new();
    let app = TestAppBuilder::new()
        .with_channel_factory(Arc::new(factory.clone()))
        .start()
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let test_res = client.get(app.url("/test")).send().await.unwrap();
    let webhook_res = client
        .post(app.url("/webhook"))
        .json(&valid_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(test_res.status(), 500);
    assert_eq!(webhook_res.status(), 500);
    let test_body: ErrorBody = test_res.json().await.unwrap();
    let webhook_body: ErrorBody = webhook_res.json().await.unwrap();
    assert_eq!(test_body, webhook_body);
    assert_eq!(factory.call_count(), 0);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
