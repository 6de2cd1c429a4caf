//! End-to-end test through the real chat-webhook adapter against a mock
//! Discord endpoint.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::TestAppBuilder;
use helpers::valid_payload;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_signal_reaches_chat_webhook() {
    // Arrange
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(body_partial_json(json!({
            "embeds": [{ "title": "🔔 FibAlgo Signal", "color": 0x00FF00 }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let webhook_url = format!("{}/api/webhooks/1/token", discord.uri());
    let app = TestAppBuilder::new()
        .with_config_modifier(|config| {
            config.channels.discord.webhook_url = Some(webhook_url);
        })
        .start()
        .await
        .unwrap();

    // Act
    let res = reqwest::Client::new()
        .post(app.url("/webhook"))
        .json(&valid_payload())
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": "success",
            "message": "Notification sent to 1 channel(s)",
            "channels_notified": ["discord"],
            "channels_failed": []
        })
    );

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_rejecting_chat_webhook_fails_the_request() {
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Unknown Webhook" })))
        .mount(&discord)
        .await;

    let webhook_url = format!("{}/api/webhooks/1/token", discord.uri());
    let app = TestAppBuilder::new()
        .with_config_modifier(|config| {
            config.channels.discord.webhook_url = Some(webhook_url);
        })
        .start()
        .await
        .unwrap();

    let res = reqwest::Client::new()
        .post(app.url("/webhook"))
        .json(&valid_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "detail": "All notification channels failed" }));

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
