//! The HTTP surface of the relay: the webhook receiver, the self-test trigger
//! and the health probe.

use crate::core::{
    AggregateResult, ChannelFactory, ChannelKind, DeliveryMode, DispatchReport, TradeSignal,
};
use crate::internal_metrics::{Metrics, SignalSource};
use crate::notification::dispatcher::Dispatcher;
use crate::registry::ChannelRegistry;
use crate::validation::{SignalPayload, ValidationError};
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

pub const SERVICE_NAME: &str = "FibAlgo Notification Relay";

/// Everything a request handler needs. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub registry: ChannelRegistry,
    pub factory: Arc<dyn ChannelFactory>,
    pub dispatcher: Dispatcher,
    pub metrics: Metrics,
}

/// Errors surfaced to HTTP callers. Every variant renders as
/// `{"detail": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidBody(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No notification channels are configured. Check environment variables.")]
    NoChannelsConfigured,
    #[error("All notification channels failed")]
    AllChannelsFailed,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NoChannelsConfigured | ApiError::AllChannelsFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub detail: String,
}

/// The body returned for a completed dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
    pub channels_notified: Vec<ChannelKind>,
    pub channels_failed: Vec<ChannelKind>,
}

impl WebhookResponse {
    fn from_report(report: DispatchReport) -> Self {
        let status = match report.result {
            AggregateResult::PartialSuccess => "partial_success",
            _ => "success",
        };
        let mut message = format!("Notification sent to {} channel(s)", report.notified.len());
        if !report.failed.is_empty() {
            message.push_str(&format!(", {} channel(s) failed", report.failed.len()));
        }
        Self {
            status: status.to_string(),
            message,
            channels_notified: report.notified,
            channels_failed: report.failed,
        }
    }

    fn from_self_test(report: DispatchReport) -> Self {
        Self {
            status: "test_completed".to_string(),
            message: format!("Test sent to {} channel(s)", report.notified.len()),
            channels_notified: report.notified,
            channels_failed: report.failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub enabled_channels: Vec<ChannelKind>,
}

/// Builds the relay's router with permissive CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", post(receive_webhook))
        .route("/test", get(self_test))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        enabled_channels: state.registry.enabled_kinds(),
    })
}

#[instrument(skip_all)]
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let parsed = body
        .map_err(ApiError::from)
        .and_then(|body| parse_payload(&headers, &body))
        .and_then(|payload| payload.validate().map_err(ApiError::from));
    let signal = match parsed {
        Ok(signal) => signal,
        Err(e) => {
            warn!(error = %e, "Rejected webhook payload");
            state.metrics.signals_rejected_total.increment(1);
            return Err(e);
        }
    };

    info!(
        action = %signal.action(),
        symbol = signal.symbol(),
        price = signal.price(),
        "Received signal"
    );
    state.metrics.increment_received(SignalSource::Webhook);

    let report = run_dispatch(&state, &signal, DeliveryMode::Live).await;
    match report.result {
        AggregateResult::NoChannelsConfigured => Err(ApiError::NoChannelsConfigured),
        AggregateResult::AllFailed => Err(ApiError::AllChannelsFailed),
        AggregateResult::AllSucceeded | AggregateResult::PartialSuccess => {
            Ok(Json(WebhookResponse::from_report(report)))
        }
    }
}

#[instrument(skip_all)]
async fn self_test(State(state): State<AppState>) -> Result<Json<WebhookResponse>, ApiError> {
    info!("Running notification self-test");
    state.metrics.increment_received(SignalSource::SelfTest);

    let report = run_dispatch(&state, &TradeSignal::test_signal(), DeliveryMode::SelfTest).await;
    match report.result {
        AggregateResult::NoChannelsConfigured => Err(ApiError::NoChannelsConfigured),
        _ => Ok(Json(WebhookResponse::from_self_test(report))),
    }
}

/// Decodes a webhook body. Alerting platforms often omit the Content-Type
/// header, so a request without one is read as JSON. A declared non-JSON type
/// is rejected.
fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Result<SignalPayload, ApiError> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        if !is_json_content_type(content_type) {
            return Err(ApiError::InvalidBody(
                "Expected request with `Content-Type: application/json`".to_string(),
            ));
        }
    }
    let Json(payload) = Json::<SignalPayload>::from_bytes(body)?;
    Ok(payload)
}

/// Accepts `application/json` and `application/*+json`, parameters ignored.
fn is_json_content_type(value: &HeaderValue) -> bool {
    let Ok(value) = value.to_str() else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.split_once('/') {
        Some(("application", subtype)) => subtype == "json" || subtype.ends_with("+json"),
        _ => false,
    }
}

/// Resolves the active channel set from the current snapshot and dispatches.
async fn run_dispatch(state: &AppState, signal: &TradeSignal, mode: DeliveryMode) -> DispatchReport {
    let channels = state
        .registry
        .enabled_channels()
        .iter()
        .map(|config| state.factory.build(config))
        .collect();
    state.dispatcher.dispatch(signal, channels, mode).await
}
