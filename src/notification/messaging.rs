//! A client for the Twilio-compatible messaging API (WhatsApp delivery).

use crate::core::{ChannelKind, DeliveryMode, NotificationChannel, TradeSignal};
use crate::formatting::{PlainTextFormatter, TextFormatter};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, instrument};

/// API error codes that need operator action rather than a resend.
const AUTHENTICATION_FAILED: i64 = 20003;
const INVALID_TO_NUMBER: i64 = 21211;
const RECIPIENT_NOT_OPTED_IN: i64 = 63007;

/// The part of a created message resource we care about.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

/// The error document returned with a non-2xx status.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Sends the short text rendering of a signal to one fixed destination.
pub struct MessagingChannel {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
    api_base_url: String,
    formatter: Box<dyn TextFormatter>,
}

impl MessagingChannel {
    pub fn new(
        client: reqwest::Client,
        account_sid: String,
        auth_token: String,
        from: String,
        to: String,
        api_base_url: String,
    ) -> Self {
        Self {
            client,
            account_sid,
            auth_token,
            from,
            to,
            api_base_url,
            formatter: Box::new(PlainTextFormatter),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url.trim_end_matches('/'),
            self.account_sid
        )
    }

    /// Logs the operator hint for a known API error code.
    fn log_hint(code: i64) {
        match code {
            AUTHENTICATION_FAILED => {
                error!("Authentication failed. Check TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN")
            }
            INVALID_TO_NUMBER => error!("Invalid 'To' phone number. Check WHATSAPP_TO format"),
            RECIPIENT_NOT_OPTED_IN => error!(
                "WhatsApp message could not be sent. Ensure recipient has opted in"
            ),
            _ => {}
        }
    }
}

#[async_trait]
impl NotificationChannel for MessagingChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Messaging
    }

    #[instrument(skip_all, fields(channel = "whatsapp", symbol = %signal.symbol()))]
    async fn send(&self, signal: &TradeSignal, mode: DeliveryMode) -> bool {
        let body = self.formatter.format(signal, mode);
        let form = [
            ("To", self.to.as_str()),
            ("From", self.from.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await;

        let res = match response {
            Ok(res) => res,
            Err(e) => {
                error!(error = %e, timeout = e.is_timeout(), "HTTP request to messaging API failed");
                return false;
            }
        };

        let status = res.status();
        if status.is_success() {
            let sid = res
                .json::<MessageResource>()
                .await
                .ok()
                .and_then(|m| m.sid)
                .unwrap_or_default();
            info!(sid = %sid, "WhatsApp message sent successfully.");
            return true;
        }

        let text = res.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(ApiErrorBody {
                code: Some(code),
                message,
            }) => {
                error!(
                    status = %status,
                    code,
                    api_message = message.as_deref().unwrap_or(""),
                    "Messaging API rejected the message"
                );
                Self::log_hint(code);
            }
            _ => {
                error!(status = %status, body = %text, "Messaging API rejected the message");
            }
        }
        false
    }
}
