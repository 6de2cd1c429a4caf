//! Renders trade signals for the individual channels.

use crate::core::{Action, DeliveryMode, TradeSignal};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

const BRAND: &str = "FibAlgo";

/// A trait for rendering a signal into a channel's text representation.
pub trait TextFormatter: Send + Sync {
    fn format(&self, signal: &TradeSignal, mode: DeliveryMode) -> String;
}

/// Short multi-line text for messaging apps. Uses WhatsApp's `*bold*` markup.
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format(&self, signal: &TradeSignal, mode: DeliveryMode) -> String {
        let body = format!(
            "🔔 *{brand} Signal*\n\
             \n\
             📊 Action: {action}\n\
             🏷️ Symbol: {symbol}\n\
             💰 Entry: {price}\n\
             🛑 Stop Loss: {sl}\n\
             🎯 TP1: {tp1}\n\
             🎯 TP2: {tp2}\n\
             📦 Qty: {qty}\n\
             ⚖️ R:R: {rr}\n\
             ⏰ Timeframe: {timeframe}",
            brand = BRAND,
            action = signal.action(),
            symbol = signal.symbol(),
            price = dollars(signal.price()),
            sl = dollars(signal.stop_loss()),
            tp1 = dollars(signal.take_profit_1()),
            tp2 = dollars(signal.take_profit_2()),
            qty = signal.quantity(),
            rr = signal.risk_reward(),
            timeframe = signal.timeframe(),
        );

        match mode {
            DeliveryMode::Live => body,
            DeliveryMode::SelfTest => format!("🧪 *TEST NOTIFICATION*\n\n{}", body),
        }
    }
}

/// A self-contained HTML document for email clients.
pub struct HtmlEmailFormatter;

impl HtmlEmailFormatter {
    fn render(&self, signal: &TradeSignal, sent_at: DateTime<Utc>) -> String {
        let action = signal.action();
        let color = match action {
            Action::Buy => "#28a745",
            Action::Sell => "#dc3545",
        };

        let rows = [
            ("Symbol", escape_html(signal.symbol())),
            ("Action", format!("<strong>{}</strong>", action)),
            ("Entry Price", dollars(signal.price())),
            ("Stop Loss", dollars(signal.stop_loss())),
            ("Take Profit 1", dollars(signal.take_profit_1())),
            ("Take Profit 2", dollars(signal.take_profit_2())),
            ("Quantity", signal.quantity().to_string()),
            ("Risk:Reward", escape_html(signal.risk_reward())),
            ("Timeframe", escape_html(signal.timeframe())),
        ]
        .iter()
        .map(|(label, value)| format!("<tr><td>{}</td><td>{}</td></tr>", label, value))
        .collect::<Vec<_>>()
        .join("\n");

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background-color: {color}; color: white; padding: 20px; text-align: center; border-radius: 8px 8px 0 0; }}
.badge {{ font-size: 24px; font-weight: bold; }}
.content {{ background-color: #f8f9fa; padding: 20px; border-radius: 0 0 8px 8px; }}
table {{ width: 100%; border-collapse: collapse; background-color: white; }}
td {{ padding: 12px; border-bottom: 1px solid #dee2e6; }}
td:first-child {{ font-weight: bold; width: 40%; color: #6c757d; }}
.footer {{ text-align: center; margin-top: 20px; color: #6c757d; font-size: 12px; }}
</style>
</head>
<body>
<div class="header"><div class="badge">🔔 {brand} {action} Signal</div></div>
<div class="content">
<table>
{rows}
</table>
<div class="footer">{brand} Trading System • {sent_at}</div>
</div>
</body>
</html>
"#,
            color = color,
            brand = BRAND,
            action = action,
            rows = rows,
            sent_at = sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

impl TextFormatter for HtmlEmailFormatter {
    fn format(&self, signal: &TradeSignal, _mode: DeliveryMode) -> String {
        self.render(signal, Utc::now())
    }
}

/// Subject line for the email channel.
pub fn email_subject(signal: &TradeSignal, mode: DeliveryMode) -> String {
    let subject = format!("{} {} Signal: {}", BRAND, signal.action(), signal.symbol());
    match mode {
        DeliveryMode::Live => format!("🔔 {}", subject),
        DeliveryMode::SelfTest => format!("🧪 TEST: {}", subject),
    }
}

/// Builds a Discord-style webhook body with a single embed, green for BUY and
/// red for SELL.
pub fn chat_embed(signal: &TradeSignal, timestamp: DateTime<Utc>) -> Value {
    let color = match signal.action() {
        Action::Buy => 0x00FF00,
        Action::Sell => 0xFF0000,
    };

    let field = |name: &str, value: String| json!({ "name": name, "value": value, "inline": true });

    json!({
        "embeds": [{
            "title": format!("🔔 {} Signal", BRAND),
            "color": color,
            "fields": [
                field("Action", format!("**{}**", signal.action())),
                field("Symbol", signal.symbol().to_string()),
                field("Timeframe", signal.timeframe().to_string()),
                field("Entry Price", dollars(signal.price())),
                field("Stop Loss", dollars(signal.stop_loss())),
                field("R:R", signal.risk_reward().to_string()),
                field("TP1", dollars(signal.take_profit_1())),
                field("TP2", dollars(signal.take_profit_2())),
                field("Quantity", signal.quantity().to_string()),
            ],
            "footer": { "text": format!("{} Trading System", BRAND) },
            "timestamp": timestamp.to_rfc3339(),
        }]
    })
}

fn dollars(value: f64) -> String {
    format!("${:.2}", value)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
