//! Inbound payload validation.
//!
//! The webhook body is first deserialized into a loosely-typed
//! [`SignalPayload`] and then checked against the signal invariants. Only a
//! payload that passes every check becomes a [`TradeSignal`].

use crate::core::{Action, TradeSignal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The JSON body of a webhook request, as sent by the charting platform.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SignalPayload {
    pub action: String,
    pub symbol: String,
    pub price: f64,
    pub sl: f64,
    pub tp1: f64,
    pub tp2: f64,
    /// Whole number of units. Integral floats such as `15.0` are accepted.
    pub qty: f64,
    pub rr: String,
    pub timeframe: String,
}

/// Reasons a payload is rejected before any channel is contacted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("action must be either BUY or SELL, got {0:?}")]
    InvalidAction(String),
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("price values must be positive ({field} = {value})")]
    NonPositivePrice { field: &'static str, value: f64 },
    #[error("quantity must be a whole number (qty = {0})")]
    FractionalQuantity(f64),
    #[error("quantity must be positive (qty = {0})")]
    NonPositiveQuantity(f64),
}

impl SignalPayload {
    /// Checks the payload and converts it into a [`TradeSignal`].
    ///
    /// The action is normalised to upper case; symbol, labels and prices are
    /// taken as-is.
    pub fn validate(self) -> Result<TradeSignal, ValidationError> {
        let action =
            Action::parse(&self.action).ok_or_else(|| ValidationError::InvalidAction(self.action.clone()))?;

        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        for (field, value) in [
            ("price", self.price),
            ("sl", self.sl),
            ("tp1", self.tp1),
            ("tp2", self.tp2),
        ] {
            // Written this way round so that NaN is rejected as well.
            if !(value > 0.0) || !value.is_finite() {
                return Err(ValidationError::NonPositivePrice { field, value });
            }
        }

        if !self.qty.is_finite() || self.qty.fract() != 0.0 {
            return Err(ValidationError::FractionalQuantity(self.qty));
        }
        if self.qty <= 0.0 {
            return Err(ValidationError::NonPositiveQuantity(self.qty));
        }

        Ok(TradeSignal {
            action,
            symbol: self.symbol,
            price: self.price,
            stop_loss: self.sl,
            take_profit_1: self.tp1,
            take_profit_2: self.tp2,
            quantity: self.qty as u64,
            risk_reward: self.rr,
            timeframe: self.timeframe,
        })
    }
}
