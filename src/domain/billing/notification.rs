//! Typed view of a gateway payment callback.
//!
//! The gateway posts untyped form fields. They stay a `GatewayParams` map only
//! long enough to verify the signature; everything after that works with
//! `PaymentNotification`.

use std::collections::BTreeMap;

use super::errors::BillingError;
use super::money::{Money, MoneyError};
use super::order::OrderNumber;

/// Untyped gateway key/value parameters, ordered by key.
pub type GatewayParams = BTreeMap<String, String>;

/// Trade status value that confirms a payment.
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

pub mod fields {
    pub const MERCHANT_ID: &str = "pid";
    pub const ORDER_NUMBER: &str = "out_trade_no";
    pub const TRADE_NUMBER: &str = "trade_no";
    pub const MONEY: &str = "money";
    pub const TRADE_STATUS: &str = "trade_status";
    pub const PAYMENT_TYPE: &str = "type";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeStatus {
    Success,
    Other(String),
}

impl TradeStatus {
    pub fn parse(raw: &str) -> Self {
        if raw == TRADE_SUCCESS {
            TradeStatus::Success
        } else {
            TradeStatus::Other(raw.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TradeStatus::Success)
    }
}

/// A payment callback with its required fields present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub merchant_id: Option<String>,
    pub order_number: OrderNumber,
    pub trade_number: String,
    /// Amount as sent by the gateway; parsed only once the order is locked.
    pub money: String,
    pub trade_status: TradeStatus,
    pub payment_type: Option<String>,
    raw: GatewayParams,
}

impl PaymentNotification {
    /// Extracts the callback fields, failing on the first missing one.
    pub fn from_params(params: &GatewayParams) -> Result<Self, BillingError> {
        let required = |name: &'static str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(BillingError::MissingField(name))
        };
        let optional = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let order_number = OrderNumber::parse(&required(fields::ORDER_NUMBER)?)
            .map_err(|e| BillingError::validation(fields::ORDER_NUMBER, e.to_string()))?;
        let trade_number = required(fields::TRADE_NUMBER)?;
        let money = required(fields::MONEY)?;

        Ok(Self {
            merchant_id: optional(fields::MERCHANT_ID),
            order_number,
            trade_number,
            money,
            trade_status: TradeStatus::parse(
                params.get(fields::TRADE_STATUS).map(String::as_str).unwrap_or_default(),
            ),
            payment_type: optional(fields::PAYMENT_TYPE),
            raw: params.clone(),
        })
    }

    pub fn amount(&self) -> Result<Money, MoneyError> {
        Money::from_decimal(&self.money)
    }

    /// The callback parameters as JSON, kept on the order for audit.
    pub fn payload_json(&self) -> String {
        serde_json::to_string(&self.raw).unwrap_or_default()
    }

    pub fn raw(&self) -> &GatewayParams {
        &self.raw
    }
}
