//! Payment gateway port for server-to-server calls.
//!
//! Browser payments go through the signed submit form; this port covers the
//! calls the service makes itself. Every call is bounded by
//! `PaymentSettings::timeout` and a timeout counts as a failure.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::settings_provider::PaymentSettings;
use crate::domain::billing::{BillingError, Money, OrderNumber};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refunds a confirmed trade in full.
    async fn refund(
        &self,
        settings: &PaymentSettings,
        request: &RefundRequest,
    ) -> Result<RefundReceipt, GatewayError>;

    /// Looks up the gateway's view of one of our orders.
    async fn query_order(
        &self,
        settings: &PaymentSettings,
        order_number: &OrderNumber,
    ) -> Result<GatewayOrderState, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub trade_number: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub message: String,
}

/// Order as reported by the gateway's query endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrderState {
    pub order_number: String,
    pub trade_number: Option<String>,
    /// Decimal amount string as reported.
    pub money: String,
    pub paid: bool,
    pub payment_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("gateway call timed out after {0:?}")]
    Timeout(Duration),

    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("gateway returned an unreadable response: {0}")]
    MalformedResponse(String),

    #[error("gateway rejected the request (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { message, .. } => BillingError::GatewayRejected(message),
            other => BillingError::GatewayUnavailable(other.to_string()),
        }
    }
}
