//! Request/response bodies of the internal API.

use serde::{Deserialize, Serialize};

use crate::adapters::http::billing::SubscriptionResponse;
use crate::application::handlers::{
    CheckSubscriptionResult, ReconcileOrderResult, RefundOrderResult,
};
use crate::domain::foundation::{OrderId, PlanId, UserId};
use crate::domain::relay::{AdmissionGrant, RelaySessionId};

// ════════════════════════════════════════════════════════════════════════════════
// Relay Admission
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct RelayAllowRequest {
    #[serde(default)]
    pub uuid: String,
    /// Omitted or non-positive means the default; clamped to the maximum.
    #[serde(default)]
    pub slots: Option<i64>,
    #[serde(default)]
    pub ttl_sec: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayAllowResponse {
    pub uuid: String,
    pub slots: u32,
    pub ttl_sec: u64,
}

impl RelayAllowResponse {
    pub fn new(session: &RelaySessionId, grant: &AdmissionGrant) -> Self {
        Self {
            uuid: session.as_str().to_string(),
            slots: grant.slots,
            ttl_sec: grant.ttl.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConsumeRequest {
    #[serde(default)]
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayConsumeResponse {
    pub uuid: String,
    pub allowed: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription Check
// ════════════════════════════════════════════════════════════════════════════════

/// Accepted as a JSON body and, for older relay builds, as query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionCheckRequest {
    #[serde(default)]
    pub token: Option<String>,
    /// Device id of the relay client.
    #[serde(default)]
    pub uuid: Option<String>,
}

impl SubscriptionCheckRequest {
    /// Fills fields missing from the body with the query string's.
    pub fn or(self, fallback: SubscriptionCheckRequest) -> Self {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }
        Self {
            token: present(self.token).or_else(|| present(fallback.token)),
            uuid: present(self.uuid).or_else(|| present(fallback.uuid)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCheckResponse {
    pub active: bool,
    pub payment_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<CheckSubscriptionResult> for SubscriptionCheckResponse {
    fn from(result: CheckSubscriptionResult) -> Self {
        // The user id is only reported alongside a real subscription answer.
        let user_id = match result.reason {
            None => result.user_id.map(|id| id.to_string()),
            Some(_) => None,
        };
        Self {
            active: result.active,
            payment_enabled: result.billing_enabled,
            user_id,
            reason: result.reason.map(|r| r.as_str()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct RefundOrderRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundOrderResponse {
    pub order_id: String,
    pub out_trade_no: String,
    pub status: &'static str,
    pub refunded_at: Option<String>,
    pub subscription_canceled: bool,
}

impl From<RefundOrderResult> for RefundOrderResponse {
    fn from(result: RefundOrderResult) -> Self {
        Self {
            order_id: result.order.id.to_string(),
            out_trade_no: result.order.order_number.to_string(),
            status: result.order.status.as_str(),
            refunded_at: result.order.refunded_at.map(|t| t.as_datetime().to_rfc3339()),
            subscription_canceled: result.subscription_canceled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileOrderRequest {
    pub out_trade_no: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOrderResponse {
    pub out_trade_no: String,
    pub status: &'static str,
    pub applied: bool,
}

impl From<ReconcileOrderResult> for ReconcileOrderResponse {
    fn from(result: ReconcileOrderResult) -> Self {
        Self {
            out_trade_no: result.order_number.to_string(),
            status: result.status.as_str(),
            applied: result.applied,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct GrantSubscriptionRequest {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionResponse {
    pub user_id: String,
    pub canceled: bool,
    pub subscription: Option<SubscriptionResponse>,
}
