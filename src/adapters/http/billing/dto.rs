//! HTTP DTOs (Data Transfer Objects) for the user-facing billing endpoints.
//!
//! These types define the JSON request/response structure for the
//! subscription API and keep domain types off the wire.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{CheckAccessResult, CreateOrderResult};
use crate::domain::billing::{Plan, Subscription};
use crate::domain::foundation::PlanId;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to buy (or activate) a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub plan_id: PlanId,
}

/// Query string of the payment submit page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitQuery {
    #[serde(default)]
    pub out_trade_no: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Result of `POST /api/subscription/orders`.
///
/// Paid plans carry `pay_url`; free plans are active immediately and carry
/// the subscription instead.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub out_trade_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionResponse>,
    /// True when an unsubmitted pending order was handed back.
    pub reused: bool,
}

impl From<CreateOrderResult> for CreateOrderResponse {
    fn from(result: CreateOrderResult) -> Self {
        Self {
            out_trade_no: result.order_number.to_string(),
            pay_url: result.pay_url,
            subscription: result.subscription.map(SubscriptionResponse::from),
            reused: result.reused,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub plan_id: String,
    pub status: String,
    pub started_at: String,
    pub expires_at: String,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            plan_id: s.plan_id.to_string(),
            status: s.status.as_str().to_string(),
            started_at: s.started_at.as_datetime().to_rfc3339(),
            expires_at: s.expires_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Result of `GET /api/subscription/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    #[serde(rename = "payment_enabled")]
    pub billing_enabled: bool,
    pub active: bool,
    pub subscription: Option<SubscriptionResponse>,
}

impl From<CheckAccessResult> for SubscriptionStatusResponse {
    fn from(result: CheckAccessResult) -> Self {
        Self {
            billing_enabled: result.billing_enabled,
            active: result.active,
            subscription: result.subscription.map(SubscriptionResponse::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in minor units (cents).
    pub price: i64,
    /// Price as the gateway shows it, e.g. `"9.99"`.
    pub price_decimal: String,
    pub period_unit: String,
    pub period_count: u32,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id.to_string(),
            code: plan.code,
            name: plan.name,
            description: plan.description,
            price: plan.price.minor(),
            price_decimal: plan.price.to_decimal(),
            period_unit: plan.period.unit.as_str().to_string(),
            period_count: plan.period.count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanResponse>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
