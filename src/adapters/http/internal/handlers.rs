//! HTTP handlers for the internal API.
//!
//! Callers are the relay servers (admission and subscription checks) and
//! operators (refunds, reconciliation, manual grants). The router puts
//! `internal_auth` in front of every route here.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::{
    CancelSubscriptionRequest, CancelSubscriptionResponse, GrantSubscriptionRequest,
    ReconcileOrderRequest, ReconcileOrderResponse, RefundOrderRequest, RefundOrderResponse,
    RelayAllowRequest, RelayAllowResponse, RelayConsumeRequest, RelayConsumeResponse,
    SubscriptionCheckRequest, SubscriptionCheckResponse,
};
use crate::adapters::http::billing::{billing_error_response, ErrorResponse, SubscriptionResponse};
use crate::application::handlers::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckAccessHandler,
    CheckSubscriptionHandler, CheckSubscriptionQuery, GrantSubscriptionCommand,
    GrantSubscriptionHandler, ReconcileOrderCommand, ReconcileOrderHandler, RefundOrderCommand,
    RefundOrderHandler,
};
use crate::domain::billing::{BillingError, OrderNumber};
use crate::domain::relay::{AdmissionGrant, AdmissionLimits, RelayError, RelaySessionId};
use crate::ports::{
    BillingStore, DeviceDirectory, PaymentGateway, PaymentSettingsProvider, RelayWhitelist,
    TokenValidator,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct InternalAppState {
    pub whitelist: Arc<dyn RelayWhitelist>,
    pub limits: AdmissionLimits,
    pub store: Arc<dyn BillingStore>,
    pub settings: Arc<dyn PaymentSettingsProvider>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub tokens: Arc<dyn TokenValidator>,
    pub devices: Arc<dyn DeviceDirectory>,
}

impl InternalAppState {
    pub fn check_subscription_handler(&self) -> CheckSubscriptionHandler {
        CheckSubscriptionHandler::new(
            self.tokens.clone(),
            self.devices.clone(),
            self.settings.clone(),
            Arc::new(CheckAccessHandler::new(self.store.clone(), self.settings.clone())),
        )
    }

    pub fn refund_order_handler(&self) -> RefundOrderHandler {
        RefundOrderHandler::new(self.store.clone(), self.gateway.clone(), self.settings.clone())
    }

    pub fn reconcile_order_handler(&self) -> ReconcileOrderHandler {
        ReconcileOrderHandler::new(self.store.clone(), self.gateway.clone(), self.settings.clone())
    }

    pub fn grant_subscription_handler(&self) -> GrantSubscriptionHandler {
        GrantSubscriptionHandler::new(self.store.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Relay Admission
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/internal/relay/allow
pub async fn relay_allow(
    State(state): State<InternalAppState>,
    Json(request): Json<RelayAllowRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let session = RelaySessionId::parse(request.uuid, &state.limits)?;
    let grant = AdmissionGrant::resolve(request.slots, request.ttl_sec, &state.limits);

    state.whitelist.allow(&session, grant).await;

    Ok(Json(RelayAllowResponse::new(&session, &grant)))
}

/// POST /api/internal/relay/consume
pub async fn relay_consume(
    State(state): State<InternalAppState>,
    Json(request): Json<RelayConsumeRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let session = RelaySessionId::parse(request.uuid, &state.limits)?;
    let allowed = state.whitelist.consume(&session).await;

    Ok(Json(RelayConsumeResponse {
        uuid: session.as_str().to_string(),
        allowed,
    }))
}

/// GET /api/internal/relay/stats
pub async fn relay_stats(State(state): State<InternalAppState>) -> impl IntoResponse {
    Json(state.whitelist.stats().await)
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription Check
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/internal/subscription/check
///
/// The body is optional and a malformed one is treated as empty, so relays
/// that only send query parameters keep working.
pub async fn subscription_check(
    State(state): State<InternalAppState>,
    Query(query): Query<SubscriptionCheckRequest>,
    body: Bytes,
) -> Result<impl IntoResponse, InternalApiError> {
    let from_body: SubscriptionCheckRequest = serde_json::from_slice(&body).unwrap_or_default();
    let request = from_body.or(query);

    let result = state
        .check_subscription_handler()
        .handle(CheckSubscriptionQuery {
            token: request.token,
            device_id: request.uuid,
        })
        .await?;

    Ok(Json(SubscriptionCheckResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/internal/orders/refund
pub async fn refund_order(
    State(state): State<InternalAppState>,
    Json(request): Json<RefundOrderRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let result = state
        .refund_order_handler()
        .handle(RefundOrderCommand {
            order_id: request.order_id,
            reason: request.reason,
        })
        .await?;

    Ok(Json(RefundOrderResponse::from(result)))
}

/// POST /api/internal/orders/reconcile
pub async fn reconcile_order(
    State(state): State<InternalAppState>,
    Json(request): Json<ReconcileOrderRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let order_number = OrderNumber::parse(request.out_trade_no.trim())
        .map_err(|_| BillingError::OrderNotFound(request.out_trade_no.clone()))?;

    let result = state
        .reconcile_order_handler()
        .handle(ReconcileOrderCommand { order_number })
        .await?;

    Ok(Json(ReconcileOrderResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/internal/subscriptions/grant
pub async fn grant_subscription(
    State(state): State<InternalAppState>,
    Json(request): Json<GrantSubscriptionRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let subscription = state
        .grant_subscription_handler()
        .handle(GrantSubscriptionCommand {
            user_id: request.user_id,
            plan_id: request.plan_id,
            days: request.days,
        })
        .await?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

/// POST /api/internal/subscriptions/cancel
pub async fn cancel_subscription(
    State(state): State<InternalAppState>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let user_id = request.user_id.to_string();
    let canceled = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand {
            user_id: request.user_id,
        })
        .await?;

    Ok(Json(CancelSubscriptionResponse {
        user_id,
        canceled: canceled.is_some(),
        subscription: canceled.map(SubscriptionResponse::from),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum InternalApiError {
    Relay(RelayError),
    Billing(BillingError),
}

impl From<RelayError> for InternalApiError {
    fn from(err: RelayError) -> Self {
        Self::Relay(err)
    }
}

impl From<BillingError> for InternalApiError {
    fn from(err: BillingError) -> Self {
        Self::Billing(err)
    }
}

impl IntoResponse for InternalApiError {
    fn into_response(self) -> Response {
        match self {
            InternalApiError::Relay(err) => {
                let message = match err {
                    RelayError::EmptySessionId => "uuid is required",
                    RelayError::SessionIdTooLong { .. } => "uuid too long",
                };
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("INVALID_SESSION_ID", message)),
                )
                    .into_response()
            }
            InternalApiError::Billing(err) => billing_error_response(&err),
        }
    }
}
