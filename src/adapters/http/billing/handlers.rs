//! HTTP handlers for the user-facing billing endpoints.
//!
//! These handlers connect axum routes to the billing command/query handlers.
//! The gateway callback and submit page answer in plain text or HTML because
//! that is what the gateway and the payer's browser expect; everything else
//! is JSON.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};

use super::dto::{
    CreateOrderRequest, CreateOrderResponse, ErrorResponse, PlanResponse, PlansResponse,
    SubmitQuery, SubscriptionStatusResponse,
};
use crate::adapters::epay::render_auto_submit;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::{
    CheckAccessHandler, CheckAccessQuery, CreateOrderCommand, CreateOrderHandler,
    HandleNotifyCommand, HandleNotifyHandler, ListPlansHandler, NotifyOutcome,
    PrepareSubmissionCommand, PrepareSubmissionHandler, SubmissionOutcome,
};
use crate::domain::billing::{BillingError, GatewayParams, OrderNumber};
use crate::ports::{BillingStore, PaymentSettingsProvider};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn BillingStore>,
    pub settings: Arc<dyn PaymentSettingsProvider>,
}

impl BillingAppState {
    pub fn new(store: Arc<dyn BillingStore>, settings: Arc<dyn PaymentSettingsProvider>) -> Self {
        Self { store, settings }
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(self.store.clone(), self.settings.clone())
    }

    pub fn prepare_submission_handler(&self) -> PrepareSubmissionHandler {
        PrepareSubmissionHandler::new(self.store.clone(), self.settings.clone())
    }

    pub fn handle_notify_handler(&self) -> HandleNotifyHandler {
        HandleNotifyHandler::new(self.store.clone(), self.settings.clone())
    }

    pub fn list_plans_handler(&self) -> ListPlansHandler {
        ListPlansHandler::new(self.store.clone(), self.settings.clone())
    }

    pub fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.store.clone(), self.settings.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscription/orders
pub async fn create_order(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .create_order_handler()
        .handle(CreateOrderCommand {
            user_id: user.id,
            plan_id: request.plan_id,
        })
        .await?;

    Ok((StatusCode::OK, Json(CreateOrderResponse::from(result))))
}

/// GET /api/subscription/status
pub async fn subscription_status(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .check_access_handler()
        .handle(CheckAccessQuery { user_id: user.id })
        .await?;

    Ok(Json(SubscriptionStatusResponse::from(result)))
}

/// GET /api/subscription/plans
pub async fn list_plans(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plans = state.list_plans_handler().handle().await?;
    Ok(Json(PlansResponse {
        plans: plans.into_iter().map(PlanResponse::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// Body the gateway needs to stop retrying.
pub const NOTIFY_ACK: &str = "success";
/// Anything but `success` makes the gateway retry later.
pub const NOTIFY_NACK: &str = "fail";

/// GET /api/payment/notify
pub async fn payment_notify_query(
    State(state): State<BillingAppState>,
    Query(params): Query<GatewayParams>,
) -> &'static str {
    notify(&state, params).await
}

/// POST /api/payment/notify
///
/// Form fields win over query parameters of the same name.
pub async fn payment_notify_form(
    State(state): State<BillingAppState>,
    Query(mut params): Query<GatewayParams>,
    Form(form): Form<GatewayParams>,
) -> &'static str {
    params.extend(form);
    notify(&state, params).await
}

async fn notify(state: &BillingAppState, params: GatewayParams) -> &'static str {
    match state
        .handle_notify_handler()
        .handle(HandleNotifyCommand { params })
        .await
    {
        Ok(outcome) => {
            if let NotifyOutcome::Applied { order_number, .. } = &outcome {
                tracing::info!(order_number = %order_number, "payment callback applied");
            }
            NOTIFY_ACK
        }
        Err(e) => {
            tracing::warn!(error = %e, retryable = e.is_retryable(), "payment callback refused");
            NOTIFY_NACK
        }
    }
}

/// GET /api/payment/submit?out_trade_no=
///
/// Renders a page that auto-posts the signed parameters to the gateway.
pub async fn payment_submit(
    State(state): State<BillingAppState>,
    Query(query): Query<SubmitQuery>,
) -> Response {
    let raw = query.out_trade_no.unwrap_or_default();
    let raw = raw.trim();
    if raw.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing out_trade_no").into_response();
    }
    let Ok(order_number) = OrderNumber::parse(raw) else {
        return (StatusCode::NOT_FOUND, "order not found").into_response();
    };

    let outcome = state
        .prepare_submission_handler()
        .handle(PrepareSubmissionCommand { order_number })
        .await;

    match outcome {
        Ok(SubmissionOutcome::Ready { action, params, .. }) => (
            [(header::CACHE_CONTROL, "no-store")],
            Html(render_auto_submit(&action, &params)),
        )
            .into_response(),
        Ok(SubmissionOutcome::Blocked) => {
            (StatusCode::OK, "redirecting to payment, please do not submit again").into_response()
        }
        Ok(SubmissionOutcome::NotFound) => (StatusCode::NOT_FOUND, "order not found").into_response(),
        Ok(SubmissionOutcome::NotPayable(_)) => {
            (StatusCode::OK, "order cannot be paid").into_response()
        }
        Ok(SubmissionOutcome::InvalidAmount) => {
            (StatusCode::OK, "order amount is invalid").into_response()
        }
        Err(BillingError::PaymentDisabled) => {
            (StatusCode::OK, "payment not enabled").into_response()
        }
        Err(e) => {
            tracing::error!(order_number = raw, error = %e, "payment submission failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "system error").into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper for billing errors.
#[derive(Debug)]
pub struct BillingApiError(pub BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

/// Status and error code for a billing error, shared with the internal API.
pub(crate) fn billing_error_status(err: &BillingError) -> (StatusCode, &'static str) {
    match err {
        BillingError::PlanNotFound(_) => (StatusCode::NOT_FOUND, "PLAN_NOT_FOUND"),
        BillingError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
        BillingError::PlanInactive(_) => (StatusCode::CONFLICT, "PLAN_INACTIVE"),
        BillingError::PaymentDisabled => (StatusCode::FORBIDDEN, "PAYMENT_DISABLED"),
        BillingError::InvalidSignature => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
        BillingError::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD"),
        BillingError::MerchantMismatch => (StatusCode::BAD_REQUEST, "MERCHANT_MISMATCH"),
        BillingError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        BillingError::AmountMismatch { .. } => (StatusCode::CONFLICT, "AMOUNT_MISMATCH"),
        BillingError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION"),
        BillingError::MissingTradeNumber(_) => (StatusCode::CONFLICT, "MISSING_TRADE_NUMBER"),
        BillingError::GatewayUnavailable(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_UNAVAILABLE"),
        BillingError::GatewayRejected(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_REJECTED"),
        BillingError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
        BillingError::LockTimeout => (StatusCode::SERVICE_UNAVAILABLE, "LOCK_TIMEOUT"),
        BillingError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

/// Error body for a billing error. Infrastructure details stay in the logs.
pub(crate) fn billing_error_response(err: &BillingError) -> Response {
    let (status, error_code) = billing_error_status(err);
    let message = match err {
        BillingError::Infrastructure(detail) => {
            tracing::error!(error = %detail, "billing request failed");
            "An internal error occurred".to_string()
        }
        other => other.to_string(),
    };
    (status, Json(ErrorResponse::new(error_code, message))).into_response()
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        billing_error_response(&self.0)
    }
}
