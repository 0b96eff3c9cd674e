//! Subscription gate for premium routes.
//!
//! Runs after `auth_middleware`. Billing switched off lets everyone through;
//! otherwise the user must be authenticated and either an admin or active.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::handlers::{CheckAccessHandler, CheckAccessQuery};
use crate::domain::billing::BillingError;
use crate::domain::foundation::AuthenticatedUser;

pub type SubscriptionGateState = Arc<CheckAccessHandler>;

pub async fn require_subscription(
    State(access): State<SubscriptionGateState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        return match access.billing_enabled().await {
            Ok(false) => next.run(request).await,
            Ok(true) => reject(
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication required",
            ),
            Err(e) => unavailable(e),
        };
    };

    if user.is_admin {
        return next.run(request).await;
    }

    match access.handle(CheckAccessQuery { user_id: user.id }).await {
        Ok(result) if result.has_access() => next.run(request).await,
        Ok(_) => reject(
            StatusCode::PAYMENT_REQUIRED,
            "SUBSCRIPTION_REQUIRED",
            "An active subscription is required",
        ),
        Err(e) => unavailable(e),
    }
}

fn unavailable(e: BillingError) -> Response {
    tracing::error!(error = %e, "subscription check failed");
    reject(
        StatusCode::SERVICE_UNAVAILABLE,
        "SUBSCRIPTION_CHECK_FAILED",
        "Subscription status is temporarily unavailable",
    )
}

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message, "code": code })),
    )
        .into_response()
}
