//! Axum router configuration for the billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_order, list_plans, payment_notify_form, payment_notify_query, payment_submit,
    subscription_status, BillingAppState,
};

/// Subscription routes, mounted at `/api/subscription`.
///
/// - `GET /plans` - Active plans (public)
/// - `POST /orders` - Create an order for the current user
/// - `GET /status` - Current user's subscription state
///
/// `orders` and `status` need `auth_middleware` on an outer layer.
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/orders", post(create_order))
        .route("/status", get(subscription_status))
}

/// Gateway-facing routes, mounted at `/api/payment`.
///
/// No user authentication: callbacks are verified by signature and the
/// submit page is addressed by order number.
///
/// - `GET|POST /notify` - Asynchronous payment callback
/// - `GET /submit` - Auto-submit page that forwards the payer to the gateway
pub fn payment_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/notify", get(payment_notify_query).post(payment_notify_form))
        .route("/submit", get(payment_submit))
}

/// Both route groups, suitable for nesting under `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/subscription", subscription_routes())
        .nest("/payment", payment_routes())
}
