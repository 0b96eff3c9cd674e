//! Axum router configuration for the internal API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, grant_subscription, reconcile_order, refund_order, relay_allow,
    relay_consume, relay_stats, subscription_check, InternalAppState,
};

/// Internal routes, mounted at `/api/internal` behind `internal_auth`.
///
/// ## Relay
/// - `POST /relay/allow` - Admit a session for a few connections
/// - `POST /relay/consume` - Spend one admission slot
/// - `GET /relay/stats` - Live whitelist entry count
/// - `POST /subscription/check` - Is the token/device owner subscribed
///
/// ## Operators
/// - `POST /orders/refund` - Refund a paid order
/// - `POST /orders/reconcile` - Ask the gateway about a pending order
/// - `POST /subscriptions/grant` - Add days without an order
/// - `POST /subscriptions/cancel` - End a subscription now
pub fn internal_routes() -> Router<InternalAppState> {
    Router::new()
        .route("/relay/allow", post(relay_allow))
        .route("/relay/consume", post(relay_consume))
        .route("/relay/stats", get(relay_stats))
        .route("/subscription/check", post(subscription_check))
        .route("/orders/refund", post(refund_order))
        .route("/orders/reconcile", post(reconcile_order))
        .route("/subscriptions/grant", post(grant_subscription))
        .route("/subscriptions/cancel", post(cancel_subscription))
}
