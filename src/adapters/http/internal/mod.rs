//! HTTP adapter for trusted callers: relay servers and operators.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{
    cancel_subscription, grant_subscription, reconcile_order, refund_order, relay_allow,
    relay_consume, relay_stats, subscription_check, InternalApiError, InternalAppState,
};
pub use routes::internal_routes;
