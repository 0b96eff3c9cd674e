//! HTTP adapter for subscriptions and the payment gateway.
//!
//! ## Subscription Endpoints
//!
//! - `GET /api/subscription/plans` - Plan catalogue
//! - `POST /api/subscription/orders` - Create order (auth)
//! - `GET /api/subscription/status` - Subscription state (auth)
//!
//! ## Gateway Endpoints
//!
//! - `GET|POST /api/payment/notify` - Payment callback, answers `success`/`fail`
//! - `GET /api/payment/submit` - Auto-submit page

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{
    create_order, list_plans, payment_notify_form, payment_notify_query, payment_submit,
    subscription_status, BillingApiError, BillingAppState, NOTIFY_ACK, NOTIFY_NACK,
};
pub(crate) use handlers::billing_error_response;
pub use routes::{billing_router, payment_routes, subscription_routes};
