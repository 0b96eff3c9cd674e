//! Billing handlers.
//!
//! ## Commands
//! - Creating orders (free plans activate on the spot)
//! - Preparing the gateway submission
//! - Applying payment callbacks and reconciling missed ones
//! - Refunds and operator grants/cancellations
//!
//! ## Queries
//! - Plan catalogue
//! - Subscription state for users and for the relay server

mod cancel_subscription;
mod check_access;
mod check_subscription;
mod create_order;
mod grant_subscription;
mod handle_notify;
mod list_plans;
mod prepare_submission;
mod reconcile_order;
mod refund_order;
mod renewal;
mod settlement;

#[cfg(test)]
pub(crate) mod test_support;

// Commands
pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult};
pub use grant_subscription::{GrantSubscriptionCommand, GrantSubscriptionHandler};
pub use handle_notify::{HandleNotifyCommand, HandleNotifyHandler};
pub use prepare_submission::{PrepareSubmissionCommand, PrepareSubmissionHandler, SubmissionOutcome};
pub use reconcile_order::{ReconcileOrderCommand, ReconcileOrderHandler, ReconcileOrderResult};
pub use refund_order::{RefundOrderCommand, RefundOrderHandler, RefundOrderResult};
pub use settlement::NotifyOutcome;

// Queries
pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use check_subscription::{
    CheckReason, CheckSubscriptionHandler, CheckSubscriptionQuery, CheckSubscriptionResult,
    MAX_TOKEN_LEN,
};
pub use list_plans::ListPlansHandler;
