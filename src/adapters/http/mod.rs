//! HTTP adapters - axum routers, handlers and middleware.
//!
//! - `billing` - subscription endpoints and the gateway callback/submit pages
//! - `internal` - relay admission, subscription check and operator commands
//! - `middleware` - authentication, internal-caller guard, subscription gate

pub mod billing;
pub mod internal;
pub mod middleware;
mod router;

pub use billing::{billing_router, BillingAppState};
pub use internal::{internal_routes, InternalAppState};
pub use router::{api_router, ApiDependencies};
