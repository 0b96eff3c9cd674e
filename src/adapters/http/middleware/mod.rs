//! HTTP middleware for axum.
//!
//! - `auth` - Bearer token authentication and the `RequireAuth` extractor
//! - `internal_auth` - Shared-key or loopback guard for `/api/internal`
//! - `require_subscription` - 402 gate for premium routes

pub mod auth;
pub mod internal_auth;
pub mod require_subscription;

pub use auth::{auth_middleware, bearer_token, AuthRejection, AuthState, RequireAuth};
pub use internal_auth::{internal_auth, InternalAuthState, INTERNAL_KEY_HEADER};
pub use require_subscription::{require_subscription, SubscriptionGateState};
