//! Assembles the full HTTP surface.
//!
//! ```text
//! /health                   liveness probe
//! /api/subscription/*       user endpoints        (auth_middleware)
//! /api/payment/*            gateway endpoints     (signature / order number)
//! /api/internal/*           relay + operator API  (internal_auth)
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use secrecy::SecretString;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::billing::{billing_router, BillingAppState};
use super::internal::{internal_routes, InternalAppState};
use super::middleware::{auth_middleware, internal_auth, AuthState, InternalAuthState};
use crate::domain::relay::AdmissionLimits;
use crate::ports::{
    BillingStore, DeviceDirectory, PaymentGateway, PaymentSettingsProvider, RelayWhitelist,
    TokenValidator,
};

/// Everything the routers need, already built.
#[derive(Clone)]
pub struct ApiDependencies {
    pub store: Arc<dyn BillingStore>,
    pub settings: Arc<dyn PaymentSettingsProvider>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub whitelist: Arc<dyn RelayWhitelist>,
    pub limits: AdmissionLimits,
    pub tokens: Arc<dyn TokenValidator>,
    pub devices: Arc<dyn DeviceDirectory>,
    /// `None` restricts the internal API to loopback peers.
    pub internal_key: Option<SecretString>,
    pub request_timeout: Duration,
}

pub fn api_router(deps: ApiDependencies) -> Router {
    let auth_state: AuthState = deps.tokens.clone();
    let billing = billing_router()
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(BillingAppState::new(deps.store.clone(), deps.settings.clone()));

    let internal = internal_routes()
        .layer(middleware::from_fn_with_state(
            InternalAuthState::new(deps.internal_key.clone()),
            internal_auth,
        ))
        .with_state(InternalAppState {
            whitelist: deps.whitelist,
            limits: deps.limits,
            store: deps.store,
            settings: deps.settings,
            gateway: deps.gateway,
            tokens: deps.tokens,
            devices: deps.devices,
        });

    let api = Router::new().merge(billing).nest("/internal", internal);

    Router::new()
        .nest("/api", api)
        .layer(TimeoutLayer::new(deps.request_timeout))
        .layer(TraceLayer::new_for_http())
        .route("/health", get(|| async { "ok" }))
}
