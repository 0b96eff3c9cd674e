//! Adapters - Implementations of port interfaces.
//!
//! - `auth` - Token validators (JWT, mock)
//! - `epay` - Payment gateway client and submit page
//! - `http` - axum routers
//! - `memory` - In-memory stores for tests and local runs
//! - `postgres` - sqlx-backed stores
//! - `relay` - Admission whitelist and its sweeper
//! - `settings` - Payment settings providers

pub mod auth;
pub mod epay;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod relay;
pub mod settings;
