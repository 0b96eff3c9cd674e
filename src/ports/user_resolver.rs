//! User resolution ports.
//!
//! Two ways to arrive at a user id:
//! - a bearer token, validated by a `TokenValidator`
//! - a device identifier reported by the relay client, looked up in a
//!   `DeviceDirectory`
//!
//! # Contract
//!
//! `TokenValidator` implementations must:
//! - Verify the token signature and expiry
//! - Return `AuthError::InvalidToken` for malformed or badly signed tokens
//! - Return `AuthError::TokenExpired` for expired tokens
//! - Return `AuthError::ServiceUnavailable` for transient errors

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, DomainError, UserId};

/// Validates bearer tokens and extracts the user behind them.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Maps relay device identifiers to their owning user.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Returns `None` when the device is unknown.
    async fn owner_of(&self, device_id: &str) -> Result<Option<UserId>, DomainError>;
}
