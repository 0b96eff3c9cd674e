//! Caller identity as resolved from a bearer token, independent of the token
//! format.

use super::UserId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,

    /// Administrators bypass the subscription gate.
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn new(id: UserId) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: UserId) -> Self {
        Self { id, is_admin: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Malformed, wrongly signed or missing its subject.
    #[error("token rejected")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    /// Validation could not run at all (key missing, backend down).
    #[error("token validation unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
