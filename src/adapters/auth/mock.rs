//! Mock token validator for testing.
//!
//! Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
//!
//! # Example
//!
//! ```ignore
//! let validator = MockTokenValidator::new()
//!     .with_test_user("valid-token", "user-123")
//!     .with_admin("admin-token", "root");
//! ```

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::TokenValidator;

#[derive(Debug, Default, Clone)]
pub struct MockTokenValidator {
    tokens: HashMap<String, AuthenticatedUser>,
    /// Returned for every validation when set.
    force_error: Option<AuthError>,
}

impl MockTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }

    /// Adds a regular user. Panics on a blank id, so only for tests.
    pub fn with_test_user(self, token: impl Into<String>, user_id: &str) -> Self {
        let user = AuthenticatedUser::new(UserId::new(user_id).expect("test user id"));
        self.with_user(token, user)
    }

    pub fn with_admin(self, token: impl Into<String>, user_id: &str) -> Self {
        let user = AuthenticatedUser::admin(UserId::new(user_id).expect("test user id"));
        self.with_user(token, user)
    }

    pub fn with_error(mut self, error: AuthError) -> Self {
        self.force_error = Some(error);
        self
    }
}

#[async_trait]
impl TokenValidator for MockTokenValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = &self.force_error {
            return Err(error.clone());
        }

        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
