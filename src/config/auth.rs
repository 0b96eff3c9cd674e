//! Authentication configuration

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Secrets for user tokens and trusted internal callers.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// HS256 secret shared with the account service
    #[serde(default)]
    pub jwt_secret: String,

    /// Shared key expected in `X-Internal-Key`. When unset, internal routes
    /// only accept loopback peers.
    pub internal_api_key: Option<String>,
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> SecretString {
        SecretString::new(self.jwt_secret.clone())
    }

    pub fn internal_api_key(&self) -> Option<SecretString> {
        self.internal_api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::new(key.clone()))
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && self.jwt_secret.len() < 32 {
            return Err(ValidationError::WeakJwtSecret);
        }
        Ok(())
    }
}
