//! HS256 bearer-token validator.
//!
//! Tokens are issued by the account service with a shared secret. The `sub`
//! claim carries the user id; an optional `admin` claim marks administrators.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::TokenValidator;

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    /// Subject - the user ID
    sub: String,

    /// Expiry timestamp (Unix epoch seconds)
    exp: i64,

    #[serde(default)]
    admin: bool,
}

pub struct JwtTokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })?;

        let claims = data.claims;
        let user_id = UserId::new(claims.sub).map_err(|_| {
            tracing::warn!("Token carries an empty subject");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser {
            id: user_id,
            is_admin: claims.admin,
        })
    }
}

impl std::fmt::Debug for JwtTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-signing-secret";

    fn issue(sub: &str, exp_offset_secs: i64, admin: bool) -> String {
        let claims = AccessClaims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
            admin,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn validator() -> JwtTokenValidator {
        JwtTokenValidator::new(&SecretString::new(SECRET.to_string()))
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let user = validator().validate(&issue("user-1", 3600, false)).await.unwrap();
        assert_eq!(user.id.as_str(), "user-1");
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn admin_claim_is_carried() {
        let user = validator().validate(&issue("root", 3600, true)).await.unwrap();
        assert!(user.is_admin);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let result = validator().validate(&issue("user-1", -3600, false)).await;
        assert_eq!(result, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let other = JwtTokenValidator::new(&SecretString::new("different".to_string()));
        let result = other.validate(&issue("user-1", 3600, false)).await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        assert_eq!(validator().validate("not-a-jwt").await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let result = validator().validate(&issue("  ", 3600, false)).await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }
}
