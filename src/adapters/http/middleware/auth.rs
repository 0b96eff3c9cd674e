//! Bearer tokens on user-facing routes.
//!
//! `auth_middleware` resolves `Authorization: Bearer <token>` through the
//! `TokenValidator` port and stores the `AuthenticatedUser` in the request
//! extensions. Handlers that need a user take the `RequireAuth` extractor;
//! routes that don't (plan listing, gateway endpoints) share the same layer.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::TokenValidator;

pub type AuthState = Arc<dyn TokenValidator>;

/// Token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn auth_failure(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (status, Json(json!({ "error": message, "code": code }))).into_response()
}

/// No token: the request continues anonymously. A token that fails
/// validation is answered here and never reaches the handler.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return next.run(request).await;
    };

    match validator.validate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(AuthError::TokenExpired) => {
            auth_failure(StatusCode::UNAUTHORIZED, "AUTH_ERROR", "Token expired")
        }
        Err(AuthError::InvalidToken) => {
            auth_failure(StatusCode::UNAUTHORIZED, "AUTH_ERROR", "Invalid token")
        }
        Err(AuthError::ServiceUnavailable(reason)) => {
            tracing::error!(%reason, "token validation unavailable");
            auth_failure(
                StatusCode::SERVICE_UNAVAILABLE,
                "AUTH_ERROR",
                "Authentication service unavailable",
            )
        }
    }
}

/// The caller's identity; 401 when the request carried no valid token.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(user) => Ok(RequireAuth(user.clone())),
            None => Err(AuthRejection::Unauthenticated),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => auth_failure(
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication required",
            ),
        }
    }
}
