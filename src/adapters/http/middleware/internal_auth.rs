//! Guard for the `/api/internal` surface used by the relay server and operators.
//!
//! With a configured key, the `X-Internal-Key` header must match it. Without
//! one, only loopback peers get through. Proxy headers are never consulted;
//! the peer address comes from `ConnectInfo`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

pub const INTERNAL_KEY_HEADER: &str = "X-Internal-Key";

#[derive(Clone, Default)]
pub struct InternalAuthState {
    key: Option<Arc<SecretString>>,
}

impl InternalAuthState {
    pub fn new(key: Option<SecretString>) -> Self {
        Self {
            key: key.map(Arc::new),
        }
    }

    fn key_matches(&self, presented: Option<&str>) -> bool {
        match (&self.key, presented) {
            (Some(key), Some(presented)) => key
                .expose_secret()
                .as_bytes()
                .ct_eq(presented.as_bytes())
                .into(),
            _ => false,
        }
    }
}

pub async fn internal_auth(
    State(state): State<InternalAuthState>,
    request: Request,
    next: Next,
) -> Response {
    if state.key.is_some() {
        let presented = request
            .headers()
            .get(INTERNAL_KEY_HEADER)
            .and_then(|h| h.to_str().ok());
        if state.key_matches(presented) {
            return next.run(request).await;
        }
        tracing::warn!(path = %request.uri().path(), "internal call with bad or missing key");
        return forbidden("Forbidden: invalid or missing X-Internal-Key");
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    match peer {
        Some(ip) if ip.is_loopback() => next.run(request).await,
        _ => {
            tracing::warn!(peer = ?peer, "internal call from non-loopback peer without key");
            forbidden("Forbidden: internal API requires X-Internal-Key or localhost access")
        }
    }
}

fn forbidden(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "code": 403, "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(state: InternalAuthState) -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(state, internal_auth))
    }

    fn request(key: Option<&str>, peer: Option<&str>) -> http::Request<Body> {
        let mut builder = http::Request::builder().uri("/ping");
        if let Some(key) = key {
            builder = builder.header(INTERNAL_KEY_HEADER, key);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    fn keyed() -> InternalAuthState {
        InternalAuthState::new(Some(SecretString::new("s3cret".to_string())))
    }

    #[tokio::test]
    async fn correct_key_is_accepted_from_anywhere() {
        let response = app(keyed())
            .oneshot(request(Some("s3cret"), Some("203.0.113.9:5000")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_key_is_rejected_even_from_loopback() {
        let response = app(keyed())
            .oneshot(request(Some("s3cre"), Some("127.0.0.1:5000")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_key_is_rejected_when_configured() {
        let response = app(keyed())
            .oneshot(request(None, Some("127.0.0.1:5000")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn keyless_mode_allows_loopback_only() {
        let open = InternalAuthState::default();
        let v4 = app(open.clone())
            .oneshot(request(None, Some("127.0.0.1:5000")))
            .await
            .unwrap();
        let v6 = app(open.clone())
            .oneshot(request(None, Some("[::1]:5000")))
            .await
            .unwrap();
        let lan = app(open.clone())
            .oneshot(request(None, Some("192.168.1.20:5000")))
            .await
            .unwrap();
        let unknown = app(open).oneshot(request(None, None)).await.unwrap();

        assert_eq!(v4.status(), StatusCode::OK);
        assert_eq!(v6.status(), StatusCode::OK);
        assert_eq!(lan.status(), StatusCode::FORBIDDEN);
        assert_eq!(unknown.status(), StatusCode::FORBIDDEN);
    }
}
