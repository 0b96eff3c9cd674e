//! HTTP integration tests for the assembled router.
//!
//! Requests go through `api_router` with in-memory adapters, so routing,
//! middleware and response shapes are exercised together:
//! 1. Internal key enforcement
//! 2. Relay admission lifecycle
//! 3. Relay subscription checks
//! 4. Gateway callback and submit page
//! 5. User-facing plan and order endpoints

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration as ChronoDuration;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use relay_billing::adapters::auth::MockTokenValidator;
use relay_billing::adapters::epay::MockPaymentGateway;
use relay_billing::adapters::http::{api_router, ApiDependencies};
use relay_billing::adapters::memory::{InMemoryBillingStore, InMemoryDeviceDirectory};
use relay_billing::adapters::relay::InMemoryRelayWhitelist;
use relay_billing::adapters::settings::StaticPaymentSettings;
use relay_billing::domain::billing::{
    BillingPeriod, GatewayParams, Money, OrderNumber, OrderStatus, Plan, Subscription,
};
use relay_billing::domain::foundation::{Timestamp, UserId};
use relay_billing::domain::relay::AdmissionLimits;
use relay_billing::ports::{BillingStore, PaymentSettings};

// =============================================================================
// Test Infrastructure
// =============================================================================

const INTERNAL_KEY: &str = "relay-shared-key";

fn payment_settings(enabled: bool) -> PaymentSettings {
    PaymentSettings {
        enabled,
        gateway_url: "https://pay.example.com".to_string(),
        merchant_id: "1001".to_string(),
        merchant_key: SecretString::new("http-test-key".to_string()),
        notify_url: None,
        return_url: None,
        timeout: Duration::from_secs(5),
        submit_debounce: ChronoDuration::seconds(3),
        pending_stale_after: ChronoDuration::minutes(30),
    }
}

fn monthly() -> Plan {
    Plan::new("monthly", "Monthly", Money::from_minor(999), BillingPeriod::months(1)).unwrap()
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryBillingStore>,
    devices: Arc<InMemoryDeviceDirectory>,
}

impl TestApp {
    async fn new(enabled: bool, plans: Vec<Plan>) -> Self {
        let store = Arc::new(InMemoryBillingStore::with_plans(plans).await);
        let devices = Arc::new(InMemoryDeviceDirectory::new());
        let tokens = MockTokenValidator::new()
            .with_test_user("alice-token", "alice")
            .with_test_user("bob-token", "bob");

        let router = api_router(ApiDependencies {
            store: store.clone(),
            settings: Arc::new(StaticPaymentSettings::new(payment_settings(enabled))),
            gateway: Arc::new(MockPaymentGateway::new()),
            whitelist: Arc::new(InMemoryRelayWhitelist::new()),
            limits: AdmissionLimits::default(),
            tokens: Arc::new(tokens),
            devices: devices.clone(),
            internal_key: Some(SecretString::new(INTERNAL_KEY.to_string())),
            request_timeout: Duration::from_secs(5),
        });

        Self {
            router,
            store,
            devices,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn internal(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/internal{}", path))
            .header("X-Internal-Key", INTERNAL_KEY)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

async fn subscribe(store: &InMemoryBillingStore, user_id: &str, plan: &Plan) {
    let subscription = Subscription::grant(
        None,
        user(user_id),
        plan.id,
        None,
        plan.period,
        Timestamp::now(),
    )
    .unwrap();
    store.put_subscription(subscription).await;
}

// =============================================================================
// Internal Key
// =============================================================================

#[tokio::test]
async fn internal_routes_reject_missing_and_wrong_keys() {
    let app = TestApp::new(true, vec![]).await;

    for key in [None, Some("wrong-key")] {
        let mut builder = Request::builder().method("GET").uri("/api/internal/relay/stats");
        if let Some(key) = key {
            builder = builder.header("X-Internal-Key", key);
        }
        let response = app.send(builder.body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["code"], 403);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let app = TestApp::new(true, vec![]).await;
    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, "ok");
}

// =============================================================================
// Relay Admission
// =============================================================================

#[tokio::test]
async fn allowed_session_admits_exactly_its_slots() {
    let app = TestApp::new(true, vec![]).await;

    let (status, allow) = app
        .internal("/relay/allow", json!({"uuid": "sess-1", "slots": 2, "ttl_sec": 60}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(allow["slots"], 2);
    assert_eq!(allow["ttl_sec"], 60);

    let mut admitted = Vec::new();
    for _ in 0..3 {
        let (_, consume) = app.internal("/relay/consume", json!({"uuid": "sess-1"})).await;
        admitted.push(consume["allowed"].as_bool().unwrap());
    }
    assert_eq!(admitted, vec![true, true, false]);
}

#[tokio::test]
async fn allow_clamps_requested_values() {
    let app = TestApp::new(true, vec![]).await;

    let (_, body) = app
        .internal("/relay/allow", json!({"uuid": "sess-2", "slots": 500, "ttl_sec": -3}))
        .await;

    let limits = AdmissionLimits::default();
    assert_eq!(body["slots"], limits.max_slots);
    assert_eq!(body["ttl_sec"], limits.default_ttl.as_secs());
}

#[tokio::test]
async fn session_id_is_validated() {
    let app = TestApp::new(true, vec![]).await;

    let (empty, _) = app.internal("/relay/allow", json!({"uuid": ""})).await;
    let (long, body) = app
        .internal("/relay/consume", json!({"uuid": "x".repeat(129)}))
        .await;

    assert_eq!(empty, StatusCode::BAD_REQUEST);
    assert_eq!(long, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_SESSION_ID");
}

#[tokio::test]
async fn stats_count_live_sessions() {
    let app = TestApp::new(true, vec![]).await;
    app.internal("/relay/allow", json!({"uuid": "a"})).await;
    app.internal("/relay/allow", json!({"uuid": "b"})).await;

    let request = Request::builder()
        .uri("/api/internal/relay/stats")
        .header("X-Internal-Key", INTERNAL_KEY)
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.send(request).await).await;

    assert_eq!(body["count"], 2);
}

// =============================================================================
// Subscription Check
// =============================================================================

#[tokio::test]
async fn check_reports_active_subscriber_by_token() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;
    subscribe(&app.store, "alice", &plan).await;

    let (status, body) = app
        .internal("/subscription/check", json!({"token": "alice-token"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
    assert_eq!(body["payment_enabled"], true);
    assert_eq!(body["user_id"], "alice");
}

#[tokio::test]
async fn check_falls_back_to_device_owner() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;
    subscribe(&app.store, "bob", &plan).await;
    app.devices.register("device-7", user("bob")).await;

    let (_, body) = app
        .internal(
            "/subscription/check",
            json!({"token": "expired-token", "uuid": "device-7"}),
        )
        .await;

    assert_eq!(body["active"], true);
    assert_eq!(body["user_id"], "bob");
}

#[tokio::test]
async fn check_unknown_user_is_inactive() {
    let app = TestApp::new(true, vec![]).await;

    let (_, body) = app.internal("/subscription/check", json!({})).await;

    assert_eq!(body["active"], false);
    assert_eq!(body["reason"], "user_not_found");
}

#[tokio::test]
async fn check_with_billing_off_lets_everyone_through() {
    let app = TestApp::new(false, vec![]).await;

    let (_, body) = app.internal("/subscription/check", json!({})).await;

    assert_eq!(body["active"], true);
    assert_eq!(body["payment_enabled"], false);
    assert_eq!(body["reason"], "payment_disabled");
}

// =============================================================================
// Gateway Endpoints
// =============================================================================

async fn open_order(app: &TestApp, plan: &Plan) -> OrderNumber {
    let request = Request::builder()
        .method("POST")
        .uri("/api/subscription/orders")
        .header(header::AUTHORIZATION, "Bearer alice-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"plan_id": plan.id}).to_string()))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body["pay_url"],
        format!("/api/payment/submit?out_trade_no={}", body["out_trade_no"].as_str().unwrap())
    );
    OrderNumber::parse(body["out_trade_no"].as_str().unwrap()).unwrap()
}

fn form_body(params: &GatewayParams) -> String {
    // Every value here is URL-safe: digits, ASCII letters, '.', '-' and hex.
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn signed_callback(order_number: &OrderNumber, money: &str) -> GatewayParams {
    let mut params = GatewayParams::new();
    params.insert("pid".into(), "1001".into());
    params.insert("out_trade_no".into(), order_number.to_string());
    params.insert("trade_no".into(), "GW-123".into());
    params.insert("money".into(), money.into());
    params.insert("trade_status".into(), "TRADE_SUCCESS".into());
    payment_settings(true).signature_engine().signed(params)
}

async fn post_notify(app: &TestApp, params: &GatewayParams) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form_body(params)))
        .unwrap();
    let response = app.send(request).await;
    let status = response.status();
    (status, text_body(response).await)
}

#[tokio::test]
async fn notify_acknowledges_valid_callback_and_activates() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;
    let order_number = open_order(&app, &plan).await;

    let (status, body) = post_notify(&app, &signed_callback(&order_number, "9.99")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "success");
    let order = app.store.find_order_by_number(&order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let status = json_body(app.get("/api/subscription/status", Some("alice-token")).await).await;
    assert_eq!(status["active"], true);
    assert_eq!(status["payment_enabled"], true);
}

#[tokio::test]
async fn notify_answers_fail_for_tampered_callback() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;
    let order_number = open_order(&app, &plan).await;

    let mut params = signed_callback(&order_number, "9.99");
    params.insert("money".into(), "0.01".into());
    let (status, body) = post_notify(&app, &params).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fail");
}

#[tokio::test]
async fn notify_by_query_string_is_accepted() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;
    let order_number = open_order(&app, &plan).await;

    let query = form_body(&signed_callback(&order_number, "9.99"));
    let response = app.get(&format!("/api/payment/notify?{}", query), None).await;

    assert_eq!(text_body(response).await, "success");
}

#[tokio::test]
async fn submit_page_is_not_cached() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;
    let order_number = open_order(&app, &plan).await;

    let response = app
        .get(&format!("/api/payment/submit?out_trade_no={}", order_number), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let html = text_body(response).await;
    assert!(html.contains("https://pay.example.com/pay/submit.php"));
    assert!(html.contains(order_number.as_str()));
}

#[tokio::test]
async fn submit_without_order_number_is_bad_request() {
    let app = TestApp::new(true, vec![]).await;

    let response = app.get("/api/payment/submit?out_trade_no=%20", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_for_unknown_order_is_not_found() {
    let app = TestApp::new(true, vec![]).await;

    let response = app.get("/api/payment/submit?out_trade_no=RD-nope", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// User Endpoints
// =============================================================================

#[tokio::test]
async fn plans_are_public() {
    let app = TestApp::new(true, vec![monthly()]).await;

    let response = app.get("/api/subscription/plans", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["plans"][0]["code"], "monthly");
    assert_eq!(body["plans"][0]["price_decimal"], "9.99");
}

#[tokio::test]
async fn ordering_requires_a_user() {
    let plan = monthly();
    let app = TestApp::new(true, vec![plan.clone()]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/subscription/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"plan_id": plan.id}).to_string()))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ordering_unknown_plan_is_not_found() {
    let app = TestApp::new(true, vec![]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/subscription/orders")
        .header(header::AUTHORIZATION, "Bearer alice-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"plan_id": monthly().id}).to_string()))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
