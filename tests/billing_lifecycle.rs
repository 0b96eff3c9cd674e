//! End-to-end billing flows through the application handlers.
//!
//! Everything runs against the in-memory store and gateway, so these tests
//! exercise the same transaction boundaries the Postgres adapter provides:
//! 1. Order creation, submission and payment callback
//! 2. Callback replays and tampering
//! 3. Renewal stacking and concurrent activations for one user
//! 4. Refunds and reconciliation against the gateway

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use secrecy::SecretString;

use relay_billing::adapters::epay::MockPaymentGateway;
use relay_billing::adapters::memory::InMemoryBillingStore;
use relay_billing::adapters::settings::StaticPaymentSettings;
use relay_billing::application::handlers::{
    CheckAccessHandler, CheckAccessQuery, CreateOrderCommand, CreateOrderHandler,
    HandleNotifyCommand, HandleNotifyHandler, NotifyOutcome, PrepareSubmissionCommand,
    PrepareSubmissionHandler, ReconcileOrderCommand, ReconcileOrderHandler, RefundOrderCommand,
    RefundOrderHandler, SubmissionOutcome,
};
use relay_billing::domain::billing::{
    BillingError, BillingPeriod, GatewayParams, Money, OrderNumber, OrderStatus, Plan,
    SubscriptionStatus,
};
use relay_billing::domain::foundation::{Timestamp, UserId};
use relay_billing::ports::{BillingStore, GatewayOrderState, PaymentSettings};

// =============================================================================
// Test Infrastructure
// =============================================================================

const MERCHANT_ID: &str = "1001";
const MERCHANT_KEY: &str = "integration-key";

fn settings() -> PaymentSettings {
    PaymentSettings {
        enabled: true,
        gateway_url: "https://pay.example.com".to_string(),
        merchant_id: MERCHANT_ID.to_string(),
        merchant_key: SecretString::new(MERCHANT_KEY.to_string()),
        notify_url: Some("https://api.example.com/api/payment/notify".to_string()),
        return_url: Some("https://app.example.com/billing".to_string()),
        timeout: Duration::from_secs(15),
        submit_debounce: ChronoDuration::seconds(3),
        pending_stale_after: ChronoDuration::minutes(30),
    }
}

fn monthly() -> Plan {
    Plan::new("monthly", "Monthly", Money::from_minor(999), BillingPeriod::months(1)).unwrap()
}

fn trial() -> Plan {
    Plan::new("trial", "Trial", Money::ZERO, BillingPeriod::days(7)).unwrap()
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

struct Harness {
    store: Arc<InMemoryBillingStore>,
    gateway: Arc<MockPaymentGateway>,
    settings: Arc<StaticPaymentSettings>,
}

impl Harness {
    async fn new(plans: Vec<Plan>) -> Self {
        Self {
            store: Arc::new(InMemoryBillingStore::with_plans(plans).await),
            gateway: Arc::new(MockPaymentGateway::new()),
            settings: Arc::new(StaticPaymentSettings::new(settings())),
        }
    }

    fn create(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(self.store.clone(), self.settings.clone())
    }

    fn submit(&self) -> PrepareSubmissionHandler {
        PrepareSubmissionHandler::new(self.store.clone(), self.settings.clone())
    }

    fn notify(&self) -> HandleNotifyHandler {
        HandleNotifyHandler::new(self.store.clone(), self.settings.clone())
    }

    fn refund(&self) -> RefundOrderHandler {
        RefundOrderHandler::new(self.store.clone(), self.gateway.clone(), self.settings.clone())
    }

    fn reconcile(&self) -> ReconcileOrderHandler {
        ReconcileOrderHandler::new(self.store.clone(), self.gateway.clone(), self.settings.clone())
    }

    fn access(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.store.clone(), self.settings.clone())
    }

    async fn open_order(&self, plan: &Plan) -> OrderNumber {
        self.create()
            .handle(CreateOrderCommand {
                user_id: alice(),
                plan_id: plan.id,
            })
            .await
            .unwrap()
            .order_number
    }
}

/// What the gateway posts back after a successful payment.
fn callback(order_number: &OrderNumber, trade_no: &str, money: &str) -> HandleNotifyCommand {
    let mut params = GatewayParams::new();
    params.insert("pid".into(), MERCHANT_ID.into());
    params.insert("out_trade_no".into(), order_number.to_string());
    params.insert("trade_no".into(), trade_no.into());
    params.insert("money".into(), money.into());
    params.insert("trade_status".into(), "TRADE_SUCCESS".into());
    params.insert("type".into(), "alipay".into());
    HandleNotifyCommand {
        params: settings().signature_engine().signed(params),
    }
}

// =============================================================================
// Purchase Flow
// =============================================================================

#[tokio::test]
async fn paying_999_minor_units_activates_one_month() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let before = Timestamp::now();

    let order_number = h.open_order(&plan).await;

    let SubmissionOutcome::Ready { params, reissued, .. } = h
        .submit()
        .handle(PrepareSubmissionCommand {
            order_number: order_number.clone(),
        })
        .await
        .unwrap()
    else {
        panic!("expected a ready submission");
    };
    assert!(!reissued);
    assert_eq!(params.get("money").map(String::as_str), Some("9.99"));
    assert!(settings().signature_engine().verify(&params));

    let outcome = h
        .notify()
        .handle(callback(&order_number, "T-1", "9.99"))
        .await
        .unwrap();
    assert!(matches!(outcome, NotifyOutcome::Applied { .. }));

    let order = h.store.find_order_by_number(&order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.amount, Money::from_minor(999));

    let access = h.access().handle(CheckAccessQuery { user_id: alice() }).await.unwrap();
    assert!(access.active);
    let subscription = access.subscription.unwrap();
    assert_eq!(subscription.last_order_id, Some(order.id));
    assert_eq!(
        subscription.expires_at,
        BillingPeriod::months(1).extend(subscription.started_at).unwrap()
    );
    assert!(!subscription.started_at.is_before(&before));
}

#[tokio::test]
async fn repeated_checkout_reuses_unsubmitted_order() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;

    let first = h.open_order(&plan).await;
    let second = h.open_order(&plan).await;

    assert_eq!(first, second);
    assert_eq!(h.store.orders_for(&alice()).await.len(), 1);
}

#[tokio::test]
async fn free_plan_activates_without_gateway() {
    let plan = trial();
    let h = Harness::new(vec![plan.clone()]).await;

    let result = h
        .create()
        .handle(CreateOrderCommand {
            user_id: alice(),
            plan_id: plan.id,
        })
        .await
        .unwrap();

    assert!(result.pay_url.is_none());
    assert_eq!(result.subscription.unwrap().status, SubscriptionStatus::Active);
    assert_eq!(h.gateway.query_count().await, 0);
}

// =============================================================================
// Callback Integrity
// =============================================================================

#[tokio::test]
async fn replayed_callbacks_extend_only_once() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let order_number = h.open_order(&plan).await;

    h.notify().handle(callback(&order_number, "T-1", "9.99")).await.unwrap();
    let order_once = h.store.find_order_by_number(&order_number).await.unwrap().unwrap();
    let once = h.store.find_subscription(&alice()).await.unwrap().unwrap();
    assert!(order_once.paid_at.is_some());

    for _ in 0..3 {
        let replay = h.notify().handle(callback(&order_number, "T-1", "9.99")).await.unwrap();
        assert_eq!(replay, NotifyOutcome::AlreadyProcessed);
    }

    let order_after = h.store.find_order_by_number(&order_number).await.unwrap().unwrap();
    assert_eq!(order_after, order_once);
    assert_eq!(order_after.paid_at, order_once.paid_at);
    assert_eq!(h.store.find_subscription(&alice()).await.unwrap().unwrap(), once);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_duplicate_callbacks_apply_once() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let order_number = h.open_order(&plan).await;
    let notify = Arc::new(h.notify());

    let deliveries: Vec<_> = (0..8)
        .map(|_| {
            let notify = notify.clone();
            let command = callback(&order_number, "T-1", "9.99");
            tokio::spawn(async move { notify.handle(command).await })
        })
        .collect();

    let mut applied = 0;
    for delivery in deliveries {
        match delivery.await.unwrap().unwrap() {
            NotifyOutcome::Applied { .. } => applied += 1,
            NotifyOutcome::AlreadyProcessed => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(applied, 1);

    let order = h.store.find_order_by_number(&order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    let subscription = h.store.find_subscription(&alice()).await.unwrap().unwrap();
    let one_month = BillingPeriod::months(1).extend(subscription.started_at).unwrap();
    assert_eq!(subscription.expires_at, one_month);
}

#[tokio::test]
async fn underpayment_is_rejected_and_order_stays_pending() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let order_number = h.open_order(&plan).await;

    let err = h
        .notify()
        .handle(callback(&order_number, "T-1", "9.98"))
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::AmountMismatch { .. }));
    let order = h.store.find_order_by_number(&order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(h.store.find_subscription(&alice()).await.unwrap().is_none());
}

#[tokio::test]
async fn callback_signed_with_another_key_is_rejected() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let order_number = h.open_order(&plan).await;

    let mut forged = settings();
    forged.merchant_key = SecretString::new("attacker".to_string());
    let mut params = callback(&order_number, "T-1", "9.99").params;
    params.remove("sign");
    let params = forged.signature_engine().signed(params);

    let err = h.notify().handle(HandleNotifyCommand { params }).await.unwrap_err();
    assert_eq!(err, BillingError::InvalidSignature);
}

// =============================================================================
// Renewal Stacking
// =============================================================================

#[tokio::test]
async fn second_purchase_stacks_on_remaining_time() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;

    let first = h.open_order(&plan).await;
    h.notify().handle(callback(&first, "T-1", "9.99")).await.unwrap();
    let after_first = h.store.find_subscription(&alice()).await.unwrap().unwrap();

    let second = h.open_order(&plan).await;
    assert_ne!(first, second);
    h.notify().handle(callback(&second, "T-2", "9.99")).await.unwrap();
    let after_second = h.store.find_subscription(&alice()).await.unwrap().unwrap();

    assert_eq!(after_second.id, after_first.id);
    assert_eq!(after_second.started_at, after_first.started_at);
    assert_eq!(
        after_second.expires_at,
        BillingPeriod::months(1).extend(after_first.expires_at).unwrap()
    );
}

#[tokio::test]
async fn concurrent_activations_for_one_user_both_count() {
    let paid = monthly();
    let free = trial();
    let h = Harness::new(vec![paid.clone(), free.clone()]).await;
    let order_number = h.open_order(&paid).await;

    let notify = h.notify();
    let create = h.create();
    let (paid_outcome, free_outcome) = tokio::join!(
        notify.handle(callback(&order_number, "T-1", "9.99")),
        create.handle(CreateOrderCommand {
            user_id: alice(),
            plan_id: free.id,
        }),
    );
    paid_outcome.unwrap();
    free_outcome.unwrap();

    let subscription = h.store.find_subscription(&alice()).await.unwrap().unwrap();
    let one_month = BillingPeriod::months(1).extend(subscription.started_at).unwrap();
    // Both grants landed on the same row: a month plus a week, in either order.
    assert!(subscription.expires_at.is_after(&one_month));
    assert!(!subscription
        .expires_at
        .is_after(&one_month.plus(ChronoDuration::days(8))));
}

// =============================================================================
// Refund and Reconcile
// =============================================================================

#[tokio::test]
async fn refund_marks_order_and_cancels_subscription() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let order_number = h.open_order(&plan).await;
    h.notify().handle(callback(&order_number, "T-9", "9.99")).await.unwrap();
    let order = h.store.find_order_by_number(&order_number).await.unwrap().unwrap();

    let result = h
        .refund()
        .handle(RefundOrderCommand {
            order_id: order.id,
            reason: "customer request".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.order.status, OrderStatus::Refunded);
    assert!(result.subscription_canceled);
    let refunds = h.gateway.refunds().await;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].trade_number, "T-9");
    assert_eq!(refunds[0].amount, Money::from_minor(999));
    assert!(!h.access().is_active(&alice()).await.unwrap());
}

#[tokio::test]
async fn reconcile_applies_missed_callback_once() {
    let plan = monthly();
    let h = Harness::new(vec![plan.clone()]).await;
    let order_number = h.open_order(&plan).await;
    h.gateway
        .set_order(GatewayOrderState {
            order_number: order_number.to_string(),
            trade_number: Some("T-42".to_string()),
            money: "9.99".to_string(),
            paid: true,
            payment_type: Some("wxpay".to_string()),
        })
        .await;

    let first = h
        .reconcile()
        .handle(ReconcileOrderCommand {
            order_number: order_number.clone(),
        })
        .await
        .unwrap();
    let late_callback = h
        .notify()
        .handle(callback(&order_number, "T-42", "9.99"))
        .await
        .unwrap();

    assert!(first.applied);
    assert_eq!(first.status, OrderStatus::Paid);
    assert_eq!(late_callback, NotifyOutcome::AlreadyProcessed);
    assert!(h.access().is_active(&alice()).await.unwrap());
}
