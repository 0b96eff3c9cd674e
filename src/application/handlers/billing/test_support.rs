//! Fixtures shared by the billing handler tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use secrecy::SecretString;

use crate::adapters::memory::InMemoryBillingStore;
use crate::adapters::settings::StaticPaymentSettings;
use crate::domain::billing::{BillingPeriod, GatewayParams, Money, Plan};
use crate::domain::foundation::UserId;
use crate::ports::PaymentSettings;

pub const MERCHANT_ID: &str = "1001";
pub const MERCHANT_KEY: &str = "merchant-secret";

pub fn settings(enabled: bool) -> PaymentSettings {
    PaymentSettings {
        enabled,
        gateway_url: "https://pay.example.com".to_string(),
        merchant_id: MERCHANT_ID.to_string(),
        merchant_key: SecretString::new(MERCHANT_KEY.to_string()),
        notify_url: Some("https://api.example.com/api/payment/notify".to_string()),
        return_url: None,
        timeout: Duration::from_secs(15),
        submit_debounce: ChronoDuration::seconds(3),
        pending_stale_after: ChronoDuration::minutes(30),
    }
}

pub fn provider(enabled: bool) -> Arc<StaticPaymentSettings> {
    Arc::new(StaticPaymentSettings::new(settings(enabled)))
}

pub fn monthly_plan() -> Plan {
    Plan::new("monthly", "Monthly", Money::from_minor(999), BillingPeriod::months(1)).unwrap()
}

pub fn free_plan() -> Plan {
    Plan::new("trial", "Trial", Money::ZERO, BillingPeriod::days(7)).unwrap()
}

pub fn user() -> UserId {
    UserId::new("user-42").unwrap()
}

pub async fn store_with(plans: impl IntoIterator<Item = Plan>) -> Arc<InMemoryBillingStore> {
    Arc::new(InMemoryBillingStore::with_plans(plans).await)
}

/// A correctly signed success callback for `order_number` paying `money`.
pub fn signed_callback(order_number: &str, trade_no: &str, money: &str) -> GatewayParams {
    let mut params = GatewayParams::new();
    params.insert("pid".into(), MERCHANT_ID.into());
    params.insert("out_trade_no".into(), order_number.into());
    params.insert("trade_no".into(), trade_no.into());
    params.insert("money".into(), money.into());
    params.insert("trade_status".into(), "TRADE_SUCCESS".into());
    params.insert("type".into(), "alipay".into());
    settings(true).signature_engine().signed(params)
}
