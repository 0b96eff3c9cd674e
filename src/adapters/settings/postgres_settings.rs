//! Operator-editable payment settings.
//!
//! The admin console stores a JSON document under `payment.epay.config`:
//!
//! ```json
//! {"enable": true, "base_url": "https://pay.example.com", "pid": "1001",
//!  "key": "...", "notify_url": "", "return_url": "", "timeout": 15}
//! ```
//!
//! Each present, non-empty field replaces the configured default. The row is
//! read on every call, so toggling `enable` or rotating `key` applies to the
//! next request.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::PgPool;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{PaymentSettings, PaymentSettingsProvider};

/// `system_settings.key` of the payment document.
pub const PAYMENT_SETTINGS_KEY: &str = "payment.epay.config";

#[derive(Debug, Default, Deserialize)]
struct StoredPaymentSettings {
    enable: Option<bool>,
    base_url: Option<String>,
    pid: Option<String>,
    key: Option<String>,
    notify_url: Option<String>,
    return_url: Option<String>,
    /// Seconds.
    timeout: Option<u64>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl StoredPaymentSettings {
    fn overlay(self, mut settings: PaymentSettings) -> PaymentSettings {
        if let Some(enabled) = self.enable {
            settings.enabled = enabled;
        }
        if let Some(url) = present(self.base_url) {
            settings.gateway_url = url;
        }
        if let Some(pid) = present(self.pid) {
            settings.merchant_id = pid;
        }
        if let Some(key) = present(self.key) {
            settings.merchant_key = SecretString::new(key);
        }
        if let Some(url) = present(self.notify_url) {
            settings.notify_url = Some(url);
        }
        if let Some(url) = present(self.return_url) {
            settings.return_url = Some(url);
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            settings.timeout = Duration::from_secs(secs);
        }
        settings
    }
}

pub struct PostgresPaymentSettings {
    pool: PgPool,
    defaults: PaymentSettings,
}

impl PostgresPaymentSettings {
    pub fn new(pool: PgPool, defaults: PaymentSettings) -> Self {
        Self { pool, defaults }
    }
}

/// Applies a stored document to the defaults. Unreadable documents leave the
/// defaults untouched.
fn resolve(defaults: &PaymentSettings, document: Option<&str>) -> PaymentSettings {
    let Some(raw) = document.filter(|d| !d.trim().is_empty()) else {
        return defaults.clone();
    };

    match serde_json::from_str::<StoredPaymentSettings>(raw) {
        Ok(stored) => stored.overlay(defaults.clone()),
        Err(e) => {
            tracing::error!(error = %e, key = PAYMENT_SETTINGS_KEY, "unreadable payment settings document");
            defaults.clone()
        }
    }
}

#[async_trait]
impl PaymentSettingsProvider for PostgresPaymentSettings {
    async fn payment_settings(&self) -> Result<PaymentSettings, DomainError> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT value FROM system_settings WHERE key = $1")
                .bind(PAYMENT_SETTINGS_KEY)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load payment settings: {}", e),
                    )
                })?;

        Ok(resolve(&self.defaults, document.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use secrecy::ExposeSecret;

    fn defaults() -> PaymentSettings {
        PaymentSettings {
            enabled: false,
            gateway_url: "https://default.example.com".to_string(),
            merchant_id: "1000".to_string(),
            merchant_key: SecretString::new("default-key".to_string()),
            notify_url: Some("https://api.example.com/api/payment/notify".to_string()),
            return_url: None,
            timeout: Duration::from_secs(15),
            submit_debounce: ChronoDuration::seconds(3),
            pending_stale_after: ChronoDuration::minutes(30),
        }
    }

    #[test]
    fn missing_document_keeps_defaults() {
        let settings = resolve(&defaults(), None);
        assert!(!settings.enabled);
        assert_eq!(settings.merchant_id, "1000");
    }

    #[test]
    fn document_overrides_present_fields() {
        let settings = resolve(
            &defaults(),
            Some(r#"{"enable":true,"pid":"2002","key":"rotated","base_url":"","timeout":5}"#),
        );
        assert!(settings.enabled);
        assert_eq!(settings.merchant_id, "2002");
        assert_eq!(settings.merchant_key.expose_secret(), "rotated");
        assert_eq!(settings.gateway_url, "https://default.example.com");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.notify_url.is_some());
    }

    #[test]
    fn zero_timeout_is_ignored() {
        let settings = resolve(&defaults(), Some(r#"{"timeout":0}"#));
        assert_eq!(settings.timeout, Duration::from_secs(15));
    }

    #[test]
    fn broken_document_falls_back_to_defaults() {
        let settings = resolve(&defaults(), Some("{not json"));
        assert_eq!(settings.merchant_id, "1000");
        assert!(!settings.enabled);
    }
}
