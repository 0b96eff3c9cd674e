//! Payment gateway configuration

use chrono::Duration as ChronoDuration;
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::ports::PaymentSettings;

/// Merchant account at an EasyPay-compatible gateway.
///
/// These values are the defaults; the database may override them at runtime
/// (see `PostgresPaymentSettings`).
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Billing on/off switch. When off, every user counts as subscribed.
    #[serde(default)]
    pub enabled: bool,

    /// Gateway base URL
    #[serde(default)]
    pub gateway_url: String,

    /// Merchant id (`pid`)
    #[serde(default)]
    pub merchant_id: String,

    /// Merchant signing key
    #[serde(default)]
    pub merchant_key: String,

    /// Public URL of the notify endpoint handed to the gateway
    pub notify_url: Option<String>,

    /// Where the gateway sends the browser after payment
    pub return_url: Option<String>,

    /// Deadline for server-to-server gateway calls
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_submit_debounce")]
    pub submit_debounce_secs: i64,

    #[serde(default = "default_pending_stale_after")]
    pub pending_stale_after_secs: i64,
}

impl PaymentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the settings value handed to the billing handlers.
    pub fn to_settings(&self) -> PaymentSettings {
        PaymentSettings {
            enabled: self.enabled,
            gateway_url: self.gateway_url.clone(),
            merchant_id: self.merchant_id.clone(),
            merchant_key: SecretString::new(self.merchant_key.clone()),
            notify_url: self.notify_url.clone().filter(|u| !u.is_empty()),
            return_url: self.return_url.clone().filter(|u| !u.is_empty()),
            timeout: self.timeout(),
            submit_debounce: ChronoDuration::seconds(self.submit_debounce_secs),
            pending_stale_after: ChronoDuration::seconds(self.pending_stale_after_secs),
        }
    }

    /// Merchant fields are only required while billing is enabled.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidPaymentTimeout);
        }
        if !self.enabled {
            return Ok(());
        }
        if self.gateway_url.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__GATEWAY_URL"));
        }
        if self.merchant_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__MERCHANT_ID"));
        }
        if self.merchant_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__MERCHANT_KEY"));
        }
        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if *environment == Environment::Production && !self.gateway_url.starts_with("https://") {
            return Err(ValidationError::GatewayMustBeHttps);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gateway_url: String::new(),
            merchant_id: String::new(),
            merchant_key: String::new(),
            notify_url: None,
            return_url: None,
            timeout_secs: default_timeout(),
            submit_debounce_secs: default_submit_debounce(),
            pending_stale_after_secs: default_pending_stale_after(),
        }
    }
}

fn default_timeout() -> u64 {
    15
}

fn default_submit_debounce() -> i64 {
    3
}

fn default_pending_stale_after() -> i64 {
    30 * 60
}
