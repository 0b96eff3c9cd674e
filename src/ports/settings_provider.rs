//! Payment settings port.
//!
//! Settings are fetched once per operation and passed explicitly to the
//! signature engine and the gateway client, so a rotated key or a toggled
//! `enabled` flag takes effect on the next request.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use secrecy::SecretString;
use std::time::Duration;

use crate::domain::billing::{OrderNumber, SignatureEngine};
use crate::domain::foundation::DomainError;

/// Path of the local page that posts an order to the gateway.
pub const PAYMENT_SUBMIT_PATH: &str = "/api/payment/submit";

/// Merchant configuration for one logical operation.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub enabled: bool,
    /// Gateway base URL, e.g. `https://pay.example.com`.
    pub gateway_url: String,
    pub merchant_id: String,
    pub merchant_key: SecretString,
    pub notify_url: Option<String>,
    pub return_url: Option<String>,
    /// Deadline for outbound gateway calls.
    pub timeout: Duration,
    /// Window in which a second payment-page visit is refused.
    pub submit_debounce: ChronoDuration,
    /// Age after which an unsubmitted pending order is replaced.
    pub pending_stale_after: ChronoDuration,
}

impl PaymentSettings {
    pub fn signature_engine(&self) -> SignatureEngine {
        SignatureEngine::new(self.merchant_key.clone())
    }

    fn base(&self) -> &str {
        self.gateway_url.trim_end_matches('/')
    }

    /// Where the browser form is posted.
    pub fn submit_url(&self) -> String {
        format!("{}/pay/submit.php", self.base())
    }

    /// Server-to-server API endpoint (refund, query).
    pub fn api_url(&self) -> String {
        format!("{}/api.php", self.base())
    }

    /// Local redirect URL handed to the client after order creation.
    pub fn pay_url(&self, order_number: &OrderNumber) -> String {
        format!("{}?out_trade_no={}", PAYMENT_SUBMIT_PATH, order_number)
    }
}

#[async_trait]
pub trait PaymentSettingsProvider: Send + Sync {
    async fn payment_settings(&self) -> Result<PaymentSettings, DomainError>;
}
