use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{PaymentSettings, PaymentSettingsProvider};

/// Hands out one fixed settings value.
#[derive(Debug, Clone)]
pub struct StaticPaymentSettings {
    settings: PaymentSettings,
}

impl StaticPaymentSettings {
    pub fn new(settings: PaymentSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PaymentSettingsProvider for StaticPaymentSettings {
    async fn payment_settings(&self) -> Result<PaymentSettings, DomainError> {
        Ok(self.settings.clone())
    }
}
