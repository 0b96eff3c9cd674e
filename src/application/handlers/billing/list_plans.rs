//! ListPlansHandler - Query handler for the public plan catalogue.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Plan};
use crate::ports::{BillingStore, PaymentSettingsProvider};

pub struct ListPlansHandler {
    store: Arc<dyn BillingStore>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl ListPlansHandler {
    pub fn new(store: Arc<dyn BillingStore>, settings: Arc<dyn PaymentSettingsProvider>) -> Self {
        Self { store, settings }
    }

    /// Active plans in display order. Nothing is for sale while billing is off.
    pub async fn handle(&self) -> Result<Vec<Plan>, BillingError> {
        if !self.settings.payment_settings().await?.enabled {
            return Err(BillingError::PaymentDisabled);
        }
        Ok(self.store.list_active_plans().await?)
    }
}
