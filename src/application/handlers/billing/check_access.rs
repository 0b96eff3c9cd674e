//! CheckAccessHandler - Query handler for a user's subscription state.
//!
//! This is the single place premium gating asks "is this user paid up?".

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{BillingStore, PaymentSettingsProvider};

#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CheckAccessResult {
    pub billing_enabled: bool,
    /// Row exists, is active and expires strictly after now.
    pub active: bool,
    pub subscription: Option<Subscription>,
}

impl CheckAccessResult {
    /// Premium features are open when billing is off or the user is active.
    pub fn has_access(&self) -> bool {
        !self.billing_enabled || self.active
    }
}

pub struct CheckAccessHandler {
    store: Arc<dyn BillingStore>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl CheckAccessHandler {
    pub fn new(store: Arc<dyn BillingStore>, settings: Arc<dyn PaymentSettingsProvider>) -> Self {
        Self { store, settings }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, BillingError> {
        let billing_enabled = self.settings.payment_settings().await?.enabled;
        let subscription = self.store.find_subscription(&query.user_id).await?;

        Ok(CheckAccessResult {
            billing_enabled,
            active: is_active(subscription.as_ref(), Timestamp::now()),
            subscription,
        })
    }

    pub async fn billing_enabled(&self) -> Result<bool, BillingError> {
        Ok(self.settings.payment_settings().await?.enabled)
    }

    /// The bare predicate, ignoring the billing switch.
    pub async fn is_active(&self, user_id: &UserId) -> Result<bool, BillingError> {
        let subscription = self.store.find_subscription(user_id).await?;
        Ok(is_active(subscription.as_ref(), Timestamp::now()))
    }
}

fn is_active(subscription: Option<&Subscription>, now: Timestamp) -> bool {
    subscription.map_or(false, |s| s.is_active_at(now))
}
