//! CancelSubscriptionHandler - Operator command that ends a subscription now.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::BillingStore;

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
}

pub struct CancelSubscriptionHandler {
    store: Arc<dyn BillingStore>,
}

impl CancelSubscriptionHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Returns the canceled row, or `None` when the user had none.
    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<Option<Subscription>, BillingError> {
        let mut uow = self.store.begin().await?;

        let Some(mut subscription) = uow.lock_subscription(&cmd.user_id).await? else {
            uow.rollback().await?;
            return Ok(None);
        };
        subscription.cancel(Timestamp::now());
        uow.save_subscription(&subscription).await?;
        uow.commit().await?;

        tracing::info!(user_id = %cmd.user_id, "subscription canceled");
        Ok(Some(subscription))
    }
}
