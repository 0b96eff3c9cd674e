//! HandleNotifyHandler - Command handler for gateway payment callbacks.
//!
//! The gateway repeats a callback until it reads `success`, and may deliver
//! the same callback concurrently. Trust checks run first and never write;
//! the state change itself happens under the order's row lock.

use std::sync::Arc;

use crate::domain::billing::{BillingError, GatewayParams, PaymentNotification};
use crate::ports::{BillingStore, PaymentSettingsProvider};

use super::settlement::{settle, ConfirmedPayment, NotifyOutcome};

/// Raw callback parameters from the query string or form body.
#[derive(Debug, Clone)]
pub struct HandleNotifyCommand {
    pub params: GatewayParams,
}

pub struct HandleNotifyHandler {
    store: Arc<dyn BillingStore>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl HandleNotifyHandler {
    pub fn new(store: Arc<dyn BillingStore>, settings: Arc<dyn PaymentSettingsProvider>) -> Self {
        Self { store, settings }
    }

    pub async fn handle(&self, cmd: HandleNotifyCommand) -> Result<NotifyOutcome, BillingError> {
        let settings = self.settings.payment_settings().await?;
        // Refused callbacks are retried by the gateway once billing is back on.
        if !settings.enabled {
            return Err(BillingError::PaymentDisabled);
        }
        let params = &cmd.params;

        // Log identifiers only; the signature and key stay out of the logs.
        let order_hint = params.get("out_trade_no").map(String::as_str).unwrap_or_default();
        let trade_hint = params.get("trade_no").map(String::as_str).unwrap_or_default();

        if !settings.signature_engine().verify(params) {
            tracing::warn!(
                order_number = order_hint,
                trade_no = trade_hint,
                "callback signature verification failed"
            );
            return Err(BillingError::InvalidSignature);
        }

        let notification = PaymentNotification::from_params(params).map_err(|e| {
            tracing::warn!(order_number = order_hint, error = %e, "callback missing fields");
            e
        })?;

        if let Some(merchant) = &notification.merchant_id {
            if merchant != &settings.merchant_id {
                tracing::warn!(
                    order_number = %notification.order_number,
                    "callback merchant id mismatch"
                );
                return Err(BillingError::MerchantMismatch);
            }
        }

        if !notification.trade_status.is_success() {
            tracing::info!(
                order_number = %notification.order_number,
                trade_status = ?notification.trade_status,
                "callback acknowledged without state change"
            );
            return Ok(NotifyOutcome::Ignored);
        }

        settle(
            self.store.as_ref(),
            ConfirmedPayment {
                order_number: &notification.order_number,
                trade_number: &notification.trade_number,
                money: &notification.money,
                payload: notification.payload_json(),
            },
        )
        .await
    }
}
