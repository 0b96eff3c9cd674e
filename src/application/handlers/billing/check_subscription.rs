//! CheckSubscriptionHandler - Query handler used by the relay server before
//! it forwards a session.
//!
//! The relay knows either the client's access token or its device id. The
//! token wins when it resolves; otherwise the device owner is looked up.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{DeviceDirectory, PaymentSettingsProvider, TokenValidator};

use super::check_access::CheckAccessHandler;

/// Longest token accepted from the relay.
pub const MAX_TOKEN_LEN: usize = 2048;

#[derive(Debug, Clone, Default)]
pub struct CheckSubscriptionQuery {
    pub token: Option<String>,
    pub device_id: Option<String>,
}

/// Why the answer did not come from a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckReason {
    PaymentDisabled,
    UserNotFound,
}

impl CheckReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckReason::PaymentDisabled => "payment_disabled",
            CheckReason::UserNotFound => "user_not_found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSubscriptionResult {
    pub active: bool,
    pub billing_enabled: bool,
    pub user_id: Option<UserId>,
    pub reason: Option<CheckReason>,
}

pub struct CheckSubscriptionHandler {
    tokens: Arc<dyn TokenValidator>,
    devices: Arc<dyn DeviceDirectory>,
    settings: Arc<dyn PaymentSettingsProvider>,
    access: Arc<CheckAccessHandler>,
}

impl CheckSubscriptionHandler {
    pub fn new(
        tokens: Arc<dyn TokenValidator>,
        devices: Arc<dyn DeviceDirectory>,
        settings: Arc<dyn PaymentSettingsProvider>,
        access: Arc<CheckAccessHandler>,
    ) -> Self {
        Self {
            tokens,
            devices,
            settings,
            access,
        }
    }

    pub async fn handle(
        &self,
        query: CheckSubscriptionQuery,
    ) -> Result<CheckSubscriptionResult, BillingError> {
        let token = query.token.filter(|t| !t.is_empty());
        if token.as_ref().map_or(false, |t| t.len() > MAX_TOKEN_LEN) {
            return Err(BillingError::validation("token", "token too long"));
        }

        let user_id = self
            .resolve_user(token.as_deref(), query.device_id.as_deref())
            .await?;

        if !self.settings.payment_settings().await?.enabled {
            return Ok(CheckSubscriptionResult {
                active: true,
                billing_enabled: false,
                user_id,
                reason: Some(CheckReason::PaymentDisabled),
            });
        }

        let Some(user_id) = user_id else {
            return Ok(CheckSubscriptionResult {
                active: false,
                billing_enabled: true,
                user_id: None,
                reason: Some(CheckReason::UserNotFound),
            });
        };

        Ok(CheckSubscriptionResult {
            active: self.access.is_active(&user_id).await?,
            billing_enabled: true,
            user_id: Some(user_id),
            reason: None,
        })
    }

    async fn resolve_user(
        &self,
        token: Option<&str>,
        device_id: Option<&str>,
    ) -> Result<Option<UserId>, BillingError> {
        if let Some(token) = token {
            match self.tokens.validate(token).await {
                Ok(user) => return Ok(Some(user.id)),
                Err(e) => tracing::debug!(error = %e, "relay token not accepted, trying device"),
            }
        }

        match device_id.filter(|d| !d.is_empty()) {
            Some(device_id) => Ok(self.devices.owner_of(device_id).await?),
            None => Ok(None),
        }
    }
}
