//! Billing error types.
//!
//! | Category | Variants | Retry |
//! |----------|----------|-------|
//! | Validation | MissingField, InvalidAmount, Validation | never |
//! | NotFound | PlanNotFound, OrderNotFound | never |
//! | Integrity | InvalidSignature, MerchantMismatch, AmountMismatch | never |
//! | Conflict | PlanInactive, PaymentDisabled, InvalidState, MissingTradeNumber | never |
//! | ExternalDependency | GatewayUnavailable, GatewayRejected | caller may retry |
//! | Transient | LockTimeout | caller may retry |
//! | Internal | Infrastructure | no |
//!
//! Idempotent replays are not errors; see `NotifyOutcome`.

use thiserror::Error;

use super::money::{Money, MoneyError};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Integrity,
    Conflict,
    ExternalDependency,
    Transient,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),

    #[error("plan {0} is not available for purchase")]
    PlanInactive(PlanId),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("payment is disabled")]
    PaymentDisabled,

    #[error("callback signature verification failed")]
    InvalidSignature,

    #[error("callback is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("callback merchant id does not match the configured merchant")]
    MerchantMismatch,

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("amount mismatch: expected {expected}, received {received}")]
    AmountMismatch { expected: Money, received: Money },

    #[error("order {order} is {status}, operation requires {required}")]
    InvalidState {
        order: String,
        status: String,
        required: &'static str,
    },

    #[error("order {0} has no gateway trade number")]
    MissingTradeNumber(String),

    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("payment gateway rejected the request: {0}")]
    GatewayRejected(String),

    #[error("validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("timed out waiting for a row lock")]
    LockTimeout,

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BillingError::MissingField(_)
            | BillingError::InvalidAmount(_)
            | BillingError::Validation { .. } => ErrorCategory::Validation,
            BillingError::PlanNotFound(_) | BillingError::OrderNotFound(_) => ErrorCategory::NotFound,
            BillingError::InvalidSignature
            | BillingError::MerchantMismatch
            | BillingError::AmountMismatch { .. } => ErrorCategory::Integrity,
            BillingError::PlanInactive(_)
            | BillingError::PaymentDisabled
            | BillingError::InvalidState { .. }
            | BillingError::MissingTradeNumber(_) => ErrorCategory::Conflict,
            BillingError::GatewayUnavailable(_) | BillingError::GatewayRejected(_) => {
                ErrorCategory::ExternalDependency
            }
            BillingError::LockTimeout => ErrorCategory::Transient,
            BillingError::Infrastructure(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the caller may repeat the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::ExternalDependency | ErrorCategory::Transient
        )
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::LockTimeout => BillingError::LockTimeout,
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => BillingError::Validation {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                order: err.details.get("order_number").cloned().unwrap_or_default(),
                status: err.message,
                required: "a valid transition",
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}
