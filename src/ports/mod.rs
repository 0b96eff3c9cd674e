//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Billing Ports
//!
//! - `BillingStore` / `BillingUnitOfWork` - Transactional order and subscription storage
//! - `PaymentSettingsProvider` - Merchant settings fetched once per operation
//! - `PaymentGateway` - Server-to-server gateway calls (refund, order query)
//!
//! ## Identity Ports
//!
//! - `TokenValidator` - Bearer token validation
//! - `DeviceDirectory` - Relay device id to user lookups
//!
//! ## Relay Ports
//!
//! - `RelayWhitelist` - Consumable, expiring admission entries

mod billing_store;
mod payment_gateway;
mod relay_whitelist;
mod settings_provider;
mod user_resolver;

pub use billing_store::{BillingStore, BillingUnitOfWork};
pub use payment_gateway::{
    GatewayError, GatewayOrderState, PaymentGateway, RefundReceipt, RefundRequest,
};
pub use relay_whitelist::{RelayWhitelist, WhitelistStats};
pub use settings_provider::{PaymentSettings, PaymentSettingsProvider, PAYMENT_SUBMIT_PATH};
pub use user_resolver::{DeviceDirectory, TokenValidator};
