//! Payment settings providers.
//!
//! - `StaticPaymentSettings` - the configured values, fixed for the process
//! - `PostgresPaymentSettings` - configured values overlaid with the operator
//!   document stored in `system_settings`

mod postgres_settings;
mod static_settings;

pub use postgres_settings::{PostgresPaymentSettings, PAYMENT_SETTINGS_KEY};
pub use static_settings::StaticPaymentSettings;
