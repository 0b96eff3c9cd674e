//! Process configuration.
//!
//! Everything comes from the environment (and a `.env` file in development):
//! `RELAY_BILLING__<SECTION>__<FIELD>`, e.g. `RELAY_BILLING__PAYMENT__MERCHANT_ID`.
//! Only `database.url` and `auth.jwt_secret` are required; the other sections
//! have working defaults.
//!
//! ```no_run
//! use relay_billing::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod relay;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use relay::RelayConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "RELAY_BILLING";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Defaults for the gateway; an operator document in the database can
    /// override them at runtime.
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    ///
    /// Fails when a required value is missing or a value does not parse.
    /// Semantic checks are left to [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::DotEnv(e.to_string()));
            }
        }

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Cross-field and environment-dependent checks, section by section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let environment = self.server.environment;
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate(&environment)?;
        self.relay.validate()?;
        self.auth.validate(&environment)
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; keep these tests serial.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("RELAY_BILLING__DATABASE__URL", "postgresql://test@localhost/test"),
        ("RELAY_BILLING__AUTH__JWT_SECRET", "dev-secret"),
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in [
            "RELAY_BILLING__SERVER__PORT",
            "RELAY_BILLING__SERVER__ENVIRONMENT",
            "RELAY_BILLING__PAYMENT__ENABLED",
            "RELAY_BILLING__PAYMENT__MERCHANT_ID",
            "RELAY_BILLING__RELAY__MAX_SLOTS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert!(!config.payment.enabled);
        assert_eq!(config.relay.max_slots, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("RELAY_BILLING__SERVER__PORT", "3000");
        env::set_var("RELAY_BILLING__RELAY__MAX_SLOTS", "4");
        env::set_var("RELAY_BILLING__PAYMENT__MERCHANT_ID", "1001");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.relay.max_slots, 4);
        assert_eq!(config.payment.merchant_id, "1001");
    }

    #[test]
    fn test_enabled_payment_without_merchant_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("RELAY_BILLING__PAYMENT__ENABLED", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("RELAY_BILLING__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }
}
