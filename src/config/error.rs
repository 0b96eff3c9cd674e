//! Configuration errors.

use thiserror::Error;

/// Failure to read configuration at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unreadable .env file: {0}")]
    DotEnv(String),

    #[error("configuration could not be loaded: {0}")]
    Load(#[from] config::ConfigError),
}

/// A loaded value that is not acceptable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Payment gateway URL must use HTTP(S)")]
    InvalidGatewayUrl,

    #[error("Payment gateway URL must use HTTPS in production")]
    GatewayMustBeHttps,

    #[error("Payment timeout must be between 1 and 120 seconds")]
    InvalidPaymentTimeout,

    #[error("Relay {0} default exceeds its maximum")]
    RelayDefaultAboveMax(&'static str),

    #[error("Relay {0} must be positive")]
    RelayLimitNotPositive(&'static str),

    #[error("JWT secret must be at least 32 bytes in production")]
    WeakJwtSecret,
}
