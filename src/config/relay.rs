//! Relay admission configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::relay::AdmissionLimits;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_slots")]
    pub default_slots: u32,

    #[serde(default = "default_max_slots")]
    pub max_slots: u32,

    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    #[serde(default = "default_max_ttl")]
    pub max_ttl_secs: u64,

    #[serde(default = "default_max_session_id_len")]
    pub max_session_id_len: usize,

    /// How often expired entries are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl RelayConfig {
    pub fn limits(&self) -> AdmissionLimits {
        AdmissionLimits {
            default_slots: self.default_slots,
            max_slots: self.max_slots,
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            max_ttl: Duration::from_secs(self.max_ttl_secs),
            max_session_id_len: self.max_session_id_len,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_slots == 0 {
            return Err(ValidationError::RelayLimitNotPositive("slots"));
        }
        if self.default_ttl_secs == 0 {
            return Err(ValidationError::RelayLimitNotPositive("ttl"));
        }
        if self.max_session_id_len == 0 {
            return Err(ValidationError::RelayLimitNotPositive("session id length"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::RelayLimitNotPositive("sweep interval"));
        }
        if self.default_slots > self.max_slots {
            return Err(ValidationError::RelayDefaultAboveMax("slots"));
        }
        if self.default_ttl_secs > self.max_ttl_secs {
            return Err(ValidationError::RelayDefaultAboveMax("ttl"));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_slots: default_slots(),
            max_slots: default_max_slots(),
            default_ttl_secs: default_ttl(),
            max_ttl_secs: default_max_ttl(),
            max_session_id_len: default_max_session_id_len(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_slots() -> u32 {
    2
}

fn default_max_slots() -> u32 {
    10
}

fn default_ttl() -> u64 {
    120
}

fn default_max_ttl() -> u64 {
    300
}

fn default_max_session_id_len() -> usize {
    128
}

fn default_sweep_interval() -> u64 {
    30
}
