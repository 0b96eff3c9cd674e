//! Relay admission values: session ids, safety limits and resolved grants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("session id is required")]
    EmptySessionId,

    #[error("session id is {actual} bytes, limit is {max}")]
    SessionIdTooLong { max: usize, actual: usize },
}

/// Bounds applied to every admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub default_slots: u32,
    pub max_slots: u32,
    pub default_ttl: Duration,
    pub max_ttl: Duration,
    pub max_session_id_len: usize,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            default_slots: 2,
            max_slots: 10,
            default_ttl: Duration::from_secs(120),
            max_ttl: Duration::from_secs(300),
            max_session_id_len: 128,
        }
    }
}

/// Opaque relay session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelaySessionId(String);

impl RelaySessionId {
    pub fn parse(raw: impl Into<String>, limits: &AdmissionLimits) -> Result<Self, RelayError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(RelayError::EmptySessionId);
        }
        if raw.len() > limits.max_session_id_len {
            return Err(RelayError::SessionIdTooLong {
                max: limits.max_session_id_len,
                actual: raw.len(),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelaySessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slot count and lifetime after clamping to the limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionGrant {
    pub slots: u32,
    pub ttl: Duration,
}

impl AdmissionGrant {
    /// Missing or non-positive values take the defaults; larger values are
    /// capped at the maxima.
    pub fn resolve(slots: Option<i64>, ttl_secs: Option<i64>, limits: &AdmissionLimits) -> Self {
        let slots = match slots {
            Some(n) if n > 0 => n.min(i64::from(limits.max_slots)) as u32,
            _ => limits.default_slots,
        };
        let ttl = match ttl_secs {
            Some(n) if n > 0 => Duration::from_secs(n as u64).min(limits.max_ttl),
            _ => limits.default_ttl,
        };
        Self { slots, ttl }
    }
}
