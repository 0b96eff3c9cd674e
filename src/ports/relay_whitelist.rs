//! Relay admission whitelist port.
//!
//! Entries are process-local and short-lived. Implementations must make
//! `consume` exclusive so that two racing consumers cannot spend the same
//! slot, while `check` and `stats` may run concurrently.

use async_trait::async_trait;

use crate::domain::relay::{AdmissionGrant, RelaySessionId};

#[async_trait]
pub trait RelayWhitelist: Send + Sync {
    /// Inserts or replaces the entry for `session`. A repeated allow resets
    /// slots and expiry; it never adds to what is left.
    async fn allow(&self, session: &RelaySessionId, grant: AdmissionGrant);

    /// Spends one slot. Returns false for unknown or expired sessions,
    /// removing an expired entry on the way.
    async fn consume(&self, session: &RelaySessionId) -> bool;

    /// True iff the entry exists, is unexpired and has slots left.
    async fn check(&self, session: &RelaySessionId) -> bool;

    /// Number of live entries: unexpired with at least one slot left.
    async fn stats(&self) -> WhitelistStats;

    /// Removes expired or exhausted entries; returns how many were removed.
    async fn purge_expired(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct WhitelistStats {
    pub count: usize,
}
