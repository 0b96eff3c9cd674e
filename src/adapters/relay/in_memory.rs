//! In-memory relay whitelist.
//!
//! One `RwLock` guards the whole map. Entries are few and live for minutes
//! at most, so sharding is not needed. Time comes from `tokio::time::Instant`
//! so tests can pause and advance the clock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::relay::{AdmissionGrant, RelaySessionId};
use crate::ports::{RelayWhitelist, WhitelistStats};

#[derive(Debug, Clone, Copy)]
struct Entry {
    slots: u32,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn is_live(&self, now: Instant) -> bool {
        !self.is_expired(now) && self.slots > 0
    }
}

/// Process-local admission whitelist.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelayWhitelist {
    entries: Arc<RwLock<HashMap<RelaySessionId, Entry>>>,
}

impl InMemoryRelayWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining slots for a session, ignoring expiry. Test helper.
    #[cfg(test)]
    async fn slots_of(&self, session: &RelaySessionId) -> Option<u32> {
        self.entries.read().await.get(session).map(|e| e.slots)
    }

    /// Stored entries including expired ones the sweeper has not reached.
    #[cfg(test)]
    pub(crate) async fn stored_len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl RelayWhitelist for InMemoryRelayWhitelist {
    async fn allow(&self, session: &RelaySessionId, grant: AdmissionGrant) {
        let entry = Entry {
            slots: grant.slots,
            expires_at: Instant::now() + grant.ttl,
        };
        self.entries.write().await.insert(session.clone(), entry);

        tracing::debug!(
            session = %session,
            slots = grant.slots,
            ttl_secs = grant.ttl.as_secs(),
            "relay session allowed"
        );
    }

    async fn consume(&self, session: &RelaySessionId) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get_mut(session) else {
            tracing::debug!(session = %session, "relay consume: unknown session");
            return false;
        };

        if !entry.is_live(now) {
            entries.remove(session);
            tracing::debug!(session = %session, "relay consume: expired");
            return false;
        }

        entry.slots -= 1;
        let remaining = entry.slots;
        if remaining == 0 {
            entries.remove(session);
        }

        tracing::debug!(session = %session, remaining, "relay consume: admitted");
        true
    }

    async fn check(&self, session: &RelaySessionId) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(session)
            .is_some_and(|entry| entry.is_live(now))
    }

    async fn stats(&self) -> WhitelistStats {
        let now = Instant::now();
        let entries = self.entries.read().await;
        WhitelistStats {
            count: entries.values().filter(|entry| entry.is_live(now)).count(),
        }
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}
