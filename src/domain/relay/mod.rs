//! Relay admission domain.
//!
//! A session broker allows a relay session for a few connections and a short
//! time; the relay forwarder consumes one slot per connecting end.

mod admission;

pub use admission::{AdmissionGrant, AdmissionLimits, RelayError, RelaySessionId};
