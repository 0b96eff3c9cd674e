//! Relay admission adapters.

mod in_memory;
mod sweeper;

pub use in_memory::InMemoryRelayWhitelist;
pub use sweeper::{WhitelistSweeper, DEFAULT_SWEEP_INTERVAL};
