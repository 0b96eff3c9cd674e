//! In-memory adapters for tests and local development.

mod billing_store;
mod device_directory;

pub use billing_store::InMemoryBillingStore;
pub use device_directory::InMemoryDeviceDirectory;
