//! Domain layer - pure business rules with no I/O.

pub mod billing;
pub mod foundation;
pub mod relay;
