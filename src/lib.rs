//! Relay Billing - subscription billing and relay admission service
//!
//! This crate sells time-boxed subscriptions through an EasyPay-compatible
//! gateway and decides which relay sessions may connect.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
