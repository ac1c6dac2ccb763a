//! DRLX diffusion RL toolkit facade.
//!
//! Bundles the member crates behind feature flags so downstream users can
//! enable only what they need.

#![warn(missing_docs, clippy::pedantic)]

/// Run configuration loading, merging, and saving (enabled by `config` feature).
#[cfg(feature = "config")]
pub use drlx_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use drlx_telemetry as telemetry;
