//! # Token Broker Library
//!
//! Obtains OAuth2 access tokens through a cache, an SSO delegate or a direct
//! OAuth2 fetch, optionally exchanges them through STS, and renders them.
//!
//! Modules:
//! - `config`: broker configuration and per-request settings
//! - `cache`: token type, cache keys and token caches
//! - `sources`: OAuth2, SSO and STS paths plus the acquisition broker
//! - `sinks`: output formats and the curl delegate
//! - `endpoints`: remote token info validation
//! - `tasks`: the command implementations

pub mod cache;
pub mod config;
pub mod endpoints;
pub mod helpers;
pub mod observability;
pub mod sinks;
pub mod sources;
pub mod tasks;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::sources::*;
pub use crate::sources::executor::{AcquireError, Acquisition, TokenBroker};
