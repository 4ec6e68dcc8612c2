//! # Service Configuration
//!
//! Plain configuration for the reconciliation service: defaults first,
//! environment overrides on top. The server binary additionally accepts
//! command-line flags that win over both.

use crate::reconcile::DEFAULT_TX_RETRIES;
use std::env;

/// Default listen address for the HTTP transport.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Address the HTTP transport binds to.
    pub bind: String,
    /// Transaction attempts before a persistent store conflict is
    /// surfaced to the caller.
    pub max_tx_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_tx_retries: DEFAULT_TX_RETRIES,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `UNILINK_HTTP_BIND` and
    /// `UNILINK_TX_RETRIES` where set and parseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env::var("UNILINK_HTTP_BIND").unwrap_or(defaults.bind),
            max_tx_retries: env::var("UNILINK_TX_RETRIES")
                .ok()
                .and_then(|raw| raw.trim().parse::<u32>().ok())
                .filter(|retries| *retries >= 1)
                .unwrap_or(defaults.max_tx_retries),
        }
    }
}
