//! Ledger-wide configuration surface, loadable from TOML.
//!
//! Every deployment needs a concrete, documented way to set the hash
//! algorithm, epoch policy, and orphan timeout, so that is carried here as a
//! plain TOML-backed struct with serde defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hash::DEFAULT_ALGORITHM;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub hash_algorithm: String,
    pub events_per_epoch: u64,
    pub time_based_epochs: bool,
    pub epoch_duration_seconds: u64,
    pub orphan_timeout_seconds: u64,
    pub strict_event_types: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: DEFAULT_ALGORITHM.to_string(),
            events_per_epoch: 1000,
            time_based_epochs: false,
            epoch_duration_seconds: 3600,
            orphan_timeout_seconds: 300,
            strict_event_types: true,
        }
    }
}

impl LedgerConfig {
    pub fn orphan_timeout(&self) -> Duration {
        Duration::from_secs(self.orphan_timeout_seconds)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
