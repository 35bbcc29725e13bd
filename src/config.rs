//! Runtime configuration shared by every map in a database.

use crate::storage::dict::{clamp_shard_count, DEFAULT_SHARDS};
use crate::storage::ExpiryConfig;

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Requested shard count for each `Dict` (clamped on use)
    pub shard_num: usize,

    /// Number of logical databases
    pub databases: usize,

    /// Background expiry sweeper tuning
    pub expiry: ExpiryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_num: DEFAULT_SHARDS,
            databases: 16,
            expiry: ExpiryConfig::default(),
        }
    }
}

impl Config {
    /// The shard count every `Dict` built from this config will actually use.
    pub fn shard_count(&self) -> usize {
        clamp_shard_count(self.shard_num)
    }
}
