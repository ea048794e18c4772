//! Engine and table configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_BLOCK_LEN, MAX_ID_DRAWS, PAGE_SIZE};
use crate::types::{CryptodevError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Bytes staged per transform call. Must be a multiple of the largest
    /// cipher block so a chunk never splits a block.
    pub staging_size: usize,

    /// Whether per-session usage counters are maintained.
    pub collect_stats: bool,

    /// Session id draws allowed before creation fails.
    pub max_id_draws: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            staging_size: PAGE_SIZE,
            collect_stats: true,
            max_id_draws: MAX_ID_DRAWS,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| CryptodevError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.staging_size == 0 || self.staging_size % MAX_BLOCK_LEN != 0 {
            return Err(CryptodevError::InvalidConfig(format!(
                "staging_size {} must be a non-zero multiple of {}",
                self.staging_size, MAX_BLOCK_LEN
            )));
        }
        if self.max_id_draws == 0 {
            return Err(CryptodevError::InvalidConfig("max_id_draws must be at least 1".into()));
        }
        Ok(())
    }
}
