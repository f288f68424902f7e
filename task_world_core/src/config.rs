use serde::{Deserialize, Serialize};

use crate::MAX_CARRY;

/// Errors raised while loading a [`WorldConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("max_carry must be at least 1")]
    ZeroCapacity,
}

/// Reward values handed out by the world.
///
/// Action rewards are returned by each operation; the `carry_*` and
/// `incompatible_per_item` values feed the per-tick state reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    /// Successful move, pick or drop.
    pub step: f64,
    /// Any illegal action, including malformed requests.
    pub illegal: f64,
    /// `no_op` and `reset`.
    pub idle: f64,
    pub paint: f64,
    pub open_door: f64,
    pub carry_empty: f64,
    pub carry_per_item: f64,
    pub incompatible_per_item: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        RewardTable {
            step: -0.02,
            illegal: -0.03,
            idle: -0.01,
            paint: 1.0,
            open_door: 0.8,
            carry_empty: -0.01,
            carry_per_item: -0.02,
            incompatible_per_item: -0.03,
        }
    }
}

/// Tunable rules of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Inventory capacity.
    pub max_carry: usize,
    /// Whether painting an already painted fixture still succeeds.
    pub allow_repaint: bool,
    /// Charge extra per carried item that no unfinished subtask needs.
    pub penalize_incompatible: bool,
    pub rewards: RewardTable,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            max_carry: MAX_CARRY,
            allow_repaint: true,
            penalize_incompatible: false,
            rewards: RewardTable::default(),
        }
    }
}

impl WorldConfig {
    /// Parses a TOML document. Keys that are not present keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = toml::from_str(source)?;
        if config.max_carry == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(config)
    }
}
