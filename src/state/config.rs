//! Tunable rules and room limits.
//!
//! Both structs deserialize from JSON with every field optional, so a host
//! can load a partial config and fall back to the defaults.

use serde::{Deserialize, Serialize};

use super::deck::{MAX_PLAYERS, MIN_PLAYERS};

/// How a play that outranks the pile top is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverValuePolicy {
    /// The played cards stay on the pile; the player picks up everything
    /// else beneath them.
    #[default]
    PartialPickup,

    /// The play is refused and the player picks up the whole pile instead.
    ForcePickup,
}

/// Rules engine settings for one game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub over_value: OverValuePolicy,

    /// Rounds after which the game is finished. `None` plays on indefinitely.
    pub max_rounds: Option<u32>,

    /// Fixed shuffle seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

/// Room and coordinator limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub max_room_players: usize,
    pub min_start_players: usize,
    pub rules: RulesConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_room_players: MAX_PLAYERS,
            min_start_players: MIN_PLAYERS,
            rules: RulesConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
