//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::interp::Easing;

/// Configuration for controller sizing and blend behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Curve applied to transition progress before poses are mixed.
    pub easing: Easing,

    /// Maximum events retained per tick; further events are dropped with a warning.
    pub max_events_per_tick: usize,

    /// Initial bone capacity for scratch poses.
    pub scratch_bones: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            easing: Easing::Smoothstep,
            max_events_per_tick: 64,
            scratch_bones: 64,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
