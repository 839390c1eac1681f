//! Per-tick inputs to a controller.
//!
//! Adapters build these and pass them into `AnimController::update` each tick. They
//! are applied before any state time advances.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    /// Named float parameters read by threshold transitions and blend trees.
    #[serde(default)]
    pub parameters: Vec<ParameterUpdate>,
    /// Triggers to set; each stays set until a transition consumes it.
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub name: String,
    pub value: f32,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f32) -> Self {
        self.parameters.push(ParameterUpdate {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_trigger(mut self, name: impl Into<String>) -> Self {
        self.triggers.push(name.into());
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.triggers.is_empty()
    }
}
