//! Controller outputs: the blended pose for this tick plus semantic events.

use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Discrete signals emitted while stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ControllerEvent {
    TransitionStarted {
        from: String,
        to: String,
        duration: f32,
    },
    TransitionCompleted {
        from: String,
        to: String,
    },
    /// A non-looping state reached its end.
    StateCompleted {
        state: String,
    },
    StateForced {
        from: String,
        to: String,
    },
}

/// Returned by `AnimController::update`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    /// Local transform per target bone.
    pub pose: Pose,
    #[serde(default)]
    pub events: Vec<ControllerEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    #[inline]
    pub fn push_event(&mut self, event: ControllerEvent) {
        self.events.push(event);
    }
}
