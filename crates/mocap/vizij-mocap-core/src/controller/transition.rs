//! Transition rules between controller states.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use super::state::{AnimState, Parameters};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value >= threshold`
    AtLeast,
    /// `value < threshold`
    Below,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionCondition {
    Immediate,
    /// The from-state finished (non-looping) or wrapped this tick (looping).
    OnComplete,
    ParameterThreshold {
        parameter: String,
        threshold: f32,
        comparison: Comparison,
    },
    /// Fires once per set; the trigger is consumed when this transition starts.
    Trigger { name: String },
}

impl TransitionCondition {
    pub fn parameter_at_least(parameter: impl Into<String>, threshold: f32) -> Self {
        TransitionCondition::ParameterThreshold {
            parameter: parameter.into(),
            threshold,
            comparison: Comparison::AtLeast,
        }
    }

    pub fn parameter_below(parameter: impl Into<String>, threshold: f32) -> Self {
        TransitionCondition::ParameterThreshold {
            parameter: parameter.into(),
            threshold,
            comparison: Comparison::Below,
        }
    }

    pub fn trigger(name: impl Into<String>) -> Self {
        TransitionCondition::Trigger { name: name.into() }
    }

    /// Evaluate without side effects. Unset parameters never satisfy a threshold.
    pub fn is_satisfied(
        &self,
        from: &AnimState,
        parameters: &Parameters,
        triggers: &HashSet<String>,
    ) -> bool {
        match self {
            TransitionCondition::Immediate => true,
            TransitionCondition::OnComplete => from.is_complete(),
            TransitionCondition::ParameterThreshold {
                parameter,
                threshold,
                comparison,
            } => match parameters.get(parameter) {
                Some(v) => match comparison {
                    Comparison::AtLeast => *v >= *threshold,
                    Comparison::Below => *v < *threshold,
                },
                None => false,
            },
            TransitionCondition::Trigger { name } => triggers.contains(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    /// Blend duration in seconds; 0 switches on the tick the condition holds.
    pub duration: f32,
    pub condition: TransitionCondition,
}

impl Transition {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        duration: f32,
        condition: TransitionCondition,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            duration,
            condition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::MotionSource;
    use crate::pose::Pose;

    #[test]
    fn thresholds_compare_inclusively_above() {
        let state = AnimState::new("idle", MotionSource::pose(Pose::identity(1)));
        let triggers = HashSet::new();
        let mut params = Parameters::new();
        let at_least = TransitionCondition::parameter_at_least("speed", 0.5);
        let below = TransitionCondition::parameter_below("speed", 0.5);
        assert!(!at_least.is_satisfied(&state, &params, &triggers));
        assert!(!below.is_satisfied(&state, &params, &triggers));

        params.insert("speed".into(), 0.5);
        assert!(at_least.is_satisfied(&state, &params, &triggers));
        assert!(!below.is_satisfied(&state, &params, &triggers));
    }

    #[test]
    fn conditions_deserialize_from_tagged_json() {
        let c: TransitionCondition =
            serde_json::from_str(r#"{ "kind": "trigger", "name": "jump" }"#).unwrap();
        assert_eq!(c, TransitionCondition::trigger("jump"));
    }
}
