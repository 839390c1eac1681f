//! Animation controller: one current state, at most one in-flight blend.
//!
//! Tick order for [`AnimController::update`]:
//! 1. apply inputs (parameters, triggers);
//! 2. advance the current state's time;
//! 3. with no blend active, start the first satisfied transition (registration order);
//! 4. with a blend active, advance the incoming state and the blend progress,
//!    committing when progress reaches 1;
//! 5. sample the current state, or both blend endpoints mixed by eased progress.
//!
//! A running blend is never interrupted by another transition.

use hashbrown::{HashMap, HashSet};
use log::{debug, trace, warn};

use super::state::{AnimState, Parameters};
use super::transition::{Transition, TransitionCondition};
use crate::blend::blend_poses_into;
use crate::config::Config;
use crate::error::ControllerError;
use crate::ids::{IdAllocator, StateId};
use crate::inputs::Inputs;
use crate::outputs::{ControllerEvent, Outputs};
use crate::pose::Pose;
use crate::scratch::Scratch;

#[derive(Clone, Debug, PartialEq)]
struct ResolvedTransition {
    from: StateId,
    to: StateId,
    duration: f32,
    condition: TransitionCondition,
}

/// In-flight cross-fade between two states.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlendState {
    pub from: StateId,
    pub to: StateId,
    pub duration: f32,
    /// Linear progress in [0, 1].
    pub progress: f32,
}

/// Collects states and transitions, then validates them all at once in [`build`].
///
/// [`build`]: ControllerBuilder::build
#[derive(Debug)]
pub struct ControllerBuilder {
    initial: String,
    bone_count: usize,
    states: Vec<AnimState>,
    transitions: Vec<Transition>,
    config: Config,
}

impl ControllerBuilder {
    pub fn new(initial: impl Into<String>, bone_count: usize) -> Self {
        Self {
            initial: initial.into(),
            bone_count,
            states: Vec::new(),
            transitions: Vec::new(),
            config: Config::default(),
        }
    }

    pub fn state(mut self, state: AnimState) -> Self {
        self.states.push(state);
        self
    }

    /// Transitions are evaluated in the order they are added.
    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AnimController, ControllerError> {
        let mut ids = IdAllocator::new();
        let mut index: HashMap<String, StateId> = HashMap::with_capacity(self.states.len());
        for state in &self.states {
            if index.contains_key(&state.name) {
                return Err(ControllerError::DuplicateState {
                    name: state.name.clone(),
                });
            }
            state.source.validate(&state.name, self.bone_count)?;
            index.insert(state.name.clone(), ids.alloc_state());
        }

        let Some(&current) = index.get(&self.initial) else {
            return Err(ControllerError::UnknownInitialState { name: self.initial });
        };

        let lookup = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| ControllerError::UnknownState {
                    name: name.to_string(),
                })
        };
        let mut transitions = Vec::with_capacity(self.transitions.len());
        for t in self.transitions {
            let from = lookup(&t.from)?;
            let to = lookup(&t.to)?;
            if !(t.duration.is_finite() && t.duration >= 0.0) {
                return Err(ControllerError::InvalidBlendDuration {
                    from: t.from,
                    to: t.to,
                    duration: t.duration,
                });
            }
            transitions.push(ResolvedTransition {
                from,
                to,
                duration: t.duration,
                condition: t.condition,
            });
        }

        let scratch = Scratch::new(&self.config);
        let mut states = self.states;
        for s in &mut states {
            s.reset();
        }
        Ok(AnimController {
            cfg: self.config,
            states,
            index,
            transitions,
            current,
            blend: None,
            parameters: Parameters::new(),
            triggers: HashSet::new(),
            bone_count: self.bone_count,
            scratch,
            out: Outputs {
                pose: Pose::identity(self.bone_count),
                events: Vec::new(),
            },
            pending: Vec::new(),
        })
    }
}

/// Per-character state machine. Owned by one character; not shared.
#[derive(Debug)]
pub struct AnimController {
    cfg: Config,
    states: Vec<AnimState>,
    index: HashMap<String, StateId>,
    transitions: Vec<ResolvedTransition>,
    current: StateId,
    blend: Option<BlendState>,
    parameters: Parameters,
    triggers: HashSet<String>,
    bone_count: usize,
    scratch: Scratch,
    out: Outputs,
    /// Events raised between ticks (e.g. by `force_state`), delivered on the next tick.
    pending: Vec<ControllerEvent>,
}

impl AnimController {
    pub fn builder(initial: impl Into<String>, bone_count: usize) -> ControllerBuilder {
        ControllerBuilder::new(initial, bone_count)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    pub fn current_state(&self) -> &str {
        &self.states[self.current.index()].name
    }

    pub fn state(&self, name: &str) -> Option<&AnimState> {
        self.index.get(name).map(|id| &self.states[id.index()])
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn blend(&self) -> Option<&BlendState> {
        self.blend.as_ref()
    }

    /// Name of the state being blended toward, if any.
    pub fn blend_target(&self) -> Option<&str> {
        self.blend
            .map(|b| self.states[b.to.index()].name.as_str())
    }

    /// Pose produced by the last `update`.
    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.out.pose
    }

    #[inline]
    pub fn outputs(&self) -> &Outputs {
        &self.out
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: f32) {
        self.parameters.insert(name.into(), value);
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters.get(name).copied()
    }

    /// Set a trigger. It stays set until a transition consumes it.
    pub fn set_trigger(&mut self, name: impl Into<String>) {
        self.triggers.insert(name.into());
    }

    pub fn is_trigger_set(&self, name: &str) -> bool {
        self.triggers.contains(name)
    }

    /// Switch to `name` immediately, dropping any in-flight blend.
    pub fn force_state(&mut self, name: &str) -> Result<(), ControllerError> {
        let id = self
            .state_id(name)
            .ok_or_else(|| ControllerError::UnknownState {
                name: name.to_string(),
            })?;
        let from = self.current_state().to_string();
        self.blend = None;
        self.current = id;
        self.states[id.index()].reset();
        debug!("forced state {from} -> {name}");
        self.pending.push(ControllerEvent::StateForced {
            from,
            to: name.to_string(),
        });
        Ok(())
    }

    /// Advance by `dt` seconds and produce this tick's pose. Non-finite or negative
    /// `dt` is treated as 0.
    pub fn update(&mut self, dt: f32, inputs: &Inputs) -> &Outputs {
        self.out.clear_events();
        let pending = std::mem::take(&mut self.pending);
        for event in pending {
            self.emit(event);
        }

        self.apply_inputs(inputs);
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let current = self.current.index();
        if self.states[current].advance(dt) {
            let state = self.states[current].name.clone();
            self.emit(ControllerEvent::StateCompleted { state });
        }

        if self.blend.is_none() {
            self.start_transition();
        }
        if self.blend.is_some() {
            self.advance_blend(dt);
        }

        self.sample();
        &self.out
    }

    fn apply_inputs(&mut self, inputs: &Inputs) {
        for p in &inputs.parameters {
            self.parameters.insert(p.name.clone(), p.value);
        }
        for t in &inputs.triggers {
            self.triggers.insert(t.clone());
        }
    }

    fn start_transition(&mut self) {
        let from_state = &self.states[self.current.index()];
        let chosen = self.transitions.iter().find(|t| {
            t.from == self.current
                && t.condition
                    .is_satisfied(from_state, &self.parameters, &self.triggers)
        });
        let Some(t) = chosen.cloned() else {
            return;
        };
        if let TransitionCondition::Trigger { name } = &t.condition {
            self.triggers.remove(name);
        }
        self.states[t.to.index()].reset();
        self.blend = Some(BlendState {
            from: t.from,
            to: t.to,
            duration: t.duration,
            progress: 0.0,
        });
        let from = self.states[t.from.index()].name.clone();
        let to = self.states[t.to.index()].name.clone();
        debug!("transition {from} -> {to} over {:.3}s", t.duration);
        self.emit(ControllerEvent::TransitionStarted {
            from,
            to,
            duration: t.duration,
        });
    }

    fn advance_blend(&mut self, dt: f32) {
        let Some(mut blend) = self.blend else {
            return;
        };
        let to = blend.to.index();
        // A self-transition shares one state; it was already advanced this tick.
        if blend.to != blend.from && self.states[to].advance(dt) {
            let state = self.states[to].name.clone();
            self.emit(ControllerEvent::StateCompleted { state });
        }
        blend.progress = if blend.duration > 0.0 {
            (blend.progress + dt / blend.duration).min(1.0)
        } else {
            1.0
        };
        trace!("blend progress {:.3}", blend.progress);

        if blend.progress >= 1.0 {
            self.current = blend.to;
            self.blend = None;
            let from = self.states[blend.from.index()].name.clone();
            let to = self.states[to].name.clone();
            debug!("transition {from} -> {to} complete");
            self.emit(ControllerEvent::TransitionCompleted { from, to });
        } else {
            self.blend = Some(blend);
        }
    }

    fn sample(&mut self) {
        let Self {
            states,
            scratch,
            out,
            parameters,
            blend,
            current,
            cfg,
            ..
        } = self;
        match blend {
            Some(b) => {
                let from = &states[b.from.index()];
                let to = &states[b.to.index()];
                from.source
                    .sample(from.time, parameters, &mut scratch.from, &mut scratch.aux);
                to.source
                    .sample(to.time, parameters, &mut scratch.to, &mut scratch.aux);
                let w = cfg.easing.apply(b.progress);
                blend_poses_into(&scratch.from, &scratch.to, w, &mut out.pose);
            }
            None => {
                let s = &states[current.index()];
                s.source
                    .sample(s.time, parameters, &mut out.pose, &mut scratch.aux);
            }
        }
    }

    fn emit(&mut self, event: ControllerEvent) {
        if self.out.events.len() >= self.cfg.max_events_per_tick {
            warn!("dropping controller event {event:?}: per-tick limit reached");
            return;
        }
        self.out.push_event(event);
    }
}
