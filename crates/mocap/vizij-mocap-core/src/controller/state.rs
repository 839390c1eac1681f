//! Controller states and the motion sources they wrap.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use super::blend_tree::BlendTree1D;
use crate::error::ControllerError;
use crate::pose::Pose;
use crate::retarget::Retargeter;

/// Named float parameters visible to transitions and blend trees.
pub type Parameters = HashMap<String, f32>;

/// A pose generated from code rather than recorded data.
pub trait ProceduralPose: Send + Sync {
    /// Write the pose at `time` into `out`, which must end up `bone_count()` long.
    fn sample(&self, time: f32, out: &mut Pose);

    fn bone_count(&self) -> usize;

    /// Cycle length in seconds; `None` means the pose never completes.
    fn duration(&self) -> Option<f32> {
        None
    }
}

/// Closure-backed [`ProceduralPose`].
pub struct ProceduralFn<F> {
    bone_count: usize,
    duration: Option<f32>,
    f: F,
}

impl<F> ProceduralFn<F>
where
    F: Fn(f32, &mut Pose) + Send + Sync,
{
    pub fn new(bone_count: usize, duration: Option<f32>, f: F) -> Self {
        Self {
            bone_count,
            duration,
            f,
        }
    }
}

impl<F> ProceduralPose for ProceduralFn<F>
where
    F: Fn(f32, &mut Pose) + Send + Sync,
{
    fn sample(&self, time: f32, out: &mut Pose) {
        out.resize(self.bone_count);
        (self.f)(time, out);
    }

    fn bone_count(&self) -> usize {
        self.bone_count
    }

    fn duration(&self) -> Option<f32> {
        self.duration
    }
}

#[derive(Clone)]
pub enum MotionSource {
    /// Retargeted mocap clip.
    Clip(Arc<Retargeter>),
    /// Static pose held indefinitely.
    Pose(Arc<Pose>),
    Procedural(Arc<dyn ProceduralPose>),
    BlendTree(BlendTree1D),
}

impl fmt::Debug for MotionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionSource::Clip(rt) => f
                .debug_struct("Clip")
                .field("bones", &rt.bone_count())
                .field("duration", &rt.duration())
                .finish(),
            MotionSource::Pose(p) => f.debug_struct("Pose").field("bones", &p.len()).finish(),
            MotionSource::Procedural(p) => f
                .debug_struct("Procedural")
                .field("bones", &p.bone_count())
                .finish(),
            MotionSource::BlendTree(tree) => f.debug_tuple("BlendTree").field(tree).finish(),
        }
    }
}

impl MotionSource {
    pub fn procedural(p: impl ProceduralPose + 'static) -> Self {
        MotionSource::Procedural(Arc::new(p))
    }

    pub fn pose(p: Pose) -> Self {
        MotionSource::Pose(Arc::new(p))
    }

    /// Length of one pass in seconds, if the source has one.
    pub fn duration(&self) -> Option<f32> {
        match self {
            MotionSource::Clip(rt) => Some(rt.duration()),
            MotionSource::Pose(_) => None,
            MotionSource::Procedural(p) => p.duration(),
            MotionSource::BlendTree(tree) => tree.duration(),
        }
    }

    pub fn bone_count(&self) -> Option<usize> {
        match self {
            MotionSource::Clip(rt) => Some(rt.bone_count()),
            MotionSource::Pose(p) => Some(p.len()),
            MotionSource::Procedural(p) => Some(p.bone_count()),
            MotionSource::BlendTree(tree) => tree.bone_count(),
        }
    }

    /// Check that every pose this source can produce has `expected` bones, descending
    /// into blend-tree entries. Empty trees are rejected since they produce nothing.
    pub(crate) fn validate(&self, state: &str, expected: usize) -> Result<(), ControllerError> {
        if let MotionSource::BlendTree(tree) = self {
            if tree.entries().is_empty() {
                return Err(ControllerError::EmptyBlendTree {
                    state: state.to_string(),
                });
            }
            return tree
                .entries()
                .iter()
                .try_for_each(|e| e.source.validate(state, expected));
        }
        match self.bone_count() {
            Some(found) if found != expected => Err(ControllerError::BoneCountMismatch {
                state: state.to_string(),
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    /// Sample into `out`. `aux` is scratch for sources that mix several inputs.
    pub fn sample(&self, time: f32, params: &Parameters, out: &mut Pose, aux: &mut Pose) {
        match self {
            MotionSource::Clip(rt) => rt.sample_into(time, out),
            MotionSource::Pose(p) => out.copy_from(p),
            MotionSource::Procedural(p) => p.sample(time, out),
            MotionSource::BlendTree(tree) => tree.sample(time, params, out, aux),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimState {
    pub name: String,
    pub source: MotionSource,
    pub speed: f32,
    pub looping: bool,
    /// Local time in seconds.
    pub time: f32,
    /// Non-looping state has reached its end.
    pub(crate) finished: bool,
    /// Looping state wrapped during the last advance.
    pub(crate) wrapped: bool,
}

impl AnimState {
    /// Looping state at speed 1.
    pub fn new(name: impl Into<String>, source: MotionSource) -> Self {
        Self {
            name: name.into(),
            source,
            speed: 1.0,
            looping: true,
            time: 0.0,
            finished: false,
            wrapped: false,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn non_looping(mut self) -> Self {
        self.looping = false;
        self
    }

    pub(crate) fn reset(&mut self) {
        self.time = 0.0;
        self.finished = false;
        self.wrapped = false;
    }

    /// Advance local time by `dt * speed`. Returns true the first time a non-looping
    /// state reaches its end.
    pub(crate) fn advance(&mut self, dt: f32) -> bool {
        self.wrapped = false;
        self.time += dt * self.speed;
        let Some(duration) = self.source.duration().filter(|d| *d > 0.0) else {
            self.time = self.time.max(0.0);
            return false;
        };
        if self.looping {
            if self.time >= duration || self.time < 0.0 {
                self.time = self.time.rem_euclid(duration);
                self.wrapped = true;
            }
            false
        } else {
            self.time = self.time.clamp(0.0, duration);
            if self.time >= duration && !self.finished {
                self.finished = true;
                return true;
            }
            false
        }
    }

    /// True once a non-looping state has finished, or on the tick a looping state wraps.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.finished || self.wrapped
    }
}
