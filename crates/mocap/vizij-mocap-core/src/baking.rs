//! Baking API: sample a retargeted clip at a fixed rate into poses and bone matrices.

use serde::{Deserialize, Serialize};

use crate::pose::{BoneMatrix, Pose};
use crate::retarget::Retargeter;
use crate::skeleton::TargetSkeleton;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BakingConfig {
    /// Target frame rate (Hz) for baked samples.
    pub frame_rate: f32,
    /// Start time (seconds) in clip space.
    pub start_time: f32,
    /// End time (seconds) in clip space; if None, uses the clip duration.
    pub end_time: Option<f32>,
}

impl Default for BakingConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            start_time: 0.0,
            end_time: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakedClip {
    pub frame_rate: f32,
    pub start_time: f32,
    pub end_time: f32,
    /// Local pose per baked frame.
    pub poses: Vec<Pose>,
    /// World-space bone matrices per baked frame; empty unless baked with a skeleton.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrices: Vec<Vec<BoneMatrix>>,
}

impl BakedClip {
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.poses.len()
    }
}

/// Resolve the sample times for a window over a clip of `duration` seconds. The end
/// is inclusive.
fn frame_times(duration: f32, cfg: &BakingConfig) -> (f32, f32, f32, usize) {
    let sr = if cfg.frame_rate.is_finite() && cfg.frame_rate > 0.0 {
        cfg.frame_rate
    } else {
        60.0
    };
    let sr = sr.max(1.0);
    let start = cfg.start_time.clamp(0.0, duration);
    let mut end = cfg.end_time.unwrap_or(duration);
    if !end.is_finite() {
        end = duration;
    }
    let end = end.clamp(start, duration);
    let frames = ((end - start) * sr).ceil() as usize + 1;
    (sr, start, end, frames)
}

/// Bake local poses for a retargeter.
pub fn bake_retargeted(retargeter: &Retargeter, cfg: &BakingConfig) -> BakedClip {
    let (sr, start, end, frames) = frame_times(retargeter.duration(), cfg);
    let mut poses = Vec::with_capacity(frames);
    for f in 0..frames {
        let t = (start + f as f32 / sr).min(end);
        poses.push(retargeter.sample(t));
    }
    BakedClip {
        frame_rate: sr,
        start_time: start,
        end_time: end,
        poses,
        matrices: Vec::new(),
    }
}

/// Bake local poses plus world bone matrices through `skeleton`.
pub fn bake_with_matrices(
    retargeter: &Retargeter,
    skeleton: &TargetSkeleton,
    cfg: &BakingConfig,
) -> BakedClip {
    let mut baked = bake_retargeted(retargeter, cfg);
    baked.matrices = baked
        .poses
        .iter()
        .map(|p| skeleton.bone_matrices(p))
        .collect();
    baked
}

/// Export baked data as serde_json::Value (stable schema for FFI/serialization).
pub fn export_baked_json(baked: &BakedClip) -> serde_json::Value {
    serde_json::to_value(baked).unwrap_or(serde_json::Value::Null)
}
