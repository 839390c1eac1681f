//! Declarative source-joint to target-bone correspondence.

use std::f32::consts::PI;
use std::fmt::Write as _;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::clip::Clip;
use crate::error::{MapError, RetargetError};
use crate::interp::functions::normalize_quat;
use crate::pose::Pose;
use crate::sampling::{rest_pose, sample_interpolated};
use crate::skeleton::TargetSkeleton;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneMapping {
    /// Joint name in the source clip.
    pub source: String,
    /// Bone index in the target skeleton.
    pub target: usize,
    /// Rest-pose correction applied before the sampled rotation.
    #[serde(default = "identity_rotation")]
    pub correction: UnitQuaternion<f32>,
    #[serde(default = "default_scale")]
    pub position_scale: f32,
}

fn identity_rotation() -> UnitQuaternion<f32> {
    UnitQuaternion::identity()
}

fn default_scale() -> f32 {
    1.0
}

impl BoneMapping {
    pub fn new(source: impl Into<String>, target: usize) -> Self {
        Self {
            source: source.into(),
            target,
            correction: UnitQuaternion::identity(),
            position_scale: 1.0,
        }
    }

    pub fn with_correction(mut self, correction: UnitQuaternion<f32>) -> Self {
        self.correction = correction;
        self
    }

    pub fn with_scale(mut self, position_scale: f32) -> Self {
        self.position_scale = position_scale;
        self
    }
}

/// Caller-supplied conversion from source units to target units.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetSettings {
    pub unit_scale: f32,
}

impl Default for RetargetSettings {
    fn default() -> Self {
        Self { unit_scale: 1.0 }
    }
}

impl RetargetSettings {
    pub fn with_unit_scale(unit_scale: f32) -> Self {
        Self { unit_scale }
    }
}

/// A mapping bound to a concrete clip joint.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResolvedMapping {
    pub joint: usize,
    pub target: usize,
    pub correction: UnitQuaternion<f32>,
    pub scale: f32,
}

/// Result of retargeting one time sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Retargeted {
    pub pose: Pose,
    /// Mappings that were skipped; their bones kept the default transform.
    pub diagnostics: Vec<RetargetError>,
}

/// Coverage of a map against a particular clip and skeleton.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingReport {
    /// Clip joints no mapping reads from.
    pub unused_source_joints: Vec<String>,
    /// Target bones no mapping writes to.
    pub unmapped_target_bones: Vec<String>,
    pub diagnostics: Vec<RetargetError>,
}

impl MappingReport {
    pub fn is_complete(&self) -> bool {
        self.unmapped_target_bones.is_empty() && self.diagnostics.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonMap {
    mappings: Vec<BoneMapping>,
}

impl SkeletonMap {
    /// Build a map; each target bone may be written by at most one mapping.
    pub fn new(mappings: Vec<BoneMapping>) -> Result<Self, MapError> {
        // Target bone -> index of the first mapping writing it.
        let mut seen: HashMap<usize, usize> = HashMap::with_capacity(mappings.len());
        for (i, m) in mappings.iter().enumerate() {
            if let Some(first) = seen.insert(m.target, i) {
                return Err(MapError::DuplicateTarget {
                    target: m.target,
                    first: mappings[first].source.clone(),
                    second: m.source.clone(),
                });
            }
        }
        Ok(Self { mappings })
    }

    #[inline]
    pub fn mappings(&self) -> &[BoneMapping] {
        &self.mappings
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn mapping_for_target(&self, target: usize) -> Option<&BoneMapping> {
        self.mappings.iter().find(|m| m.target == target)
    }

    pub fn mapping_for_source(&self, source: &str) -> Option<&BoneMapping> {
        self.mappings.iter().find(|m| m.source == source)
    }

    pub fn mapping_for_source_mut(&mut self, source: &str) -> Option<&mut BoneMapping> {
        self.mappings.iter_mut().find(|m| m.source == source)
    }

    /// Bind mappings to clip joints, collecting every skipped entry.
    pub(crate) fn resolve(
        &self,
        clip: &Clip,
        bone_count: usize,
    ) -> (Vec<ResolvedMapping>, Vec<RetargetError>) {
        let mut resolved = Vec::with_capacity(self.mappings.len());
        let mut diagnostics = Vec::new();
        for m in &self.mappings {
            if m.target >= bone_count {
                diagnostics.push(RetargetError::TargetOutOfRange {
                    target: m.target,
                    bone_count,
                });
                continue;
            }
            match clip.joint_index(&m.source) {
                Some(joint) => resolved.push(ResolvedMapping {
                    joint,
                    target: m.target,
                    correction: m.correction,
                    scale: m.position_scale,
                }),
                None => diagnostics.push(RetargetError::MissingSourceJoint {
                    source_joint: m.source.clone(),
                    target: m.target,
                }),
            }
        }
        (resolved, diagnostics)
    }

    /// Retarget `clip` at `time` into a pose shaped like `defaults`.
    pub fn apply(
        &self,
        clip: &Clip,
        time: f32,
        defaults: &Pose,
        settings: &RetargetSettings,
    ) -> Retargeted {
        let (resolved, diagnostics) = self.resolve(clip, defaults.len());
        let mut pose = defaults.clone();
        write_resolved(&resolved, clip, time, settings, &mut pose);
        Retargeted { pose, diagnostics }
    }

    /// Derive each mapping's correction from rest bone directions: the source joint's
    /// first child (or end site) against the target bone's first child.
    pub fn calibrate_rest_pose(&mut self, clip: &Clip, skeleton: &TargetSkeleton) {
        let source_world = world_rest_positions(clip);
        let target_world = skeleton.world_pose(&skeleton.rest_pose());
        for m in &mut self.mappings {
            let Some(joint) = clip.joint_index(&m.source) else {
                continue;
            };
            let source_dir = clip
                .children(joint)
                .next()
                .map(|c| source_world[c] - source_world[joint])
                .or(clip.joints()[joint].end_site);
            let target_dir = skeleton
                .bones()
                .iter()
                .position(|b| b.parent == Some(m.target))
                .map(|c| target_world[c].translation - target_world[m.target].translation);
            if let (Some(s), Some(t)) = (source_dir, target_dir) {
                m.correction = calculate_tpose_offset(&s, &t);
            }
        }
    }

    /// Which joints and bones the map leaves uncovered.
    pub fn report(&self, clip: &Clip, skeleton: &TargetSkeleton) -> MappingReport {
        let (_, diagnostics) = self.resolve(clip, skeleton.bone_count());
        let used: HashSet<&str> = self.mappings.iter().map(|m| m.source.as_str()).collect();
        let targets: HashSet<usize> = self.mappings.iter().map(|m| m.target).collect();
        MappingReport {
            unused_source_joints: clip
                .joints()
                .iter()
                .filter(|j| !used.contains(j.name.as_str()))
                .map(|j| j.name.clone())
                .collect(),
            unmapped_target_bones: skeleton
                .bones()
                .iter()
                .enumerate()
                .filter(|(i, _)| !targets.contains(i))
                .map(|(_, b)| b.name.clone())
                .collect(),
            diagnostics,
        }
    }

    /// One line per mapping, for logs and debugging.
    pub fn describe(&self, skeleton: &TargetSkeleton) -> String {
        let mut out = String::new();
        for m in &self.mappings {
            let target = skeleton
                .bones()
                .get(m.target)
                .map(|b| b.name.as_str())
                .unwrap_or("?");
            let _ = writeln!(
                out,
                "{:<16} -> {:<12} [{}] scale={:.3} correction={:.1}deg",
                m.source,
                target,
                m.target,
                m.position_scale,
                m.correction.angle().to_degrees()
            );
        }
        out
    }

    fn from_table(prefix: &str, table: &[(&str, usize)]) -> Self {
        Self {
            mappings: table
                .iter()
                .map(|(name, target)| BoneMapping::new(format!("{prefix}{name}"), *target))
                .collect(),
        }
    }

    /// CMU-style joint names onto [`TargetSkeleton::humanoid`].
    pub fn cmu_to_humanoid() -> Self {
        Self::from_table("", CMU_HUMANOID)
    }

    /// Mixamo (`mixamorig:` namespaced) joint names onto [`TargetSkeleton::humanoid`].
    pub fn mixamo_to_humanoid() -> Self {
        Self::from_table("mixamorig:", MIXAMO_HUMANOID)
    }

    /// Torso and legs only, for locomotion-driven characters.
    pub fn cmu_to_minimal() -> Self {
        Self::from_table("", CMU_MINIMAL)
    }
}

const CMU_HUMANOID: &[(&str, usize)] = &[
    ("Hips", 0),
    ("Spine", 1),
    ("Spine1", 2),
    ("Neck", 3),
    ("Head", 4),
    ("LeftShoulder", 5),
    ("LeftArm", 6),
    ("LeftForeArm", 7),
    ("LeftHand", 8),
    ("RightShoulder", 9),
    ("RightArm", 10),
    ("RightForeArm", 11),
    ("RightHand", 12),
    ("LeftUpLeg", 13),
    ("LeftLeg", 14),
    ("LeftFoot", 15),
    ("LeftToeBase", 16),
    ("RightUpLeg", 17),
    ("RightLeg", 18),
    ("RightFoot", 19),
    ("RightToeBase", 20),
];

const MIXAMO_HUMANOID: &[(&str, usize)] = &[
    ("Hips", 0),
    ("Spine", 1),
    ("Spine2", 2),
    ("Neck", 3),
    ("Head", 4),
    ("LeftShoulder", 5),
    ("LeftArm", 6),
    ("LeftForeArm", 7),
    ("LeftHand", 8),
    ("RightShoulder", 9),
    ("RightArm", 10),
    ("RightForeArm", 11),
    ("RightHand", 12),
    ("LeftUpLeg", 13),
    ("LeftLeg", 14),
    ("LeftFoot", 15),
    ("LeftToeBase", 16),
    ("RightUpLeg", 17),
    ("RightLeg", 18),
    ("RightFoot", 19),
    ("RightToeBase", 20),
];

const CMU_MINIMAL: &[(&str, usize)] = &[
    ("Hips", 0),
    ("Spine", 1),
    ("Spine1", 2),
    ("LeftUpLeg", 13),
    ("LeftLeg", 14),
    ("LeftFoot", 15),
    ("RightUpLeg", 17),
    ("RightLeg", 18),
    ("RightFoot", 19),
];

/// Write resolved mappings for `time` into `out`. Bones without a mapping are untouched.
pub(crate) fn write_resolved(
    resolved: &[ResolvedMapping],
    clip: &Clip,
    time: f32,
    settings: &RetargetSettings,
    out: &mut Pose,
) {
    for r in resolved {
        let src = sample_interpolated(clip, r.joint, time);
        let slot = &mut out[r.target];
        slot.translation = src.translation * (r.scale * settings.unit_scale);
        slot.rotation = r.correction * src.rotation;
    }
}

fn world_rest_positions(clip: &Clip) -> Vec<Vector3<f32>> {
    let local = rest_pose(clip);
    let mut world: Vec<Vector3<f32>> = Vec::with_capacity(local.len());
    for (i, joint) in clip.joints().iter().enumerate() {
        let p = match joint.parent {
            Some(parent) => world[parent] + local[i].translation,
            None => local[i].translation,
        };
        world.push(p);
    }
    world
}

/// Minimal rotation taking `source_dir` onto `target_dir`.
///
/// Parallel or zero-length inputs give identity. Antiparallel inputs rotate 180 degrees
/// about an axis perpendicular to `source_dir`, built from the world axis least aligned
/// with it. The result is always a finite unit quaternion.
pub fn calculate_tpose_offset(
    source_dir: &Vector3<f32>,
    target_dir: &Vector3<f32>,
) -> UnitQuaternion<f32> {
    const EPS: f32 = 1e-6;
    let (Some(s), Some(t)) = (source_dir.try_normalize(EPS), target_dir.try_normalize(EPS)) else {
        return UnitQuaternion::identity();
    };
    if !(s.iter().all(|v| v.is_finite()) && t.iter().all(|v| v.is_finite())) {
        return UnitQuaternion::identity();
    }
    let d = s.dot(&t);
    if d >= 1.0 - EPS {
        return UnitQuaternion::identity();
    }
    if d <= -1.0 + EPS {
        let abs = s.abs();
        let world = if abs.x <= abs.y && abs.x <= abs.z {
            Vector3::x()
        } else if abs.y <= abs.z {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let axis = Unit::new_normalize(s.cross(&world));
        return UnitQuaternion::from_axis_angle(&axis, PI);
    }
    let c = s.cross(&t);
    normalize_quat(Quaternion::new(1.0 + d, c.x, c.y, c.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn duplicate_targets_are_rejected() {
        let err = SkeletonMap::new(vec![BoneMapping::new("A", 1), BoneMapping::new("B", 1)])
            .unwrap_err();
        assert_eq!(
            err,
            MapError::DuplicateTarget {
                target: 1,
                first: "A".into(),
                second: "B".into()
            }
        );
    }

    #[test]
    fn presets_match_humanoid_names() {
        let sk = TargetSkeleton::humanoid();
        for map in [
            SkeletonMap::cmu_to_humanoid(),
            SkeletonMap::mixamo_to_humanoid(),
            SkeletonMap::cmu_to_minimal(),
        ] {
            assert!(SkeletonMap::new(map.mappings().to_vec()).is_ok());
            assert!(map.mappings().iter().all(|m| m.target < sk.bone_count()));
        }
        let cmu = SkeletonMap::cmu_to_humanoid();
        assert_eq!(cmu.len(), 21);
        let head = cmu.mapping_for_source("Head").unwrap();
        assert_eq!(sk.bones()[head.target].name, "head");
        let foot = cmu.mapping_for_source("RightFoot").unwrap();
        assert_eq!(sk.bones()[foot.target].name, "foot.R");
        assert!(SkeletonMap::mixamo_to_humanoid()
            .mapping_for_source("mixamorig:LeftHand")
            .is_some());
    }

    #[test]
    fn tpose_offset_maps_direction() {
        let s = Vector3::new(1.0, 0.0, 0.0);
        let t = Vector3::new(0.0, 1.0, 0.0);
        let q = calculate_tpose_offset(&s, &t);
        assert_relative_eq!(q * s, t, epsilon = 1e-6);
        assert_eq!(calculate_tpose_offset(&s, &s), UnitQuaternion::identity());
        assert_eq!(
            calculate_tpose_offset(&Vector3::zeros(), &t),
            UnitQuaternion::identity()
        );
    }

    #[test]
    fn tpose_offset_antiparallel_is_valid() {
        for d in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.3, 0.4, -0.9),
            Vector3::new(1e-3, 1.0, 1e-3),
        ] {
            let q = calculate_tpose_offset(&d, &-d);
            let raw = q.into_inner();
            assert!(raw.coords.iter().all(|v| v.is_finite()));
            assert_relative_eq!(raw.norm(), 1.0, epsilon = 1e-5);
            let dn = d.normalize();
            assert_relative_eq!(q * dn, -dn, epsilon = 1e-5);
        }
    }
}
