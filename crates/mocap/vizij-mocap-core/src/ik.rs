//! Analytic two-bone IK overlay (upper arm / forearm / hand, thigh / shin / foot).
//!
//! Solves in world space with the law of cosines, then writes corrected local rotations
//! for the chain's root and mid bones. The end bone's own rotation is untouched.

use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::error::SkeletonError;
use crate::interp::functions::slerp;
use crate::pose::Pose;
use crate::skeleton::TargetSkeleton;

const EPS: f32 = 1e-5;

#[derive(Clone, Debug, PartialEq)]
pub struct TwoBoneIk {
    pub root: usize,
    pub mid: usize,
    pub end: usize,
    /// World-space goal for the end bone.
    pub target: Vector3<f32>,
    /// World-space point the middle joint should bend toward.
    pub pole: Option<Vector3<f32>>,
    /// 0 leaves the pose unchanged, 1 applies the full solve. Non-finite counts as 0.
    pub weight: f32,
}

impl TwoBoneIk {
    /// Chain `root -> mid -> end`; each bone must be the direct parent of the next.
    pub fn new(
        skeleton: &TargetSkeleton,
        root: usize,
        mid: usize,
        end: usize,
    ) -> Result<Self, SkeletonError> {
        let bones = skeleton.bones();
        let linked = bones.get(mid).and_then(|b| b.parent) == Some(root)
            && bones.get(end).and_then(|b| b.parent) == Some(mid);
        if !linked {
            return Err(SkeletonError::NotAChain { root, mid, end });
        }
        Ok(Self {
            root,
            mid,
            end,
            target: Vector3::zeros(),
            pole: None,
            weight: 1.0,
        })
    }

    pub fn from_names(
        skeleton: &TargetSkeleton,
        root: &str,
        mid: &str,
        end: &str,
    ) -> Result<Self, SkeletonError> {
        let find = |name: &str| {
            skeleton
                .bone_index(name)
                .ok_or_else(|| SkeletonError::UnknownBone {
                    name: name.to_string(),
                })
        };
        Self::new(skeleton, find(root)?, find(mid)?, find(end)?)
    }

    pub fn with_target(mut self, target: Vector3<f32>) -> Self {
        self.target = target;
        self
    }

    pub fn with_pole(mut self, pole: Vector3<f32>) -> Self {
        self.pole = Some(pole);
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Edit `pose` (local transforms for `skeleton`) so the end bone reaches toward
    /// the target. Unreachable targets leave the chain fully extended toward them.
    pub fn apply(&self, skeleton: &TargetSkeleton, pose: &mut Pose) {
        let weight = if self.weight.is_finite() {
            self.weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if weight == 0.0 || pose.len() < skeleton.bone_count() {
            return;
        }
        let world = skeleton.world_pose(pose);
        let a = world[self.root].translation;
        let b = world[self.mid].translation;
        let c = world[self.end].translation;
        let a_gr = world[self.root].rotation;
        let b_gr = world[self.mid].rotation;
        let t = self.target;

        let lab = (b - a).norm();
        let lcb = (b - c).norm();
        if lab < EPS || lcb < EPS {
            return;
        }
        let lat = (t - a).norm().clamp(EPS, lab + lcb - EPS);

        let ac = c - a;
        let ab = b - a;
        let at = t - a;
        let ac_ab_0 = angle_between(&ac, &ab);
        let ba_bc_0 = angle_between(&(a - b), &(c - b));
        let ac_at_0 = angle_between(&ac, &at);

        let ac_ab_1 = ((lcb * lcb - lab * lab - lat * lat) / (-2.0 * lab * lat))
            .clamp(-1.0, 1.0)
            .acos();
        let ba_bc_1 = ((lat * lat - lab * lab - lcb * lcb) / (-2.0 * lab * lcb))
            .clamp(-1.0, 1.0)
            .acos();

        let bend_hint = match self.pole {
            Some(p) => p - a,
            None => ab,
        };
        let axis0 = ac
            .cross(&bend_hint)
            .try_normalize(EPS)
            .unwrap_or_else(|| perpendicular(&ac));
        let axis1 = ac.cross(&at).try_normalize(EPS).unwrap_or(axis0);

        let r0 = rotation_about(&a_gr, &axis0, ac_ab_1 - ac_ab_0);
        let r1 = rotation_about(&b_gr, &axis0, ba_bc_1 - ba_bc_0);
        let r2 = rotation_about(&a_gr, &axis1, ac_at_0);

        let root_old = pose[self.root].rotation;
        let mid_old = pose[self.mid].rotation;
        // Bend inside the current chain plane first, then swing the bent chain onto the target.
        let root_new = root_old * (r2 * r0);
        let mid_new = mid_old * r1;
        pose[self.root].rotation = slerp(&root_old, &root_new, weight);
        pose[self.mid].rotation = slerp(&mid_old, &mid_new, weight);
    }
}

fn angle_between(u: &Vector3<f32>, v: &Vector3<f32>) -> f32 {
    match (u.try_normalize(EPS), v.try_normalize(EPS)) {
        (Some(u), Some(v)) => u.dot(&v).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Rotation of `angle` about world-space `axis`, expressed in the frame of `global`.
fn rotation_about(
    global: &UnitQuaternion<f32>,
    axis: &Vector3<f32>,
    angle: f32,
) -> UnitQuaternion<f32> {
    let local = global.inverse() * axis;
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(local), angle)
}

fn perpendicular(v: &Vector3<f32>) -> Vector3<f32> {
    let abs = v.abs();
    let world = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    v.cross(&world)
        .try_normalize(EPS)
        .unwrap_or_else(Vector3::x)
}
