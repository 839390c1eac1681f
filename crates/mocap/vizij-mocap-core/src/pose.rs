//! Per-bone transforms and poses.

use std::ops::{Deref, DerefMut};

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::interp::RotationOrder;

/// Column-major 3x4 bone matrix: x axis, y axis, z axis, translation.
pub type BoneMatrix = [f32; 12];

/// Local translation plus unit-quaternion rotation of one bone.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointTransform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for JointTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl JointTransform {
    #[inline]
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn new(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// `self` applied as a parent transform to a child-local transform.
    #[inline]
    pub fn compose(&self, local: &JointTransform) -> JointTransform {
        JointTransform {
            translation: self.translation + self.rotation * local.translation,
            rotation: self.rotation * local.rotation,
        }
    }

    #[inline]
    pub fn transform_point(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.translation + self.rotation * p
    }

    /// Rotation expressed as Euler degrees in the given order.
    pub fn euler_degrees(&self, order: RotationOrder) -> [f32; 3] {
        order.from_quat(&self.rotation)
    }

    pub fn to_bone_matrix(&self) -> BoneMatrix {
        let r = self.rotation.to_rotation_matrix();
        let m = r.matrix();
        let t = &self.translation;
        [
            m[(0, 0)],
            m[(1, 0)],
            m[(2, 0)],
            m[(0, 1)],
            m[(1, 1)],
            m[(2, 1)],
            m[(0, 2)],
            m[(1, 2)],
            m[(2, 2)],
            t.x,
            t.y,
            t.z,
        ]
    }
}

/// One transform per bone, in a skeleton's fixed index order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose(pub Vec<JointTransform>);

impl Pose {
    pub fn identity(bone_count: usize) -> Self {
        Self(vec![JointTransform::identity(); bone_count])
    }

    pub fn from_transforms(transforms: Vec<JointTransform>) -> Self {
        Self(transforms)
    }

    /// Overwrite `self` with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &Pose) {
        self.0.clear();
        self.0.extend_from_slice(&other.0);
    }

    /// Resize to `bone_count`, filling new slots with identity.
    pub fn resize(&mut self, bone_count: usize) {
        self.0.resize(bone_count, JointTransform::identity());
    }

    pub fn into_inner(self) -> Vec<JointTransform> {
        self.0
    }
}

impl Deref for Pose {
    type Target = [JointTransform];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Pose {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<JointTransform>> for Pose {
    fn from(v: Vec<JointTransform>) -> Self {
        Self(v)
    }
}
