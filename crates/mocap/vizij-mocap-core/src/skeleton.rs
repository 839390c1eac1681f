//! Runtime target skeleton: bone names, parents and rest transforms, plus forward
//! kinematics to world transforms and renderer-facing bone matrices.

use hashbrown::HashMap;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::clip::Clip;
use crate::error::SkeletonError;
use crate::pose::{BoneMatrix, JointTransform, Pose};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: JointTransform,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>, offset: Vector3<f32>) -> Self {
        Self {
            name: name.into(),
            parent,
            rest: JointTransform::from_translation(offset),
        }
    }
}

/// Bones in a fixed index order where every parent precedes its children.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSkeleton {
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
}

impl TargetSkeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        if bones.is_empty() {
            return Err(SkeletonError::Empty);
        }
        let mut name_to_index = HashMap::with_capacity(bones.len());
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= index {
                    return Err(SkeletonError::ParentOrder {
                        index,
                        name: bone.name.clone(),
                        parent,
                    });
                }
            }
            if name_to_index.insert(bone.name.clone(), index).is_some() {
                return Err(SkeletonError::DuplicateBone {
                    name: bone.name.clone(),
                });
            }
        }
        Ok(Self {
            bones,
            name_to_index,
        })
    }

    /// The clip's own joint hierarchy at rest, as a target skeleton.
    pub fn from_clip(clip: &Clip) -> Self {
        let bones = clip
            .joints()
            .iter()
            .map(|j| Bone::new(j.name.clone(), j.parent, j.offset))
            .collect();
        let name_to_index = clip
            .joints()
            .iter()
            .enumerate()
            .map(|(i, j)| (j.name.clone(), i))
            .collect();
        // Clip invariants already guarantee ordering and unique names.
        Self {
            bones,
            name_to_index,
        }
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn rest_pose(&self) -> Pose {
        self.bones.iter().map(|b| b.rest).collect::<Vec<_>>().into()
    }

    /// Forward kinematics: local pose to world transforms. Missing local entries fall
    /// back to the bone's rest transform.
    pub fn world_pose_into(&self, local: &Pose, out: &mut Pose) {
        out.resize(self.bones.len());
        for (i, bone) in self.bones.iter().enumerate() {
            let l = local.get(i).copied().unwrap_or(bone.rest);
            let world = match bone.parent {
                Some(p) => out[p].compose(&l),
                None => l,
            };
            out[i] = world;
        }
    }

    pub fn world_pose(&self, local: &Pose) -> Pose {
        let mut out = Pose::default();
        self.world_pose_into(local, &mut out);
        out
    }

    /// World-space 3x4 column-major matrices, one per bone.
    pub fn bone_matrices(&self, local: &Pose) -> Vec<BoneMatrix> {
        self.world_pose(local)
            .iter()
            .map(JointTransform::to_bone_matrix)
            .collect()
    }

    /// Distance from a bone to its parent at rest.
    pub fn rest_length(&self, bone: usize) -> f32 {
        self.bones
            .get(bone)
            .map(|b| b.rest.translation.norm())
            .unwrap_or(0.0)
    }

    /// 21-bone humanoid used by the bundled skeleton map presets. Y up, metres.
    pub fn humanoid() -> Self {
        let v = Vector3::new;
        let bones = vec![
            Bone::new("hips", None, v(0.0, 1.0, 0.0)),
            Bone::new("spine", Some(0), v(0.0, 0.1, 0.0)),
            Bone::new("chest", Some(1), v(0.0, 0.2, 0.0)),
            Bone::new("neck", Some(2), v(0.0, 0.2, 0.0)),
            Bone::new("head", Some(3), v(0.0, 0.1, 0.0)),
            Bone::new("shoulder.L", Some(2), v(0.05, 0.15, 0.0)),
            Bone::new("upper_arm.L", Some(5), v(0.15, 0.0, 0.0)),
            Bone::new("forearm.L", Some(6), v(0.28, 0.0, 0.0)),
            Bone::new("hand.L", Some(7), v(0.25, 0.0, 0.0)),
            Bone::new("shoulder.R", Some(2), v(-0.05, 0.15, 0.0)),
            Bone::new("upper_arm.R", Some(9), v(-0.15, 0.0, 0.0)),
            Bone::new("forearm.R", Some(10), v(-0.28, 0.0, 0.0)),
            Bone::new("hand.R", Some(11), v(-0.25, 0.0, 0.0)),
            Bone::new("thigh.L", Some(0), v(0.1, -0.05, 0.0)),
            Bone::new("shin.L", Some(13), v(0.0, -0.42, 0.0)),
            Bone::new("foot.L", Some(14), v(0.0, -0.40, 0.0)),
            Bone::new("toe.L", Some(15), v(0.0, -0.05, 0.12)),
            Bone::new("thigh.R", Some(0), v(-0.1, -0.05, 0.0)),
            Bone::new("shin.R", Some(17), v(0.0, -0.42, 0.0)),
            Bone::new("foot.R", Some(18), v(0.0, -0.40, 0.0)),
            Bone::new("toe.R", Some(19), v(0.0, -0.05, 0.12)),
        ];
        let name_to_index = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Self {
            bones,
            name_to_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn humanoid_is_well_formed() {
        let sk = TargetSkeleton::humanoid();
        assert_eq!(sk.bone_count(), 21);
        assert!(TargetSkeleton::new(sk.bones().to_vec()).is_ok());
        assert_eq!(sk.bone_index("head"), Some(4));
        assert_eq!(sk.bone_index("toe.R"), Some(20));
    }

    #[test]
    fn forward_kinematics_accumulates_rotation() {
        let sk = TargetSkeleton::new(vec![
            Bone::new("a", None, Vector3::zeros()),
            Bone::new("b", Some(0), Vector3::new(1.0, 0.0, 0.0)),
        ])
        .unwrap();
        let mut local = sk.rest_pose();
        local[0].rotation =
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);
        let world = sk.world_pose(&local);
        assert_relative_eq!(world[1].translation, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);

        let mats = sk.bone_matrices(&local);
        assert_eq!(mats.len(), 2);
        assert_relative_eq!(mats[1][10], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_bad_order_and_duplicates() {
        let err = TargetSkeleton::new(vec![
            Bone::new("a", Some(0), Vector3::zeros()),
        ])
        .unwrap_err();
        assert!(matches!(err, SkeletonError::ParentOrder { .. }));

        let err = TargetSkeleton::new(vec![
            Bone::new("a", None, Vector3::zeros()),
            Bone::new("a", Some(0), Vector3::zeros()),
        ])
        .unwrap_err();
        assert!(matches!(err, SkeletonError::DuplicateBone { .. }));
    }
}
