//! Pose blending and masked layer composition.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::interp::functions::{lerp_vec3, slerp};
use crate::pose::{JointTransform, Pose};

/// Blend two transforms: slerp rotation, lerp translation.
#[inline]
pub fn blend_transforms(a: &JointTransform, b: &JointTransform, t: f32) -> JointTransform {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    JointTransform {
        translation: lerp_vec3(&a.translation, &b.translation, t),
        rotation: slerp(&a.rotation, &b.rotation, t),
    }
}

/// Blend `a` toward `b` bone by bone into `out`.
///
/// When the poses differ in length the common prefix is blended and the remaining
/// bones are copied from the longer pose.
pub fn blend_poses_into(a: &Pose, b: &Pose, t: f32, out: &mut Pose) {
    let common = a.len().min(b.len());
    let longer = if a.len() >= b.len() { a } else { b };
    out.0.clear();
    out.0.reserve(longer.len());
    for i in 0..common {
        out.0.push(blend_transforms(&a[i], &b[i], t));
    }
    out.0.extend_from_slice(&longer[common..]);
}

pub fn blend_poses(a: &Pose, b: &Pose, t: f32) -> Pose {
    let mut out = Pose::default();
    blend_poses_into(a, b, t, &mut out);
    out
}

/// Which bones a layer affects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bones", rename_all = "snake_case")]
pub enum BoneMask {
    #[default]
    All,
    Only(HashSet<usize>),
    Except(HashSet<usize>),
}

impl BoneMask {
    pub fn only(bones: impl IntoIterator<Item = usize>) -> Self {
        BoneMask::Only(bones.into_iter().collect())
    }

    pub fn except(bones: impl IntoIterator<Item = usize>) -> Self {
        BoneMask::Except(bones.into_iter().collect())
    }

    #[inline]
    pub fn affects(&self, bone: usize) -> bool {
        match self {
            BoneMask::All => true,
            BoneMask::Only(set) => set.contains(&bone),
            BoneMask::Except(set) => !set.contains(&bone),
        }
    }

    /// Resolve bone names through `lookup`; unknown names are ignored.
    pub fn only_named<'n, F>(names: impl IntoIterator<Item = &'n str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<usize>,
    {
        BoneMask::Only(names.into_iter().filter_map(|n| lookup(n)).collect())
    }

    pub fn except_named<'n, F>(names: impl IntoIterator<Item = &'n str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<usize>,
    {
        BoneMask::Except(names.into_iter().filter_map(|n| lookup(n)).collect())
    }
}

/// Blend `overlay` onto `base` for bones selected by `mask`.
///
/// `weight` is clamped to [0, 1]; 0 leaves `base` untouched and 1 replaces the masked
/// bones outright. Bones beyond the shorter pose are left as they are in `base`.
pub fn apply_layer(base: &mut Pose, overlay: &Pose, mask: &BoneMask, weight: f32) {
    let w = if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if w == 0.0 {
        return;
    }
    for (bone, (dst, src)) in base.iter_mut().zip(overlay.iter()).enumerate() {
        if mask.affects(bone) {
            *dst = blend_transforms(dst, src, w);
        }
    }
}
