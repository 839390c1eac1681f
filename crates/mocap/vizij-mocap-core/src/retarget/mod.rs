//! Retargeting recorded motion onto a runtime skeleton.
//!
//! A [`SkeletonMap`] names which clip joint drives which target bone, with a rest-pose
//! correction and a position scale per entry. [`Retargeter`] binds a map to one clip
//! so per-tick sampling has no lookups or error paths.

pub mod auto_map;
pub mod proportions;
pub mod retargeter;
pub mod skeleton_map;

pub use auto_map::{auto_map, canonical_name, Side};
pub use proportions::{Limb, LimbChain, LimbLengths, LimbProportions};
pub use retargeter::Retargeter;
pub use skeleton_map::{
    calculate_tpose_offset, BoneMapping, MappingReport, RetargetSettings, Retargeted, SkeletonMap,
};
