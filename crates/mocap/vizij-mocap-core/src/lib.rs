//! Vizij Mocap Core (engine-agnostic)
//!
//! Motion-capture ingestion and pose blending: parse BVH recordings into an immutable
//! [`Clip`], retarget them onto a runtime [`TargetSkeleton`] through a [`SkeletonMap`],
//! and drive an [`AnimController`] state machine that cross-fades between retargeted
//! clips, static poses and procedural motion. The controller emits one local
//! transform per target bone each tick; [`TargetSkeleton::bone_matrices`] turns that
//! into world matrices for a skinned-mesh renderer.

pub mod baking;
pub mod blend;
pub mod bvh;
pub mod clip;
pub mod config;
pub mod controller;
pub mod error;
pub mod ids;
pub mod ik;
pub mod inputs;
pub mod interp;
pub mod loaders;
pub mod outputs;
pub mod pose;
pub mod retarget;
pub mod sampling;
pub mod scratch;
pub mod skeleton;

// Re-exports for consumers (adapters)
pub use baking::{bake_retargeted, bake_with_matrices, export_baked_json, BakedClip, BakingConfig};
pub use blend::{apply_layer, blend_poses, blend_transforms, BoneMask};
pub use bvh::parse_bvh;
pub use clip::{Channel, Clip, Joint};
pub use config::Config;
pub use controller::{
    AnimController, AnimLayer, AnimState, BlendTree1D, ControllerBuilder, LayeredController,
    MotionSource, ProceduralFn, ProceduralPose, Transition, TransitionCondition,
};
pub use error::{
    ClipError, ControllerError, LoadError, MapError, ParseError, ParseErrorKind, RetargetError,
    SkeletonError,
};
pub use ids::{LayerId, StateId};
pub use ik::TwoBoneIk;
pub use inputs::{Inputs, ParameterUpdate};
pub use interp::{slerp, Easing, RotationOrder};
pub use loaders::{parse_skeleton_map_json, parse_target_skeleton_json};
pub use outputs::{ControllerEvent, Outputs};
pub use pose::{BoneMatrix, JointTransform, Pose};
pub use retarget::{
    auto_map, calculate_tpose_offset, BoneMapping, LimbLengths, LimbProportions, MappingReport,
    RetargetSettings, Retargeted, Retargeter, SkeletonMap,
};
pub use skeleton::{Bone, TargetSkeleton};

pub use nalgebra::{UnitQuaternion, Vector3};
