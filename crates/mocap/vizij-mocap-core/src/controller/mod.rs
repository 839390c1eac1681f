//! Animation state machine over mocap, static and procedural motion sources.

pub mod blend_tree;
pub mod layers;
pub mod machine;
pub mod state;
pub mod transition;

pub use blend_tree::{BlendEntry, BlendTree1D};
pub use layers::{AnimLayer, LayeredController};
pub use machine::{AnimController, BlendState, ControllerBuilder};
pub use state::{AnimState, MotionSource, Parameters, ProceduralFn, ProceduralPose};
pub use transition::{Comparison, Transition, TransitionCondition};
