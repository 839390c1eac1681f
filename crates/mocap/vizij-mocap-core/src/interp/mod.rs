//! Interpolation helpers.
//!
//! `functions` holds scalar/vector lerp, quaternion slerp with shortest-arc sign
//! correction, and the easing curves used for blend progress. `euler` converts
//! channel-ordered Euler triples to and from quaternions.

pub mod euler;
pub mod functions;

pub use euler::{Axis, RotationOrder};
pub use functions::{lerp_f32, lerp_vec3, nlerp, normalize_quat, slerp, Easing};
