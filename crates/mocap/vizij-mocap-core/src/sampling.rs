//! Clip sampling: per-joint local transforms at a frame index or a continuous time.
//!
//! Model:
//! - A joint's raw values are the `channels.len()` floats at
//!   `frame * total_channels + channel_offset`.
//! - Translation axes without a channel keep the joint's rest offset; rotation axes
//!   without a channel are zero.
//! - Rotation channels compose in declaration order and are converted to a quaternion
//!   before any interpolation.
//! - Continuous time maps to `time / frame_time`, clamped to `[0, frame_count - 1]`.
//!   Times within [`FRAME_SNAP_EPSILON`] of a frame return that frame's values verbatim.

use nalgebra::{UnitQuaternion, Vector3};

use crate::clip::Clip;
use crate::interp::euler::axis_rotation;
use crate::interp::functions::{lerp_vec3, slerp};
use crate::pose::{JointTransform, Pose};

/// Fractional-frame distance under which sampling snaps to the nearest stored frame.
pub const FRAME_SNAP_EPSILON: f32 = 1e-4;

/// Raw channel values for `joint` at `frame`, in declaration order.
///
/// `frame` is clamped to the last frame. Panics if `joint` is out of range.
pub fn sample_channels(clip: &Clip, joint: usize, frame: usize) -> &[f32] {
    let j = &clip.joints()[joint];
    let row = clip.frame_values(frame);
    &row[j.channel_offset..j.channel_offset + j.channels.len()]
}

/// Local transform of `joint` at a stored frame.
pub fn sample_frame(clip: &Clip, joint: usize, frame: usize) -> JointTransform {
    let j = &clip.joints()[joint];
    let values = sample_channels(clip, joint, frame);
    let mut translation = j.offset;
    let mut rotation = UnitQuaternion::identity();
    for (channel, value) in j.channels.iter().zip(values) {
        if channel.is_translation() {
            translation[channel.axis().index()] = *value;
        } else {
            rotation *= axis_rotation(channel.axis(), *value);
        }
    }
    JointTransform {
        translation,
        rotation,
    }
}

/// Split a time in seconds into `(frame, next_frame, t)`.
pub fn frame_position(clip: &Clip, time: f32) -> (usize, usize, f32) {
    let last = clip.frame_count() - 1;
    let raw = if time.is_finite() {
        time / clip.frame_time()
    } else {
        0.0
    };
    let f = raw.clamp(0.0, last as f32);
    let nearest = f.round();
    if (f - nearest).abs() <= FRAME_SNAP_EPSILON {
        let frame = nearest as usize;
        return (frame, frame, 0.0);
    }
    let f0 = f.floor() as usize;
    let f1 = (f0 + 1).min(last);
    (f0, f1, f - f0 as f32)
}

/// Local transform of `joint` at `time` seconds.
pub fn sample_interpolated(clip: &Clip, joint: usize, time: f32) -> JointTransform {
    let (f0, f1, t) = frame_position(clip, time);
    let a = sample_frame(clip, joint, f0);
    if f0 == f1 {
        return a;
    }
    let b = sample_frame(clip, joint, f1);
    JointTransform {
        translation: lerp_vec3(&a.translation, &b.translation, t),
        rotation: slerp(&a.rotation, &b.rotation, t),
    }
}

/// Sample every joint of `clip` at `time` into `out`, resizing it to the joint count.
pub fn sample_pose_into(clip: &Clip, time: f32, out: &mut Pose) {
    out.resize(clip.joint_count());
    for (joint, slot) in out.iter_mut().enumerate() {
        *slot = sample_interpolated(clip, joint, time);
    }
}

pub fn sample_pose(clip: &Clip, time: f32) -> Pose {
    let mut out = Pose::default();
    sample_pose_into(clip, time, &mut out);
    out
}

/// Rest pose of the clip's own skeleton: offsets only, no rotation.
pub fn rest_pose(clip: &Clip) -> Pose {
    clip.joints()
        .iter()
        .map(|j| JointTransform::from_translation(j.offset))
        .collect::<Vec<_>>()
        .into()
}

impl Clip {
    /// See [`sample_frame`].
    #[inline]
    pub fn sample(&self, joint: usize, frame: usize) -> JointTransform {
        sample_frame(self, joint, frame)
    }

    /// See [`sample_interpolated`].
    #[inline]
    pub fn sample_interpolated(&self, joint: usize, time: f32) -> JointTransform {
        sample_interpolated(self, joint, time)
    }

    /// See [`sample_channels`].
    #[inline]
    pub fn sample_channels(&self, joint: usize, frame: usize) -> &[f32] {
        sample_channels(self, joint, frame)
    }

    /// See [`sample_pose`].
    #[inline]
    pub fn sample_pose(&self, time: f32) -> Pose {
        sample_pose(self, time)
    }

    /// Rest-pose translation of `joint`.
    #[inline]
    pub fn rest_offset(&self, joint: usize) -> Option<Vector3<f32>> {
        self.joint(joint).map(|j| j.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Channel, Joint};
    use crate::interp::RotationOrder;
    use approx::assert_relative_eq;

    fn spinning_clip() -> Clip {
        let mut root = Joint::new("Root", None, Vector3::new(0.0, 1.0, 0.0));
        root.channels = vec![Channel::Yposition, Channel::Zrotation];
        let values = vec![5.0, 0.0, 7.0, 90.0, 9.0, 180.0];
        Clip::new(vec![root], 3, 0.1, values).unwrap()
    }

    #[test]
    fn missing_translation_axes_keep_rest_offset() {
        let clip = spinning_clip();
        let t = clip.sample(0, 1);
        assert_eq!(t.translation, Vector3::new(0.0, 7.0, 0.0));
        let euler = t.euler_degrees(RotationOrder::Zxy);
        assert_relative_eq!(euler[0], 90.0, epsilon = 1e-4);
    }

    #[test]
    fn frame_boundaries_are_verbatim() {
        let clip = spinning_clip();
        let exact = clip.sample_interpolated(0, 0.1);
        assert_eq!(exact, clip.sample(0, 1));
        // Float error in the division must not leak into the result.
        let near = clip.sample_interpolated(0, 0.3 - 0.1);
        assert_eq!(near, clip.sample(0, 2));
    }

    #[test]
    fn interpolates_between_frames_and_clamps() {
        let clip = spinning_clip();
        let mid = clip.sample_interpolated(0, 0.05);
        assert_relative_eq!(mid.translation.y, 6.0, epsilon = 1e-5);
        assert_relative_eq!(mid.rotation.angle(), 45f32.to_radians(), epsilon = 1e-4);

        assert_eq!(clip.sample_interpolated(0, -1.0), clip.sample(0, 0));
        assert_eq!(clip.sample_interpolated(0, 10.0), clip.sample(0, 2));
        assert_eq!(clip.sample_pose(0.1)[0], clip.sample(0, 1));
    }

    #[test]
    fn raw_channels_are_exposed_in_declaration_order() {
        let clip = spinning_clip();
        assert_eq!(clip.sample_channels(0, 2), &[9.0, 180.0]);
    }
}
