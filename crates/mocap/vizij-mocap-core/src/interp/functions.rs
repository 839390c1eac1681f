//! Interpolation primitives shared by the clip sampler, the pose blender and the
//! controller.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Above this |dot| two rotations are treated as nearly identical and blended linearly.
pub const SLERP_DOT_THRESHOLD: f32 = 0.9995;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: &Vector3<f32>, b: &Vector3<f32>, t: f32) -> Vector3<f32> {
    Vector3::new(
        lerp_f32(a.x, b.x, t),
        lerp_f32(a.y, b.y, t),
        lerp_f32(a.z, b.z, t),
    )
}

/// Normalize a raw quaternion, falling back to identity for zero or non-finite input.
#[inline]
pub fn normalize_quat(q: Quaternion<f32>) -> UnitQuaternion<f32> {
    let n = q.norm();
    if n > f32::EPSILON && n.is_finite() {
        UnitQuaternion::new_unchecked(q / n)
    } else {
        UnitQuaternion::identity()
    }
}

/// Quaternion NLERP with shortest-arc correction.
#[inline]
pub fn nlerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    let qa = a.into_inner();
    let mut qb = b.into_inner();
    if qa.dot(&qb) < 0.0 {
        qb = -qb;
    }
    normalize_quat(qa.lerp(&qb, t))
}

/// Spherical interpolation along the shorter arc.
///
/// `t <= 0` returns `a` and `t >= 1` returns `b` exactly. When the inputs are within
/// [`SLERP_DOT_THRESHOLD`] of each other the result is a renormalized linear blend.
pub fn slerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    let qa = a.into_inner();
    let mut qb = b.into_inner();
    let mut dot = qa.dot(&qb);
    if dot < 0.0 {
        qb = -qb;
        dot = -dot;
    }
    if dot > SLERP_DOT_THRESHOLD {
        return normalize_quat(qa.lerp(&qb, t));
    }
    let theta_0 = dot.min(1.0).acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = theta.sin() / sin_theta_0;
    normalize_quat(qa * s0 + qb * s1)
}

/// Cubic Hermite ease, zero slope at both ends.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Quadratic ease-in/ease-out.
#[inline]
pub fn ease_in_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Curve applied to blend progress before poses are mixed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    #[default]
    Smoothstep,
    QuadInOut,
}

impl Easing {
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t.clamp(0.0, 1.0),
            Easing::Smoothstep => smoothstep(t),
            Easing::QuadInOut => ease_in_out_quad(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn rot(axis: Vector3<f32>, deg: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(axis), deg.to_radians())
    }

    /// |dot| of two rotations; 1 when they are the same orientation.
    fn alignment(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>) -> f32 {
        a.quaternion().dot(b.quaternion()).abs()
    }

    #[test]
    fn slerp_endpoints_are_exact() {
        let a = rot(Vector3::x(), 30.0);
        let b = rot(Vector3::y(), 120.0);
        assert_eq!(slerp(&a, &b, 0.0), a);
        assert_eq!(slerp(&a, &b, 1.0), b);
        assert_eq!(slerp(&a, &b, -3.0), a);
        assert_eq!(slerp(&a, &b, 2.0), b);
    }

    #[test]
    fn slerp_of_identical_inputs_is_stable() {
        let a = rot(Vector3::new(1.0, 2.0, 3.0), 71.0);
        for t in [0.1, 0.25, 0.5, 0.9] {
            let q = slerp(&a, &a, t);
            assert_relative_eq!(alignment(&q, &a), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn slerp_takes_the_short_arc() {
        let a = rot(Vector3::z(), 10.0);
        let b = UnitQuaternion::new_unchecked(-rot(Vector3::z(), 50.0).into_inner());
        let mid = slerp(&a, &b, 0.5);
        assert_relative_eq!(alignment(&mid, &rot(Vector3::z(), 30.0)), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn slerp_midpoint_halves_the_angle() {
        let a = UnitQuaternion::identity();
        let b = rot(Vector3::y(), 90.0);
        let mid = slerp(&a, &b, 0.5);
        assert_relative_eq!(mid.angle(), 45f32.to_radians(), epsilon = 1e-5);
    }

    #[test]
    fn zero_quaternion_normalizes_to_identity() {
        let q = normalize_quat(Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(q, UnitQuaternion::identity());
    }

    #[test]
    fn easing_curves_hit_endpoints() {
        for e in [Easing::Linear, Easing::Smoothstep, Easing::QuadInOut] {
            assert_eq!(e.apply(0.0), 0.0);
            assert_eq!(e.apply(1.0), 1.0);
            assert_relative_eq!(e.apply(0.5), 0.5, epsilon = 1e-6);
        }
        assert!(smoothstep(0.25) < 0.25);
    }
}
