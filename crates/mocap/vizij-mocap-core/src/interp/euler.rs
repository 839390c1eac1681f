//! Euler angle conversion for the six Tait-Bryan orders.
//!
//! Angles are in degrees. An order `[i, j, k]` means `R = R_i(a) * R_j(b) * R_k(c)`,
//! which is how BVH composes a joint's rotation channels in declaration order.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    #[inline]
    pub fn unit(self) -> Unit<Vector3<f32>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

/// Rotation of `degrees` about a principal axis.
#[inline]
pub fn axis_rotation(axis: Axis, degrees: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&axis.unit(), degrees.to_radians())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RotationOrder {
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl RotationOrder {
    pub const ALL: [RotationOrder; 6] = [
        RotationOrder::Xyz,
        RotationOrder::Xzy,
        RotationOrder::Yxz,
        RotationOrder::Yzx,
        RotationOrder::Zxy,
        RotationOrder::Zyx,
    ];

    pub fn axes(self) -> [Axis; 3] {
        use Axis::*;
        match self {
            RotationOrder::Xyz => [X, Y, Z],
            RotationOrder::Xzy => [X, Z, Y],
            RotationOrder::Yxz => [Y, X, Z],
            RotationOrder::Yzx => [Y, Z, X],
            RotationOrder::Zxy => [Z, X, Y],
            RotationOrder::Zyx => [Z, Y, X],
        }
    }

    /// Order matching three distinct axes, `None` if any axis repeats.
    pub fn from_axes(axes: [Axis; 3]) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.axes() == axes)
    }

    /// Compose `R_i(a) * R_j(b) * R_k(c)` from angles given in this order.
    pub fn to_quat(self, degrees: [f32; 3]) -> UnitQuaternion<f32> {
        let [i, j, k] = self.axes();
        axis_rotation(i, degrees[0]) * axis_rotation(j, degrees[1]) * axis_rotation(k, degrees[2])
    }

    /// Decompose a rotation into angles for this order. The middle angle lies in
    /// [-90, 90]; at gimbal lock the split between the outer two is arbitrary.
    pub fn from_quat(self, q: &UnitQuaternion<f32>) -> [f32; 3] {
        let [i, j, k] = self.axes().map(Axis::index);
        let rot = q.to_rotation_matrix();
        let m = rot.matrix();
        let cyclic = matches!((i, j, k), (0, 1, 2) | (1, 2, 0) | (2, 0, 1));
        let s = if cyclic { 1.0 } else { -1.0 };

        let b = (s * m[(i, k)]).clamp(-1.0, 1.0).asin();
        let (a, c) = if (s * m[(i, k)]).abs() < 0.999_999 {
            (
                (-s * m[(j, k)]).atan2(m[(k, k)]),
                (-s * m[(i, j)]).atan2(m[(i, i)]),
            )
        } else {
            // Gimbal lock: fold everything into the first angle.
            ((s * m[(k, j)]).atan2(m[(j, j)]), 0.0)
        };
        [a.to_degrees(), b.to_degrees(), c.to_degrees()]
    }
}
