//! Small analytic geometry helpers: planes, three-plane intersection and angles.

use std::f32::consts::{PI, TAU};

use nalgebra::Matrix3;

use crate::collision::types::{Quat, Vec3};

/// Determinant magnitude under which three planes are treated as parallel.
pub const PLANE_DET_EPS: f32 = 0.001;

/// Plane `normal · x + d = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            d: -normal.dot(&point),
        }
    }

    /// Signed distance scaled by the normal length.
    #[inline]
    pub fn distance(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Intersection point of three planes via Cramer's rule.
///
/// Returns `None` when `|det| < PLANE_DET_EPS`.
pub fn intersect_planes(a: &Plane, b: &Plane, c: &Plane) -> Option<Vec3> {
    let m = Matrix3::from_rows(&[
        a.normal.transpose(),
        b.normal.transpose(),
        c.normal.transpose(),
    ]);
    let det = m.determinant();
    if det.abs() < PLANE_DET_EPS {
        return None;
    }

    let rhs = Vec3::new(-a.d, -b.d, -c.d);
    let mut out = Vec3::zeros();
    for col in 0..3 {
        let mut mc = m;
        mc.set_column(col, &rhs);
        out[col] = mc.determinant() / det;
    }
    Some(out)
}

/// Wrap an angle to `[-PI, PI)`.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let mut r = (a + PI) % TAU;
    if r < 0.0 {
        r += TAU;
    }
    r - PI
}

/// Orientation for (yaw, pitch, roll). Yaw spins about +Z, pitch about the local right
/// axis and roll about the local forward axis. Yaw 0 faces +Y.
pub fn rotation_from_angles(yaw: f32, pitch: f32, roll: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::z_axis(), yaw)
        * Quat::from_axis_angle(&Vec3::x_axis(), pitch)
        * Quat::from_axis_angle(&Vec3::y_axis(), roll)
}

/// Yaw that makes the character face along `dir` (horizontal part only).
#[inline]
pub fn yaw_from_direction(dir: &Vec3) -> f32 {
    (-dir.x).atan2(dir.y)
}

#[inline]
pub fn horizontal(v: &Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, 0.0)
}
