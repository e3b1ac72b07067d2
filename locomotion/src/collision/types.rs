/*!
Collision data types and math aliases shared by the collision submodules and the
character code.

This module contains no algorithms. It defines what the collision world hands back to
the probes, the climb detector and the penetration resolver:
- `RayHit`:    closest hit of a segment cast
- `SweepHit`:  earliest time of impact of a convex cast
- `Contact`:   one overlapping manifold point, normal pointing out of the solid

All vectors are world-space and Z is up.
*/

use nalgebra as na;
use rapier3d::prelude::ColliderHandle;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Identifier of a collision object (static geometry or a dynamic body).
pub type ObjectHandle = ColliderHandle;

#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub point: Vec3,
    /// Surface normal at `point`, facing the ray origin.
    pub normal: Vec3,
    /// Fraction (0..1) of `to - from` where the hit occurred.
    pub fraction: f32,
    pub object: ObjectHandle,
}

#[derive(Clone, Copy, Debug)]
pub struct SweepHit {
    /// Contact point on the hit object.
    pub point: Vec3,
    /// Surface normal of the hit object at `point`.
    pub normal: Vec3,
    /// Fraction (0..1) of the cast where the hit occurred.
    pub fraction: f32,
    pub object: ObjectHandle,
}

/// A single manifold point between a query volume and a solid.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// Contact point on the solid.
    pub point: Vec3,
    /// Unit normal pointing out of the solid, toward the query volume.
    pub normal: Vec3,
    /// Signed separation; negative while penetrating.
    pub distance: f32,
    pub object: ObjectHandle,
}

/// Capsule orientation in the character's local frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapsuleAxis {
    /// Upright, along local +Z.
    Vertical,
    /// Lying along the local forward axis (+Y), used while swimming.
    Forward,
}

/// Capsule specification for a character volume.
///
/// `half_height` is the half-length of the cylinder section, so the total length is
/// `2 * half_height + 2 * radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleSpec {
    pub radius: f32,
    pub half_height: f32,
    pub axis: CapsuleAxis,
}
