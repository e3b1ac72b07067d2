/*!
Collision root module.

The locomotion core consumes the collision world as an opaque service through the
[`CollisionWorld`] trait: segment casts, convex sweeps, overlapping contacts and body
transforms. A rapier/parry-backed implementation is provided:

- types:         shared data types (hits, contacts, capsule specs)
- settings:      query tolerances
- broad:         BVH accelerator and query AABB helpers
- narrow_phase:  thin wrappers over parry ray, shape-cast and contact queries
- rapier_world:  `RapierCollisionWorld` built from body definitions
*/

pub mod broad;
pub mod narrow_phase;
pub mod rapier_world;
pub mod settings;
pub mod types;

use rapier3d::parry::shape::Shape;

pub use rapier_world::{BodyDef, ColliderShapeDef, RapierCollisionWorld, collider_from_def};
pub use types::{
    CapsuleAxis, CapsuleSpec, Contact, Iso, ObjectHandle, Point3, Quat, RayHit, SweepHit, Vec3,
};

/// Queries the character controller needs from the physics collaborator.
///
/// Implementations must be deterministic for a given world state. All results are
/// world-space.
pub trait CollisionWorld {
    /// Closest hit along the segment `from -> to`.
    fn ray_test(&self, from: &Vec3, to: &Vec3) -> Option<RayHit>;

    /// Earliest hit of `shape` translating from `from` to `to`.
    fn convex_sweep_test(&self, shape: &dyn Shape, from: &Iso, to: &Iso) -> Option<SweepHit>;

    /// Append every manifold point between `shape` at `pose` and the world.
    fn contacts(&self, shape: &dyn Shape, pose: &Iso, out: &mut Vec<Contact>);

    fn world_transform(&self, object: ObjectHandle) -> Option<Iso>;

    fn gravity(&self) -> Vec3;
}
