//! Rapier-backed collision world used by the locomotion probes.
//!
//! Colliders live in a rapier `ColliderSet` built from plain definitions; queries go through
//! a parry BVH (`WorldAccel`) and the narrow-phase wrappers. Dynamic bodies can be moved
//! between ticks with [`RapierCollisionWorld::set_world_transform`].

use log::debug;
use rapier3d::{
    na::{Translation3, UnitQuaternion},
    parry::shape::Shape,
    prelude::*,
};

use super::{
    CollisionWorld,
    broad::{self, WorldAccel},
    narrow_phase,
    settings::MIN_CAST_LENGTH_SQ,
    types::{Contact, Iso, ObjectHandle, RayHit, SweepHit, Vec3},
};
use crate::constants::DEFAULT_GRAVITY_Z;

/// Schema-agnostic definition of a world collider.
///
/// Conventions
/// - Units are level units, Z is up.
/// - For planes the normal is derived from the pose as `rotation * +Z` and
///   `dist = dot(normal, translation) + offset_along_normal`.
#[derive(Clone, Debug)]
pub struct BodyDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    pub translation: Vector<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub shape: ColliderShapeDef,
}

impl BodyDef {
    pub fn new(id: u32, translation: Vector<f32>, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            translation,
            rotation: UnitQuaternion::identity(),
            shape,
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Supported collider shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite half-space; solid lies behind `rotation * +Z`.
    Plane { offset_along_normal: f32 },

    /// Oriented cuboid with given half-extents.
    Cuboid { half_extents: Vector<f32> },

    Sphere { radius: f32 },

    /// Z-aligned capsule.
    CapsuleZ { radius: f32, half_height: f32 },

    /// Triangle soup, vertices in the body's local frame.
    TriMesh {
        vertices: Vec<Point<f32>>,
        indices: Vec<[u32; 3]>,
    },
}

/// Build a rapier collider positioned at the definition's pose.
pub fn collider_from_def(def: &BodyDef) -> Option<Collider> {
    let iso = Isometry::from_parts(Translation3::from(def.translation), def.rotation);

    let mut collider = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // n = R * +Z, and the plane `n . x = dist` passes through `n * dist`.
            let n = def.rotation * Vector::z();
            let dist = n.dot(&def.translation) + *offset_along_normal;
            let unit_n = UnitVector::new_normalize(n);
            return Some(
                ColliderBuilder::halfspace(unit_n)
                    .translation(unit_n.into_inner() * dist)
                    .build(),
            );
        }

        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build()
        }

        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius).build(),

        ColliderShapeDef::CapsuleZ {
            radius,
            half_height,
        } => ColliderBuilder::capsule_z(*half_height, *radius).build(),

        ColliderShapeDef::TriMesh { vertices, indices } => {
            match ColliderBuilder::trimesh(vertices.clone(), indices.clone()) {
                Ok(builder) => builder.build(),
                Err(err) => {
                    debug!("skipping trimesh body {}: {err:?}", def.id);
                    return None;
                }
            }
        }
    };

    collider.set_position(iso);
    Some(collider)
}

/// In-memory collision world: colliders plus a BVH over them.
pub struct RapierCollisionWorld {
    colliders: ColliderSet,
    accel: WorldAccel,
    handles_by_id: Vec<(u32, ColliderHandle)>,
    gravity: Vec3,
}

impl RapierCollisionWorld {
    /// Build a world from body definitions.
    ///
    /// Determinism: the input is sorted by `id` before insertion.
    pub fn build(mut defs: Vec<BodyDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let mut colliders = ColliderSet::new();
        let mut handles_by_id = Vec::with_capacity(defs.len());
        for def in &defs {
            if let Some(collider) = collider_from_def(def) {
                handles_by_id.push((def.id, colliders.insert(collider)));
            }
        }

        let accel = broad::build_world_accel(&colliders);
        Self {
            colliders,
            accel,
            handles_by_id,
            gravity: Vec3::new(0.0, 0.0, DEFAULT_GRAVITY_Z),
        }
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Handle of the body created from definition `id`.
    pub fn handle_of(&self, id: u32) -> Option<ObjectHandle> {
        self.handles_by_id
            .iter()
            .find(|(def_id, _)| *def_id == id)
            .map(|(_, h)| *h)
    }

    /// Move a body and refresh the broad phase. Returns false for unknown handles.
    pub fn set_world_transform(&mut self, object: ObjectHandle, pose: Iso) -> bool {
        let Some(collider) = self.colliders.get_mut(object) else {
            return false;
        };
        collider.set_position(pose);
        self.accel = broad::build_world_accel(&self.colliders);
        true
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }
}

impl CollisionWorld for RapierCollisionWorld {
    fn ray_test(&self, from: &Vec3, to: &Vec3) -> Option<RayHit> {
        if (to - from).norm_squared() < MIN_CAST_LENGTH_SQ {
            return None;
        }

        let query = broad::segment_aabb(from, to);
        broad::query_candidates(&self.accel, &query)
            .into_iter()
            .filter_map(|h| {
                let collider = self.colliders.get(h)?;
                narrow_phase::ray_against_collider(h, collider, from, to)
            })
            .min_by(|a, b| a.fraction.total_cmp(&b.fraction))
    }

    fn convex_sweep_test(&self, shape: &dyn Shape, from: &Iso, to: &Iso) -> Option<SweepHit> {
        if (to.translation.vector - from.translation.vector).norm_squared() < MIN_CAST_LENGTH_SQ {
            return None;
        }

        let query = broad::swept_shape_aabb(shape, from, to);
        broad::query_candidates(&self.accel, &query)
            .into_iter()
            .filter_map(|h| {
                let collider = self.colliders.get(h)?;
                narrow_phase::sweep_against_collider(h, collider, shape, from, to)
            })
            .min_by(|a, b| a.fraction.total_cmp(&b.fraction))
    }

    fn contacts(&self, shape: &dyn Shape, pose: &Iso, out: &mut Vec<Contact>) {
        let query = broad::shape_aabb(shape, pose);
        for h in broad::query_candidates(&self.accel, &query) {
            let Some(collider) = self.colliders.get(h) else {
                continue;
            };
            if let Some(contact) = narrow_phase::contact_with_collider(h, collider, shape, pose) {
                out.push(contact);
            }
        }
    }

    fn world_transform(&self, object: ObjectHandle) -> Option<Iso> {
        self.colliders.get(object).map(|c| *c.position())
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::parry::shape::Capsule;

    fn floor_and_box() -> RapierCollisionWorld {
        RapierCollisionWorld::build(vec![
            BodyDef::new(
                2,
                vector![0.0, 2048.0, 512.0],
                ColliderShapeDef::Cuboid {
                    half_extents: vector![512.0, 512.0, 512.0],
                },
            ),
            BodyDef::new(
                1,
                Vector::zeros(),
                ColliderShapeDef::Plane {
                    offset_along_normal: 0.0,
                },
            ),
        ])
    }

    #[test]
    fn ray_down_hits_floor_plane() {
        let world = floor_and_box();
        let hit = world
            .ray_test(&Vec3::new(0.0, 0.0, 500.0), &Vec3::new(0.0, 0.0, -500.0))
            .unwrap();
        assert!(hit.point.z.abs() < 1e-3);
        assert!((hit.normal - Vec3::z()).norm() < 1e-4);
        assert!((hit.fraction - 0.5).abs() < 1e-4);
        assert_eq!(Some(hit.object), world.handle_of(1));
    }

    #[test]
    fn ray_picks_closest_of_several() {
        let world = floor_and_box();
        // Straight down onto the top of the box (z = 1024).
        let hit = world
            .ray_test(&Vec3::new(0.0, 2048.0, 2000.0), &Vec3::new(0.0, 2048.0, -10.0))
            .unwrap();
        assert!((hit.point.z - 1024.0).abs() < 1e-2);
        assert_eq!(Some(hit.object), world.handle_of(2));
    }

    #[test]
    fn sweep_hits_box_face() {
        let world = floor_and_box();
        let capsule = Capsule::new_z(100.0, 50.0);
        let from = Iso::translation(0.0, 0.0, 400.0);
        let to = Iso::translation(0.0, 2048.0, 400.0);
        let hit = world.convex_sweep_test(&capsule, &from, &to).unwrap();
        // Box near face is at y = 1536, capsule radius 50.
        let travelled = hit.fraction * 2048.0;
        assert!((travelled - 1486.0).abs() < 1.0, "travelled {travelled}");
        assert!((hit.normal - (-Vec3::y())).norm() < 1e-3);
    }

    #[test]
    fn contacts_report_penetration_depth() {
        let world = floor_and_box();
        let capsule = Capsule::new_z(100.0, 50.0);
        // Bottom of the capsule at z = -20.
        let pose = Iso::translation(0.0, 0.0, 130.0);
        let mut out = Vec::new();
        world.contacts(&capsule, &pose, &mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0].distance + 20.0).abs() < 1e-2);
        assert!((out[0].normal - Vec3::z()).norm() < 1e-3);
    }

    #[test]
    fn capsule_clear_of_the_floor_has_no_contact() {
        let world = floor_and_box();
        let capsule = Capsule::new_z(100.0, 50.0);
        let mut out = Vec::new();
        // Bottom 150 above the plane.
        world.contacts(&capsule, &Iso::translation(0.0, 0.0, 300.0), &mut out);
        assert!(out.iter().all(|c| c.distance >= 0.0), "{out:?}");

        // Resting exactly on it.
        out.clear();
        world.contacts(&capsule, &Iso::translation(0.0, 0.0, 150.0), &mut out);
        assert!(out.iter().all(|c| c.distance.abs() < 1e-2), "{out:?}");
    }

    #[test]
    fn moving_a_body_updates_queries() {
        let mut world = floor_and_box();
        let handle = world.handle_of(2).unwrap();
        assert!(world.set_world_transform(handle, Iso::translation(0.0, 0.0, 512.0)));

        let hit = world
            .ray_test(&Vec3::new(0.0, 0.0, 2000.0), &Vec3::new(0.0, 0.0, -10.0))
            .unwrap();
        assert_eq!(hit.object, handle);
        assert_eq!(world.world_transform(handle), Some(Iso::translation(0.0, 0.0, 512.0)));
    }
}
