use rapier3d::{
    parry::{
        query::{self, Ray, RayCast, ShapeCastOptions},
        shape::Shape,
    },
    prelude::{Collider, ColliderHandle},
};

use super::{
    settings::CONTACT_PREDICTION,
    types::{Contact, Iso, Point3, RayHit, SweepHit, Vec3},
};

/// Cast the segment `from -> to` against one collider.
///
/// The ray direction is the unnormalized segment so the time of impact is already the
/// fraction along it.
pub fn ray_against_collider(
    handle: ColliderHandle,
    collider: &Collider,
    from: &Vec3,
    to: &Vec3,
) -> Option<RayHit> {
    let dir = to - from;
    let ray = Ray::new(Point3::from(*from), dir);
    let hit = collider
        .shape()
        .cast_ray_and_get_normal(collider.position(), &ray, 1.0, true)?;

    // A ray starting inside a solid reports a zero normal; face it back at the origin.
    let mut normal = hit.normal;
    if normal.norm_squared() < 1.0e-12 {
        normal = -dir.normalize();
    } else if normal.dot(&dir) > 0.0 {
        normal = -normal;
    }

    Some(RayHit {
        point: from + dir * hit.time_of_impact,
        normal,
        fraction: hit.time_of_impact,
        object: handle,
    })
}

/// Cast `shape` translating from `from` to `to` against one static collider.
///
/// Initial overlaps that separate along the cast are ignored, so a sweep that starts
/// touching a surface still finds what lies ahead.
pub fn sweep_against_collider(
    handle: ColliderHandle,
    collider: &Collider,
    shape: &dyn Shape,
    from: &Iso,
    to: &Iso,
) -> Option<SweepHit> {
    let vel = to.translation.vector - from.translation.vector;

    let mut opts = ShapeCastOptions::with_max_time_of_impact(1.0);
    opts.stop_at_penetration = false;
    let hit = query::cast_shapes(
        from,
        &vel,
        shape,
        collider.position(),
        &Vec3::zeros(),
        collider.shape(),
        opts,
    )
    .ok()
    .flatten()?;

    // Witness and normal on the static collider are in its local frame.
    let pose = collider.position();
    let mut normal = pose.rotation * hit.normal2.into_inner();
    if normal.dot(&vel) > 0.0 {
        normal = -normal;
    }

    Some(SweepHit {
        point: (pose * hit.witness2).coords,
        normal,
        fraction: hit.time_of_impact,
        object: handle,
    })
}

/// Closest manifold point between `shape` at `pose` and one collider, if touching.
pub fn contact_with_collider(
    handle: ColliderHandle,
    collider: &Collider,
    shape: &dyn Shape,
    pose: &Iso,
) -> Option<Contact> {
    // The solid goes first so `normal1` points out of it, toward the volume.
    let c = query::contact(
        collider.position(),
        collider.shape(),
        pose,
        shape,
        CONTACT_PREDICTION,
    )
    .ok()
    .flatten()?;

    Some(Contact {
        point: c.point1.coords,
        normal: c.normal1.into_inner(),
        distance: c.dist,
        object: handle,
    })
}
