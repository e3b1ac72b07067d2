use nalgebra as na;
use rapier3d::{
    parry::{
        bounding_volume::Aabb,
        partitioning::{Bvh, BvhBuildStrategy},
        shape::{Shape, ShapeType},
    },
    prelude::{ColliderHandle, ColliderSet},
};

use super::{
    settings::QUERY_AABB_MARGIN,
    types::{Iso, Vec3},
};

/// Broad-phase accelerator over the colliders of a collision world.
///
/// Notes:
/// - Finite shapes are stored as world-space AABBs inside a BVH. `leaf_handles` maps each
///   BVH leaf back to its collider.
/// - Half-spaces are infinite, so they are kept in `plane_handles` and always tested.
pub struct WorldAccel {
    pub bvh: Bvh,
    pub leaf_handles: Vec<ColliderHandle>,
    pub plane_handles: Vec<ColliderHandle>,
}

impl WorldAccel {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.leaf_handles.is_empty() && self.plane_handles.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.leaf_handles.len() + self.plane_handles.len()
    }
}

/// Build the accelerator from the colliders' current positions.
///
/// Must be rebuilt after any collider moves.
pub fn build_world_accel(colliders: &ColliderSet) -> WorldAccel {
    let mut aabbs: Vec<Aabb> = Vec::new();
    let mut leaf_handles = Vec::new();
    let mut plane_handles = Vec::new();

    for (handle, collider) in colliders.iter() {
        if collider.shape().shape_type() == ShapeType::HalfSpace {
            plane_handles.push(handle);
        } else {
            aabbs.push(collider.compute_aabb());
            leaf_handles.push(handle);
        }
    }

    WorldAccel {
        bvh: Bvh::from_leaves(BvhBuildStrategy::Binned, &aabbs),
        leaf_handles,
        plane_handles,
    }
}

/// Candidate colliders whose AABB intersects `query`, planes first.
pub fn query_candidates(accel: &WorldAccel, query: &Aabb) -> Vec<ColliderHandle> {
    let mut out = accel.plane_handles.clone();
    out.extend(
        accel
            .bvh
            .intersect_aabb(query)
            .map(|leaf_idx| accel.leaf_handles[leaf_idx as usize]),
    );
    out
}

/// AABB enclosing the segment `from -> to`.
pub fn segment_aabb(from: &Vec3, to: &Vec3) -> Aabb {
    let mins = na::Point3::new(from.x.min(to.x), from.y.min(to.y), from.z.min(to.z));
    let maxs = na::Point3::new(from.x.max(to.x), from.y.max(to.y), from.z.max(to.z));
    aabb_inflate(&Aabb { mins, maxs }, QUERY_AABB_MARGIN)
}

/// AABB enclosing `shape` at both ends of a cast.
pub fn swept_shape_aabb(shape: &dyn Shape, from: &Iso, to: &Iso) -> Aabb {
    let swept = aabb_union(&shape.compute_aabb(from), &shape.compute_aabb(to));
    aabb_inflate(&swept, QUERY_AABB_MARGIN)
}

/// AABB of `shape` at `pose`, with margin.
pub fn shape_aabb(shape: &dyn Shape, pose: &Iso) -> Aabb {
    aabb_inflate(&shape.compute_aabb(pose), QUERY_AABB_MARGIN)
}

fn aabb_union(a: &Aabb, b: &Aabb) -> Aabb {
    let mins = na::Point3::new(
        a.mins.x.min(b.mins.x),
        a.mins.y.min(b.mins.y),
        a.mins.z.min(b.mins.z),
    );
    let maxs = na::Point3::new(
        a.maxs.x.max(b.maxs.x),
        a.maxs.y.max(b.maxs.y),
        a.maxs.z.max(b.maxs.z),
    );
    Aabb { mins, maxs }
}

fn aabb_inflate(a: &Aabb, margin: f32) -> Aabb {
    if margin <= 0.0 {
        return *a;
    }
    let delta = na::Vector3::new(margin, margin, margin);
    Aabb {
        mins: a.mins - delta,
        maxs: a.maxs + delta,
    }
}
