//! Edge and wall climbability.
//!
//! An edge is the line where a walkable top surface meets a near-vertical wall. Its
//! hang point is the intersection of the floor plane, the wall plane and the vertical
//! plane through the character spanned by its forward and up axes.

use rapier3d::parry::shape::Ball;

use crate::{
    collision::{Iso, ObjectHandle, SweepHit, Vec3},
    context::SimulationContext,
    flags::SectorFlag,
    math::{Plane, horizontal, intersect_planes, yaw_from_direction},
};

use super::Character;

/// Surfaces with a steeper normal than this are not treated as an edge top.
const FLOOR_NORMAL_MIN_Z: f32 = 0.1;

/// Hands and feet ray heights as fractions of the body height.
const WALL_HANDS_HEIGHT: f32 = 0.9;
const WALL_FEET_HEIGHT: f32 = 0.25;

/// Headroom over an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClimbClearance {
    #[default]
    None,
    /// Enough room to climb up, but not to stand.
    CanClimbUp,
    /// Full standing clearance above the edge.
    Unobstructed,
    /// Only the edge itself can be used (hang or shimmy).
    EdgeOnly,
}

impl ClimbClearance {
    pub const fn bits(self) -> u8 {
        match self {
            ClimbClearance::None => 0x00,
            ClimbClearance::CanClimbUp => 0x01,
            ClimbClearance::Unobstructed => 0x03,
            ClimbClearance::EdgeOnly => 0x08,
        }
    }

    pub fn can_climb_up(self) -> bool {
        self.bits() & 0x01 != 0
    }
}

/// Climbable wall (ladder) coverage in front of the character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WallHit {
    #[default]
    None,
    /// Only the hands reach a climbable wall.
    Partial,
    FullBody,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClimbInfo {
    pub edge_hit: bool,
    pub edge_point: Vec3,
    /// Horizontal unit normal of the edge, pointing back toward the character.
    pub edge_normal: Vec3,
    /// Horizontal unit tangent, oriented along the character's right axis.
    pub edge_tangent: Vec3,
    /// Yaw that faces the edge.
    pub edge_z_angle: f32,
    pub edge_object: Option<ObjectHandle>,
    /// Vertical space above the edge's top surface.
    pub next_z_space: f32,
    pub clearance: ClimbClearance,
    pub can_hang: bool,
    pub ceiling_limit: f32,
    pub floor_limit: f32,
    /// Hang anchor.
    pub point: Vec3,
    pub wall_hit: WallHit,
    pub wall_point: Vec3,
    pub wall_normal: Vec3,
}

/// Slant rejection: `n` is the cross product of the floor and wall normals, i.e. the
/// edge direction. An edge tilted too far out of the horizontal is unclimbable.
#[inline]
pub fn is_unclimbable_slant(n: &Vec3, tolerance: f32) -> bool {
    n.z * n.z > tolerance * tolerance * n.norm_squared()
}

impl Character {
    /// Look for a hangable edge around `self.position + offset`.
    ///
    /// `test_height` is the lowest clearance above the feet worth searching; it is
    /// raised to the maximum step height.
    pub fn check_climbability(
        &self,
        sim: &SimulationContext<'_>,
        offset: &Vec3,
        test_height: f32,
    ) -> ClimbInfo {
        let cfg = &self.config;
        let r = cfg.climb_r;
        let pos = self.position;
        let fwd = self.forward_xy();
        let right = self.right_xy();
        let sensor = Ball::new(r);
        let sweep = |from: Vec3, to: Vec3| -> Option<SweepHit> {
            sim.world
                .convex_sweep_test(&sensor, &Iso::translation(from.x, from.y, from.z), &Iso::translation(to.x, to.y, to.z))
        };

        // Ceiling straight above the body centre.
        let centre = pos + Vec3::new(0.0, 0.0, self.body_height() * 0.5);
        let ceiling = sim
            .world
            .ray_test(&centre, &(centre + Vec3::new(0.0, 0.0, cfg.probe_distance)))
            .map(|h| h.point.z);

        let mut ret = ClimbInfo {
            floor_limit: self.height_info.floor_z().unwrap_or(f32::MIN),
            ceiling_limit: ceiling.unwrap_or(f32::MAX),
            point: self.climb.point,
            ..Default::default()
        };

        // Clamp the candidate just below the ceiling.
        let mut target = pos + offset;
        if let Some(c) = ceiling {
            target.z = target.z.min(c - r - 1.0);
        }

        let test_height = test_height.max(cfg.max_step_up_height);
        let bottom = pos.z + self.body_height() - test_height;
        if target.z < bottom {
            return ret;
        }

        // Top surface: straight down from the candidate, then sideways along forward.
        let floor_hit = sweep(target, Vec3::new(target.x, target.y, bottom))
            .filter(|h| h.normal.z >= FLOOR_NORMAL_MIN_Z && h.fraction > 0.0)
            .or_else(|| {
                sweep(target - fwd * (2.0 * r), target + fwd * r)
                    .filter(|h| h.normal.z >= FLOOR_NORMAL_MIN_Z)
            });
        let Some(floor_hit) = floor_hit else {
            return ret;
        };
        let floor_plane = Plane::from_point_normal(floor_hit.point, floor_hit.normal);

        // Wall: sweep toward the candidate, stepping down one climb radius at a time.
        let side_plane = Plane::from_point_normal(pos, right);
        let mut z = floor_hit.point.z - r;
        let mut found = None;
        while z >= bottom {
            let from = Vec3::new(pos.x, pos.y, z);
            let to = Vec3::new(target.x, target.y, z) + fwd * r;
            if let Some(wall) = sweep(from, to).filter(|h| h.normal.z.abs() < FLOOR_NORMAL_MIN_Z) {
                let wall_plane = Plane::from_point_normal(wall.point, wall.normal);
                if let Some(edge) = intersect_planes(&floor_plane, &wall_plane, &side_plane) {
                    found = Some((edge, wall));
                    break;
                }
            }
            z -= r;
        }
        let Some((edge, wall)) = found else {
            return ret;
        };

        let n = floor_hit.normal.cross(&wall.normal);
        if is_unclimbable_slant(&n, cfg.critical_slant_z_component) {
            return ret;
        }
        let flat = horizontal(&n);
        if flat.norm_squared() < 1.0e-8 {
            return ret;
        }

        let mut tangent = flat.normalize();
        if tangent.dot(&right) < 0.0 {
            tangent = -tangent;
        }
        let edge_normal = tangent.cross(&Vec3::z());

        ret.edge_hit = true;
        ret.edge_point = edge;
        ret.edge_tangent = tangent;
        ret.edge_normal = edge_normal;
        ret.edge_z_angle = yaw_from_direction(&-edge_normal);
        ret.edge_object = Some(wall.object);
        ret.point = edge;
        ret.can_hang = self
            .height_info
            .floor_z()
            .is_none_or(|f| edge.z - f >= cfg.height);

        // Headroom measured just past the edge, over the top surface.
        let over = edge - edge_normal * (r * 2.0) + Vec3::new(0.0, 0.0, 1.0);
        ret.next_z_space = sim
            .world
            .ray_test(&over, &(over + Vec3::new(0.0, 0.0, cfg.probe_distance)))
            .map_or(cfg.probe_distance, |h| h.point.z - edge.z);
        ret.ceiling_limit = ret.ceiling_limit.min(edge.z + ret.next_z_space);

        ret.clearance = if ret.next_z_space >= cfg.height {
            ClimbClearance::Unobstructed
        } else if ret.next_z_space >= test_height {
            ClimbClearance::CanClimbUp
        } else {
            ClimbClearance::EdgeOnly
        };
        ret
    }

    /// Check for a climbable wall (ladder) straight ahead.
    ///
    /// The wall counts only when the character's sector is flagged climbable. Results are
    /// stored in `self.climb`.
    pub fn check_wall_climbability(&mut self, sim: &SimulationContext<'_>) -> WallHit {
        let cfg = &self.config;
        let fwd = self.forward_xy();
        let reach = cfg.radius + 2.0 * cfg.climb_r;
        let height = cfg.height;

        let climbable = sim
            .rooms
            .sector_at(&(self.position + Vec3::new(0.0, 0.0, 1.0)), self.room)
            .is_some_and(|(_, s)| s.has(SectorFlag::Climbable));

        let cast = |frac: f32| {
            let from = self.position + Vec3::new(0.0, 0.0, height * frac);
            sim.world
                .ray_test(&from, &(from + fwd * reach))
                .filter(|h| h.normal.z.abs() < FLOOR_NORMAL_MIN_Z)
        };

        let hands = if climbable { cast(WALL_HANDS_HEIGHT) } else { None };
        let feet = if climbable { cast(WALL_FEET_HEIGHT) } else { None };

        let hit = match (hands, feet) {
            (Some(_), Some(_)) => WallHit::FullBody,
            (Some(_), None) => WallHit::Partial,
            _ => WallHit::None,
        };
        if let Some(h) = hands.or(feet) {
            self.climb.wall_point = h.point;
            self.climb.wall_normal = h.normal;
        }
        self.climb.wall_hit = hit;
        hit
    }
}
