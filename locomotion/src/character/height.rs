use crate::{
    collision::{ObjectHandle, RayHit, Vec3},
    config::ControllerConfig,
    context::SimulationContext,
    flags::SectorFlag,
    rooms::{RoomSet, Sector},
};

use super::{Character, MoveMode};

/// Upper bound on sector links followed while looking for a water surface.
const MAX_SECTOR_CHAIN: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub object: ObjectHandle,
}

impl From<RayHit> for SurfaceHit {
    fn from(hit: RayHit) -> Self {
        Self {
            point: hit.point,
            normal: hit.normal,
            object: hit.object,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuicksandState {
    #[default]
    None,
    Sinking,
    Drowning,
}

/// Floor, ceiling and water surface around a probe point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeightInfo {
    pub floor: Option<SurfaceHit>,
    pub ceiling: Option<SurfaceHit>,
    /// A water surface exists in this sector column.
    pub water: bool,
    /// Height of the water or quicksand surface.
    pub transition_level: f32,
    pub quicksand: QuicksandState,
}

impl HeightInfo {
    #[inline]
    pub fn floor_hit(&self) -> bool {
        self.floor.is_some()
    }

    #[inline]
    pub fn ceiling_hit(&self) -> bool {
        self.ceiling.is_some()
    }

    pub fn floor_z(&self) -> Option<f32> {
        self.floor.map(|f| f.point.z)
    }

    pub fn ceiling_z(&self) -> Option<f32> {
        self.ceiling.map(|c| c.point.z)
    }

    /// Water depth over the floor, if both are known.
    pub fn water_depth(&self) -> Option<f32> {
        if !self.water {
            return None;
        }
        self.floor_z().map(|f| self.transition_level - f)
    }
}

/// Classification of the floor ahead relative to the character's feet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepType {
    DownCanHang,
    DownDrop,
    DownBig,
    DownLittle,
    Horizontal,
    UpLittle,
    UpBig,
    UpClimb,
    UpImpossible,
}

impl StepType {
    /// Walking and running may continue onto this step.
    pub fn is_walkable(self) -> bool {
        matches!(
            self,
            StepType::DownLittle | StepType::Horizontal | StepType::UpLittle
        )
    }
}

/// Probe floor, ceiling and water around `point`.
///
/// The floor comes from a downward ray. The ceiling ray starts just above the floor hit
/// (or at the point when there is no floor). With no floor but a ceiling, a second
/// downward ray from under the ceiling retries the floor.
pub fn get_height_info(
    sim: &SimulationContext<'_>,
    point: &Vec3,
    room_hint: Option<usize>,
    cfg: &ControllerConfig,
) -> HeightInfo {
    let up = Vec3::z();
    let range = cfg.probe_distance;
    let offset = cfg.ceiling_probe_offset;

    let mut floor = sim
        .world
        .ray_test(point, &(point - up * range))
        .map(SurfaceHit::from);

    let ceiling_from = match floor {
        Some(f) => f.point + up * offset,
        None => *point,
    };
    let ceiling = sim
        .world
        .ray_test(&ceiling_from, &(point + up * range))
        .map(SurfaceHit::from);

    if floor.is_none() {
        if let Some(c) = ceiling {
            let from = c.point - up * offset;
            floor = sim
                .world
                .ray_test(&from, &(from - up * range))
                .map(SurfaceHit::from);
        }
    }

    let mut info = HeightInfo {
        floor,
        ceiling,
        ..Default::default()
    };
    probe_water(sim.rooms, point, room_hint, cfg, &mut info);
    info
}

/// Walk the sector column to find a water or quicksand surface.
///
/// Inside a liquid sector the walk goes up to the first dry sector and the surface is
/// that sector's floor. Otherwise it goes down to the first liquid sector and the
/// surface is that sector's ceiling.
fn probe_water(
    rooms: &RoomSet,
    point: &Vec3,
    room_hint: Option<usize>,
    cfg: &ControllerConfig,
    info: &mut HeightInfo,
) {
    let Some((_, start)) = rooms.sector_at(point, room_hint) else {
        return;
    };

    let is_liquid = |s: &Sector| s.has(SectorFlag::Water) || s.has(SectorFlag::Quicksand);

    if is_liquid(start) {
        let quicksand = start.has(SectorFlag::Quicksand);
        let mut sector = start;
        for _ in 0..MAX_SECTOR_CHAIN {
            match sector.above.and_then(|r| rooms.sector(r)) {
                Some(next) if is_liquid(next) => sector = next,
                Some(next) => {
                    info.transition_level = next.floor;
                    break;
                }
                None => {
                    info.transition_level = sector.ceiling;
                    break;
                }
            }
        }
        if quicksand {
            info.quicksand = classify_quicksand(info.transition_level, point, cfg);
        } else {
            info.water = true;
        }
        return;
    }

    let mut sector = start;
    for _ in 0..MAX_SECTOR_CHAIN {
        let Some(next) = sector.below.and_then(|r| rooms.sector(r)) else {
            return;
        };
        if next.has(SectorFlag::Water) {
            info.water = true;
            info.transition_level = next.ceiling;
            return;
        }
        if next.has(SectorFlag::Quicksand) {
            info.transition_level = next.ceiling;
            info.quicksand = classify_quicksand(next.ceiling, point, cfg);
            return;
        }
        sector = next;
    }
}

fn classify_quicksand(surface: f32, point: &Vec3, cfg: &ControllerConfig) -> QuicksandState {
    if surface - point.z > cfg.quicksand_drown_depth {
        QuicksandState::Drowning
    } else if surface > point.z {
        QuicksandState::Sinking
    } else {
        QuicksandState::None
    }
}

impl Character {
    /// Point the height probe casts from for the current move mode.
    pub fn probe_point(&self) -> Vec3 {
        let lift = match self.move_mode {
            MoveMode::OnFloor => self.config.max_step_up_height,
            MoveMode::Underwater | MoveMode::OnWater => self.config.radius,
            _ => self.body_height() * 0.5,
        };
        self.position + Vec3::new(0.0, 0.0, lift)
    }

    pub fn update_height_info(&mut self, sim: &SimulationContext<'_>) {
        let point = self.probe_point();
        self.height_info = get_height_info(sim, &point, self.room, &self.config);
    }

    /// Classify the floor at `offset` from the character (world-space offset).
    pub fn check_next_step(
        &self,
        sim: &SimulationContext<'_>,
        offset: &Vec3,
    ) -> (StepType, HeightInfo) {
        let cfg = &self.config;
        let from = self.position + offset + Vec3::new(0.0, 0.0, self.body_height());
        let next = get_height_info(sim, &from, self.room, cfg);

        let Some(floor) = next.floor else {
            return (StepType::DownDrop, next);
        };

        let delta = floor.point.z - self.position.z;
        let step = if delta.abs() < cfg.min_step_up_height {
            StepType::Horizontal
        } else if delta < 0.0 {
            let drop = -delta;
            if drop <= cfg.max_step_up_height {
                StepType::DownLittle
            } else if drop <= cfg.fall_down_height {
                StepType::DownBig
            } else if drop >= cfg.height {
                StepType::DownCanHang
            } else {
                StepType::DownDrop
            }
        } else if floor.normal.z < cfg.critical_slant_z_component {
            StepType::UpImpossible
        } else if delta <= cfg.max_step_up_height {
            StepType::UpLittle
        } else if delta <= cfg.height {
            StepType::UpBig
        } else if delta <= cfg.max_climb_height {
            StepType::UpClimb
        } else {
            StepType::UpImpossible
        };

        // No headroom above the next floor.
        let blocked = delta > 0.0
            && next
                .ceiling
                .is_some_and(|c| c.point.z - floor.point.z < cfg.height * 0.5);
        if blocked {
            return (StepType::UpImpossible, next);
        }
        (step, next)
    }

    /// A slope rising ahead that is too steep to walk onto.
    pub fn has_stop_slant(&self, next: &HeightInfo) -> bool {
        let Some(floor) = next.floor else {
            return false;
        };
        let fwd = self.forward_xy();
        floor.point.z > self.position.z
            && floor.normal.z < self.config.critical_slant_z_component
            && fwd.x * floor.normal.x + fwd.y * floor.normal.y < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestLevel, flat_level, pool_level, step_level};

    #[test]
    fn floor_and_ceiling_on_flat_ground() {
        let level = flat_level(0.0, Some(2048.0));
        let sim = level.sim();
        let cfg = ControllerConfig::default();
        let info = get_height_info(&sim, &Vec3::new(512.0, 512.0, 100.0), None, &cfg);

        assert_eq!(info.floor_z().map(|z| z.round()), Some(0.0));
        assert!((info.floor.unwrap().normal - Vec3::z()).norm() < 1e-4);
        assert_eq!(info.ceiling_z().map(|z| z.round()), Some(2048.0));
        assert!(!info.water);
    }

    #[test]
    fn no_floor_below_falls_back_from_ceiling() {
        // Probe point is below the floor plane of a world that only has a slab above.
        let level = TestLevel::slab_only(1000.0, 1200.0);
        let sim = level.sim();
        let cfg = ControllerConfig::default();
        let info = get_height_info(&sim, &Vec3::new(0.0, 0.0, 500.0), None, &cfg);
        assert_eq!(info.ceiling_z().map(|z| z.round()), Some(1000.0));
        // The fallback ray starts below the slab and finds nothing else.
        assert!(info.floor.is_none());
    }

    #[test]
    fn water_surface_from_inside_and_above() {
        let level = pool_level();
        let sim = level.sim();
        let cfg = ControllerConfig::default();

        let inside = get_height_info(&sim, &Vec3::new(512.0, 512.0, -300.0), None, &cfg);
        assert!(inside.water);
        assert_eq!(inside.transition_level, 0.0);
        assert_eq!(inside.quicksand, QuicksandState::None);

        let above = get_height_info(&sim, &Vec3::new(512.0, 512.0, 300.0), None, &cfg);
        assert!(above.water);
        assert_eq!(above.transition_level, 0.0);
    }

    #[test]
    fn next_step_classification() {
        // Floor at 0 with a 200-high step and a 600-high block ahead (+Y).
        let level = step_level();
        let sim = level.sim();
        let ch = level.character_at(Vec3::new(512.0, 512.0, 0.0), 0.0);

        let (step, _) = ch.check_next_step(&sim, &Vec3::new(0.0, 100.0, 0.0));
        assert_eq!(step, StepType::Horizontal);

        let (step, _) = ch.check_next_step(&sim, &Vec3::new(0.0, 1100.0, 0.0));
        assert_eq!(step, StepType::UpLittle);

        let (step, _) = ch.check_next_step(&sim, &Vec3::new(0.0, 2100.0, 0.0));
        assert_eq!(step, StepType::UpBig);
    }

    #[test]
    fn stop_slant_only_when_rising_ahead() {
        let level = step_level();
        let ch = level.character_at(Vec3::new(512.0, 512.0, 0.0), 0.0);
        let steep = |nz: f32, ny: f32, z: f32| HeightInfo {
            floor: Some(SurfaceHit {
                point: Vec3::new(0.0, 0.0, z),
                normal: Vec3::new(0.0, ny, nz).normalize(),
                object: level.floor_handle(),
            }),
            ..Default::default()
        };
        // Normal leaning back toward the character: slope rises ahead.
        assert!(ch.has_stop_slant(&steep(0.5, -0.8, 100.0)));
        // Same slope but below the feet.
        assert!(!ch.has_stop_slant(&steep(0.5, -0.8, -100.0)));
        // Gentle slope.
        assert!(!ch.has_stop_slant(&steep(0.95, -0.3, 100.0)));
    }
}
