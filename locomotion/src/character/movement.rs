//! Per-move-mode integrators.
//!
//! Every integrator probes the environment, computes a velocity for its mode and then walks
//! the tick's displacement in sub-steps short enough that the body cannot skip over
//! geometry thinner than its radius. Each sub-step advances the origin, pushes it out of
//! overlapping solids, refreshes the room and the height probe, then clamps the result
//! against the probed floor and ceiling.

use log::trace;

use crate::{
    collision::Vec3,
    constants::FREE_FALL_SPEED_MAXIMUM,
    context::SimulationContext,
    flags::{CommandFlag, SectorFlag},
    math::{horizontal, wrap_angle},
};

use super::{Character, MoveDirection, MoveMode, PITCH_LIMIT, QuicksandState, SlideDirection};

/// Floor normals with a smaller z component are walls, not slopes.
const SLIDE_MIN_NORMAL_Z: f32 = 0.02;

/// Number of sub-steps for a displacement of length `distance`.
///
/// `max(1, floor(2 * distance / radius) + 1)`, so no sub-step is longer than half the
/// radius.
pub fn substep_count(distance: f32, radius: f32) -> usize {
    if !(radius > 0.0) || !distance.is_finite() {
        return 1;
    }
    ((2.0 * distance.abs() / radius).floor() as usize + 1).max(1)
}

/// Slide state for a floor normal, or `None` when the floor is walkable (or a wall).
///
/// Facing down-slope slides forward, anything else slides backward.
pub fn slide_direction(normal: &Vec3, forward: &Vec3, critical_z: f32) -> Option<SlideDirection> {
    if !(normal.z > SLIDE_MIN_NORMAL_Z && normal.z < critical_z) {
        return None;
    }
    if normal.x * forward.x + normal.y * forward.y >= 0.0 {
        Some(SlideDirection::Forward)
    } else {
        Some(SlideDirection::Back)
    }
}

/// Move `current` toward `max` while `active`, otherwise toward zero, at `accel * max`
/// per second.
pub fn inertia_linear(current: f32, max: f32, accel: f32, active: bool, dt: f32) -> f32 {
    let rate = accel * max * dt;
    if active {
        (current + rate).min(max)
    } else {
        (current - rate).max(0.0)
    }
}

/// Move `current` toward `input * max` at `accel * max` per second.
pub fn inertia_angular(current: f32, max: f32, accel: f32, input: f32, dt: f32) -> f32 {
    let target = input.clamp(-1.0, 1.0) * max;
    let rate = accel * max * dt;
    current + (target - current).clamp(-rate, rate)
}

/// Post-sub-step clamp; returning false ends the sub-step loop.
type Settle = fn(&mut Character, &SimulationContext<'_>) -> bool;

impl Character {
    /// Run the integrator for the current move mode. Returns the sub-step count used.
    pub fn integrate(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        match self.move_mode {
            MoveMode::OnFloor => self.move_on_floor(sim, dt),
            MoveMode::FreeFalling => self.free_falling(sim, dt),
            MoveMode::Climbing => self.climbing(sim, dt),
            MoveMode::WallsClimb => self.walls_climbing(sim, dt),
            MoveMode::Monkeyswing => self.monkey_climbing(sim, dt),
            MoveMode::Underwater => self.move_underwater(sim, dt),
            MoveMode::OnWater => self.move_on_water(sim, dt),
        }
    }

    fn step_through(&mut self, sim: &SimulationContext<'_>, movement: Vec3, settle: Settle) -> usize {
        let iter = substep_count(movement.norm(), self.config.radius);
        let step = movement / iter as f32;
        // Each probe after a move doubles as the probe before the next one.
        for _ in 0..iter {
            self.position += step;
            self.fix_penetrations(sim, Some(&step));
            self.update_room(sim);
            self.update_height_info(sim);
            if !settle(self, sim) || self.response.horizontal_collide {
                break;
            }
        }
        iter
    }

    /// Push the body down under a ceiling, never below the floor. Returns whether it hit.
    fn clamp_to_ceiling(&mut self) -> bool {
        let Some(c) = self.height_info.ceiling else {
            return false;
        };
        let h = self.body_height();
        if self.position.z + h <= c.point.z {
            return false;
        }
        let floor = self.height_info.floor_z().unwrap_or(f32::MIN);
        self.position.z = (c.point.z - h).max(floor);
        self.response.ceiling_collide = true;
        true
    }

    /// Keep the horizontal speed and start falling.
    fn start_free_fall(&mut self) {
        self.speed.z = 0.0;
        self.set_move_mode(MoveMode::FreeFalling);
    }

    fn start_swimming(&mut self) {
        self.position.z = self.height_info.transition_level - self.config.swim_depth;
        self.speed = Vec3::zeros();
        self.inertia_linear = 0.0;
        self.angles.y = 0.0;
        self.angles.z = 0.0;
        self.set_move_mode(MoveMode::OnWater);
    }

    fn surface(&mut self) {
        self.position.z = self.height_info.transition_level - self.config.swim_depth;
        self.speed.z = 0.0;
        self.angles.y = 0.0;
        self.set_move_mode(MoveMode::OnWater);
    }

    /// Dive in, keeping the entry direction as pitch and the entry speed as inertia.
    fn enter_water(&mut self) {
        let speed = self.speed.norm();
        if speed > 1.0e-3 {
            self.angles.y = (self.speed.z / speed).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.inertia_linear = (speed / self.speed_mult).min(self.config.max_speed_underwater);
        self.speed = Vec3::zeros();
        self.set_move_mode(MoveMode::Underwater);
    }

    fn land(&mut self) {
        let landing = (-self.speed.z).max(0.0);
        self.response.landing_speed = landing;
        self.response.floor_collide = true;
        let damage = self.params.fall_damage(landing, &self.config);
        if damage > 0.0 && self.params.apply_damage(damage) {
            self.kill();
        }
        trace!("landed at {landing:.0} u/s, damage {damage:.0}");
        self.speed = Vec3::zeros();
        self.set_move_mode(MoveMode::OnFloor);
    }

    /// Roll toward the turn while `enabled`, back to level otherwise.
    pub fn lean(&mut self, enabled: bool, dt: f32) {
        let input = if enabled { -self.command.turn() } else { 0.0 };
        self.angles.z = inertia_angular(
            self.angles.z,
            self.config.max_lean,
            self.config.inertia_angular,
            input,
            dt,
        );
    }

    /// Ceiling height when the ceiling right above carries monkey bars.
    pub fn monkey_ceiling(&self, sim: &SimulationContext<'_>) -> Option<f32> {
        let c = self.height_info.ceiling?;
        let probe = c.point - Vec3::z();
        sim.rooms
            .sector_at(&probe, self.room)
            .filter(|(_, s)| s.has(SectorFlag::Monkeyswing))
            .map(|_| c.point.z)
    }

    pub fn move_on_floor(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        self.update_height_info(sim);

        let fall_down = self.config.fall_down_height;
        let Some(floor) = self
            .height_info
            .floor
            .filter(|f| self.position.z - f.point.z < fall_down)
        else {
            self.start_free_fall();
            return 1;
        };

        self.response.slide = slide_direction(
            &floor.normal,
            &self.forward_xy(),
            self.config.critical_slant_z_component,
        );
        let mut speed = match self.response.slide {
            Some(_) => horizontal(&floor.normal)
                .try_normalize(1.0e-6)
                .map_or_else(Vec3::zeros, |down| down * self.config.slide_speed),
            None => self.direction_velocity(),
        };
        let in_quicksand = self.height_info.quicksand != QuicksandState::None;
        if in_quicksand {
            let cap = self.config.max_speed_quicksand * self.speed_mult;
            let n = speed.norm();
            if n > cap {
                speed *= cap / n;
            }
        }
        self.speed = speed;
        self.lean(self.dir == MoveDirection::Forward, dt);

        let iter = self.step_through(sim, speed * dt, settle_on_floor);

        match self.height_info.floor {
            Some(f) if self.position.z - f.point.z < fall_down => {
                let sink = if in_quicksand {
                    self.config.quicksand_sink_speed
                } else {
                    self.config.floor_snap_speed
                };
                if self.position.z > f.point.z {
                    self.position.z = (self.position.z - sink * dt).max(f.point.z);
                }
                if self
                    .height_info
                    .water_depth()
                    .is_some_and(|d| d > self.config.swim_start_depth)
                {
                    self.start_swimming();
                }
            }
            _ => self.start_free_fall(),
        }
        iter
    }

    pub fn free_falling(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        self.update_height_info(sim);
        self.turn(self.config.rot_speed_freefall, dt);

        let v0 = self.speed;
        self.speed += sim.world.gravity() * dt;
        self.speed.z = self.speed.z.max(-FREE_FALL_SPEED_MAXIMUM);
        let movement = (v0 + self.speed) * (0.5 * dt);

        self.step_through(sim, movement, settle_falling)
    }

    /// Hanging on an edge: shimmy along the current direction only.
    pub fn climbing(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        self.speed = self.direction_velocity();
        self.step_through(sim, self.speed * dt, |_, _| true)
    }

    /// Ladder movement; forward and backward map onto up and down.
    pub fn walls_climbing(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        self.speed = self.direction_velocity();
        let iter = self.step_through(sim, self.speed * dt, settle_on_floor);
        self.check_wall_climbability(sim);
        iter
    }

    /// Hand-over-hand under a monkey-bar ceiling. Leaving the bars undoes the move and
    /// reports a horizontal collision.
    pub fn monkey_climbing(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        let start = self.position;
        self.speed = self.direction_velocity();
        let iter = self.step_through(sim, self.speed * dt, settle_monkey);

        if self.monkey_ceiling(sim).is_none() {
            self.position = start;
            self.speed = Vec3::zeros();
            self.response.horizontal_collide = true;
            self.update_room(sim);
            self.update_height_info(sim);
        }
        iter
    }

    pub fn move_underwater(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        self.update_height_info(sim);
        if !self.height_info.water {
            self.start_free_fall();
            return 1;
        }

        let rot = self.config.rot_speed_underwater;
        let accel = self.config.inertia_angular;
        self.inertia_angular[0] = inertia_angular(self.inertia_angular[0], rot, accel, self.command.rot.x, dt);
        self.inertia_angular[1] = inertia_angular(self.inertia_angular[1], rot, accel, self.command.rot.y, dt);
        self.angles.x = wrap_angle(self.angles.x + self.inertia_angular[0] * dt);
        self.angles.y = (self.angles.y + self.inertia_angular[1] * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        self.inertia_linear = inertia_linear(
            self.inertia_linear,
            self.config.max_speed_underwater,
            self.config.inertia_underwater,
            self.command.has(CommandFlag::Jump),
            dt,
        );
        self.speed = self.basis(1) * (self.inertia_linear * self.speed_mult);

        self.step_through(sim, self.speed * dt, settle_underwater)
    }

    pub fn move_on_water(&mut self, sim: &SimulationContext<'_>, dt: f32) -> usize {
        self.response.reset_collisions();
        self.update_height_info(sim);

        self.inertia_angular[0] = inertia_angular(
            self.inertia_angular[0],
            self.config.rot_speed_onwater,
            self.config.inertia_angular,
            self.command.rot.x,
            dt,
        );
        self.angles.x = wrap_angle(self.angles.x + self.inertia_angular[0] * dt);

        self.inertia_linear = inertia_linear(
            self.inertia_linear,
            self.config.max_speed_onwater,
            self.config.inertia_onwater,
            self.dir != MoveDirection::Stay,
            dt,
        );
        // Coast along the previous heading once the stroke stops.
        let heading = match self.dir.basis() {
            Some((0, sign)) => self.right_xy() * sign,
            Some((_, sign)) => self.forward_xy() * sign,
            None => horizontal(&self.speed)
                .try_normalize(1.0e-6)
                .unwrap_or_else(Vec3::zeros),
        };
        self.speed = heading * (self.inertia_linear * self.speed_mult);

        self.step_through(sim, self.speed * dt, settle_on_water)
    }
}

fn settle_on_floor(ch: &mut Character, _: &SimulationContext<'_>) -> bool {
    if let Some(f) = ch.height_info.floor {
        if ch.position.z < f.point.z {
            ch.position.z = f.point.z;
            ch.response.floor_collide = true;
        }
    }
    ch.clamp_to_ceiling();
    true
}

fn settle_falling(ch: &mut Character, _: &SimulationContext<'_>) -> bool {
    if ch.clamp_to_ceiling() && ch.speed.z > 0.0 {
        ch.speed.z = 0.0;
    }
    if ch.response.horizontal_collide {
        ch.speed.x = 0.0;
        ch.speed.y = 0.0;
    }

    let hi = ch.height_info;
    let deep = hi
        .floor_z()
        .is_none_or(|f| hi.transition_level - f > ch.config.swim_exit_depth);
    if hi.water && ch.position.z < hi.transition_level && deep {
        ch.enter_water();
        return false;
    }

    if let Some(f) = hi.floor {
        if ch.speed.z <= 0.0 && ch.position.z <= f.point.z {
            ch.position.z = f.point.z;
            ch.land();
            return false;
        }
    }
    true
}

fn settle_monkey(ch: &mut Character, sim: &SimulationContext<'_>) -> bool {
    match ch.monkey_ceiling(sim) {
        Some(z) => {
            ch.position.z = z - ch.body_height();
            true
        }
        None => false,
    }
}

fn settle_underwater(ch: &mut Character, _: &SimulationContext<'_>) -> bool {
    if let Some(f) = ch.height_info.floor {
        if ch.position.z < f.point.z {
            ch.position.z = f.point.z;
            ch.response.floor_collide = true;
        }
    }
    ch.clamp_to_ceiling();

    let hi = ch.height_info;
    if hi.water && ch.position.z > hi.transition_level - ch.config.swim_depth {
        ch.surface();
        return false;
    }
    true
}

fn settle_on_water(ch: &mut Character, _: &SimulationContext<'_>) -> bool {
    let hi = ch.height_info;
    let floor = hi.floor_z();

    if !hi.water {
        match floor {
            Some(f) if ch.position.z - f < ch.config.fall_down_height => {
                ch.position.z = ch.position.z.max(f);
                ch.set_move_mode(MoveMode::OnFloor);
            }
            _ => ch.start_free_fall(),
        }
        return false;
    }

    if let Some(f) = floor.filter(|f| hi.transition_level - f < ch.config.swim_exit_depth) {
        ch.position.z = f;
        ch.speed = Vec3::zeros();
        ch.inertia_linear = 0.0;
        ch.set_move_mode(MoveMode::OnFloor);
        return false;
    }

    ch.position.z = hi.transition_level - ch.config.swim_depth;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        character::MoveDirection,
        test_support::{flat_level, monkey_level, pool_level, slope_level},
    };

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn substep_count_bounds_each_step_by_half_radius() {
        assert_eq!(substep_count(300.0, 128.0), 5);
        assert_eq!(substep_count(0.0, 128.0), 1);
        assert_eq!(substep_count(63.0, 128.0), 1);
        assert_eq!(substep_count(64.0, 128.0), 2);
        assert_eq!(substep_count(10.0, 0.0), 1);
        for d in [1.0_f32, 50.0, 129.0, 1000.0, 4096.0] {
            let n = substep_count(d, 128.0);
            assert!(d / n as f32 <= 64.0, "d = {d}, n = {n}");
        }
    }

    #[test]
    fn fall_down_height_decides_between_floor_and_fall() {
        let level = flat_level(0.0, None);
        let sim = level.sim();

        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 600.0), 0.0);
        ch.config.fall_down_height = 700.0;
        ch.move_on_floor(&sim, DT);
        assert_eq!(ch.move_mode, MoveMode::OnFloor);

        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 600.0), 0.0);
        ch.config.fall_down_height = 500.0;
        ch.move_on_floor(&sim, DT);
        assert_eq!(ch.move_mode, MoveMode::FreeFalling);
    }

    #[test]
    fn steep_floor_normal_forces_a_slide() {
        let fwd = Vec3::new(0.0, 1.0, 0.0);
        assert!(slide_direction(&Vec3::new(0.0, 0.0, 0.05), &fwd, 0.81).is_some());
        assert_eq!(slide_direction(&Vec3::new(0.0, 0.0, 1.0), &fwd, 0.81), None);
        assert_eq!(slide_direction(&Vec3::new(0.0, -1.0, 0.01), &fwd, 0.81), None);
        assert_eq!(
            slide_direction(&Vec3::new(0.0, 0.8, 0.6), &fwd, 0.81),
            Some(SlideDirection::Forward)
        );
        assert_eq!(
            slide_direction(&Vec3::new(0.0, -0.8, 0.6), &fwd, 0.81),
            Some(SlideDirection::Back)
        );
    }

    #[test]
    fn integrator_slides_down_a_steep_slope() {
        // Slope rising toward +Y, normal (0, -0.866, 0.5).
        let angle = std::f32::consts::FRAC_PI_3;
        let level = slope_level(angle);
        let sim = level.sim();
        let y = 512.0;
        let mut ch = level.character_at(Vec3::new(512.0, y, y * angle.tan() + 1.0), 0.0);
        ch.dir = MoveDirection::Forward;
        ch.current_speed = 5.0;

        ch.move_on_floor(&sim, DT);
        assert_eq!(ch.move_mode, MoveMode::OnFloor);
        assert_eq!(ch.response.slide, Some(SlideDirection::Back));
        assert!(ch.position.y < y, "slid to y = {}", ch.position.y);
    }

    #[test]
    fn free_fall_lands_on_the_floor() {
        let level = flat_level(0.0, None);
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 500.0), 0.0);
        ch.set_move_mode(MoveMode::FreeFalling);

        for _ in 0..60 {
            ch.integrate(&sim, DT);
            if ch.move_mode == MoveMode::OnFloor {
                break;
            }
        }
        assert_eq!(ch.move_mode, MoveMode::OnFloor);
        assert!(ch.position.z.abs() < 1.0, "z = {}", ch.position.z);
        assert!(ch.response.landing_speed > 0.0);
        assert!(!ch.response.killed);
    }

    #[test]
    fn jumping_into_a_ceiling_stops_the_rise() {
        let level = flat_level(0.0, Some(1200.0));
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 10.0), 0.0);
        ch.set_move_mode(MoveMode::FreeFalling);
        ch.speed = Vec3::new(0.0, 0.0, 3000.0);

        let mut hit = false;
        for _ in 0..20 {
            ch.integrate(&sim, DT);
            hit |= ch.response.ceiling_collide;
            assert!(ch.position.z + ch.body_height() <= 1200.0 + 1.0);
        }
        assert!(hit);
    }

    #[test]
    fn falling_into_deep_water_starts_swimming() {
        let level = pool_level();
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 200.0), 0.0);
        ch.set_move_mode(MoveMode::FreeFalling);

        for _ in 0..60 {
            ch.integrate(&sim, DT);
            if ch.move_mode != MoveMode::FreeFalling {
                break;
            }
        }
        assert_eq!(ch.move_mode, MoveMode::Underwater);
        assert!(ch.angles.y < 0.0, "diving pitch {}", ch.angles.y);
    }

    #[test]
    fn deep_water_lifts_a_walker_to_the_surface() {
        let level = pool_level();
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, -1024.0), 0.0);
        ch.move_on_floor(&sim, DT);
        assert_eq!(ch.move_mode, MoveMode::OnWater);
        assert!((ch.position.z + ch.config.swim_depth).abs() < 1e-3);
    }

    #[test]
    fn swimming_up_surfaces() {
        let level = pool_level();
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, -400.0), 0.0);
        ch.set_move_mode(MoveMode::Underwater);
        ch.angles.y = 1.2;
        ch.command.flags.add(CommandFlag::Jump);

        for _ in 0..90 {
            ch.integrate(&sim, DT);
            if ch.move_mode == MoveMode::OnWater {
                break;
            }
        }
        assert_eq!(ch.move_mode, MoveMode::OnWater);
        assert!((ch.position.z + ch.config.swim_depth).abs() < 1e-3);
        assert_eq!(ch.angles.y, 0.0);
    }

    #[test]
    fn surface_swimming_holds_the_water_line() {
        let level = pool_level();
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, -100.0), 0.0);
        ch.set_move_mode(MoveMode::OnWater);
        ch.dir = MoveDirection::Forward;

        for _ in 0..15 {
            ch.integrate(&sim, DT);
        }
        assert_eq!(ch.move_mode, MoveMode::OnWater);
        assert!(ch.position.y > 512.0);
        assert!((ch.position.z + 100.0).abs() < 1e-3);
    }

    #[test]
    fn monkey_bars_hold_the_body_under_the_ceiling() {
        let level = monkey_level();
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 600.0, 700.0), 0.0);
        ch.set_move_mode(MoveMode::Monkeyswing);
        ch.dir = MoveDirection::Forward;
        ch.current_speed = 1.0;
        ch.update_height_info(&sim);

        ch.integrate(&sim, DT);
        assert!((ch.position.z - (1536.0 - 768.0)).abs() < 1.0, "z = {}", ch.position.z);
        assert!(!ch.response.horizontal_collide);
    }

    #[test]
    fn leaving_the_monkey_bars_is_blocked() {
        let level = monkey_level();
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 900.0, 768.0), 0.0);
        ch.set_move_mode(MoveMode::Monkeyswing);
        ch.dir = MoveDirection::Forward;
        ch.current_speed = 10.0;
        ch.update_height_info(&sim);

        ch.integrate(&sim, 0.5);
        assert!(ch.response.horizontal_collide);
        assert!((ch.position.y - 900.0).abs() < 1e-3);
    }

    #[test]
    fn inertia_ramps_and_decays() {
        let mut v = 0.0;
        for _ in 0..10 {
            v = inertia_linear(v, 50.0, 1.0, true, 0.25);
        }
        assert_eq!(v, 50.0);
        v = inertia_linear(v, 50.0, 1.0, false, 0.5);
        assert_eq!(v, 25.0);

        let w = inertia_angular(0.0, 2.0, 1.0, -1.0, 0.25);
        assert!((w + 0.5).abs() < 1e-6);
        let w = inertia_angular(w, 2.0, 1.0, 0.0, 1.0);
        assert_eq!(w, 0.0);
    }

    #[test]
    fn running_turn_leans_into_the_turn() {
        let level = flat_level(0.0, None);
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 0.0), 0.0);
        ch.command.rot.x = 1.0;
        for _ in 0..30 {
            ch.lean(true, DT);
        }
        assert!((ch.angles.z + ch.config.max_lean).abs() < 1e-5);
        for _ in 0..30 {
            ch.lean(false, DT);
        }
        assert!(ch.angles.z.abs() < 1e-5);
    }
}
