use crate::{collision::Vec3, context::SimulationContext};

use super::Character;

/// True when a push-out `reaction` mostly opposes the horizontal part of `requested`.
///
/// Both vectors must be predominantly horizontal; then the cosine between their
/// horizontal parts is compared against `critical_wall_component`.
pub fn is_horizontal_collision(reaction: &Vec3, requested: &Vec3, critical_wall_component: f32) -> bool {
    let t1 = reaction.x * reaction.x + reaction.y * reaction.y;
    let t2 = requested.x * requested.x + requested.y * requested.y;
    if reaction.z * reaction.z >= t1 || requested.z * requested.z >= t2 {
        return false;
    }
    let cos = (reaction.x * requested.x + reaction.y * requested.y) / (t1 * t2).sqrt();
    cos < critical_wall_component
}

impl Character {
    /// One push-out pass over every overlapping contact.
    ///
    /// All contacts come from the same pose; each negative one moves the origin by a
    /// fraction of its depth along the contact normal. Returns the accumulated reaction
    /// and whether anything moved.
    pub fn recover_from_penetration(&mut self, sim: &SimulationContext<'_>) -> (Vec3, bool) {
        let volume = self.volume();
        let shape = volume.shape();
        let pose = volume.pose(&self.position, &self.rotation(), self.angles.x);
        let frac = self.config.penetration_push_fraction;

        let mut contacts = Vec::new();
        sim.world.contacts(&shape, &pose, &mut contacts);

        let mut reaction = Vec3::zeros();
        let mut moved = false;
        for c in contacts.iter().filter(|c| c.distance < 0.0) {
            self.position += c.normal * (-c.distance * frac);
            reaction += c.normal * frac;
            moved = true;
        }
        (reaction, moved)
    }

    /// Run penetration recovery up to the configured iteration cap.
    ///
    /// Residual overlap after the cap is accepted and corrected on later ticks. When a
    /// requested move is given, a wall-like reaction sets `horizontal_collide`.
    pub fn fix_penetrations(&mut self, sim: &SimulationContext<'_>, requested: Option<&Vec3>) -> bool {
        if self.no_fix {
            return false;
        }

        let mut reaction = Vec3::zeros();
        let mut moved_any = false;
        for _ in 0..self.config.penetration_max_iterations {
            let (r, moved) = self.recover_from_penetration(sim);
            if !moved {
                break;
            }
            reaction += r;
            moved_any = true;
        }

        if let Some(m) = requested {
            if moved_any
                && is_horizontal_collision(&reaction, m, self.config.critical_wall_component)
            {
                self.response.horizontal_collide = true;
            }
        }
        moved_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{character::MoveMode, test_support::{flat_level, wall_level}};

    #[test]
    fn no_overlap_is_a_no_op() {
        let level = flat_level(0.0, None);
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, 0.0), 0.0);
        let before = ch.position;

        let (reaction, moved) = ch.recover_from_penetration(&sim);
        assert!(!moved);
        assert_eq!(reaction, Vec3::zeros());
        assert_eq!(ch.position, before);

        assert!(!ch.fix_penetrations(&sim, Some(&Vec3::new(0.0, 10.0, 0.0))));
        assert_eq!(ch.position, before);
        assert!(!ch.response.horizontal_collide);
    }

    #[test]
    fn pushes_a_fifth_of_the_depth_per_pass() {
        let level = flat_level(0.0, None);
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, -100.0), 0.0);
        ch.move_mode = MoveMode::FreeFalling;

        let (reaction, moved) = ch.recover_from_penetration(&sim);
        assert!(moved);
        assert!((ch.position.z - (-80.0)).abs() < 0.05, "z = {}", ch.position.z);
        assert!((reaction - Vec3::new(0.0, 0.0, 0.2)).norm() < 1e-3);
    }

    #[test]
    fn iteration_cap_leaves_residual_overlap() {
        let level = flat_level(0.0, None);
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 512.0, -100.0), 0.0);
        ch.move_mode = MoveMode::FreeFalling;

        assert!(ch.fix_penetrations(&sim, None));
        // 100 * 0.8^4 remains after four passes.
        assert!((ch.position.z - (-40.96)).abs() < 0.1, "z = {}", ch.position.z);
    }

    #[test]
    fn walking_into_a_wall_is_a_horizontal_collision() {
        // Wall face at y = 1024, facing -Y.
        let level = wall_level(1024.0);
        let sim = level.sim();
        let mut ch = level.character_at(Vec3::new(512.0, 1024.0 - 100.0, 0.0), 0.0);

        ch.fix_penetrations(&sim, Some(&Vec3::new(0.0, 30.0, 0.0)));
        assert!(ch.response.horizontal_collide);
        assert!(ch.position.y < 1024.0 - 100.0);
    }

    #[test]
    fn horizontal_collision_ratio_test() {
        let wall = Vec3::new(0.0, -1.0, 0.0);
        assert!(is_horizontal_collision(&wall, &Vec3::new(0.0, 1.0, 0.0), -0.707));
        // Glancing contact stays below the threshold.
        assert!(!is_horizontal_collision(&wall, &Vec3::new(1.0, 0.2, 0.0), -0.707));
        // Mostly vertical reaction is a floor, not a wall.
        assert!(!is_horizontal_collision(&Vec3::new(0.0, -0.1, 1.0), &Vec3::new(0.0, 1.0, 0.0), -0.707));
    }
}
