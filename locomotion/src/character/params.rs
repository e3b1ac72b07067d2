use crate::config::ControllerConfig;

use super::{HeightInfo, MoveMode, QuicksandState};

/// Health, air and stamina.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterParams {
    pub health: f32,
    pub air: f32,
    pub stamina: f32,
}

impl CharacterParams {
    pub fn new(cfg: &ControllerConfig) -> Self {
        Self {
            health: cfg.health_max,
            air: cfg.air_max,
            stamina: cfg.stamina_max,
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Subtract `amount` from health. Returns true when this call killed.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        let was_alive = !self.is_dead();
        self.health = (self.health - amount).max(0.0);
        was_alive && self.is_dead()
    }

    /// Health lost for landing at `landing_speed` (positive, downward).
    ///
    /// Nothing up to the safe speed, lethal from the critical speed on, linear between.
    pub fn fall_damage(&self, landing_speed: f32, cfg: &ControllerConfig) -> f32 {
        let safe = cfg.fall_speed_max_safe;
        let critical = cfg.fall_speed_critical;
        if landing_speed <= safe {
            0.0
        } else if landing_speed >= critical {
            cfg.health_max
        } else {
            cfg.health_max * (landing_speed - safe) / (critical - safe)
        }
    }

    /// Per-tick drain and refill. Returns true when this update killed.
    pub fn update(
        &mut self,
        mode: MoveMode,
        height: &HeightInfo,
        sprinting: bool,
        dt: f32,
        cfg: &ControllerConfig,
    ) -> bool {
        if self.is_dead() {
            return false;
        }

        let submerged =
            mode == MoveMode::Underwater || height.quicksand == QuicksandState::Drowning;
        // Time spent without air this tick.
        let mut breathless = 0.0;
        if submerged {
            let air = self.air - cfg.air_rate * dt;
            if air < 0.0 && cfg.air_rate > 0.0 {
                breathless = (-air / cfg.air_rate).min(dt);
            }
            self.air = air.max(0.0);
        } else {
            self.air = (self.air + cfg.air_rate * dt * 2.0).min(cfg.air_max);
        }

        if sprinting {
            self.stamina = (self.stamina - cfg.stamina_rate * dt).max(0.0);
        } else {
            self.stamina = (self.stamina + cfg.stamina_rate * dt).min(cfg.stamina_max);
        }

        if breathless > 0.0 {
            return self.apply_damage(cfg.drown_damage * breathless);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fall_damage_is_zero_then_linear_then_lethal() {
        let cfg = ControllerConfig::default();
        let p = CharacterParams::new(&cfg);
        assert_eq!(p.fall_damage(cfg.fall_speed_max_safe, &cfg), 0.0);
        let mid = 0.5 * (cfg.fall_speed_max_safe + cfg.fall_speed_critical);
        assert!((p.fall_damage(mid, &cfg) - cfg.health_max * 0.5).abs() < 1e-2);
        assert_eq!(p.fall_damage(cfg.fall_speed_critical + 1.0, &cfg), cfg.health_max);
    }

    #[test]
    fn drowning_drains_air_then_health() {
        let cfg = ControllerConfig::default();
        let mut p = CharacterParams::new(&cfg);
        let hi = HeightInfo::default();

        // Enough time to empty the lungs.
        let t = cfg.air_max / cfg.air_rate;
        assert!(!p.update(MoveMode::Underwater, &hi, false, t, &cfg));
        assert_eq!(p.air, 0.0);
        assert_eq!(p.health, cfg.health_max);

        let mut died = false;
        for _ in 0..100 {
            died |= p.update(MoveMode::Underwater, &hi, false, 1.0, &cfg);
        }
        assert!(died);
        assert!(p.is_dead());
        // Reported once only.
        assert!(!p.update(MoveMode::Underwater, &hi, false, 1.0, &cfg));
    }

    #[test]
    fn drowning_damage_starts_when_air_runs_out() {
        let cfg = ControllerConfig::default();
        let mut p = CharacterParams::new(&cfg);
        let hi = HeightInfo::default();

        // Air lasts for the first half of the call only.
        p.air = cfg.air_rate * 0.5;
        p.update(MoveMode::Underwater, &hi, false, 1.0, &cfg);
        assert_eq!(p.air, 0.0);
        let expected = cfg.health_max - cfg.drown_damage * 0.5;
        assert!((p.health - expected).abs() < 1e-3, "health {}", p.health);
    }

    #[test]
    fn surface_refills_air_and_sprint_drains_stamina() {
        let cfg = ControllerConfig::default();
        let mut p = CharacterParams::new(&cfg);
        p.air = 0.0;
        p.update(MoveMode::OnWater, &HeightInfo::default(), true, 1.0, &cfg);
        assert!(p.air > 0.0);
        assert!(p.stamina < cfg.stamina_max);
    }
}
