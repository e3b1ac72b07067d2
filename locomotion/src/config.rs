//! Per-character tuning.
//!
//! Distances are level units (one sector = 1024), speeds are units per second unless a
//! field says "per frame", angles are radians.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{FREE_FALL_SPEED_CRITICAL, FREE_FALL_SPEED_MAXSAFE},
    error::{LocomotionError, Result},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Body ---
    pub height: f32,
    pub radius: f32,
    /// Radius of the climb sensor sphere.
    pub climb_r: f32,

    // --- Steps and drops ---
    pub min_step_up_height: f32,
    pub max_step_up_height: f32,
    pub max_climb_height: f32,
    pub fall_down_height: f32,

    // --- Surface classification ---
    pub critical_slant_z_component: f32,
    pub critical_wall_component: f32,
    /// Horizontal speed while sliding down a steep floor.
    pub slide_speed: f32,

    // --- Penetration recovery ---
    pub penetration_max_iterations: u32,
    pub penetration_push_fraction: f32,

    // --- Height probe ---
    pub probe_distance: f32,
    pub ceiling_probe_offset: f32,

    // --- Water ---
    /// Depth of the origin below the surface while swimming on water.
    pub swim_depth: f32,
    /// Water deeper than this slows running down to wading.
    pub wade_depth: f32,
    /// Water deeper than this lifts a walking character into swimming.
    pub swim_start_depth: f32,
    /// Water shallower than this puts a swimming character back on its feet.
    pub swim_exit_depth: f32,
    pub quicksand_drown_depth: f32,
    pub quicksand_sink_speed: f32,

    // --- Speeds ---
    /// Converts animation speed (units per frame) into units per second.
    pub speed_mult: f32,
    /// Animation speed caps (units per frame).
    pub max_speed_underwater: f32,
    pub max_speed_onwater: f32,
    pub max_speed_quicksand: f32,
    /// Vertical snap speed used to glue the character to a lower floor.
    pub floor_snap_speed: f32,

    // --- Turning (radians per second at full input) ---
    pub rot_speed_land: f32,
    pub rot_speed_freefall: f32,
    pub rot_speed_underwater: f32,
    pub rot_speed_onwater: f32,
    pub rot_speed_monkeyswing: f32,

    // --- Inertia (1/s) ---
    pub inertia_underwater: f32,
    pub inertia_onwater: f32,
    pub inertia_angular: f32,
    /// Maximum roll (radians) while turning at running speed.
    pub max_lean: f32,

    // --- Fall damage (units/s, positive downward speeds) ---
    pub fall_speed_max_safe: f32,
    pub fall_speed_critical: f32,

    // --- Vitals ---
    pub health_max: f32,
    pub air_max: f32,
    pub stamina_max: f32,
    /// Air lost per second underwater; also the per-second refill on the surface.
    pub air_rate: f32,
    pub stamina_rate: f32,
    /// Health lost per second once air is exhausted.
    pub drown_damage: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            height: 768.0,
            radius: 128.0,
            climb_r: 32.0,

            min_step_up_height: 128.0,
            max_step_up_height: 256.0 + 32.0,
            max_climb_height: 1920.0,
            fall_down_height: 320.0,

            critical_slant_z_component: 0.810,
            critical_wall_component: -0.707,
            slide_speed: 1500.0,

            penetration_max_iterations: 4,
            penetration_push_fraction: 0.2,

            probe_distance: 4096.0,
            ceiling_probe_offset: 64.0,

            swim_depth: 100.0,
            wade_depth: 256.0,
            swim_start_depth: 730.0,
            swim_exit_depth: 512.0,
            quicksand_drown_depth: 640.0,
            quicksand_sink_speed: 64.0,

            speed_mult: 30.0,
            max_speed_underwater: 50.0,
            max_speed_onwater: 24.0,
            max_speed_quicksand: 5.0,
            floor_snap_speed: 2400.0,

            rot_speed_land: 2.4,
            rot_speed_freefall: 0.3,
            rot_speed_underwater: 1.1,
            rot_speed_onwater: 1.6,
            rot_speed_monkeyswing: 1.8,

            inertia_underwater: 1.0,
            inertia_onwater: 1.5,
            inertia_angular: 6.0,
            max_lean: 0.15,

            fall_speed_max_safe: FREE_FALL_SPEED_MAXSAFE,
            fall_speed_critical: FREE_FALL_SPEED_CRITICAL,

            health_max: 1000.0,
            air_max: 1800.0,
            stamina_max: 120.0,
            air_rate: 30.0,
            stamina_rate: 30.0,
            drown_damage: 150.0,
        }
    }
}

impl ControllerConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| {
            warn!("rejecting controller config: {msg}");
            Err(LocomotionError::InvalidConfig(msg.to_string()))
        };

        if !(self.radius > 0.0) {
            return fail("radius must be positive");
        }
        if !(self.height > 2.0 * self.radius) {
            return fail("height must exceed the capsule diameter");
        }
        if !(self.climb_r > 0.0) {
            return fail("climb_r must be positive");
        }
        if self.penetration_max_iterations == 0 {
            return fail("penetration_max_iterations must be at least 1");
        }
        if !(self.penetration_push_fraction > 0.0 && self.penetration_push_fraction <= 1.0) {
            return fail("penetration_push_fraction must be in (0, 1]");
        }
        if !(self.critical_slant_z_component > 0.0 && self.critical_slant_z_component < 1.0) {
            return fail("critical_slant_z_component must be in (0, 1)");
        }
        if !(self.critical_wall_component >= -1.0 && self.critical_wall_component <= 0.0) {
            return fail("critical_wall_component must be in [-1, 0]");
        }
        if !(self.probe_distance > self.ceiling_probe_offset && self.ceiling_probe_offset >= 0.0) {
            return fail("probe_distance must exceed ceiling_probe_offset");
        }
        if !(self.min_step_up_height <= self.max_step_up_height
            && self.max_step_up_height <= self.max_climb_height)
        {
            return fail("step heights must be ordered min <= max <= climb");
        }
        if !(self.swim_exit_depth < self.swim_start_depth) {
            return fail("swim_exit_depth must be below swim_start_depth");
        }
        if !(self.fall_speed_max_safe < self.fall_speed_critical) {
            return fail("fall_speed_max_safe must be below fall_speed_critical");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg = ControllerConfig::from_json_str(r#"{ "fall_down_height": 500.0 }"#).unwrap();
        assert_eq!(cfg.fall_down_height, 500.0);
        assert_eq!(cfg.radius, ControllerConfig::default().radius);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ControllerConfig::from_json_str("{ height: ").unwrap_err();
        assert!(matches!(err, LocomotionError::ConfigParse(_)));
    }

    #[test]
    fn inconsistent_values_are_rejected() {
        let err = ControllerConfig::from_json_str(r#"{ "height": 100.0 }"#).unwrap_err();
        assert!(matches!(err, LocomotionError::InvalidConfig(_)));

        let cfg = ControllerConfig {
            penetration_max_iterations: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
