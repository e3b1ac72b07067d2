// Level units: one sector is 1024 units wide, one "click" is a quarter of that.
pub const SECTOR_SIZE: f32 = 1024.0;
pub const STEP_HEIGHT: f32 = 256.0;

/// Default animation playback rate (frames per second).
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Default world gravity (units/s^2, pointing down).
pub const DEFAULT_GRAVITY_Z: f32 = -4500.0;

/// Fall speeds (units/s) used by landing classification and fall damage.
pub const FREE_FALL_SPEED_2: f32 = 4500.0;
pub const FREE_FALL_SPEED_MAXSAFE: f32 = 5500.0;
pub const FREE_FALL_SPEED_CRITICAL: f32 = 7500.0;
pub const FREE_FALL_SPEED_MAXIMUM: f32 = 7800.0;

/// Probe offsets ahead of the character when checking the next step.
pub const WALK_FORWARD_OFFSET: f32 = 96.0;
pub const WALK_BACK_OFFSET: f32 = 16.0;
pub const RUN_FORWARD_OFFSET: f32 = 128.0;
pub const CRAWL_FORWARD_OFFSET: f32 = 256.0;

/// Hanging tolerances.
pub const HANG_WALL_DISTANCE: f32 = 128.0 - 24.0;
pub const HANG_VERTICAL_EPSILON: f32 = 64.0;
pub const TRY_HANG_WALL_OFFSET: f32 = 72.0;
pub const HANG_SENSOR_Z: f32 = 800.0;
