//! Animation indices in Lara's model that handlers jump to directly.
//!
//! Everything else is reached through the dispatch tables.

pub const RUN: usize = 0;
pub const WALK_FORWARD: usize = 1;
pub const RUN_TO_STAY_LEFT: usize = 8;
pub const RUN_TO_STAY_RIGHT: usize = 10;
pub const LANDING_HARD: usize = 24;
pub const LANDING_LIGHT: usize = 31;
pub const FREE_FALL_FORWARD: usize = 34;
pub const HANG_TO_RELEASE: usize = 37;
pub const CLIMB_3CLICK: usize = 42;
pub const CLIMB_2CLICK: usize = 50;
pub const WALL_SMASH_LEFT: usize = 53;
pub const WALL_SMASH_RIGHT: usize = 54;
pub const SLIDE_FORWARD: usize = 70;
pub const HANG_IDLE: usize = 96;
pub const CLIMB_ON: usize = 97;
pub const STAY_IDLE: usize = 103;
pub const START_SLIDE_BACKWARD: usize = 104;
pub const UNDERWATER_IDLE: usize = 108;
pub const ONWATER_IDLE: usize = 110;
pub const FREE_FALL_TO_UNDERWATER: usize = 112;
pub const UNDERWATER_TO_ONWATER: usize = 114;
pub const ONWATER_DIVE: usize = 115;
pub const UNDERWATER_DEATH: usize = 124;
pub const ONWATER_DEATH: usize = 132;
pub const ROLL_BEGIN: usize = 146;
pub const LADDER_IDLE: usize = 164;
pub const CROUCH_IDLE: usize = 222;
pub const MONKEY_IDLE: usize = 234;
pub const CRAWL_IDLE: usize = 263;
pub const TIGHTROPE_IDLE: usize = 396;
