/*!
Character state owned by one actor: transform, speeds, move mode, cached probe results,
the current command and per-tick response flags.

Submodules implement the operations on it:
- height:      floor/ceiling/water probe and next-step classification
- penetration: iterative push-out from overlapping solids
- climb:       edge and wall climbability
- movement:    per-move-mode integrators
- params:      health, air and stamina
*/

pub mod climb;
pub mod height;
pub mod movement;
pub mod params;
pub mod penetration;

use log::debug;
use rapier3d::parry::shape::Capsule;

use crate::{
    animation::skeleton::PendingAction,
    collision::{CapsuleAxis, CapsuleSpec, Iso, Quat, Vec3},
    config::ControllerConfig,
    context::SimulationContext,
    flags::{CommandFlag, CommandFlags},
    math::{rotation_from_angles, wrap_angle},
};

pub use climb::{ClimbClearance, ClimbInfo, WallHit};
pub use height::{HeightInfo, QuicksandState, StepType, SurfaceHit};
pub use params::CharacterParams;

/// Largest pitch magnitude (radians) while swimming.
pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.05;

/// Coarse locomotion regime; selects the integrator and the collision volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveMode {
    OnFloor,
    FreeFalling,
    Climbing,
    Underwater,
    OnWater,
    WallsClimb,
    Monkeyswing,
}

/// Direction the current animation moves the character in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveDirection {
    Stay,
    Forward,
    Backward,
    Left,
    Right,
}

/// Basis column and sign per `MoveDirection`, indexed by discriminant.
/// Columns: 0 = right, 1 = forward, 2 = up.
const DIRECTION_BASIS: [Option<(usize, f32)>; 5] = [
    None,
    Some((1, 1.0)),
    Some((1, -1.0)),
    Some((0, -1.0)),
    Some((0, 1.0)),
];

/// Ladders map forward/backward onto the up axis.
const WALL_CLIMB_BASIS: [Option<(usize, f32)>; 5] = [
    None,
    Some((2, 1.0)),
    Some((2, -1.0)),
    Some((0, -1.0)),
    Some((0, 1.0)),
];

impl MoveDirection {
    #[inline]
    pub fn basis(self) -> Option<(usize, f32)> {
        DIRECTION_BASIS[self as usize]
    }

    #[inline]
    pub fn wall_climb_basis(self) -> Option<(usize, f32)> {
        WALL_CLIMB_BASIS[self as usize]
    }
}

/// Per-tick intent from the input layer or AI.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Command {
    /// -1/0/1 per axis: x strafes right, y walks forward, z climbs or swims up.
    pub movement: [i8; 3],
    /// Turn input per axis (yaw, pitch, roll), -1..1. Positive yaw turns left.
    pub rot: Vec3,
    pub flags: CommandFlags,
}

impl Command {
    #[inline]
    pub fn has(&self, flag: CommandFlag) -> bool {
        self.flags.has(flag)
    }

    #[inline]
    pub fn forward(&self) -> bool {
        self.movement[1] > 0
    }

    #[inline]
    pub fn back(&self) -> bool {
        self.movement[1] < 0
    }

    #[inline]
    pub fn left(&self) -> bool {
        self.movement[0] < 0
    }

    #[inline]
    pub fn right(&self) -> bool {
        self.movement[0] > 0
    }

    #[inline]
    pub fn up(&self) -> bool {
        self.movement[2] > 0
    }

    #[inline]
    pub fn down(&self) -> bool {
        self.movement[2] < 0
    }

    /// -1 turning right, 1 turning left, 0 otherwise.
    #[inline]
    pub fn turn(&self) -> f32 {
        if self.rot.x > 0.0 {
            1.0
        } else if self.rot.x < 0.0 {
            -1.0
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideDirection {
    Forward,
    Back,
}

/// Collision feedback produced by the integrators and read by the state handlers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Response {
    pub killed: bool,
    /// Set once the kill has been reported to the outside.
    pub kill_reported: bool,
    pub horizontal_collide: bool,
    pub floor_collide: bool,
    pub ceiling_collide: bool,
    pub slide: Option<SlideDirection>,
    /// Downward speed at the last landing (units/s).
    pub landing_speed: f32,
}

impl Response {
    pub fn reset_collisions(&mut self) {
        self.horizontal_collide = false;
        self.floor_collide = false;
        self.ceiling_collide = false;
    }
}

/// Capsule and its center offset in the character frame for one move mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionVolume {
    pub capsule: CapsuleSpec,
    /// Capsule center relative to the character origin (feet).
    pub offset: Vec3,
}

impl CollisionVolume {
    /// Volume for a move mode.
    ///
    /// On the floor the capsule is lifted above step height so that stepping onto low
    /// geometry is left to the floor clamp. Swimming uses a capsule lying along forward.
    pub fn for_mode(mode: MoveMode, crouched: bool, cfg: &ControllerConfig) -> Self {
        let r = cfg.radius;
        let height = if crouched {
            cfg.height * 0.5
        } else {
            cfg.height
        };
        match mode {
            MoveMode::Underwater | MoveMode::OnWater => Self {
                capsule: CapsuleSpec {
                    radius: r,
                    half_height: (cfg.height * 0.5 - r).max(0.0),
                    axis: CapsuleAxis::Forward,
                },
                offset: Vec3::new(0.0, 0.0, r),
            },
            MoveMode::OnFloor => {
                let bottom = cfg.max_step_up_height.min(height - 2.0 * r);
                Self::vertical(r, bottom, height)
            }
            _ => Self::vertical(r, 0.0, height),
        }
    }

    fn vertical(r: f32, bottom: f32, top: f32) -> Self {
        Self {
            capsule: CapsuleSpec {
                radius: r,
                half_height: ((top - bottom) * 0.5 - r).max(0.0),
                axis: CapsuleAxis::Vertical,
            },
            offset: Vec3::new(0.0, 0.0, (top + bottom) * 0.5),
        }
    }

    pub fn shape(&self) -> Capsule {
        match self.capsule.axis {
            CapsuleAxis::Vertical => Capsule::new_z(self.capsule.half_height, self.capsule.radius),
            CapsuleAxis::Forward => Capsule::new_y(self.capsule.half_height, self.capsule.radius),
        }
    }

    /// World pose for a character at `position` facing `rotation`.
    pub fn pose(&self, position: &Vec3, rotation: &Quat, yaw: f32) -> Iso {
        let rot = match self.capsule.axis {
            CapsuleAxis::Vertical => Quat::from_axis_angle(&Vec3::z_axis(), yaw),
            CapsuleAxis::Forward => *rotation,
        };
        Iso::from_parts((position + rot * self.offset).into(), rot)
    }

    /// Highest point of the volume above the origin.
    pub fn top(&self) -> f32 {
        match self.capsule.axis {
            CapsuleAxis::Vertical => {
                self.offset.z + self.capsule.half_height + self.capsule.radius
            }
            CapsuleAxis::Forward => self.offset.z + self.capsule.radius,
        }
    }
}

/// One actor's locomotion state.
#[derive(Clone, Debug)]
pub struct Character {
    /// Origin at the feet.
    pub position: Vec3,
    /// (yaw, pitch, roll) in radians.
    pub angles: Vec3,
    /// World velocity (units/s).
    pub speed: Vec3,
    /// Animation-driven speed (units per frame).
    pub current_speed: f32,
    pub speed_mult: f32,
    pub inertia_linear: f32,
    pub inertia_angular: [f32; 2],
    pub move_mode: MoveMode,
    pub dir: MoveDirection,
    pub crouched: bool,
    /// Skip penetration recovery while scripted animations move the body.
    pub no_fix: bool,
    pub height_info: HeightInfo,
    pub climb: ClimbInfo,
    pub command: Command,
    pub response: Response,
    pub params: CharacterParams,
    pub room: Option<usize>,
    pub visible: bool,
    /// Tightrope sway, -1..1; falls off past either end.
    pub balance: f32,
    pub config: ControllerConfig,
}

impl Character {
    pub fn new(position: Vec3, yaw: f32, config: ControllerConfig) -> Self {
        let params = CharacterParams::new(&config);
        Self {
            position,
            angles: Vec3::new(wrap_angle(yaw), 0.0, 0.0),
            speed: Vec3::zeros(),
            current_speed: 0.0,
            speed_mult: config.speed_mult,
            inertia_linear: 0.0,
            inertia_angular: [0.0; 2],
            move_mode: MoveMode::OnFloor,
            dir: MoveDirection::Stay,
            crouched: false,
            no_fix: false,
            height_info: HeightInfo::default(),
            climb: ClimbInfo::default(),
            command: Command::default(),
            response: Response::default(),
            params,
            room: None,
            visible: true,
            balance: 0.0,
            config,
        }
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        rotation_from_angles(self.angles.x, self.angles.y, self.angles.z)
    }

    pub fn transform(&self) -> Iso {
        Iso::from_parts(self.position.into(), self.rotation())
    }

    /// World-space basis column: 0 = right, 1 = forward, 2 = up.
    #[inline]
    pub fn basis(&self, column: usize) -> Vec3 {
        let mut axis = Vec3::zeros();
        axis[column] = 1.0;
        self.rotation() * axis
    }

    /// Horizontal forward direction, ignoring pitch and roll.
    pub fn forward_xy(&self) -> Vec3 {
        let (s, c) = self.angles.x.sin_cos();
        Vec3::new(-s, c, 0.0)
    }

    pub fn right_xy(&self) -> Vec3 {
        let (s, c) = self.angles.x.sin_cos();
        Vec3::new(c, s, 0.0)
    }

    pub fn volume(&self) -> CollisionVolume {
        CollisionVolume::for_mode(self.move_mode, self.crouched, &self.config)
    }

    /// Body height for the current pose.
    pub fn body_height(&self) -> f32 {
        self.volume().top()
    }

    pub fn set_move_mode(&mut self, mode: MoveMode) {
        if self.move_mode != mode {
            debug!("move mode {:?} -> {:?}", self.move_mode, mode);
            self.move_mode = mode;
        }
    }

    /// Turn by `rate` (rad/s) scaled by the yaw input.
    pub fn turn(&mut self, rate: f32, dt: f32) {
        self.angles.x = wrap_angle(self.angles.x + self.command.rot.x * rate * dt);
    }

    /// Pitch by `rate` (rad/s) scaled by the pitch input, clamped to straight up/down.
    pub fn pitch(&mut self, rate: f32, dt: f32) {
        self.angles.y = (self.angles.y + self.command.rot.y * rate * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Velocity along the current move direction at the animation-driven speed.
    pub fn direction_velocity(&self) -> Vec3 {
        let t = self.current_speed * self.speed_mult;
        let table = if self.move_mode == MoveMode::WallsClimb {
            self.dir.wall_climb_basis()
        } else {
            self.dir.basis()
        };
        match table {
            Some((0, sign)) => self.right_xy() * (sign * t),
            Some((1, sign)) => self.forward_xy() * (sign * t),
            Some((_, sign)) => Vec3::z() * (sign * t),
            None => Vec3::zeros(),
        }
    }

    /// Refresh the room index from the current position.
    pub fn update_room(&mut self, sim: &SimulationContext<'_>) {
        let probe = self.position + Vec3::z();
        if let Some(room) = sim.rooms.find_room_containing(&probe, self.room) {
            self.room = Some(room);
        }
    }

    /// Launch into a jump with the given vertical and horizontal speeds.
    pub fn set_to_jump(&mut self, vertical: f32, horizontal: f32) {
        let (col, sign) = self.dir.basis().unwrap_or((1, 1.0));
        let planar = if col == 0 {
            self.right_xy()
        } else {
            self.forward_xy()
        };
        self.speed = planar * (sign * horizontal);
        self.speed.z = vertical;
        self.response.reset_collisions();
        self.response.slide = None;
        self.set_move_mode(MoveMode::FreeFalling);
    }

    pub fn kill(&mut self) {
        self.response.killed = true;
        self.params.health = 0.0;
    }

    /// Apply a post-transition action installed by a state handler.
    pub fn apply_pending_action(&mut self, action: PendingAction) {
        debug!("applying pending action {action:?}");
        match action {
            PendingAction::SetMoveMode(mode) => self.set_move_mode(mode),
            PendingAction::ClimbToEdge(point) => {
                self.position = point;
                self.speed = Vec3::zeros();
                self.no_fix = false;
                self.set_move_mode(MoveMode::OnFloor);
            }
            PendingAction::HangAt(point) => {
                self.position = point;
                self.speed = Vec3::zeros();
                self.set_move_mode(MoveMode::Climbing);
            }
            PendingAction::TurnAround => {
                self.angles.x = wrap_angle(self.angles.x + std::f32::consts::PI);
            }
            PendingAction::EnableFix => self.no_fix = false,
        }
    }
}
