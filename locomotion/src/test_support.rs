//! Levels, an animation model and log capture shared by the unit tests.

use std::{cell::RefCell, f32::consts::PI, sync::Once};

use log::{Level, LevelFilter, Log, Metadata, Record};
use rapier3d::{
    na::UnitQuaternion,
    prelude::{Vector, vector},
};

use crate::{
    animation::{AnimCommand, AnimCommandKind, AnimDispatch, Animation, AnimationModel, CommandFrame, StateChange},
    character::Character,
    collision::{BodyDef, ColliderShapeDef, ObjectHandle, RapierCollisionWorld, Vec3},
    config::ControllerConfig,
    context::SimulationContext,
    flags::SectorFlag,
    rooms::{Room, RoomSet, Sector},
    state::{LaraState, anims},
};

const FLOOR_ID: u32 = 1;
const CEILING_ID: u32 = 2;
const SOLID_ID: u32 = 10;
const EXTRA_ID: u32 = 20;

/// Half-width of the solids along x; every test runs near x = 512.
const WIDE: f32 = 6144.0;

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Debug);
    });
}

/// Records logged so far on this test's thread.
pub fn captured_logs() -> Vec<(Level, String)> {
    CAPTURED.with(|c| c.borrow().clone())
}

pub struct TestLevel {
    bodies: Vec<BodyDef>,
    world: RapierCollisionWorld,
    rooms: RoomSet,
    ledge_face: f32,
}

impl TestLevel {
    fn new(bodies: Vec<BodyDef>, rooms: RoomSet) -> Self {
        init_logging();
        let world = RapierCollisionWorld::build(bodies.clone());
        Self {
            bodies,
            world,
            rooms,
            ledge_face: 0.0,
        }
    }

    fn with_body(mut self, body: BodyDef) -> Self {
        self.bodies.push(body);
        self.world = RapierCollisionWorld::build(self.bodies.clone());
        self
    }

    /// Nothing but a slab spanning `bottom..top` over the origin.
    pub fn slab_only(bottom: f32, top: f32) -> Self {
        let rooms = RoomSet::new(vec![open_room((-2048.0, -2048.0), -1024.0, 8192.0)]);
        Self::new(vec![slab(SOLID_ID, (-2048.0, 2048.0), (-2048.0, 2048.0), (bottom, top))], rooms)
    }

    pub fn sim(&self) -> SimulationContext<'_> {
        SimulationContext::new(&self.world, &self.rooms)
    }

    pub fn character_at(&self, position: Vec3, yaw: f32) -> Character {
        let mut ch = Character::new(position, yaw, ControllerConfig::default());
        ch.update_room(&self.sim());
        ch
    }

    pub fn floor_handle(&self) -> ObjectHandle {
        self.world.handle_of(FLOOR_ID).expect("level has a floor")
    }

    /// Flag every sector of every room.
    pub fn with_sector_flag(mut self, flag: SectorFlag) -> Self {
        let mut rooms = self.rooms.rooms().to_vec();
        for sector in rooms.iter_mut().flat_map(|r| r.sectors.iter_mut()) {
            sector.flags.add(flag);
        }
        self.rooms = RoomSet::new(rooms);
        self
    }

    /// Solid starting at `z` over the top of the ledge.
    pub fn with_ceiling_over_ledge(self, z: f32) -> Self {
        let face = self.ledge_face;
        self.with_body(slab(EXTRA_ID, (-WIDE, WIDE), (face, face + 4096.0), (z, z + 1024.0)))
    }

    /// Solid starting at `z` over the floor in front of the ledge.
    pub fn with_ceiling_before_ledge(self, z: f32) -> Self {
        let face = self.ledge_face;
        self.with_body(slab(EXTRA_ID, (-WIDE, WIDE), (face - 1024.0, face), (z, z + 1024.0)))
    }
}

fn floor_plane(z: f32) -> BodyDef {
    BodyDef::new(FLOOR_ID, vector![0.0, 0.0, z], ColliderShapeDef::Plane { offset_along_normal: 0.0 })
}

fn ceiling_plane(z: f32) -> BodyDef {
    BodyDef::new(CEILING_ID, vector![0.0, 0.0, z], ColliderShapeDef::Plane { offset_along_normal: 0.0 })
        .with_rotation(UnitQuaternion::from_axis_angle(&Vector::x_axis(), PI))
}

/// Axis-aligned box spanning the given ranges.
fn slab(id: u32, x: (f32, f32), y: (f32, f32), z: (f32, f32)) -> BodyDef {
    let center = vector![(x.0 + x.1) * 0.5, (y.0 + y.1) * 0.5, (z.0 + z.1) * 0.5];
    let half_extents = vector![(x.1 - x.0) * 0.5, (y.1 - y.0) * 0.5, (z.1 - z.0) * 0.5];
    BodyDef::new(id, center, ColliderShapeDef::Cuboid { half_extents })
}

/// 4x4 sector room with plain sectors.
fn open_room(origin: (f32, f32), bottom: f32, top: f32) -> Room {
    Room::uniform(0, origin, (4, 4), (bottom, top), Sector::new(bottom, top))
}

pub fn flat_level(floor: f32, ceiling: Option<f32>) -> TestLevel {
    let top = ceiling.unwrap_or(floor + 8192.0);
    let mut bodies = vec![floor_plane(floor)];
    bodies.extend(ceiling.map(ceiling_plane));
    let room = Room::uniform(0, (0.0, 0.0), (4, 4), (floor - 1024.0, top), Sector::new(floor, top));
    TestLevel::new(bodies, RoomSet::new(vec![room]))
}

/// Solid wall for y >= `face_y`.
pub fn wall_level(face_y: f32) -> TestLevel {
    TestLevel::new(
        vec![floor_plane(0.0), slab(SOLID_ID, (-WIDE, WIDE), (face_y, face_y + 2048.0), (0.0, 4096.0))],
        RoomSet::new(vec![open_room((0.0, 0.0), -1024.0, 8192.0)]),
    )
}

/// Block for y >= `face_y` whose top is at `top_z`.
pub fn ledge_level(face_y: f32, top_z: f32) -> TestLevel {
    let mut level = TestLevel::new(
        vec![floor_plane(0.0), slab(SOLID_ID, (-WIDE, WIDE), (face_y, face_y + 4096.0), (0.0, top_z))],
        RoomSet::new(vec![open_room((0.0, 0.0), -1024.0, 8192.0)]),
    );
    level.ledge_face = face_y;
    level
}

/// Block for y >= `face_y` rolled about +Y so its top climbs steeply along x, crossing
/// z = 1024 above x = 512.
pub fn slanted_ledge_level(face_y: f32, roll: f32) -> TestLevel {
    let half = vector![2048.0, 2048.0, 768.0];
    let (s, c) = roll.sin_cos();
    let center = vector![512.0 - half.z * s, face_y + half.y, 1024.0 - half.z * c];
    let block = BodyDef::new(SOLID_ID, center, ColliderShapeDef::Cuboid { half_extents: half })
        .with_rotation(UnitQuaternion::from_axis_angle(&Vector::y_axis(), roll));
    TestLevel::new(
        vec![floor_plane(0.0), block],
        RoomSet::new(vec![open_room((0.0, 0.0), -1024.0, 8192.0)]),
    )
}

/// Tall wall for y >= `face_y`; the sectors in front are climbable when `climbable`.
pub fn ladder_level(face_y: f32, climbable: bool) -> TestLevel {
    let level = TestLevel::new(
        vec![floor_plane(0.0), slab(SOLID_ID, (-WIDE, WIDE), (face_y, face_y + 2048.0), (0.0, 2048.0))],
        RoomSet::new(vec![open_room((0.0, 0.0), -1024.0, 8192.0)]),
    );
    if climbable {
        level.with_sector_flag(SectorFlag::Climbable)
    } else {
        level
    }
}

/// Plane through the origin rising toward +Y at `angle`.
pub fn slope_level(angle: f32) -> TestLevel {
    let plane = BodyDef::new(FLOOR_ID, Vector::zeros(), ColliderShapeDef::Plane { offset_along_normal: 0.0 })
        .with_rotation(UnitQuaternion::from_axis_angle(&Vector::x_axis(), angle));
    TestLevel::new(vec![plane], RoomSet::new(vec![open_room((0.0, 0.0), -1024.0, 8192.0)]))
}

/// Floor at 0 with a 200-high step from y = 1536 and a 600-high block from y = 2560.
pub fn step_level() -> TestLevel {
    TestLevel::new(
        vec![
            floor_plane(0.0),
            slab(SOLID_ID, (-WIDE, WIDE), (1536.0, 2560.0), (0.0, 200.0)),
            slab(SOLID_ID + 1, (-WIDE, WIDE), (2560.0, 4096.0), (0.0, 600.0)),
        ],
        RoomSet::new(vec![open_room((0.0, 0.0), -1024.0, 8192.0)]),
    )
}

/// Floor at 0, ceiling at 1536, monkey bars over the first sector row (y < 1024).
pub fn monkey_level() -> TestLevel {
    let mut room = Room::uniform(0, (0.0, 0.0), (2, 4), (0.0, 1536.0), Sector::new(0.0, 1536.0));
    let depth = room.depth;
    for (i, sector) in room.sectors.iter_mut().enumerate() {
        if i % depth == 0 {
            sector.flags.add(SectorFlag::Monkeyswing);
        }
    }
    TestLevel::new(vec![floor_plane(0.0), ceiling_plane(1536.0)], RoomSet::new(vec![room]))
}

/// 1024-deep pool (surface at 0) over 0..2048 on x and y, with a pool side rising to 128
/// for y >= 1536.
pub fn pool_level() -> TestLevel {
    let water = Room::uniform(
        0,
        (0.0, 0.0),
        (2, 2),
        (-1024.0, 0.0),
        Sector::new(-1024.0, 0.0).with_flag(SectorFlag::Water),
    );
    let air = Room::uniform(1, (0.0, 0.0), (2, 2), (0.0, 2048.0), Sector::new(0.0, 2048.0));
    let mut rooms = RoomSet::new(vec![water, air]);
    rooms.stack_rooms(0, 1);
    TestLevel::new(
        vec![floor_plane(-1024.0), slab(SOLID_ID, (0.0, 2048.0), (1536.0, 2048.0), (-1024.0, 128.0))],
        rooms,
    )
}

/// Named animations; the first entry per state is that state's canonical animation.
/// (index, state, frames, speed, rollover)
const NAMED: &[(usize, LaraState, u16, f32, Option<usize>)] = &[
    (anims::STAY_IDLE, LaraState::Stop, 30, 0.0, None),
    (anims::RUN, LaraState::RunForward, 22, 30.0, None),
    (anims::WALK_FORWARD, LaraState::WalkForward, 24, 10.0, None),
    (anims::RUN_TO_STAY_LEFT, LaraState::Stop, 6, 0.0, Some(anims::STAY_IDLE)),
    (anims::RUN_TO_STAY_RIGHT, LaraState::Stop, 6, 0.0, Some(anims::STAY_IDLE)),
    (anims::LANDING_HARD, LaraState::Stop, 12, 0.0, Some(anims::STAY_IDLE)),
    (anims::LANDING_LIGHT, LaraState::Stop, 6, 0.0, Some(anims::STAY_IDLE)),
    (anims::WALL_SMASH_LEFT, LaraState::Stop, 8, 0.0, Some(anims::STAY_IDLE)),
    (anims::WALL_SMASH_RIGHT, LaraState::Stop, 8, 0.0, Some(anims::STAY_IDLE)),
    (anims::FREE_FALL_FORWARD, LaraState::FreeFall, 8, 0.0, None),
    (anims::HANG_TO_RELEASE, LaraState::GrabToFall, 6, 0.0, Some(anims::FREE_FALL_FORWARD)),
    (anims::CLIMB_ON, LaraState::Climbing, 16, 0.0, Some(anims::STAY_IDLE)),
    (anims::CLIMB_2CLICK, LaraState::Climbing, 12, 0.0, Some(anims::STAY_IDLE)),
    (anims::CLIMB_3CLICK, LaraState::Climbing, 16, 0.0, Some(anims::STAY_IDLE)),
    (anims::SLIDE_FORWARD, LaraState::SlideForward, 8, 0.0, None),
    (anims::START_SLIDE_BACKWARD, LaraState::SlideBack, 8, 0.0, None),
    (anims::HANG_IDLE, LaraState::Hang, 16, 0.0, None),
    (anims::UNDERWATER_IDLE, LaraState::UnderwaterStop, 30, 0.0, None),
    (anims::ONWATER_IDLE, LaraState::OnWaterStop, 30, 0.0, None),
    (anims::UNDERWATER_TO_ONWATER, LaraState::OnWaterStop, 12, 0.0, Some(anims::ONWATER_IDLE)),
    (anims::ONWATER_DIVE, LaraState::UnderwaterDiving, 12, 0.0, Some(anims::UNDERWATER_IDLE)),
    (anims::FREE_FALL_TO_UNDERWATER, LaraState::UnderwaterDiving, 8, 0.0, Some(anims::UNDERWATER_IDLE)),
    (anims::UNDERWATER_DEATH, LaraState::WaterDeath, 20, 0.0, None),
    (anims::ONWATER_DEATH, LaraState::WaterDeath, 20, 0.0, None),
    (anims::ROLL_BEGIN, LaraState::RollForward, 15, 20.0, Some(anims::STAY_IDLE)),
    (anims::LADDER_IDLE, LaraState::LadderIdle, 16, 0.0, None),
    (anims::CROUCH_IDLE, LaraState::CrouchIdle, 30, 0.0, None),
    (anims::MONKEY_IDLE, LaraState::MonkeyswingIdle, 30, 0.0, None),
    (anims::CRAWL_IDLE, LaraState::CrawlIdle, 30, 0.0, None),
    (anims::TIGHTROPE_IDLE, LaraState::TightropeIdle, 30, 0.0, None),
];

/// Generated animations start after the last named one.
const GENERATED_START: usize = anims::TIGHTROPE_IDLE + 1;

const JUMP_VERTICAL: f32 = 1800.0;
const JUMP_HORIZONTAL: f32 = 750.0;

fn generated_speed(state: LaraState) -> f32 {
    use LaraState::*;
    match state {
        Sprint => 45.0,
        RunBack => 20.0,
        SprintRoll | RollBackward => 20.0,
        WadeForward => 10.0,
        WalkBack | StepLeft | StepRight => 6.0,
        MonkeyswingForward | MonkeyswingLeft | MonkeyswingRight => 8.0,
        CrawlForward | CrawlBack | TightropeForward | LadderUp | LadderDown | LadderLeft
        | LadderRight => 5.0,
        ShimmyLeft | ShimmyRight | PushablePush | PushablePull => 4.0,
        _ => 0.0,
    }
}

fn jump_launch(state: LaraState) -> Option<AnimCommandKind> {
    let horizontal = match state {
        LaraState::JumpUp => 0.0,
        LaraState::JumpForward | LaraState::JumpBack | LaraState::JumpLeft | LaraState::JumpRight => {
            JUMP_HORIZONTAL
        }
        _ => return None,
    };
    Some(AnimCommandKind::JumpDistance {
        vertical: JUMP_VERTICAL,
        horizontal,
    })
}

fn canonical(animations: &[Animation], state: LaraState) -> usize {
    NAMED
        .iter()
        .find(|n| n.1 == state)
        .map(|n| n.0)
        .or_else(|| {
            animations
                .iter()
                .skip(GENERATED_START)
                .position(|a| a.state_id == state.id())
                .map(|i| i + GENERATED_START)
        })
        .unwrap_or(anims::STAY_IDLE)
}

/// Lara's animation set, reduced to what the handlers rely on.
///
/// Named indices carry their real states; every other state gets one generated
/// animation. Every real animation can reach every state's canonical animation at any
/// frame, except the run, which stops on the left foot in its first half and on the
/// right in its second.
pub fn lara_model() -> AnimationModel {
    let filler = |i: usize| Animation {
        state_id: u16::MAX,
        next_anim: i,
        ..Default::default()
    };
    let mut animations: Vec<Animation> = (0..GENERATED_START).map(filler).collect();
    for &(index, state, frames, speed, rollover) in NAMED {
        animations[index] = Animation {
            state_id: state.id(),
            frame_duration: frames,
            speed,
            next_anim: rollover.unwrap_or(index),
            ..Default::default()
        };
    }

    for state in LaraState::ALL {
        if NAMED.iter().any(|n| n.1 == *state) {
            continue;
        }
        let index = animations.len();
        let launch = jump_launch(*state);
        animations.push(Animation {
            state_id: state.id(),
            frame_duration: 10,
            speed: generated_speed(*state),
            // Jumps hand over to the fall instead of relaunching.
            next_anim: if launch.is_some() { anims::FREE_FALL_FORWARD } else { index },
            commands: launch
                .map(|kind| AnimCommand {
                    frame: CommandFrame::At(0),
                    kind,
                })
                .into_iter()
                .collect(),
            ..Default::default()
        });
    }

    let targets: Vec<(u16, usize)> = LaraState::ALL
        .iter()
        .map(|s| (s.id(), canonical(&animations, *s)))
        .collect();
    for (index, anim) in animations.iter_mut().enumerate() {
        if anim.state_id == u16::MAX {
            continue;
        }
        let last = anim.last_frame();
        anim.state_changes = targets
            .iter()
            .map(|&(target, next_anim)| {
                let whole = |next_anim| AnimDispatch {
                    frame_low: 0,
                    frame_high: last,
                    next_anim,
                    next_frame: 0,
                };
                let dispatches = if index == anims::RUN && target == LaraState::Stop.id() {
                    vec![
                        AnimDispatch {
                            frame_high: 10,
                            ..whole(anims::RUN_TO_STAY_LEFT)
                        },
                        AnimDispatch {
                            frame_low: 11,
                            ..whole(anims::RUN_TO_STAY_RIGHT)
                        },
                    ]
                } else {
                    vec![whole(next_anim)]
                };
                StateChange { target, dispatches }
            })
            .collect();
    }

    AnimationModel::new(animations).expect("test model is valid")
}

/// Canonical animation for `state` in a model built by [`lara_model`].
pub fn anim_for(model: &AnimationModel, state: LaraState) -> usize {
    canonical(model.animations(), state)
}
