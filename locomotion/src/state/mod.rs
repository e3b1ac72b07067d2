/*!
Lara's control state machine.

Each `LaraState` value may have a handler registered in the `StateController`. A handler
reads the character's command and environment, adjusts move direction and flags, and
asks for the next state through `StateContext::set_next_state`. The animation stepper
then reaches that state through the current animation's dispatch table.

Handler families:
- ground:  standing, walking, running, sidesteps, wading, rolls, slides, death
- air:     jumps, free fall, reach, swan dive
- hang:    hanging, shimmying, climbing up, monkey bars, ladders
- crawl:   crouching and crawling
- water:   underwater and surface swimming
- special: tightrope and scripted interactions
*/

pub mod air;
pub mod anims;
pub mod crawl;
pub mod ground;
pub mod hang;
pub mod special;
pub mod water;

use std::collections::HashMap;

use log::{debug, error};

use crate::{
    animation::{AnimationMode, AnimationModel, PendingAction, Skeleton},
    character::{Character, Command, HeightInfo, MoveMode, StepType},
    collision::Vec3,
    context::SimulationContext,
    controller::ControllerEvent,
    error::{LocomotionError, Result},
    flags::CommandFlag,
};

/// Declare `LaraState` with explicit ids plus `ALL` and `TryFrom<u16>`.
macro_rules! lara_states {
    ($($variant:ident = $id:literal),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum LaraState {
            $($variant = $id),*
        }

        impl LaraState {
            pub const ALL: &'static [LaraState] = &[$(LaraState::$variant),*];

            #[inline]
            pub const fn id(self) -> u16 {
                self as u16
            }
        }

        impl TryFrom<u16> for LaraState {
            type Error = u16;

            fn try_from(id: u16) -> std::result::Result<Self, u16> {
                match id {
                    $($id => Ok(LaraState::$variant),)*
                    other => Err(other),
                }
            }
        }
    };
}

lara_states! {
    WalkForward = 0,
    RunForward = 1,
    Stop = 2,
    JumpForward = 3,
    Pose = 4,
    RunBack = 5,
    TurnRightSlow = 6,
    TurnLeftSlow = 7,
    Death = 8,
    FreeFall = 9,
    Hang = 10,
    Reach = 11,
    Splat = 12,
    UnderwaterStop = 13,
    GrabToFall = 14,
    JumpPrepare = 15,
    WalkBack = 16,
    UnderwaterForward = 17,
    UnderwaterInertia = 18,
    Climbing = 19,
    TurnFast = 20,
    StepRight = 21,
    StepLeft = 22,
    RollBackward = 23,
    SlideForward = 24,
    JumpBack = 25,
    JumpLeft = 26,
    JumpRight = 27,
    JumpUp = 28,
    FallBackward = 29,
    ShimmyLeft = 30,
    ShimmyRight = 31,
    SlideBack = 32,
    OnWaterStop = 33,
    OnWaterForward = 34,
    UnderwaterDiving = 35,
    PushablePush = 36,
    PushablePull = 37,
    PushableGrab = 38,
    PickUp = 39,
    SwitchDown = 40,
    SwitchUp = 41,
    InsertKey = 42,
    InsertPuzzle = 43,
    WaterDeath = 44,
    RollForward = 45,
    BoulderDeath = 46,
    OnWaterBack = 47,
    OnWaterLeft = 48,
    OnWaterRight = 49,
    UseMidas = 50,
    MidasDeath = 51,
    SwandiveBegin = 52,
    SwandiveEnd = 53,
    Handstand = 54,
    OnWaterExit = 55,
    LadderIdle = 56,
    LadderUp = 57,
    LadderLeft = 58,
    LadderEnd = 59,
    LadderRight = 60,
    LadderDown = 61,
    WadeForward = 65,
    UnderwaterTurnaround = 66,
    FlarePickup = 67,
    JumpRoll = 68,
    ZiplineRide = 70,
    CrouchIdle = 71,
    CrouchRoll = 72,
    Sprint = 73,
    SprintRoll = 74,
    MonkeyswingIdle = 75,
    MonkeyswingForward = 76,
    MonkeyswingLeft = 77,
    MonkeyswingRight = 78,
    MonkeyswingTurnaround = 79,
    CrawlIdle = 80,
    CrawlForward = 81,
    MonkeyswingTurnLeft = 82,
    MonkeyswingTurnRight = 83,
    CrawlTurnLeft = 84,
    CrawlTurnRight = 85,
    CrawlBack = 86,
    ClimbToCrawl = 87,
    CrawlToClimb = 88,
    MiscControl = 89,
    RopeTurnLeft = 90,
    RopeTurnRight = 91,
    GiantButtonPush = 92,
    TrapdoorFloorOpen = 93,
    RoundHandle = 95,
    Cogwheel = 96,
    LeverSwitchPush = 97,
    Hole = 98,
    PoleIdle = 99,
    PoleUp = 100,
    PoleDown = 101,
    PoleTurnLeft = 102,
    PoleTurnRight = 103,
    Pulley = 104,
    CrouchTurnLeft = 105,
    CrouchTurnRight = 106,
    ClimbCornerLeftOuter = 107,
    ClimbCornerRightOuter = 108,
    ClimbCornerLeftInner = 109,
    ClimbCornerRightInner = 110,
    RopeIdle = 111,
    RopeClimbUp = 112,
    RopeClimbDown = 113,
    RopeSwing = 114,
    LadderToHands = 115,
    PositionCorrector = 116,
    DoubledoorsPush = 117,
    Dozy = 118,
    TightropeIdle = 119,
    TightropeTurnaround = 120,
    TightropeForward = 121,
    TightropeBalancingLeft = 122,
    TightropeBalancingRight = 123,
    TightropeEnter = 124,
    TightropeExit = 125,
    DoveSwitch = 126,
    TightropeRestoreBalance = 127,
    BarsSwing = 128,
    BarsJump = 129,
}

pub type StateHandler = fn(&mut StateContext<'_, '_>) -> Result<()>;

/// Everything a handler may touch during one `handle` call.
pub struct StateContext<'a, 's> {
    pub character: &'a mut Character,
    pub skeleton: &'a mut Skeleton,
    pub model: &'a AnimationModel,
    pub sim: &'a SimulationContext<'s>,
    pub events: &'a mut Vec<ControllerEvent>,
    pub dt: f32,
    controller: &'a StateController,
}

impl<'a, 's> StateContext<'a, 's> {
    pub fn new(
        controller: &'a StateController,
        character: &'a mut Character,
        skeleton: &'a mut Skeleton,
        model: &'a AnimationModel,
        sim: &'a SimulationContext<'s>,
        events: &'a mut Vec<ControllerEvent>,
        dt: f32,
    ) -> Self {
        Self {
            character,
            skeleton,
            model,
            sim,
            events,
            dt,
            controller,
        }
    }

    #[inline]
    pub fn cmd(&self) -> Command {
        self.character.command
    }

    #[inline]
    pub fn frame(&self) -> u16 {
        self.skeleton.current.frame
    }

    #[inline]
    pub fn animation(&self) -> usize {
        self.skeleton.current.animation
    }

    pub fn is_last_frame(&self) -> bool {
        let anim = self.model.animation(self.skeleton.current.animation).1;
        self.skeleton.current.frame >= anim.last_frame()
    }

    /// Ask the stepper to reach `state`.
    ///
    /// Fails without touching the skeleton when `state` has no handler.
    pub fn set_next_state(&mut self, state: LaraState) -> Result<()> {
        if !self.controller.is_registered(state) {
            error!("set_next_state({state:?}): state has no registered handler");
            return Err(LocomotionError::UnregisteredState(state));
        }
        self.skeleton.next_state = state.id();
        Ok(())
    }

    /// Jump straight to `animation`, bypassing dispatch.
    pub fn set_animation(&mut self, animation: usize, frame: u16) {
        self.skeleton.set_animation(self.model, animation, frame);
    }

    /// Index of the dispatch case the current frame would take toward `target`.
    ///
    /// Used to pick between the left and right foot variants of a transition.
    pub fn anim_dispatch_case(&self, target: LaraState) -> Option<usize> {
        let anim = self.model.animation(self.skeleton.current.animation).1;
        let frame = self.skeleton.current.frame;
        anim.state_change(target.id())?
            .find(frame, frame.saturating_add(1))
    }

    /// Run `action` on the character when the next animation starts.
    pub fn on_new_animation(&mut self, action: PendingAction) {
        self.skeleton.set_pending_action(action);
    }

    pub fn emit(&mut self, event: ControllerEvent) {
        self.events.push(event);
    }

    /// Floor class at `distance` along the horizontal forward axis.
    pub fn step_ahead(&self, distance: f32) -> (StepType, HeightInfo) {
        let offset = self.character.forward_xy() * distance;
        self.character.check_next_step(self.sim, &offset)
    }

    /// Floor class at `distance` along the horizontal right axis (negative for left).
    pub fn step_aside(&self, distance: f32) -> (StepType, HeightInfo) {
        let offset = self.character.right_xy() * distance;
        self.character.check_next_step(self.sim, &offset)
    }

    /// Whether a body-height ray along `dir` from waist height hits something within
    /// `reach`.
    pub fn blocked_toward(&self, dir: &Vec3, reach: f32) -> bool {
        let from = self.character.position + Vec3::new(0.0, 0.0, self.character.body_height() * 0.5);
        self.sim.world.ray_test(&from, &(from + dir * reach)).is_some()
    }
}

/// Handler table keyed by `LaraState`.
#[derive(Clone)]
pub struct StateController {
    handlers: HashMap<LaraState, StateHandler>,
}

impl Default for StateController {
    fn default() -> Self {
        Self::new()
    }
}

impl StateController {
    /// Controller with every handler family registered.
    pub fn new() -> Self {
        let mut controller = Self::empty();
        ground::register(&mut controller);
        air::register(&mut controller);
        hang::register(&mut controller);
        crawl::register(&mut controller);
        water::register(&mut controller);
        special::register(&mut controller);
        controller
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, state: LaraState, handler: StateHandler) {
        if self.handlers.insert(state, handler).is_some() {
            debug!("handler for {state:?} replaced");
        }
    }

    #[inline]
    pub fn is_registered(&self, state: LaraState) -> bool {
        self.handlers.contains_key(&state)
    }

    /// States without a handler, in id order.
    pub fn unregistered_states(&self) -> Vec<LaraState> {
        LaraState::ALL
            .iter()
            .copied()
            .filter(|s| !self.is_registered(*s))
            .collect()
    }

    /// Run the handler for the skeleton's current state.
    ///
    /// A request for an unregistered state ends the handler early but not the tick.
    pub fn handle(&self, ctx: &mut StateContext<'_, '_>) -> Result<()> {
        ctx.skeleton.mode = AnimationMode::Normal;
        ctx.character.update_height_info(ctx.sim);

        if ctx.character.response.killed && !ctx.character.response.kill_reported {
            ctx.character.response.kill_reported = true;
            ctx.emit(ControllerEvent::StopAmbientAudio);
        }

        let id = ctx.skeleton.state();
        let handler = LaraState::try_from(id)
            .ok()
            .and_then(|s| self.handlers.get(&s).copied());
        let result = match handler {
            Some(handler) => handler(ctx),
            None => Self::fallback(ctx, id),
        };
        // Already logged by `set_next_state`; the skeleton keeps its target.
        match result {
            Err(LocomotionError::UnregisteredState(_)) => Ok(()),
            other => other,
        }
    }

    fn fallback(ctx: &mut StateContext<'_, '_>, id: u16) -> Result<()> {
        let holding = ctx.cmd().has(CommandFlag::Action);
        match ctx.character.move_mode {
            MoveMode::Monkeyswing | MoveMode::WallsClimb if !holding => {
                debug!("state {id} has no handler, letting go");
                ctx.character.no_fix = false;
                ctx.character.speed = Vec3::zeros();
                ctx.character.set_move_mode(MoveMode::FreeFalling);
                ctx.set_animation(anims::FREE_FALL_FORWARD, 0);
                ctx.set_next_state(LaraState::FreeFall)
            }
            MoveMode::OnFloor => ctx.set_next_state(LaraState::Stop),
            MoveMode::FreeFalling => ctx.set_next_state(LaraState::FreeFall),
            MoveMode::OnWater => ctx.set_next_state(LaraState::OnWaterStop),
            MoveMode::Underwater => ctx.set_next_state(LaraState::UnderwaterStop),
            _ => Ok(()),
        }
    }
}
