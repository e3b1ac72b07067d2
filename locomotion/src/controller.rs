//! Per-actor tick.
//!
//! One `LaraController` owns a character and its skeleton. Each tick stores the command,
//! runs the state handler, steps the animation, applies what the animation asked for,
//! integrates the move mode and updates the vitals. The pose for the renderer and the
//! events raised on the way come back in a `TickOutput`.

use log::{debug, error, trace};

use crate::{
    animation::{AnimCommandKind, AnimEvent, AnimationModel, AnimationState, Skeleton, step},
    character::{Character, Command},
    collision::{Iso, Vec3},
    config::ControllerConfig,
    context::SimulationContext,
    error::{LocomotionError, Result},
    state::{LaraState, StateContext, StateController, anims},
};

/// Longest step simulated in one tick; longer gaps are clamped to it.
pub const MAX_TICK_DT: f32 = 0.125;

/// Things the outside world reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerEvent {
    StopAmbientAudio,
    PlaySound(u32),
    PlayEffect(u32),
    /// Raised once, on the tick the character dies.
    Killed,
    VisibilityChanged(bool),
    /// A scripted interaction animation played through.
    InteractionDone(LaraState),
}

/// What the renderer needs to draw the actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSnapshot {
    pub transform: Iso,
    pub current: AnimationState,
    pub previous: AnimationState,
    pub lerp: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TickOutput {
    pub pose: PoseSnapshot,
    pub events: Vec<ControllerEvent>,
}

pub struct LaraController {
    pub character: Character,
    pub skeleton: Skeleton,
    states: StateController,
    anim_events: Vec<AnimEvent>,
}

impl LaraController {
    pub fn new(character: Character, skeleton: Skeleton) -> Self {
        Self::with_states(character, skeleton, StateController::new())
    }

    /// Controller with a custom handler table.
    pub fn with_states(character: Character, skeleton: Skeleton, states: StateController) -> Self {
        let missing = states.unregistered_states();
        if !missing.is_empty() {
            debug!("{} states have no handler: {missing:?}", missing.len());
        }
        Self {
            character,
            skeleton,
            states,
            anim_events: Vec::new(),
        }
    }

    /// Standing character at `position`, facing `yaw`.
    pub fn spawn(
        model: &AnimationModel,
        position: Vec3,
        yaw: f32,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let character = Character::new(position, yaw, config);
        let skeleton = Skeleton::new(model, anims::STAY_IDLE);
        Ok(Self::new(character, skeleton))
    }

    /// Current state, if the animation belongs to a known one.
    pub fn state(&self) -> Option<LaraState> {
        LaraState::try_from(self.skeleton.state()).ok()
    }

    /// Ask for `state` from outside the handlers, e.g. to start an interaction.
    pub fn request_state(&mut self, state: LaraState) -> Result<()> {
        if !self.states.is_registered(state) {
            error!("request_state({state:?}): state has no registered handler");
            return Err(LocomotionError::UnregisteredState(state));
        }
        self.skeleton.next_state = state.id();
        Ok(())
    }

    pub fn pose(&self) -> PoseSnapshot {
        PoseSnapshot {
            transform: self.character.transform(),
            current: self.skeleton.current,
            previous: self.skeleton.previous,
            lerp: self.skeleton.lerp,
        }
    }

    pub fn tick(
        &mut self,
        sim: &SimulationContext<'_>,
        model: &AnimationModel,
        command: Command,
        dt: f32,
    ) -> Result<TickOutput> {
        let dt = dt.clamp(0.0, MAX_TICK_DT);
        let was_killed = self.character.response.killed;
        let mut events = Vec::new();

        self.character.command = command;
        self.character.update_room(sim);
        {
            let mut ctx = StateContext::new(
                &self.states,
                &mut self.character,
                &mut self.skeleton,
                model,
                sim,
                &mut events,
                dt,
            );
            self.states.handle(&mut ctx)?;
        }

        self.anim_events.clear();
        step(&mut self.skeleton, model, dt, &mut self.anim_events);
        for event in self.anim_events.drain(..) {
            apply_anim_event(&mut self.character, event, &mut events);
        }

        let anim = model.animation(self.skeleton.current.animation).1;
        self.character.current_speed = anim.speed_at(self.skeleton.current.frame);
        let iterations = self.character.integrate(sim, dt);
        trace!(
            "{:?} moved to {:?} in {iterations} sub-steps",
            self.character.move_mode, self.character.position
        );

        let sprinting = self.skeleton.state() == LaraState::Sprint.id();
        let ch = &mut self.character;
        if ch.params.update(ch.move_mode, &ch.height_info, sprinting, dt, &ch.config) {
            ch.kill();
        }
        if ch.response.killed && !was_killed {
            debug!("killed in {:?}", ch.move_mode);
            events.push(ControllerEvent::Killed);
        }

        Ok(TickOutput {
            pose: self.pose(),
            events,
        })
    }
}

fn apply_anim_event(character: &mut Character, event: AnimEvent, out: &mut Vec<ControllerEvent>) {
    match event {
        AnimEvent::Command(AnimCommandKind::SetPosition([right, forward, up])) => {
            character.position +=
                character.right_xy() * right + character.forward_xy() * forward + Vec3::z() * up;
        }
        AnimEvent::Command(AnimCommandKind::JumpDistance {
            vertical,
            horizontal,
        }) => character.set_to_jump(vertical, horizontal),
        AnimEvent::Command(AnimCommandKind::Kill) => character.kill(),
        AnimEvent::Command(AnimCommandKind::PlaySound(id)) => out.push(ControllerEvent::PlaySound(id)),
        AnimEvent::Command(AnimCommandKind::PlayEffect(id)) => {
            out.push(ControllerEvent::PlayEffect(id))
        }
        AnimEvent::Command(AnimCommandKind::ToggleVisibility) => {
            character.visible = !character.visible;
            out.push(ControllerEvent::VisibilityChanged(character.visible));
        }
        AnimEvent::AnimationChanged { from, to } => trace!("animation {from} -> {to}"),
        AnimEvent::PendingAction(action) => character.apply_pending_action(action),
    }
}
