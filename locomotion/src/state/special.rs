//! Tightrope walking and scripted interactions.
//!
//! Interactions (pickups, switches, keyholes, pushables) are entered from outside the
//! state machine through `LaraController::request_state`; their handlers hold the
//! character in place and report completion on the last frame.

use log::debug;

use crate::{
    animation::PendingAction,
    character::{MoveDirection, MoveMode},
    collision::Vec3,
    controller::ControllerEvent,
    error::Result,
    flags::{CommandFlag, SectorFlag},
};

use super::{LaraState, StateContext, StateController, anims};

/// Balance drift per second, proportional to the current lean.
const BALANCE_DRIFT: f32 = 0.6;
/// Extra sway per second while walking.
const BALANCE_WALK_SWAY: f32 = 0.15;
/// Correction per second from sideways input.
const BALANCE_CORRECTION: f32 = 1.5;
/// Lean past which the character visibly fights for balance.
const BALANCE_WOBBLE: f32 = 0.5;
/// Lean under which the balance counts as restored.
const BALANCE_RESTORED: f32 = 0.25;

pub(super) fn register(c: &mut StateController) {
    c.register(LaraState::TightropeEnter, tightrope_enter);
    c.register(LaraState::TightropeIdle, tightrope_idle);
    c.register(LaraState::TightropeForward, tightrope_forward);
    c.register(LaraState::TightropeTurnaround, tightrope_turnaround);
    c.register(LaraState::TightropeBalancingLeft, tightrope_balancing);
    c.register(LaraState::TightropeBalancingRight, tightrope_balancing);
    c.register(LaraState::TightropeRestoreBalance, tightrope_restore);
    c.register(LaraState::TightropeExit, tightrope_exit);

    for state in [
        LaraState::PickUp,
        LaraState::FlarePickup,
        LaraState::SwitchDown,
        LaraState::SwitchUp,
        LaraState::InsertKey,
        LaraState::InsertPuzzle,
    ] {
        c.register(state, interaction);
    }
    c.register(LaraState::PushableGrab, pushable_grab);
    c.register(LaraState::PushablePush, pushable_move);
    c.register(LaraState::PushablePull, pushable_move);
}

fn on_tightrope(ctx: &StateContext<'_, '_>) -> bool {
    ctx.sim
        .rooms
        .sector_at(&(ctx.character.position + Vec3::z()), ctx.character.room)
        .is_some_and(|(_, s)| s.has(SectorFlag::Tightrope))
}

/// Advance the balance and fall off past either end. Returns true when the character
/// fell.
fn update_balance(ctx: &mut StateContext<'_, '_>, walking: bool) -> Result<bool> {
    let ch = &mut *ctx.character;
    let side = if ch.balance < 0.0 { -1.0 } else { 1.0 };
    let sway = if walking { BALANCE_WALK_SWAY * side } else { 0.0 };
    let correction = f32::from(ch.command.movement[0]) * BALANCE_CORRECTION;
    ch.balance += (ch.balance * BALANCE_DRIFT + sway + correction) * ctx.dt;

    if ch.balance.abs() < 1.0 {
        return Ok(false);
    }
    debug!("lost balance at {:.2}", ch.balance);
    ch.balance = 0.0;
    ch.dir = MoveDirection::Stay;
    ch.speed = Vec3::zeros();
    ch.set_move_mode(MoveMode::FreeFalling);
    ctx.set_animation(anims::FREE_FALL_FORWARD, 0);
    ctx.set_next_state(LaraState::FreeFall)?;
    Ok(true)
}

fn wobble_state(balance: f32) -> LaraState {
    if balance < 0.0 {
        LaraState::TightropeBalancingLeft
    } else {
        LaraState::TightropeBalancingRight
    }
}

fn tightrope_enter(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.balance = 0.0;
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::TightropeIdle)?;
    }
    Ok(())
}

fn tightrope_idle(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if update_balance(ctx, false)? {
        return Ok(());
    }
    if !on_tightrope(ctx) {
        return ctx.set_next_state(LaraState::TightropeExit);
    }

    let cmd = ctx.cmd();
    if ctx.character.balance.abs() > BALANCE_WOBBLE {
        ctx.set_next_state(wobble_state(ctx.character.balance))
    } else if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::TightropeTurnaround)
    } else if cmd.forward() {
        ctx.set_next_state(LaraState::TightropeForward)
    } else {
        ctx.set_next_state(LaraState::TightropeIdle)
    }
}

fn tightrope_forward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    if update_balance(ctx, true)? {
        return Ok(());
    }
    if !on_tightrope(ctx) {
        ctx.character.dir = MoveDirection::Stay;
        return ctx.set_next_state(LaraState::TightropeExit);
    }

    if ctx.character.balance.abs() > BALANCE_WOBBLE {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(wobble_state(ctx.character.balance))
    } else if !ctx.cmd().forward() {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::TightropeIdle)
    } else {
        Ok(())
    }
}

fn tightrope_turnaround(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if ctx.skeleton.pending_action().is_none() && ctx.frame() == 0 {
        ctx.on_new_animation(PendingAction::TurnAround);
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::TightropeIdle)?;
    }
    Ok(())
}

fn tightrope_balancing(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if update_balance(ctx, false)? {
        return Ok(());
    }
    if ctx.character.balance.abs() < BALANCE_RESTORED {
        ctx.set_next_state(LaraState::TightropeRestoreBalance)
    } else {
        ctx.set_next_state(wobble_state(ctx.character.balance))
    }
}

fn tightrope_restore(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if update_balance(ctx, false)? {
        return Ok(());
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::TightropeIdle)?;
    }
    Ok(())
}

fn tightrope_exit(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.balance = 0.0;
    if ctx.is_last_frame() {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::Stop)?;
    }
    Ok(())
}

/// Report that the interaction animation played through.
fn finish_interaction(ctx: &mut StateContext<'_, '_>) {
    if let Ok(state) = LaraState::try_from(ctx.skeleton.state()) {
        ctx.emit(ControllerEvent::InteractionDone(state));
    }
}

fn interaction(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.speed = Vec3::zeros();
    if ctx.is_last_frame() {
        finish_interaction(ctx);
        ctx.set_next_state(LaraState::Stop)?;
    }
    Ok(())
}

fn pushable_grab(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    let cmd = ctx.cmd();
    if !cmd.has(CommandFlag::Action) {
        ctx.set_next_state(LaraState::Stop)
    } else if cmd.forward() {
        ctx.set_next_state(LaraState::PushablePush)
    } else if cmd.back() {
        ctx.set_next_state(LaraState::PushablePull)
    } else {
        ctx.set_next_state(LaraState::PushableGrab)
    }
}

fn pushable_move(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let pull = ctx.skeleton.state() == LaraState::PushablePull.id();
    ctx.character.dir = if pull {
        MoveDirection::Backward
    } else {
        MoveDirection::Forward
    };
    if ctx.is_last_frame() {
        ctx.character.dir = MoveDirection::Stay;
        finish_interaction(ctx);
        ctx.set_next_state(LaraState::PushableGrab)?;
    }
    Ok(())
}
