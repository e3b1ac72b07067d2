//! Jumps and falls.
//!
//! Launch speeds come from the jump animations' `JumpDistance` commands; these handlers
//! only steer in the air, grab edges and pick the landing.

use crate::{
    animation::PendingAction,
    character::{MoveDirection, MoveMode},
    constants::{FREE_FALL_SPEED_2, TRY_HANG_WALL_OFFSET},
    error::Result,
    flags::CommandFlag,
};

use super::{LaraState, StateContext, StateController, anims, hang};

pub(super) fn register(c: &mut StateController) {
    c.register(LaraState::JumpPrepare, jump_prepare);
    c.register(LaraState::JumpForward, jump_forward);
    c.register(LaraState::JumpBack, jump_sideways);
    c.register(LaraState::JumpLeft, jump_sideways);
    c.register(LaraState::JumpRight, jump_sideways);
    c.register(LaraState::JumpUp, jump_up);
    c.register(LaraState::Reach, reach);
    c.register(LaraState::FreeFall, free_fall);
    c.register(LaraState::FallBackward, fall_backward);
    c.register(LaraState::SwandiveBegin, swandive_begin);
    c.register(LaraState::SwandiveEnd, swandive_end);
    c.register(LaraState::JumpRoll, jump_roll);
    c.register(LaraState::GrabToFall, grab_to_fall);
}

/// Entering water or dying in the air. Returns true when a transition was forced.
fn air_interrupts(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    match ctx.character.move_mode {
        MoveMode::Underwater => {
            ctx.character.dir = MoveDirection::Stay;
            ctx.set_animation(anims::FREE_FALL_TO_UNDERWATER, 0);
            ctx.set_next_state(LaraState::UnderwaterForward)?;
            Ok(true)
        }
        MoveMode::OnWater => {
            ctx.character.dir = MoveDirection::Stay;
            ctx.set_animation(anims::ONWATER_IDLE, 0);
            ctx.set_next_state(LaraState::OnWaterStop)?;
            Ok(true)
        }
        MoveMode::OnFloor if ctx.character.response.killed => {
            ctx.set_next_state(LaraState::Death)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[inline]
fn landed(ctx: &StateContext<'_, '_>) -> bool {
    ctx.character.move_mode == MoveMode::OnFloor
}

/// Land from a long fall: hard or light, depending on the impact speed.
fn land(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    let anim = if ctx.character.response.landing_speed >= FREE_FALL_SPEED_2 {
        anims::LANDING_HARD
    } else {
        anims::LANDING_LIGHT
    };
    ctx.set_animation(anim, 0);
    ctx.set_next_state(LaraState::Stop)
}

fn jump_prepare(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    ctx.character.dir = MoveDirection::Stay;
    if ctx.character.response.killed {
        return ctx.set_next_state(LaraState::Death);
    }
    if !cmd.has(CommandFlag::Jump) {
        return ctx.set_next_state(LaraState::Stop);
    }

    let fwd = ctx.character.forward_xy();
    let wall_ahead = ctx.blocked_toward(&fwd, ctx.character.config.radius + TRY_HANG_WALL_OFFSET);
    let (dir, state) = if cmd.forward() && !wall_ahead {
        (MoveDirection::Forward, LaraState::JumpForward)
    } else if cmd.back() {
        (MoveDirection::Backward, LaraState::JumpBack)
    } else if cmd.left() {
        (MoveDirection::Left, LaraState::JumpLeft)
    } else if cmd.right() {
        (MoveDirection::Right, LaraState::JumpRight)
    } else {
        (MoveDirection::Stay, LaraState::JumpUp)
    };
    // Read by the launch command once the jump animation starts.
    ctx.character.dir = dir;
    ctx.set_next_state(state)
}

fn jump_forward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    let cmd = ctx.cmd();
    ctx.character.turn(ctx.character.config.rot_speed_freefall, ctx.dt);

    if landed(ctx) {
        ctx.character.dir = MoveDirection::Stay;
        return if cmd.forward() && !cmd.has(CommandFlag::Shift) {
            ctx.set_next_state(LaraState::RunForward)
        } else {
            ctx.set_next_state(LaraState::Stop)
        };
    }

    if cmd.has(CommandFlag::Action) {
        ctx.set_next_state(LaraState::Reach)
    } else if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::JumpRoll)
    } else if ctx.character.speed.z < -FREE_FALL_SPEED_2 {
        ctx.set_next_state(LaraState::FreeFall)
    } else {
        ctx.set_next_state(LaraState::JumpForward)
    }
}

/// Back, left and right jumps.
fn jump_sideways(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    if landed(ctx) {
        ctx.character.dir = MoveDirection::Stay;
        return ctx.set_next_state(LaraState::Stop);
    }
    let is_back = ctx.skeleton.state() == LaraState::JumpBack.id();
    if is_back && ctx.cmd().has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::JumpRoll)
    } else if ctx.character.speed.z < -FREE_FALL_SPEED_2 {
        ctx.set_next_state(LaraState::FreeFall)
    } else {
        Ok(())
    }
}

fn jump_up(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    if landed(ctx) {
        ctx.character.dir = MoveDirection::Stay;
        return ctx.set_next_state(LaraState::Stop);
    }
    if ctx.cmd().has(CommandFlag::Action) && try_grab(ctx)? {
        return Ok(());
    }
    if ctx.character.speed.z < -FREE_FALL_SPEED_2 {
        ctx.set_next_state(LaraState::FreeFall)
    } else {
        Ok(())
    }
}

/// Grab whatever is in reach: monkey bars overhead, an edge or a ladder ahead.
fn try_grab(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    Ok(hang::try_grab_monkey(ctx)? || hang::try_grab_edge(ctx)? || hang::try_grab_ladder(ctx)?)
}

fn reach(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    ctx.character.turn(ctx.character.config.rot_speed_freefall, ctx.dt);
    if landed(ctx) {
        return land(ctx);
    }
    if ctx.cmd().has(CommandFlag::Action) && try_grab(ctx)? {
        return Ok(());
    }
    if ctx.character.speed.z < -FREE_FALL_SPEED_2 {
        ctx.set_next_state(LaraState::FreeFall)
    } else {
        ctx.set_next_state(LaraState::Reach)
    }
}

fn free_fall(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if air_interrupts(ctx)? {
        return Ok(());
    }
    ctx.character.lean(false, ctx.dt);
    if landed(ctx) {
        return land(ctx);
    }
    if ctx.cmd().has(CommandFlag::Action) && try_grab(ctx)? {
        return Ok(());
    }
    ctx.set_next_state(LaraState::FreeFall)
}

fn fall_backward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    if landed(ctx) {
        return land(ctx);
    }
    if ctx.character.speed.z < -FREE_FALL_SPEED_2 {
        ctx.set_next_state(LaraState::FreeFall)
    } else {
        Ok(())
    }
}

fn swandive_begin(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    ctx.character.turn(ctx.character.config.rot_speed_freefall, ctx.dt);
    if landed(ctx) {
        return land(ctx);
    }
    ctx.set_next_state(LaraState::SwandiveEnd)
}

/// Head first: only water makes this survivable.
fn swandive_end(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    ctx.character.dir = MoveDirection::Stay;
    if landed(ctx) {
        ctx.character.kill();
        return ctx.set_next_state(LaraState::Death);
    }
    Ok(())
}

fn jump_roll(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if air_interrupts(ctx)? {
        return Ok(());
    }
    if landed(ctx) {
        ctx.character.dir = MoveDirection::Stay;
        return ctx.set_next_state(LaraState::Stop);
    }
    if ctx.skeleton.pending_action().is_none() && ctx.frame() == 0 {
        ctx.on_new_animation(PendingAction::TurnAround);
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::FallBackward)?;
    }
    Ok(())
}

fn grab_to_fall(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if air_interrupts(ctx)? {
        return Ok(());
    }
    if landed(ctx) {
        ctx.set_next_state(LaraState::Stop)
    } else {
        ctx.set_next_state(LaraState::FreeFall)
    }
}
