//! Underwater and surface swimming.
//!
//! Swimming speed and turning are inertial and live in the integrators; these handlers
//! pick the stroke, dive, surface and climb out.

use std::f32::consts::FRAC_PI_4;

use log::debug;

use crate::{
    animation::{AnimationMode, PendingAction},
    character::{ClimbClearance, MoveDirection, MoveMode},
    collision::Vec3,
    constants::{STEP_HEIGHT, TRY_HANG_WALL_OFFSET},
    error::Result,
    flags::CommandFlag,
};

use super::{LaraState, StateContext, StateController, anims, ground::stand_point};

/// Nose-down pitch when diving from the surface.
const DIVE_PITCH: f32 = -FRAC_PI_4;

pub(super) fn register(c: &mut StateController) {
    c.register(LaraState::UnderwaterStop, underwater_stop);
    c.register(LaraState::UnderwaterForward, underwater_forward);
    c.register(LaraState::UnderwaterInertia, underwater_inertia);
    c.register(LaraState::UnderwaterDiving, underwater_diving);
    c.register(LaraState::UnderwaterTurnaround, underwater_turnaround);
    c.register(LaraState::WaterDeath, water_death);

    c.register(LaraState::OnWaterStop, onwater_stop);
    c.register(LaraState::OnWaterForward, onwater_move);
    c.register(LaraState::OnWaterBack, onwater_move);
    c.register(LaraState::OnWaterLeft, onwater_move);
    c.register(LaraState::OnWaterRight, onwater_move);
    c.register(LaraState::OnWaterExit, onwater_exit);
}

/// Mode changes made by the integrators, and drowning. Returns true when a transition
/// was forced.
fn water_interrupts(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    let mode = ctx.character.move_mode;
    if ctx.character.response.killed {
        ctx.character.dir = MoveDirection::Stay;
        let anim = if mode == MoveMode::OnWater {
            anims::ONWATER_DEATH
        } else {
            anims::UNDERWATER_DEATH
        };
        ctx.set_animation(anim, 0);
        ctx.set_next_state(LaraState::WaterDeath)?;
        return Ok(true);
    }

    let underwater = matches!(
        LaraState::try_from(ctx.skeleton.state()),
        Ok(LaraState::UnderwaterStop
            | LaraState::UnderwaterForward
            | LaraState::UnderwaterInertia
            | LaraState::UnderwaterDiving
            | LaraState::UnderwaterTurnaround)
    );
    let forced = match mode {
        MoveMode::OnFloor => Some((anims::STAY_IDLE, LaraState::Stop)),
        MoveMode::FreeFalling => Some((anims::FREE_FALL_FORWARD, LaraState::FreeFall)),
        MoveMode::OnWater if underwater => Some((anims::UNDERWATER_TO_ONWATER, LaraState::OnWaterStop)),
        MoveMode::Underwater if !underwater => Some((anims::UNDERWATER_IDLE, LaraState::UnderwaterStop)),
        _ => None,
    };
    let Some((anim, state)) = forced else {
        return Ok(false);
    };
    debug!("left the water regime in {mode:?}, switching to {state:?}");
    ctx.character.dir = MoveDirection::Stay;
    ctx.set_animation(anim, 0);
    ctx.set_next_state(state)?;
    Ok(true)
}

fn underwater_stop(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if water_interrupts(ctx)? {
        return Ok(());
    }
    let cmd = ctx.cmd();
    if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::UnderwaterTurnaround)
    } else if cmd.has(CommandFlag::Jump) {
        ctx.set_next_state(LaraState::UnderwaterForward)
    } else {
        ctx.set_next_state(LaraState::UnderwaterStop)
    }
}

fn underwater_forward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if water_interrupts(ctx)? {
        return Ok(());
    }
    let cmd = ctx.cmd();
    if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::UnderwaterTurnaround)
    } else if cmd.has(CommandFlag::Jump) {
        ctx.set_next_state(LaraState::UnderwaterForward)
    } else {
        ctx.set_next_state(LaraState::UnderwaterInertia)
    }
}

/// Gliding after the stroke until the speed dies out.
fn underwater_inertia(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if water_interrupts(ctx)? {
        return Ok(());
    }
    let cmd = ctx.cmd();
    if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::UnderwaterTurnaround)
    } else if cmd.has(CommandFlag::Jump) {
        ctx.set_next_state(LaraState::UnderwaterForward)
    } else if ctx.character.inertia_linear <= 0.0 || ctx.is_last_frame() {
        ctx.set_next_state(LaraState::UnderwaterStop)
    } else {
        Ok(())
    }
}

fn underwater_diving(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if water_interrupts(ctx)? {
        return Ok(());
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::UnderwaterForward)?;
    }
    Ok(())
}

fn underwater_turnaround(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if water_interrupts(ctx)? {
        return Ok(());
    }
    if ctx.skeleton.pending_action().is_none() && ctx.frame() == 0 {
        ctx.character.angles.y = -ctx.character.angles.y;
        ctx.on_new_animation(PendingAction::TurnAround);
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::UnderwaterStop)?;
    }
    Ok(())
}

/// Drowned or killed in the water: hold the last pose.
fn water_death(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.inertia_linear = 0.0;
    if !ctx.character.response.killed {
        ctx.character.kill();
    }
    ctx.skeleton.mode = AnimationMode::LoopLastFrame;
    Ok(())
}

/// Go under from the surface.
fn dive(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let climb_r = ctx.character.config.climb_r;
    let ch = &mut *ctx.character;
    ch.dir = MoveDirection::Stay;
    ch.angles.y = DIVE_PITCH;
    ch.position.z -= climb_r;
    ch.set_move_mode(MoveMode::Underwater);
    ctx.set_animation(anims::ONWATER_DIVE, 0);
    ctx.set_next_state(LaraState::UnderwaterDiving)
}

/// Climb out onto an edge just above the water line.
fn try_exit(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    let ch = &ctx.character;
    let water = ch.height_info.transition_level;
    let climb_r = ch.config.climb_r;
    let reach = ch.config.radius + TRY_HANG_WALL_OFFSET;
    let lift = (water - ch.position.z) + 2.0 * STEP_HEIGHT + climb_r;
    let offset = ch.forward_xy() * reach + Vec3::z() * lift;

    let info = ch.check_climbability(ctx.sim, &offset, 0.0);
    if !info.edge_hit || info.clearance != ClimbClearance::Unobstructed {
        return Ok(false);
    }
    let rise = info.edge_point.z - water;
    if rise <= -climb_r || rise > 2.0 * STEP_HEIGHT {
        return Ok(false);
    }

    debug!("leaving the water onto edge at {:?}", info.edge_point);
    let ch = &mut *ctx.character;
    ch.climb = info;
    ch.angles.x = info.edge_z_angle;
    ch.angles.y = 0.0;
    ch.speed = Vec3::zeros();
    ch.inertia_linear = 0.0;
    ch.dir = MoveDirection::Stay;
    ch.no_fix = true;
    ch.set_move_mode(MoveMode::Climbing);
    ctx.set_next_state(LaraState::OnWaterExit)?;
    Ok(true)
}

fn onwater_stop(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if water_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    if cmd.has(CommandFlag::Action) && cmd.forward() && try_exit(ctx)? {
        return Ok(());
    }
    if cmd.has(CommandFlag::Crouch) || cmd.down() {
        dive(ctx)
    } else if cmd.forward() {
        ctx.set_next_state(LaraState::OnWaterForward)
    } else if cmd.back() {
        ctx.set_next_state(LaraState::OnWaterBack)
    } else if cmd.left() {
        ctx.set_next_state(LaraState::OnWaterLeft)
    } else if cmd.right() {
        ctx.set_next_state(LaraState::OnWaterRight)
    } else {
        ctx.set_next_state(LaraState::OnWaterStop)
    }
}

fn onwater_move(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    if water_interrupts(ctx)? {
        return Ok(());
    }
    let cmd = ctx.cmd();
    let state = LaraState::try_from(ctx.skeleton.state()).unwrap_or(LaraState::OnWaterStop);
    let (held, dir) = match state {
        LaraState::OnWaterBack => (cmd.back(), MoveDirection::Backward),
        LaraState::OnWaterLeft => (cmd.left(), MoveDirection::Left),
        LaraState::OnWaterRight => (cmd.right(), MoveDirection::Right),
        _ => (cmd.forward(), MoveDirection::Forward),
    };

    if dir == MoveDirection::Forward && cmd.has(CommandFlag::Action) && try_exit(ctx)? {
        return Ok(());
    }
    if cmd.has(CommandFlag::Crouch) || cmd.down() {
        return dive(ctx);
    }
    if held {
        ctx.character.dir = dir;
        Ok(())
    } else {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::OnWaterStop)
    }
}

fn onwater_exit(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.no_fix = true;
    if ctx.skeleton.pending_action().is_none() {
        let stand = stand_point(ctx);
        ctx.on_new_animation(PendingAction::ClimbToEdge(stand));
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::Stop)?;
    }
    Ok(())
}
