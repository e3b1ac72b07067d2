//! Crouching and crawling.

use log::debug;

use crate::{
    animation::PendingAction,
    character::{ClimbInfo, MoveDirection, StepType},
    collision::Vec3,
    constants::CRAWL_FORWARD_OFFSET,
    error::Result,
    flags::CommandFlag,
    math::{horizontal, yaw_from_direction},
};

use super::{LaraState, StateContext, StateController, ground::floor_interrupts, hang::hang_origin};

pub(super) fn register(c: &mut StateController) {
    c.register(LaraState::CrouchIdle, crouch_idle);
    c.register(LaraState::CrouchRoll, crouch_roll);
    c.register(LaraState::CrouchTurnLeft, crouch_turn);
    c.register(LaraState::CrouchTurnRight, crouch_turn);
    c.register(LaraState::CrawlIdle, crawl_idle);
    c.register(LaraState::CrawlForward, crawl_move);
    c.register(LaraState::CrawlBack, crawl_move);
    c.register(LaraState::CrawlTurnLeft, crawl_turn);
    c.register(LaraState::CrawlTurnRight, crawl_turn);
    c.register(LaraState::CrawlToClimb, crawl_to_climb);
}

/// Room to stand up under the ceiling.
fn can_stand(ctx: &StateContext<'_, '_>) -> bool {
    let ch = &ctx.character;
    ch.height_info
        .ceiling_z()
        .is_none_or(|c| c - ch.position.z >= ch.config.height)
}

/// Floor checks while low. Falling or sliding stands the character up.
fn low_interrupts(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    if floor_interrupts(ctx)? {
        if !ctx.character.response.killed {
            ctx.character.crouched = false;
        }
        return Ok(true);
    }
    Ok(false)
}

fn crouch_idle(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.crouched = true;
    ctx.character.lean(false, ctx.dt);
    if low_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    if !cmd.has(CommandFlag::Crouch) && can_stand(ctx) {
        ctx.character.crouched = false;
        return ctx.set_next_state(LaraState::Stop);
    }

    if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::CrouchRoll)
    } else if cmd.forward() || cmd.back() {
        ctx.set_next_state(LaraState::CrawlIdle)
    } else if cmd.turn() > 0.0 {
        ctx.set_next_state(LaraState::CrouchTurnLeft)
    } else if cmd.turn() < 0.0 {
        ctx.set_next_state(LaraState::CrouchTurnRight)
    } else {
        ctx.set_next_state(LaraState::CrouchIdle)
    }
}

fn crouch_roll(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.crouched = true;
    if low_interrupts(ctx)? {
        return Ok(());
    }
    if ctx.character.response.horizontal_collide {
        ctx.character.dir = MoveDirection::Stay;
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::CrouchIdle)?;
    }
    Ok(())
}

fn crouch_turn(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.crouched = true;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    if low_interrupts(ctx)? {
        return Ok(());
    }
    let cmd = ctx.cmd();
    if cmd.turn() == 0.0 || !cmd.has(CommandFlag::Crouch) {
        ctx.set_next_state(LaraState::CrouchIdle)
    } else {
        Ok(())
    }
}

fn crawl_idle(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.crouched = true;
    if low_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    if !cmd.has(CommandFlag::Crouch) && can_stand(ctx) {
        return ctx.set_next_state(LaraState::CrouchIdle);
    }

    if cmd.forward() {
        let (step, _) = ctx.step_ahead(CRAWL_FORWARD_OFFSET);
        if step.is_walkable() {
            ctx.set_next_state(LaraState::CrawlForward)
        } else {
            ctx.set_next_state(LaraState::CrawlIdle)
        }
    } else if cmd.back() {
        let (step, _) = ctx.step_ahead(-CRAWL_FORWARD_OFFSET);
        if step.is_walkable() {
            ctx.set_next_state(LaraState::CrawlBack)
        } else if step == StepType::DownCanHang && cmd.has(CommandFlag::Action) {
            ctx.set_next_state(LaraState::CrawlToClimb)
        } else {
            ctx.set_next_state(LaraState::CrawlIdle)
        }
    } else if cmd.turn() > 0.0 {
        ctx.set_next_state(LaraState::CrawlTurnLeft)
    } else if cmd.turn() < 0.0 {
        ctx.set_next_state(LaraState::CrawlTurnRight)
    } else {
        ctx.set_next_state(LaraState::CrawlIdle)
    }
}

fn crawl_move(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let back = ctx.skeleton.state() == LaraState::CrawlBack.id();
    let (dir, probe) = if back {
        (MoveDirection::Backward, -CRAWL_FORWARD_OFFSET)
    } else {
        (MoveDirection::Forward, CRAWL_FORWARD_OFFSET)
    };
    ctx.character.dir = dir;
    ctx.character.crouched = true;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    if low_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let held = if back { cmd.back() } else { cmd.forward() };
    let (step, _) = ctx.step_ahead(probe);
    if !held || !step.is_walkable() || ctx.character.response.horizontal_collide {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::CrawlIdle)
    } else {
        Ok(())
    }
}

fn crawl_turn(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.crouched = true;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    if low_interrupts(ctx)? {
        return Ok(());
    }
    if ctx.cmd().turn() == 0.0 {
        ctx.set_next_state(LaraState::CrawlIdle)
    } else {
        Ok(())
    }
}

/// Face of the ledge under the character's feet, behind it.
fn ledge_behind(ctx: &StateContext<'_, '_>) -> Option<ClimbInfo> {
    let ch = &ctx.character;
    let fwd = ch.forward_xy();
    let below = Vec3::z() * ch.config.climb_r;
    let from = ch.position - fwd * CRAWL_FORWARD_OFFSET - below;
    let hit = ctx.sim.world.ray_test(&from, &(ch.position - below))?;

    let normal = horizontal(&hit.normal).try_normalize(1.0e-6)?;
    let edge_point = Vec3::new(hit.point.x, hit.point.y, ch.position.z);
    Some(ClimbInfo {
        edge_hit: true,
        edge_point,
        edge_normal: normal,
        edge_tangent: normal.cross(&Vec3::z()),
        edge_z_angle: yaw_from_direction(&-normal),
        edge_object: Some(hit.object),
        point: edge_point,
        can_hang: true,
        ..Default::default()
    })
}

/// Lower over the ledge behind and end up hanging from it.
fn crawl_to_climb(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.no_fix = true;

    if ctx.skeleton.pending_action().is_none() {
        let Some(info) = ledge_behind(ctx) else {
            debug!("no ledge behind the crawlspace, staying put");
            ctx.character.no_fix = false;
            return ctx.set_next_state(LaraState::CrawlIdle);
        };
        ctx.character.climb = info;
        ctx.on_new_animation(PendingAction::HangAt(hang_origin(&info)));
    }

    if ctx.is_last_frame() {
        ctx.character.crouched = false;
        ctx.character.angles.x = ctx.character.climb.edge_z_angle;
        ctx.set_next_state(LaraState::Hang)?;
    }
    Ok(())
}
