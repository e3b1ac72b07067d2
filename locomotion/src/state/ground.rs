//! Standing, walking, running and sliding.

use log::debug;

use crate::{
    animation::PendingAction,
    character::{MoveDirection, MoveMode, SlideDirection, StepType, WallHit},
    collision::Vec3,
    constants::{RUN_FORWARD_OFFSET, STEP_HEIGHT, TRY_HANG_WALL_OFFSET, WALK_BACK_OFFSET, WALK_FORWARD_OFFSET},
    error::Result,
    flags::{CommandFlag, SectorFlag},
    math::{horizontal, yaw_from_direction},
};

use super::{LaraState, StateContext, StateController, anims};

pub(super) fn register(c: &mut StateController) {
    c.register(LaraState::Stop, stop);
    c.register(LaraState::TurnLeftSlow, turn_slow);
    c.register(LaraState::TurnRightSlow, turn_slow);
    c.register(LaraState::TurnFast, turn_fast);
    c.register(LaraState::WalkForward, walk_forward);
    c.register(LaraState::RunForward, run_forward);
    c.register(LaraState::Sprint, sprint);
    c.register(LaraState::RunBack, run_back);
    c.register(LaraState::WalkBack, walk_back);
    c.register(LaraState::StepLeft, step_left);
    c.register(LaraState::StepRight, step_right);
    c.register(LaraState::WadeForward, wade_forward);
    c.register(LaraState::RollForward, roll);
    c.register(LaraState::RollBackward, roll);
    c.register(LaraState::SprintRoll, roll);
    c.register(LaraState::SlideForward, slide);
    c.register(LaraState::SlideBack, slide);
    c.register(LaraState::Death, death);
    c.register(LaraState::Splat, death);
}

/// Checks shared by every standing state. Returns true when a transition was forced.
pub(super) fn floor_interrupts(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    if ctx.character.response.killed {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::Death)?;
        return Ok(true);
    }

    match ctx.character.move_mode {
        MoveMode::FreeFalling => {
            ctx.character.dir = MoveDirection::Stay;
            ctx.set_animation(anims::FREE_FALL_FORWARD, 0);
            ctx.set_next_state(LaraState::FreeFall)?;
            return Ok(true);
        }
        MoveMode::OnWater => {
            ctx.character.dir = MoveDirection::Stay;
            ctx.set_animation(anims::ONWATER_IDLE, 0);
            ctx.set_next_state(LaraState::OnWaterStop)?;
            return Ok(true);
        }
        _ => {}
    }

    if let Some(dir) = ctx.character.response.slide {
        start_slide(ctx, dir)?;
        return Ok(true);
    }
    Ok(false)
}

/// Align with the slope and enter the matching slide.
fn start_slide(ctx: &mut StateContext<'_, '_>, dir: SlideDirection) -> Result<()> {
    let state = ctx.skeleton.state();
    let (target, anim) = match dir {
        SlideDirection::Forward => (LaraState::SlideForward, anims::SLIDE_FORWARD),
        SlideDirection::Back => (LaraState::SlideBack, anims::START_SLIDE_BACKWARD),
    };
    if state == target.id() {
        return Ok(());
    }

    if let Some(floor) = ctx.character.height_info.floor {
        let downhill = horizontal(&floor.normal);
        let facing = match dir {
            SlideDirection::Forward => downhill,
            SlideDirection::Back => -downhill,
        };
        if facing.norm_squared() > 1.0e-8 {
            ctx.character.angles.x = yaw_from_direction(&facing);
        }
    }
    debug!("sliding {dir:?}");
    ctx.character.dir = MoveDirection::Stay;
    ctx.set_animation(anim, 0);
    ctx.set_next_state(target)
}

pub(super) fn is_wading(ctx: &StateContext<'_, '_>) -> bool {
    ctx.character
        .height_info
        .water_depth()
        .is_some_and(|d| d > ctx.character.config.wade_depth)
}

fn turn_state(turn: f32) -> LaraState {
    if turn > 0.0 {
        LaraState::TurnLeftSlow
    } else {
        LaraState::TurnRightSlow
    }
}

fn stop(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.lean(false, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let wading = is_wading(ctx);

    if cmd.has(CommandFlag::Action) && cmd.forward() && try_climb(ctx)? {
        return Ok(());
    }

    if cmd.has(CommandFlag::Jump) && !wading {
        ctx.set_next_state(LaraState::JumpPrepare)
    } else if cmd.has(CommandFlag::Roll) && !wading {
        ctx.set_next_state(LaraState::RollForward)
    } else if cmd.has(CommandFlag::Crouch) && !wading {
        ctx.set_next_state(LaraState::CrouchIdle)
    } else if cmd.forward() {
        let (step, next) = ctx.step_ahead(RUN_FORWARD_OFFSET);
        if !step.is_walkable() || ctx.character.has_stop_slant(&next) {
            return ctx.set_next_state(LaraState::Stop);
        }
        if wading {
            ctx.set_next_state(LaraState::WadeForward)
        } else if cmd.has(CommandFlag::Shift) {
            ctx.set_next_state(LaraState::WalkForward)
        } else {
            ctx.set_next_state(LaraState::RunForward)
        }
    } else if cmd.back() {
        let (step, _) = ctx.step_ahead(-WALK_BACK_OFFSET - ctx.character.config.radius);
        if !step.is_walkable() {
            return ctx.set_next_state(LaraState::Stop);
        }
        if cmd.has(CommandFlag::Shift) || wading {
            ctx.set_next_state(LaraState::WalkBack)
        } else {
            ctx.set_next_state(LaraState::RunBack)
        }
    } else if cmd.left() || cmd.right() {
        let sign = if cmd.right() { 1.0 } else { -1.0 };
        let (step, _) = ctx.step_aside(sign * ctx.character.config.radius);
        if !step.is_walkable() {
            ctx.set_next_state(LaraState::Stop)
        } else if cmd.right() {
            ctx.set_next_state(LaraState::StepRight)
        } else {
            ctx.set_next_state(LaraState::StepLeft)
        }
    } else if cmd.turn() != 0.0 {
        ctx.set_next_state(turn_state(cmd.turn()))
    } else {
        ctx.set_next_state(LaraState::Stop)
    }
}

/// Start a ladder, a tightrope or a climb onto the ledge ahead.
fn try_climb(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    if ctx.character.check_wall_climbability(ctx.sim) == WallHit::FullBody {
        let normal = ctx.character.climb.wall_normal;
        ctx.character.angles.x = yaw_from_direction(&-normal);
        ctx.character.set_move_mode(MoveMode::WallsClimb);
        ctx.set_next_state(LaraState::LadderIdle)?;
        return Ok(true);
    }

    let on_rope = ctx
        .sim
        .rooms
        .sector_at(&(ctx.character.position + Vec3::z()), ctx.character.room)
        .is_some_and(|(_, s)| s.has(SectorFlag::Tightrope));
    if on_rope {
        ctx.set_next_state(LaraState::TightropeEnter)?;
        return Ok(true);
    }

    // Probe from the highest climbable point so tall walls are not measured from inside.
    let reach = ctx.character.config.radius + TRY_HANG_WALL_OFFSET;
    let lift = ctx.character.config.max_climb_height - ctx.character.body_height();
    let probe = ctx.character.forward_xy() * reach + Vec3::z() * lift;
    let (step, next) = ctx.character.check_next_step(ctx.sim, &probe);
    let Some(floor_z) = next.floor_z() else {
        return Ok(false);
    };
    let rise = floor_z - ctx.character.position.z;
    match step {
        StepType::UpBig => {
            let climb_r = ctx.character.config.climb_r;
            let offset = ctx.character.forward_xy() * reach + Vec3::z() * (rise + 2.0 * climb_r);
            let info = ctx.character.check_climbability(ctx.sim, &offset, rise);
            if !info.edge_hit || !info.clearance.can_climb_up() {
                return Ok(false);
            }
            let anim = if rise <= 2.5 * STEP_HEIGHT {
                anims::CLIMB_2CLICK
            } else {
                anims::CLIMB_3CLICK
            };
            debug!("climbing {rise:.0} onto edge at {:?}", info.edge_point);
            ctx.character.climb = info;
            ctx.character.angles.x = info.edge_z_angle;
            ctx.character.no_fix = true;
            ctx.character.set_move_mode(MoveMode::Climbing);
            ctx.set_animation(anim, 0);
            Ok(true)
        }
        StepType::UpClimb => {
            ctx.set_next_state(LaraState::JumpPrepare)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Feet position on top of the stored edge.
pub(super) fn stand_point(ctx: &StateContext<'_, '_>) -> Vec3 {
    let climb = &ctx.character.climb;
    climb.edge_point - climb.edge_normal * ctx.character.config.radius
}

fn turn_slow(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.turn(ctx.character.config.rot_speed_land, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    if cmd.has(CommandFlag::Jump) {
        ctx.set_next_state(LaraState::JumpPrepare)
    } else if cmd.forward() {
        let (step, _) = ctx.step_ahead(WALK_FORWARD_OFFSET);
        if !step.is_walkable() {
            ctx.set_next_state(LaraState::Stop)
        } else if cmd.has(CommandFlag::Shift) || is_wading(ctx) {
            ctx.set_next_state(LaraState::WalkForward)
        } else {
            ctx.set_next_state(LaraState::RunForward)
        }
    } else if cmd.turn() == 0.0 {
        ctx.set_next_state(LaraState::Stop)
    } else if !cmd.has(CommandFlag::Shift) && ctx.is_last_frame() {
        ctx.set_next_state(LaraState::TurnFast)
    } else {
        ctx.set_next_state(turn_state(cmd.turn()))
    }
}

fn turn_fast(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.turn(ctx.character.config.rot_speed_land * 2.0, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }
    if ctx.cmd().turn() == 0.0 {
        ctx.set_next_state(LaraState::Stop)
    } else {
        ctx.set_next_state(LaraState::TurnFast)
    }
}

fn walk_forward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    ctx.character.lean(false, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let (step, next) = ctx.step_ahead(WALK_FORWARD_OFFSET);
    if !cmd.forward()
        || !step.is_walkable()
        || ctx.character.has_stop_slant(&next)
        || ctx.character.response.horizontal_collide
    {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::Stop)
    } else if is_wading(ctx) {
        ctx.set_next_state(LaraState::WadeForward)
    } else if cmd.has(CommandFlag::Shift) {
        ctx.set_next_state(LaraState::WalkForward)
    } else {
        ctx.set_next_state(LaraState::RunForward)
    }
}

/// Bounce off a wall, the foot in front picks the variant.
fn wall_smash(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let anim = match ctx.anim_dispatch_case(LaraState::Stop) {
        Some(0) => anims::WALL_SMASH_LEFT,
        _ => anims::WALL_SMASH_RIGHT,
    };
    ctx.character.dir = MoveDirection::Stay;
    ctx.set_animation(anim, 0);
    ctx.set_next_state(LaraState::Stop)
}

fn run_forward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.turn(ctx.character.config.rot_speed_land, ctx.dt);
    ctx.character.lean(true, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let (step, next) = ctx.step_ahead(RUN_FORWARD_OFFSET);
    if ctx.character.response.horizontal_collide
        || ctx.character.has_stop_slant(&next)
        || matches!(step, StepType::UpBig | StepType::UpClimb | StepType::UpImpossible)
    {
        return wall_smash(ctx);
    }

    if cmd.has(CommandFlag::Jump) {
        if cmd.has(CommandFlag::Shift) {
            ctx.set_next_state(LaraState::SwandiveBegin)
        } else {
            ctx.set_next_state(LaraState::JumpForward)
        }
    } else if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::RollForward)
    } else if cmd.has(CommandFlag::Sprint) && ctx.character.params.stamina > 0.0 {
        ctx.set_next_state(LaraState::Sprint)
    } else if cmd.has(CommandFlag::Crouch) {
        ctx.set_next_state(LaraState::CrouchIdle)
    } else if !cmd.forward() {
        ctx.set_next_state(LaraState::Stop)
    } else if is_wading(ctx) {
        ctx.set_next_state(LaraState::WadeForward)
    } else if cmd.has(CommandFlag::Shift) {
        ctx.set_next_state(LaraState::WalkForward)
    } else {
        ctx.set_next_state(LaraState::RunForward)
    }
}

fn sprint(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    ctx.character.lean(true, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let (step, _) = ctx.step_ahead(RUN_FORWARD_OFFSET);
    if ctx.character.response.horizontal_collide || (!step.is_walkable() && step != StepType::DownBig) {
        return wall_smash(ctx);
    }
    if !cmd.forward() {
        ctx.set_next_state(LaraState::Stop)
    } else if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::SprintRoll)
    } else if cmd.has(CommandFlag::Crouch) {
        ctx.set_next_state(LaraState::CrouchIdle)
    } else if !cmd.has(CommandFlag::Sprint) || ctx.character.params.stamina <= 0.0 {
        ctx.set_next_state(LaraState::RunForward)
    } else {
        ctx.set_next_state(LaraState::Sprint)
    }
}

/// Hop backward; plays once.
fn run_back(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Backward;
    if floor_interrupts(ctx)? {
        return Ok(());
    }
    if ctx.character.response.horizontal_collide || ctx.is_last_frame() {
        ctx.set_next_state(LaraState::Stop)
    } else {
        Ok(())
    }
}

fn walk_back(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Backward;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let (step, _) = ctx.step_ahead(-WALK_BACK_OFFSET - ctx.character.config.radius);
    if !cmd.back() || !step.is_walkable() || ctx.character.response.horizontal_collide {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::Stop)
    } else {
        ctx.set_next_state(LaraState::WalkBack)
    }
}

fn sidestep(ctx: &mut StateContext<'_, '_>, dir: MoveDirection) -> Result<()> {
    ctx.character.dir = dir;
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    let (held, sign, state) = match dir {
        MoveDirection::Right => (cmd.right(), 1.0, LaraState::StepRight),
        _ => (cmd.left(), -1.0, LaraState::StepLeft),
    };
    let (step, _) = ctx.step_aside(sign * ctx.character.config.radius);
    if !held || !step.is_walkable() || ctx.character.response.horizontal_collide {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::Stop)
    } else {
        ctx.set_next_state(state)
    }
}

fn step_left(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    sidestep(ctx, MoveDirection::Left)
}

fn step_right(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    sidestep(ctx, MoveDirection::Right)
}

fn wade_forward(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Forward;
    ctx.character.turn(ctx.character.config.rot_speed_land * 0.5, ctx.dt);
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    let cmd = ctx.cmd();
    if !cmd.forward() || ctx.character.response.horizontal_collide {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::Stop)
    } else if !is_wading(ctx) {
        ctx.set_next_state(LaraState::RunForward)
    } else {
        ctx.set_next_state(LaraState::WadeForward)
    }
}

/// Forward rolls end facing the other way.
fn roll(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let backward = ctx.skeleton.state() == LaraState::RollBackward.id();
    ctx.character.dir = if backward {
        MoveDirection::Backward
    } else {
        MoveDirection::Forward
    };
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    if !backward && ctx.skeleton.pending_action().is_none() {
        ctx.on_new_animation(PendingAction::TurnAround);
    }
    if ctx.is_last_frame() || ctx.character.response.horizontal_collide {
        ctx.set_next_state(LaraState::Stop)?;
    }
    Ok(())
}

fn slide(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let forward = ctx.skeleton.state() == LaraState::SlideForward.id();
    ctx.character.dir = MoveDirection::Stay;
    if floor_interrupts(ctx)? {
        return Ok(());
    }

    if ctx.cmd().has(CommandFlag::Jump) {
        let jump = if forward {
            LaraState::JumpForward
        } else {
            LaraState::JumpBack
        };
        ctx.character.dir = if forward {
            MoveDirection::Forward
        } else {
            MoveDirection::Backward
        };
        return ctx.set_next_state(jump);
    }
    // Still sliding: keep going. Off the slope: stand up.
    ctx.set_next_state(LaraState::Stop)
}

/// Plays the death animation and holds its last frame.
fn death(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.speed.x = 0.0;
    ctx.character.speed.y = 0.0;
    if !ctx.character.response.killed {
        ctx.character.kill();
    }
    ctx.skeleton.mode = crate::animation::AnimationMode::LoopLastFrame;
    Ok(())
}
