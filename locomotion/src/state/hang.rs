//! Hanging from edges, climbing up, monkey bars and ladders.

use log::debug;

use crate::{
    animation::PendingAction,
    character::{ClimbClearance, ClimbInfo, MoveDirection, MoveMode, WallHit},
    collision::Vec3,
    constants::{HANG_SENSOR_Z, HANG_VERTICAL_EPSILON, HANG_WALL_DISTANCE, TRY_HANG_WALL_OFFSET},
    error::Result,
    flags::CommandFlag,
    math::yaw_from_direction,
};

use super::{LaraState, StateContext, StateController, anims, ground::stand_point};

pub(super) fn register(c: &mut StateController) {
    c.register(LaraState::Hang, hang);
    c.register(LaraState::ShimmyLeft, shimmy);
    c.register(LaraState::ShimmyRight, shimmy);
    c.register(LaraState::Climbing, climb_up);
    c.register(LaraState::Handstand, climb_up);
    c.register(LaraState::ClimbToCrawl, climb_up);

    c.register(LaraState::MonkeyswingIdle, monkey_idle);
    c.register(LaraState::MonkeyswingForward, monkey_move);
    c.register(LaraState::MonkeyswingLeft, monkey_move);
    c.register(LaraState::MonkeyswingRight, monkey_move);
    c.register(LaraState::MonkeyswingTurnLeft, monkey_turn);
    c.register(LaraState::MonkeyswingTurnRight, monkey_turn);
    c.register(LaraState::MonkeyswingTurnaround, monkey_turnaround);

    c.register(LaraState::LadderIdle, ladder_idle);
    c.register(LaraState::LadderUp, ladder_move);
    c.register(LaraState::LadderDown, ladder_move);
    c.register(LaraState::LadderLeft, ladder_move);
    c.register(LaraState::LadderRight, ladder_move);
    c.register(LaraState::LadderEnd, climb_up);
}

/// Origin of a character hanging with its hands on `info`'s edge.
pub fn hang_origin(info: &ClimbInfo) -> Vec3 {
    info.edge_point + info.edge_normal * HANG_WALL_DISTANCE - Vec3::z() * HANG_SENSOR_Z
}

/// Offset of the hand sensor from the origin.
fn hand_probe(ctx: &StateContext<'_, '_>) -> Vec3 {
    let reach = ctx.character.config.radius + TRY_HANG_WALL_OFFSET;
    ctx.character.forward_xy() * reach + Vec3::z() * (HANG_SENSOR_Z + HANG_VERTICAL_EPSILON)
}

/// Edge level with the hands, if any.
fn edge_in_hands(ctx: &StateContext<'_, '_>, shift: f32) -> Option<ClimbInfo> {
    let offset = hand_probe(ctx) + ctx.character.right_xy() * shift;
    let info = ctx.character.check_climbability(ctx.sim, &offset, 0.0);
    let hands = ctx.character.position.z + HANG_SENSOR_Z;
    (info.edge_hit && (info.edge_point.z - hands).abs() <= HANG_VERTICAL_EPSILON).then_some(info)
}

fn hold_edge(ctx: &mut StateContext<'_, '_>, info: ClimbInfo) {
    let ch = &mut *ctx.character;
    ch.climb = info;
    ch.angles.x = info.edge_z_angle;
    ch.angles.y = 0.0;
    ch.angles.z = 0.0;
    ch.position = hang_origin(&info);
    ch.speed = Vec3::zeros();
    ch.no_fix = true;
    ch.set_move_mode(MoveMode::Climbing);
}

/// Catch an edge while airborne.
///
/// The edge must be within reach of the hands, widened by the distance fallen this tick.
pub(super) fn try_grab_edge(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    let offset = hand_probe(ctx);
    let info = ctx.character.check_climbability(ctx.sim, &offset, 0.0);
    if !info.edge_hit || !info.can_hang {
        return Ok(false);
    }

    let hands = ctx.character.position.z + HANG_SENSOR_Z;
    let fallen = (-ctx.character.speed.z).max(0.0) * ctx.dt;
    let above_hands = info.edge_point.z - hands;
    if above_hands > HANG_VERTICAL_EPSILON || above_hands < -(HANG_VERTICAL_EPSILON + fallen) {
        return Ok(false);
    }

    debug!("grabbed edge at {:?}", info.edge_point);
    hold_edge(ctx, info);
    ctx.character.dir = MoveDirection::Stay;
    ctx.set_animation(anims::HANG_IDLE, 0);
    ctx.set_next_state(LaraState::Hang)?;
    Ok(true)
}

/// Catch monkey bars right above the hands.
pub(super) fn try_grab_monkey(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    let Some(ceiling) = ctx.character.monkey_ceiling(ctx.sim) else {
        return Ok(false);
    };
    let body = ctx.character.body_height();
    if ceiling - (ctx.character.position.z + body) > HANG_VERTICAL_EPSILON {
        return Ok(false);
    }

    debug!("grabbed monkey bars at {ceiling:.0}");
    let ch = &mut *ctx.character;
    ch.position.z = ceiling - body;
    ch.speed = Vec3::zeros();
    ch.dir = MoveDirection::Stay;
    ch.set_move_mode(MoveMode::Monkeyswing);
    ctx.set_animation(anims::MONKEY_IDLE, 0);
    ctx.set_next_state(LaraState::MonkeyswingIdle)?;
    Ok(true)
}

/// Catch a climbable wall ahead.
pub(super) fn try_grab_ladder(ctx: &mut StateContext<'_, '_>) -> Result<bool> {
    if ctx.character.check_wall_climbability(ctx.sim) == WallHit::None {
        return Ok(false);
    }
    let normal = ctx.character.climb.wall_normal;
    let ch = &mut *ctx.character;
    ch.angles.x = yaw_from_direction(&-normal);
    ch.speed = Vec3::zeros();
    ch.dir = MoveDirection::Stay;
    ch.set_move_mode(MoveMode::WallsClimb);
    ctx.set_animation(anims::LADDER_IDLE, 0);
    ctx.set_next_state(LaraState::LadderIdle)?;
    Ok(true)
}

/// Drop from a grip into a fall.
fn let_go(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let ch = &mut *ctx.character;
    ch.no_fix = false;
    ch.dir = MoveDirection::Stay;
    ch.speed = Vec3::zeros();
    ch.set_move_mode(MoveMode::FreeFalling);
    ctx.set_animation(anims::HANG_TO_RELEASE, 0);
    ctx.set_next_state(LaraState::GrabToFall)
}

fn hang(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    ctx.character.dir = MoveDirection::Stay;
    if !cmd.has(CommandFlag::Action) || cmd.back() || cmd.down() {
        return let_go(ctx);
    }
    let Some(info) = edge_in_hands(ctx, 0.0) else {
        return let_go(ctx);
    };
    hold_edge(ctx, info);

    if cmd.forward() || cmd.up() {
        match info.clearance {
            ClimbClearance::Unobstructed if cmd.has(CommandFlag::Shift) => {
                ctx.set_next_state(LaraState::Handstand)
            }
            ClimbClearance::Unobstructed => ctx.set_next_state(LaraState::Climbing),
            ClimbClearance::CanClimbUp => ctx.set_next_state(LaraState::ClimbToCrawl),
            _ => ctx.set_next_state(LaraState::Hang),
        }
    } else if cmd.left() {
        ctx.set_next_state(LaraState::ShimmyLeft)
    } else if cmd.right() {
        ctx.set_next_state(LaraState::ShimmyRight)
    } else {
        ctx.set_next_state(LaraState::Hang)
    }
}

/// Move along the edge while there is still edge under the leading hand.
fn shimmy(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    if !cmd.has(CommandFlag::Action) {
        return let_go(ctx);
    }
    let left = ctx.skeleton.state() == LaraState::ShimmyLeft.id();
    let (held, sign, dir) = if left {
        (cmd.left(), -1.0, MoveDirection::Left)
    } else {
        (cmd.right(), 1.0, MoveDirection::Right)
    };

    let Some(info) = edge_in_hands(ctx, 0.0) else {
        return let_go(ctx);
    };
    hold_edge(ctx, info);

    let lead = sign * (ctx.character.config.radius * 0.5 + ctx.character.config.climb_r);
    if !held || edge_in_hands(ctx, lead).is_none() {
        ctx.character.dir = MoveDirection::Stay;
        return ctx.set_next_state(LaraState::Hang);
    }
    ctx.character.dir = dir;
    Ok(())
}

/// One-shot pull-ups: the body is placed on top when the animation ends.
fn climb_up(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let state = ctx.skeleton.state();
    ctx.character.dir = MoveDirection::Stay;
    ctx.character.no_fix = true;
    if ctx.skeleton.pending_action().is_none() {
        let stand = stand_point(ctx);
        ctx.on_new_animation(PendingAction::ClimbToEdge(stand));
    }
    if !ctx.is_last_frame() {
        return Ok(());
    }
    if state == LaraState::ClimbToCrawl.id() {
        ctx.character.crouched = true;
        ctx.set_next_state(LaraState::CrawlIdle)
    } else {
        ctx.set_next_state(LaraState::Stop)
    }
}

fn monkey_let_go(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let ch = &mut *ctx.character;
    ch.dir = MoveDirection::Stay;
    ch.speed = Vec3::zeros();
    ch.set_move_mode(MoveMode::FreeFalling);
    ctx.set_animation(anims::FREE_FALL_FORWARD, 0);
    ctx.set_next_state(LaraState::FreeFall)
}

fn monkey_idle(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    ctx.character.dir = MoveDirection::Stay;
    if !cmd.has(CommandFlag::Action) || ctx.character.monkey_ceiling(ctx.sim).is_none() {
        return monkey_let_go(ctx);
    }

    if cmd.forward() {
        ctx.set_next_state(LaraState::MonkeyswingForward)
    } else if cmd.left() {
        ctx.set_next_state(LaraState::MonkeyswingLeft)
    } else if cmd.right() {
        ctx.set_next_state(LaraState::MonkeyswingRight)
    } else if cmd.has(CommandFlag::Roll) {
        ctx.set_next_state(LaraState::MonkeyswingTurnaround)
    } else if cmd.turn() > 0.0 {
        ctx.set_next_state(LaraState::MonkeyswingTurnLeft)
    } else if cmd.turn() < 0.0 {
        ctx.set_next_state(LaraState::MonkeyswingTurnRight)
    } else {
        ctx.set_next_state(LaraState::MonkeyswingIdle)
    }
}

fn monkey_move(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    if !cmd.has(CommandFlag::Action) {
        return monkey_let_go(ctx);
    }
    let state = LaraState::try_from(ctx.skeleton.state()).unwrap_or(LaraState::MonkeyswingIdle);
    let (held, dir) = match state {
        LaraState::MonkeyswingLeft => (cmd.left(), MoveDirection::Left),
        LaraState::MonkeyswingRight => (cmd.right(), MoveDirection::Right),
        _ => (cmd.forward(), MoveDirection::Forward),
    };
    if dir == MoveDirection::Forward {
        ctx.character.turn(ctx.character.config.rot_speed_monkeyswing, ctx.dt);
    }

    if !held || ctx.character.response.horizontal_collide {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::MonkeyswingIdle)
    } else {
        ctx.character.dir = dir;
        Ok(())
    }
}

fn monkey_turn(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    ctx.character.dir = MoveDirection::Stay;
    if !cmd.has(CommandFlag::Action) {
        return monkey_let_go(ctx);
    }
    ctx.character.turn(ctx.character.config.rot_speed_monkeyswing, ctx.dt);
    if cmd.turn() == 0.0 || cmd.forward() {
        ctx.set_next_state(LaraState::MonkeyswingIdle)
    } else {
        Ok(())
    }
}

fn monkey_turnaround(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    ctx.character.dir = MoveDirection::Stay;
    if ctx.skeleton.pending_action().is_none() && ctx.frame() == 0 {
        ctx.on_new_animation(PendingAction::TurnAround);
    }
    if ctx.is_last_frame() {
        ctx.set_next_state(LaraState::MonkeyswingIdle)?;
    }
    Ok(())
}

fn ladder_let_go(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let ch = &mut *ctx.character;
    ch.dir = MoveDirection::Stay;
    ch.speed = Vec3::zeros();
    ch.set_move_mode(MoveMode::FreeFalling);
    ctx.set_animation(anims::FREE_FALL_FORWARD, 0);
    ctx.set_next_state(LaraState::FreeFall)
}

/// Feet resting on the floor.
fn on_ground(ctx: &StateContext<'_, '_>) -> bool {
    ctx.character
        .height_info
        .floor_z()
        .is_some_and(|f| ctx.character.position.z - f <= 1.0)
}

fn ladder_idle(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    ctx.character.dir = MoveDirection::Stay;
    if !cmd.has(CommandFlag::Action) {
        if on_ground(ctx) {
            ctx.character.set_move_mode(MoveMode::OnFloor);
            return ctx.set_next_state(LaraState::Stop);
        }
        return ladder_let_go(ctx);
    }

    if cmd.forward() || cmd.up() {
        ctx.set_next_state(LaraState::LadderUp)
    } else if cmd.back() || cmd.down() {
        if on_ground(ctx) {
            ctx.character.set_move_mode(MoveMode::OnFloor);
            ctx.set_next_state(LaraState::Stop)
        } else {
            ctx.set_next_state(LaraState::LadderDown)
        }
    } else if cmd.left() {
        ctx.set_next_state(LaraState::LadderLeft)
    } else if cmd.right() {
        ctx.set_next_state(LaraState::LadderRight)
    } else {
        ctx.set_next_state(LaraState::LadderIdle)
    }
}

fn ladder_move(ctx: &mut StateContext<'_, '_>) -> Result<()> {
    let cmd = ctx.cmd();
    if !cmd.has(CommandFlag::Action) {
        return ladder_let_go(ctx);
    }
    let state = LaraState::try_from(ctx.skeleton.state()).unwrap_or(LaraState::LadderIdle);
    let (held, dir) = match state {
        LaraState::LadderUp => (cmd.forward() || cmd.up(), MoveDirection::Forward),
        LaraState::LadderDown => (cmd.back() || cmd.down(), MoveDirection::Backward),
        LaraState::LadderLeft => (cmd.left(), MoveDirection::Left),
        _ => (cmd.right(), MoveDirection::Right),
    };
    let wall = ctx.character.check_wall_climbability(ctx.sim);

    // Hands above the top of the wall: pull up onto it.
    if dir == MoveDirection::Forward && wall == WallHit::Partial {
        let climb_r = ctx.character.config.climb_r;
        let offset = ctx.character.forward_xy() * (ctx.character.config.radius + TRY_HANG_WALL_OFFSET)
            + Vec3::z() * (ctx.character.config.height + 2.0 * climb_r);
        let info = ctx.character.check_climbability(ctx.sim, &offset, 0.0);
        if info.edge_hit && info.clearance == ClimbClearance::Unobstructed {
            ctx.character.climb = info;
            ctx.character.dir = MoveDirection::Stay;
            return ctx.set_next_state(LaraState::LadderEnd);
        }
    }

    if dir == MoveDirection::Backward && (on_ground(ctx) || ctx.character.response.floor_collide) {
        ctx.character.dir = MoveDirection::Stay;
        ctx.character.set_move_mode(MoveMode::OnFloor);
        return ctx.set_next_state(LaraState::Stop);
    }

    if !held || wall == WallHit::None || ctx.character.response.ceiling_collide {
        ctx.character.dir = MoveDirection::Stay;
        ctx.set_next_state(LaraState::LadderIdle)
    } else {
        ctx.character.dir = dir;
        Ok(())
    }
}
