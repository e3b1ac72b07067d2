use crate::{character::MoveMode, collision::Vec3};

use super::AnimationModel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimationState {
    pub animation: usize,
    pub frame: u16,
    pub state: u16,
}

/// Playback override set by state handlers for the current tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationMode {
    #[default]
    Normal,
    /// Hold frame 0.
    FrameLock,
    /// Stop on the last frame instead of rolling over.
    LoopLastFrame,
}

/// One-shot action applied to the character when the next animation starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PendingAction {
    SetMoveMode(MoveMode),
    /// Stand on top of an edge (feet position).
    ClimbToEdge(Vec3),
    /// Hang with the origin at this point.
    HangAt(Vec3),
    TurnAround,
    EnableFix,
}

/// Playback state of one actor.
#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    pub current: AnimationState,
    pub previous: AnimationState,
    /// Interpolation fraction between `previous` and `current`.
    pub lerp: f32,
    /// Time accumulated toward the next frame.
    pub frame_time: f32,
    /// State the handlers want to reach through the dispatch tables.
    pub next_state: u16,
    pub mode: AnimationMode,
    pending: Option<PendingAction>,
}

impl Skeleton {
    pub fn new(model: &AnimationModel, animation: usize) -> Self {
        let (index, anim) = model.animation(animation);
        let state = AnimationState {
            animation: index,
            frame: 0,
            state: anim.state_id,
        };
        Self {
            current: state,
            previous: state,
            lerp: 0.0,
            frame_time: 0.0,
            next_state: anim.state_id,
            mode: AnimationMode::Normal,
            pending: None,
        }
    }

    /// Jump straight to `animation` at `frame`. The target state follows the new
    /// animation.
    pub fn set_animation(&mut self, model: &AnimationModel, animation: usize, frame: u16) {
        let (index, anim) = model.animation(animation);
        self.previous = self.current;
        self.current = AnimationState {
            animation: index,
            frame: frame.min(anim.last_frame()),
            state: anim.state_id,
        };
        self.next_state = anim.state_id;
        self.frame_time = 0.0;
        self.lerp = 0.0;
    }

    #[inline]
    pub fn state(&self) -> u16 {
        self.current.state
    }

    /// Install an action for the next animation change, replacing any previous one.
    pub fn set_pending_action(&mut self, action: PendingAction) {
        self.pending = Some(action);
    }

    pub fn pending_action(&self) -> Option<PendingAction> {
        self.pending
    }

    pub fn take_pending_action(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }
}
