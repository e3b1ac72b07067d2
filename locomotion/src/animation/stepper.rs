//! Per-tick animation advance.
//!
//! Each elapsed frame period advances one frame with this priority:
//! frame lock, loop-last-frame clamp, state-change dispatch toward `next_state`, natural
//! rollover to `next_anim`. Commands bound to the last frame fire exactly once per pass,
//! at the rollover.

use log::trace;

use super::{AnimCommandKind, AnimationMode, AnimationModel, CommandFrame, PendingAction, Skeleton};

/// Frames advanced in one call at most; the rest of the accumulated time is dropped.
pub const MAX_FRAMES_PER_STEP: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimEvent {
    Command(AnimCommandKind),
    AnimationChanged { from: usize, to: usize },
    PendingAction(PendingAction),
}

/// Advance `skel` by `dt` seconds, appending what happened to `events`.
pub fn step(skel: &mut Skeleton, model: &AnimationModel, dt: f32, events: &mut Vec<AnimEvent>) {
    skel.frame_time += dt.max(0.0);

    let mut advanced = 0;
    loop {
        let period = model.animation(skel.current.animation).1.frame_period();
        if skel.frame_time < period {
            skel.lerp = (skel.frame_time / period).clamp(0.0, 1.0);
            return;
        }
        if advanced == MAX_FRAMES_PER_STEP {
            trace!("dropping {:.3}s of animation time", skel.frame_time);
            skel.frame_time = 0.0;
            skel.lerp = 0.0;
            return;
        }
        skel.frame_time -= period;
        advance_frame(skel, model, events);
        advanced += 1;
    }
}

fn advance_frame(skel: &mut Skeleton, model: &AnimationModel, events: &mut Vec<AnimEvent>) {
    let (index, anim) = model.animation(skel.current.animation);
    skel.current.animation = index;
    skel.previous = skel.current;

    match skel.mode {
        AnimationMode::FrameLock => {
            skel.current.frame = 0;
            return;
        }
        AnimationMode::LoopLastFrame if skel.current.frame >= anim.last_frame() => {
            skel.current.frame = anim.last_frame();
            return;
        }
        _ => {}
    }

    let frame = skel.current.frame;
    let candidate = frame.saturating_add(1);

    if skel.next_state != skel.current.state {
        let target = anim.state_change(skel.next_state).and_then(|sc| {
            sc.find(frame, candidate).map(|i| sc.dispatches[i])
        });
        if let Some(d) = target {
            switch_to(skel, model, d.next_anim, d.next_frame, events);
            return;
        }
    }

    if candidate >= anim.frame_duration {
        events.extend(
            anim.commands
                .iter()
                .filter(|c| c.frame == CommandFrame::LastFrame)
                .map(|c| AnimEvent::Command(c.kind)),
        );
        switch_to(skel, model, anim.next_anim, anim.next_frame, events);
        return;
    }

    skel.current.frame = candidate;
    fire_frame_commands(skel, model, events);
}

/// Enter `animation` at `frame`, keeping `next_state`.
fn switch_to(
    skel: &mut Skeleton,
    model: &AnimationModel,
    animation: usize,
    frame: u16,
    events: &mut Vec<AnimEvent>,
) {
    let from = skel.current.animation;
    let (to, anim) = model.animation(animation);
    skel.current.animation = to;
    skel.current.frame = frame.min(anim.last_frame());
    skel.current.state = anim.state_id;

    if from != to {
        events.push(AnimEvent::AnimationChanged { from, to });
        if let Some(action) = skel.take_pending_action() {
            events.push(AnimEvent::PendingAction(action));
        }
    }
    fire_frame_commands(skel, model, events);
}

fn fire_frame_commands(skel: &Skeleton, model: &AnimationModel, events: &mut Vec<AnimEvent>) {
    let anim = model.animation(skel.current.animation).1;
    let frame = CommandFrame::At(skel.current.frame);
    events.extend(
        anim.commands
            .iter()
            .filter(|c| c.frame == frame)
            .map(|c| AnimEvent::Command(c.kind)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimCommand, AnimDispatch, Animation, StateChange};

    const PERIOD: f32 = 1.0 / 30.0;

    fn looping(frames: u16, commands: Vec<AnimCommand>) -> Animation {
        Animation {
            state_id: 2,
            frame_duration: frames,
            commands,
            ..Default::default()
        }
    }

    fn sounds(events: &[AnimEvent], id: u32) -> usize {
        events
            .iter()
            .filter(|e| **e == AnimEvent::Command(AnimCommandKind::PlaySound(id)))
            .count()
    }

    #[test]
    fn last_frame_command_fires_once_per_pass() {
        let model = AnimationModel::new(vec![looping(
            5,
            vec![
                AnimCommand {
                    frame: CommandFrame::LastFrame,
                    kind: AnimCommandKind::PlaySound(1),
                },
                AnimCommand {
                    frame: CommandFrame::At(4),
                    kind: AnimCommandKind::PlaySound(2),
                },
            ],
        )])
        .unwrap();
        let mut skel = Skeleton::new(&model, 0);
        let mut events = Vec::new();

        let mut seen = Vec::new();
        for _ in 0..10 {
            step(&mut skel, &model, PERIOD, &mut events);
            seen.push(sounds(&events, 1));
        }
        // Two passes through frames 0..=4, the command fires at each rollover only.
        assert_eq!(sounds(&events, 1), 2);
        assert_eq!(seen, vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 2]);
        // The mid-animation command at frame 4 fires on entering frame 4 only.
        assert_eq!(sounds(&events, 2), 2);
        assert_eq!(skel.current.frame, 0);
    }

    #[test]
    fn dispatch_takes_the_first_matching_case() {
        let mut start = looping(30, Vec::new());
        start.state_changes = vec![StateChange {
            target: 7,
            dispatches: vec![
                AnimDispatch {
                    frame_low: 10,
                    frame_high: 20,
                    next_anim: 1,
                    next_frame: 0,
                },
                AnimDispatch {
                    frame_low: 15,
                    frame_high: 25,
                    next_anim: 2,
                    next_frame: 3,
                },
            ],
        }];
        let mut a = looping(30, Vec::new());
        a.state_id = 7;
        let mut b = looping(30, Vec::new());
        b.state_id = 7;
        let model = AnimationModel::new(vec![start, a, b]).unwrap();

        let mut skel = Skeleton::new(&model, 0);
        skel.current.frame = 16;
        skel.next_state = 7;
        let mut events = Vec::new();
        step(&mut skel, &model, PERIOD, &mut events);

        assert_eq!(skel.current.animation, 1);
        assert_eq!(skel.state(), 7);
        assert!(events.contains(&AnimEvent::AnimationChanged { from: 0, to: 1 }));
    }

    #[test]
    fn frame_lock_and_loop_last_frame() {
        let model = AnimationModel::new(vec![looping(5, Vec::new())]).unwrap();
        let mut events = Vec::new();

        let mut skel = Skeleton::new(&model, 0);
        skel.current.frame = 3;
        skel.mode = AnimationMode::FrameLock;
        step(&mut skel, &model, PERIOD * 3.0 + 1e-4, &mut events);
        assert_eq!(skel.current.frame, 0);

        let mut skel = Skeleton::new(&model, 0);
        skel.mode = AnimationMode::LoopLastFrame;
        for _ in 0..12 {
            step(&mut skel, &model, PERIOD, &mut events);
        }
        assert_eq!(skel.current.frame, 4);
        assert!(events.is_empty());
    }

    #[test]
    fn pending_action_is_emitted_on_animation_change() {
        let mut first = looping(2, Vec::new());
        first.next_anim = 1;
        let model = AnimationModel::new(vec![first, looping(4, Vec::new())]).unwrap();
        let mut skel = Skeleton::new(&model, 0);
        skel.set_pending_action(PendingAction::TurnAround);

        let mut events = Vec::new();
        step(&mut skel, &model, PERIOD, &mut events);
        assert!(events.is_empty());
        assert_eq!(skel.pending_action(), Some(PendingAction::TurnAround));

        step(&mut skel, &model, PERIOD, &mut events);
        assert_eq!(
            events,
            vec![
                AnimEvent::AnimationChanged { from: 0, to: 1 },
                AnimEvent::PendingAction(PendingAction::TurnAround),
            ]
        );
        assert_eq!(skel.pending_action(), None);
    }

    #[test]
    fn lerp_is_the_remainder_over_the_period() {
        let model = AnimationModel::new(vec![looping(100, Vec::new())]).unwrap();
        let mut skel = Skeleton::new(&model, 0);
        let mut events = Vec::new();
        step(&mut skel, &model, PERIOD * 2.5, &mut events);
        assert_eq!(skel.current.frame, 2);
        assert!((skel.lerp - 0.5).abs() < 1e-3);

        // A huge step is capped.
        step(&mut skel, &model, 100.0, &mut events);
        assert_eq!(skel.current.frame, 2 + MAX_FRAMES_PER_STEP as u16);
        assert_eq!(skel.frame_time, 0.0);
    }
}
