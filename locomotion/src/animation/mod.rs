/*!
Animation asset types.

An `AnimationModel` is read-only at runtime. Successor links (`next_anim`, dispatch
targets) are indices into the model's animation list, so a model can be cloned or moved
freely without re-linking.

- skeleton: per-actor playback state
- stepper:  per-tick frame advance, dispatch and command firing
*/

pub mod skeleton;
pub mod stepper;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    constants::DEFAULT_FRAME_RATE,
    error::{LocomotionError, Result},
};

pub use skeleton::{AnimationMode, AnimationState, PendingAction, Skeleton};
pub use stepper::{AnimEvent, step};

/// Frame-range rule: while the animation plays a frame in `frame_low..=frame_high`, a
/// request for the owning `StateChange`'s target jumps to `next_anim` at `next_frame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimDispatch {
    pub frame_low: u16,
    pub frame_high: u16,
    pub next_anim: usize,
    pub next_frame: u16,
}

impl AnimDispatch {
    /// Whether moving from `current` to `candidate` lands in (or steps over the end of)
    /// this case's range.
    #[inline]
    pub fn matches(&self, current: u16, candidate: u16) -> bool {
        (self.frame_low <= candidate && candidate <= self.frame_high)
            || (current <= self.frame_high && self.frame_high <= candidate)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub target: u16,
    /// Checked in order; the first match wins.
    pub dispatches: Vec<AnimDispatch>,
}

impl StateChange {
    /// Index of the first matching case.
    pub fn find(&self, current: u16, candidate: u16) -> Option<usize> {
        self.dispatches
            .iter()
            .position(|d| d.matches(current, candidate))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandFrame {
    /// Fires once when the animation rolls over to its successor.
    LastFrame,
    /// Fires when playback enters this frame.
    At(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnimCommandKind {
    /// Offset in the character frame (right, forward, up).
    SetPosition([f32; 3]),
    /// Launch speeds in units per second; vertical is positive up.
    JumpDistance { vertical: f32, horizontal: f32 },
    Kill,
    PlaySound(u32),
    PlayEffect(u32),
    ToggleVisibility,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimCommand {
    pub frame: CommandFrame,
    pub kind: AnimCommandKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Animation {
    pub state_id: u16,
    /// Number of frames.
    pub frame_duration: u16,
    /// Frames per second.
    pub frame_rate: f32,
    /// Root speed at frame 0 and its per-frame change (units per frame).
    pub speed: f32,
    pub accel: f32,
    pub next_anim: usize,
    pub next_frame: u16,
    pub state_changes: Vec<StateChange>,
    pub commands: Vec<AnimCommand>,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            state_id: 0,
            frame_duration: 1,
            frame_rate: DEFAULT_FRAME_RATE,
            speed: 0.0,
            accel: 0.0,
            next_anim: 0,
            next_frame: 0,
            state_changes: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl Animation {
    #[inline]
    pub fn frame_period(&self) -> f32 {
        1.0 / self.frame_rate
    }

    #[inline]
    pub fn last_frame(&self) -> u16 {
        self.frame_duration.saturating_sub(1)
    }

    pub fn state_change(&self, target: u16) -> Option<&StateChange> {
        self.state_changes.iter().find(|sc| sc.target == target)
    }

    /// Root speed at `frame`.
    pub fn speed_at(&self, frame: u16) -> f32 {
        self.speed + self.accel * f32::from(frame)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationModel {
    animations: Vec<Animation>,
}

impl AnimationModel {
    /// Validate and wrap a list of animations.
    pub fn new(animations: Vec<Animation>) -> Result<Self> {
        if animations.is_empty() {
            return Err(LocomotionError::InvalidAnimationModel(
                "model has no animations".to_string(),
            ));
        }

        let count = animations.len();
        for (i, anim) in animations.iter().enumerate() {
            if anim.frame_duration == 0 {
                return Err(LocomotionError::InvalidAnimationModel(format!(
                    "animation {i} has no frames"
                )));
            }
            if !(anim.frame_rate > 0.0) {
                return Err(LocomotionError::InvalidAnimationModel(format!(
                    "animation {i} has a non-positive frame rate"
                )));
            }
            let dispatch_targets = anim
                .state_changes
                .iter()
                .flat_map(|sc| sc.dispatches.iter().map(|d| d.next_anim));
            if let Some(bad) = std::iter::once(anim.next_anim)
                .chain(dispatch_targets)
                .find(|&n| n >= count)
            {
                return Err(LocomotionError::InvalidAnimationModel(format!(
                    "animation {i} links to missing animation {bad}"
                )));
            }
        }
        Ok(Self { animations })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let animations: Vec<Animation> = serde_json::from_str(s)?;
        Self::new(animations)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// Animation `index`, clamping unknown indices to 0.
    pub fn animation(&self, index: usize) -> (usize, &Animation) {
        match self.animations.get(index) {
            Some(anim) => (index, anim),
            None => {
                warn!(
                    "animation {index} out of range (model has {}), using 0",
                    self.animations.len()
                );
                (0, &self.animations[0])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(low: u16, high: u16, next_anim: usize) -> AnimDispatch {
        AnimDispatch {
            frame_low: low,
            frame_high: high,
            next_anim,
            next_frame: 0,
        }
    }

    #[test]
    fn first_matching_dispatch_case_wins() {
        let sc = StateChange {
            target: 1,
            dispatches: vec![dispatch(10, 20, 7), dispatch(15, 25, 8)],
        };
        let hit = sc.find(16, 17).map(|i| sc.dispatches[i].next_anim);
        assert_eq!(hit, Some(7));
        assert_eq!(sc.find(20, 23).map(|i| sc.dispatches[i].next_anim), Some(7));
        assert_eq!(sc.find(21, 22).map(|i| sc.dispatches[i].next_anim), Some(8));
        assert_eq!(sc.find(1, 2), None);
    }

    #[test]
    fn stepping_over_a_range_end_still_matches() {
        let d = dispatch(4, 5, 0);
        assert!(d.matches(3, 8));
        assert!(!d.matches(6, 8));
    }

    #[test]
    fn model_rejects_broken_links() {
        assert!(AnimationModel::new(Vec::new()).is_err());

        let dangling = Animation {
            next_anim: 3,
            ..Default::default()
        };
        let err = AnimationModel::new(vec![dangling]).unwrap_err();
        assert!(matches!(err, LocomotionError::InvalidAnimationModel(_)));

        let empty = Animation {
            frame_duration: 0,
            ..Default::default()
        };
        assert!(AnimationModel::new(vec![empty]).is_err());
    }

    #[test]
    fn out_of_range_animation_clamps_to_zero() {
        let model = AnimationModel::new(vec![Animation::default(), Animation::default()]).unwrap();
        assert_eq!(model.animation(1).0, 1);
        assert_eq!(model.animation(99).0, 0);
    }

    #[test]
    fn model_parses_from_json() {
        let json = r#"[
            { "state_id": 2, "frame_duration": 10, "next_anim": 1 },
            { "state_id": 0, "frame_duration": 4,
              "commands": [ { "frame": "LastFrame", "kind": { "PlaySound": 12 } } ] }
        ]"#;
        let model = AnimationModel::from_json_str(json).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.animation(0).1.next_anim, 1);
        assert_eq!(model.animation(0).1.frame_rate, DEFAULT_FRAME_RATE);
        assert_eq!(
            model.animation(1).1.commands[0].kind,
            AnimCommandKind::PlaySound(12)
        );
    }
}
