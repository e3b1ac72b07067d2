pub mod animation;
pub mod character;
pub mod collision;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod error;
pub mod flags;
pub mod math;
pub mod rooms;
pub mod state;

#[cfg(test)]
mod test_support;

pub use animation::{AnimEvent, Animation, AnimationModel, AnimationState, PendingAction, Skeleton, step};
pub use character::{Character, ClimbInfo, Command, HeightInfo, MoveDirection, MoveMode, StepType, height::get_height_info};
pub use collision::{BodyDef, ColliderShapeDef, CollisionWorld, RapierCollisionWorld};
pub use config::ControllerConfig;
pub use context::SimulationContext;
pub use controller::{ControllerEvent, LaraController, PoseSnapshot, TickOutput};
pub use error::{LocomotionError, Result};
pub use flags::{CommandFlag, CommandFlags, SectorFlag, SectorFlags};
pub use rooms::{Room, RoomSet, Sector};
pub use state::{LaraState, StateContext, StateController};
