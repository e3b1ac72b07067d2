use thiserror::Error;

use crate::state::LaraState;

/// Errors surfaced by the locomotion core.
///
/// Geometry queries never fail; they report misses through `Option` and hit flags.
#[derive(Debug, Error)]
pub enum LocomotionError {
    #[error("no handler registered for state {0:?}")]
    UnregisteredState(LaraState),

    #[error("invalid controller config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse controller config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid animation model: {0}")]
    InvalidAnimationModel(String),
}

pub type Result<T> = std::result::Result<T, LocomotionError>;
