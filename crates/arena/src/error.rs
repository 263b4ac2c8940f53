//! Error types returned to the collaborators driving the simulation.

use crate::actor::ActorId;
use thiserror::Error;

/// Errors raised at the simulation's API surface.
///
/// The tick itself never fails; these only report misuse by the caller.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("Actor already joined: {0}")]
    DuplicateActor(ActorId),

    #[error("Invalid config value `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
