//! Error types
//!
//! `RuleViolation` covers user-facing rejections: the attempt is refused and no
//! state changes. `SubmitError` covers the completion collaborator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::{Ability, GamePhase};

/// A rejected player action. Shown as a transient warning, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuleViolation {
    #[error("not allowed during {0:?}")]
    WrongPhase(GamePhase),
    #[error("lane {lane} is full")]
    LaneFull { lane: usize },
    #[error("no units left to place")]
    PoolEmpty,
    #[error("place at least one unit first")]
    NothingPlaced,
    #[error("nothing to undo")]
    UndoEmpty,
    #[error("{0:?} is not available")]
    AbilityUnavailable(Ability),
    #[error("need 2 players in lane {lane}")]
    NotEnoughToMerge { lane: usize },
    #[error("input locked")]
    InteractionBlocked,
}

/// Invalid level preset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown level {0} (expected 1..=5)")]
    UnknownLevel(u8),
    #[error("{max_spawns} spawns cannot cover {rounds} rounds")]
    TooFewSpawns { max_spawns: u32, rounds: u32 },
    #[error("{what} lane {lane} out of range")]
    LaneOutOfRange { what: &'static str, lane: usize },
}

/// Failure reported by a completion sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error("rejected: {0}")]
    Rejected(String),
}
