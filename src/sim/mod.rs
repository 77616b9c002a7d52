//! Round simulation
//!
//! All gameplay logic lives here. This module stays free of rendering and
//! platform concerns:
//! - Fixed timestep only
//! - Seeded RNG owned by the match
//! - Stable iteration order (by unit ID)
//! - One discrete input per tick

pub mod abilities;
pub mod collision;
pub mod feed;
pub mod obstacles;
pub mod progression;
pub mod round;
pub mod schedule;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod unit;

pub use collision::{Collision, CollisionOutcome};
pub use feed::{HudView, Snapshot, UnitView};
pub use obstacles::{Gate, Obstacles, Portal, SurvivalPlatform};
pub use progression::{CompletionAck, CompletionRecord, CompletionSink, completion_points};
pub use schedule::{DeferredAction, Scheduler, TaskHandle};
pub use spawn::SpawnPlan;
pub use state::{
    Ability, AbilityFlags, Character, GameEvent, GamePhase, MatchOutcome, MatchState,
    MatchSummary, RoundOutcome, RoundRecord, RoundState,
};
pub use tick::{InputEvent, TickInput, autoplay_input, dispatch, tick};
pub use unit::{Fate, Side, Unit, UnitFlags, UnitId, UnitRegistry};
