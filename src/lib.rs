//! Glitch Lanes - a lane-defense round game
//!
//! Core modules:
//! - `sim`: Round simulation (placement, abilities, obstacles, collisions, scoring)
//! - `renderer`: Lane projection consumed by the presentation layer
//! - `platform`: Browser/native platform abstraction
//! - `settings`: Data-driven level presets and tuning
//! - `leaderboard`: Local level-completion ledger

pub mod error;
pub mod leaderboard;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, RuleViolation, SubmitError};
pub use leaderboard::Leaderboard;
pub use settings::{LevelConfig, Tuning};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one field unit of travel per step)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Number of parallel lanes
    pub const LANE_COUNT: usize = 5;
    /// Index of the center lane (platforms, immortals, overflow hazard)
    pub const CENTER_LANE: usize = 2;

    /// Field depth: horizon at 0, home wall at FIELD_DEPTH
    pub const FIELD_DEPTH: f32 = 540.0;
    /// Spacing between stacked spawns in one lane
    pub const SPAWN_STACK_SPACING: f32 = 40.0;
    /// Player placement row (distance above the home wall)
    pub const PLAYER_SPAWN_OFFSET: f32 = 30.0;
    /// Revived units appear further up the field
    pub const REVIVE_SPAWN_OFFSET: f32 = 100.0;
    /// Enemy spawn row, measured from the horizon
    pub const ENEMY_SPAWN_DEPTH: f32 = 80.0;

    /// Gate geometry (fraction of field depth for the gate itself)
    pub const GATE_DEPTH_FRACTION: f32 = 0.25;
    /// Pressure plate sits this far below the gate
    pub const GATE_PLATE_OFFSET: f32 = 90.0;
    /// Holder stands this far below the plate
    pub const GATE_HOLD_OFFSET: f32 = 10.0;
    /// Enemies queue this far above the gate
    pub const GATE_QUEUE_OFFSET: f32 = 20.0;

    /// Survival platform radius
    pub const PLATFORM_RADIUS: f32 = 30.0;
    /// Second platform sits this far above the first
    pub const PLATFORM_SPACING: f32 = 100.0;

    /// Portal trigger radius
    pub const PORTAL_RADIUS: f32 = 20.0;
    /// Portals sit this far above mid-field
    pub const PORTAL_OFFSET: f32 = 90.0;
}

/// Clamp a requested lane index to the valid range
#[inline]
pub fn clamp_lane(lane: usize) -> usize {
    lane.min(consts::LANE_COUNT - 1)
}
