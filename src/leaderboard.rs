//! Local level-completion ledger
//!
//! Persisted to LocalStorage. Keeps the best points per level and the highest
//! level cleared, which unlocks the next one.

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;
use crate::platform::storage;
use crate::settings::LevelConfig;
use crate::sim::{CompletionAck, CompletionRecord, CompletionSink};

/// Best result for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelBest {
    pub level: u8,
    pub points: i32,
    /// Times the level was cleared
    pub clears: u32,
    /// Unix timestamp (ms) of the best run
    pub timestamp: f64,
}

/// Completion ledger
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Leaderboard {
    /// Sorted by level
    pub levels: Vec<LevelBest>,
    /// Highest level cleared (0 when none)
    pub highest_completed: u8,
    /// Persist after each completion
    #[serde(skip)]
    pub autosave: bool,
}

impl Leaderboard {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "glitch_lanes_leaderboard";

    pub fn new() -> Self {
        Self::default()
    }

    /// Load from LocalStorage (empty natively, where nothing is persisted)
    pub fn load() -> Self {
        let board = match storage::load_json::<Leaderboard>(Self::STORAGE_KEY) {
            Some(board) => {
                log::info!("Loaded progress for {} levels", board.levels.len());
                board
            }
            None => {
                log::info!("No saved progress, starting fresh");
                Self::default()
            }
        };
        Self {
            autosave: cfg!(target_arch = "wasm32"),
            ..board
        }
    }

    pub fn save(&self) -> bool {
        let saved = storage::save_json(Self::STORAGE_KEY, self);
        if saved {
            log::info!("Progress saved ({} levels)", self.levels.len());
        }
        saved
    }

    pub fn best(&self, level: u8) -> Option<&LevelBest> {
        self.levels.iter().find(|b| b.level == level)
    }

    /// Level 1 is always open; each clear opens the next
    pub fn is_unlocked(&self, level: u8) -> bool {
        (1..=LevelConfig::MAX_LEVEL).contains(&level) && level <= self.highest_completed.saturating_add(1)
    }

    /// Record a completion. Returns the best points now on record and
    /// whether this run set it.
    pub fn record(&mut self, level: u8, points: i32, timestamp: f64) -> (i32, bool) {
        self.highest_completed = self.highest_completed.max(level);

        let pos = self.levels.iter().position(|b| b.level >= level);
        match pos {
            Some(i) if self.levels[i].level == level => {
                let entry = &mut self.levels[i];
                entry.clears += 1;
                if points > entry.points {
                    entry.points = points;
                    entry.timestamp = timestamp;
                    (points, true)
                } else {
                    (entry.points, false)
                }
            }
            _ => {
                let entry = LevelBest {
                    level,
                    points,
                    clears: 1,
                    timestamp,
                };
                self.levels.insert(pos.unwrap_or(self.levels.len()), entry);
                (points, true)
            }
        }
    }

    /// Sum of best points over every level
    pub fn total_points(&self) -> i32 {
        self.levels.iter().map(|b| b.points).sum()
    }
}

impl CompletionSink for Leaderboard {
    fn submit(&mut self, record: &CompletionRecord) -> Result<CompletionAck, SubmitError> {
        if !(1..=LevelConfig::MAX_LEVEL).contains(&record.level) {
            return Err(SubmitError::Rejected(format!("unknown level {}", record.level)));
        }
        let previous = (self.levels.clone(), self.highest_completed);
        let (best_points, new_best) = self.record(record.level, record.points, storage::now_ms());
        if self.autosave && !self.save() {
            log::warn!("Level {} completion not persisted, discarding", record.level);
            (self.levels, self.highest_completed) = previous;
            return Err(SubmitError::StorageUnavailable);
        }
        Ok(CompletionAck {
            best_points,
            new_best,
        })
    }
}
