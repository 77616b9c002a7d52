//! Match progression and level completion
//!
//! A won match produces a `CompletionRecord`. The match hands it to a
//! `CompletionSink` (the local leaderboard, or a backend) at most once. A failed
//! submission is reported and never rolls the match back.

use serde::{Deserialize, Serialize};

use super::state::{GameEvent, GamePhase, MatchOutcome, MatchState};
use crate::error::SubmitError;

/// Points awarded before deductions
pub const BASE_POINTS: i32 = 100;
/// Deduction per ability used
pub const ABILITY_PENALTY: i32 = 5;

/// What a completed level is worth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub level: u8,
    pub points: i32,
}

/// Sink acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionAck {
    /// Best points now on record for the level
    pub best_points: i32,
    pub new_best: bool,
}

/// Anything that accepts level completions
pub trait CompletionSink {
    fn submit(&mut self, record: &CompletionRecord) -> Result<CompletionAck, SubmitError>;
}

/// `100 - units_used - 5 * abilities_used`. Not clamped.
pub fn completion_points(units_used: u32, abilities_used: u32) -> i32 {
    let units = i32::try_from(units_used).unwrap_or(i32::MAX);
    let abilities = i32::try_from(abilities_used).unwrap_or(i32::MAX);
    BASE_POINTS
        .saturating_sub(units)
        .saturating_sub(abilities.saturating_mul(ABILITY_PENALTY))
}

/// More round wins takes the match; a tie goes to the enemy
pub fn match_outcome(player_wins: u32, enemy_wins: u32) -> MatchOutcome {
    if player_wins > enemy_wins {
        MatchOutcome::PlayerWin
    } else {
        MatchOutcome::EnemyWin
    }
}

impl MatchState {
    /// Completion owed to a sink: a resolved player win not yet submitted
    pub fn pending_completion(&self) -> Option<CompletionRecord> {
        if self.phase != GamePhase::MatchResolved || self.completion_submitted {
            return None;
        }
        let summary = self.summary?;
        (summary.outcome == MatchOutcome::PlayerWin).then_some(CompletionRecord {
            level: self.config.level,
            points: summary.points,
        })
    }

    /// Hand the pending completion to `sink`, once per match.
    ///
    /// Returns `None` when nothing is owed. Errors are also raised as
    /// `GameEvent::CompletionFailed`; the match result stands either way.
    pub fn submit_completion(
        &mut self,
        sink: &mut dyn CompletionSink,
    ) -> Option<Result<CompletionAck, SubmitError>> {
        let record = self.pending_completion()?;
        self.completion_submitted = true;

        let result = sink.submit(&record);
        match &result {
            Ok(ack) => {
                log::info!(
                    "Level {} completed with {} points (best {})",
                    record.level,
                    record.points,
                    ack.best_points
                );
                self.push_event(GameEvent::CompletionSubmitted {
                    level: record.level,
                    points: record.points,
                });
            }
            Err(e) => {
                log::warn!("Completion submit failed: {}", e);
                self.push_event(GameEvent::CompletionFailed(e.to_string()));
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LevelConfig;
    use crate::sim::state::{Character, MatchSummary};
    use proptest::prelude::*;

    #[derive(Default)]
    struct RecordingSink {
        records: Vec<CompletionRecord>,
        fail: bool,
    }

    impl CompletionSink for RecordingSink {
        fn submit(&mut self, record: &CompletionRecord) -> Result<CompletionAck, SubmitError> {
            if self.fail {
                return Err(SubmitError::Rejected("offline".into()));
            }
            self.records.push(*record);
            Ok(CompletionAck {
                best_points: record.points,
                new_best: true,
            })
        }
    }

    fn resolved(outcome: MatchOutcome) -> MatchState {
        let mut state = MatchState::new(LevelConfig::preset(3).unwrap(), 5);
        state.select_character(Character::Male).unwrap();
        state.phase = GamePhase::MatchResolved;
        state.summary = Some(MatchSummary {
            outcome,
            player_wins: 2,
            enemy_wins: 1,
            decided_by_tie_break: false,
            units_used: 12,
            abilities_used: 2,
            points: completion_points(12, 2),
        });
        state
    }

    #[test]
    fn test_points_formula() {
        assert_eq!(completion_points(0, 0), 100);
        assert_eq!(completion_points(12, 2), 78);
        assert_eq!(completion_points(25, 4), 55);
        assert_eq!(completion_points(200, 0), -100);
    }

    #[test]
    fn test_submits_once_on_player_win() {
        let mut state = resolved(MatchOutcome::PlayerWin);
        let mut sink = RecordingSink::default();

        let ack = state.submit_completion(&mut sink).unwrap().unwrap();
        assert_eq!(ack.best_points, 78);
        assert!(state.submit_completion(&mut sink).is_none());
        assert_eq!(
            sink.records,
            vec![CompletionRecord {
                level: 3,
                points: 78
            }]
        );
    }

    #[test]
    fn test_enemy_win_submits_nothing() {
        let mut state = resolved(MatchOutcome::EnemyWin);
        let mut sink = RecordingSink::default();
        assert!(state.submit_completion(&mut sink).is_none());
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_failure_is_a_warning_not_a_rollback() {
        let mut state = resolved(MatchOutcome::PlayerWin);
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let result = state.submit_completion(&mut sink).unwrap();
        assert!(result.is_err());
        assert_eq!(state.phase, GamePhase::MatchResolved);
        assert!(state.summary.is_some());
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::CompletionFailed(_)))
        );
    }

    proptest! {
        #[test]
        fn prop_tie_or_worse_goes_to_enemy(p in 0u32..6, e in 0u32..6) {
            let outcome = match_outcome(p, e);
            prop_assert_eq!(outcome == MatchOutcome::PlayerWin, p > e);
        }
    }
}
