//! Round controller
//!
//! The only place that moves the match between phases. Every operation checks
//! the current phase first and either applies fully or returns a
//! `RuleViolation` without touching state.

use super::progression::{completion_points, match_outcome};
use super::schedule::DeferredAction;
use super::spawn::SpawnSlot;
use super::state::{
    Character, GameEvent, GamePhase, MatchState, MatchSummary, MatchOutcome, RoundOutcome,
    RoundRecord,
};
use super::unit::{Side, UnitFlags, UnitId};
use crate::clamp_lane;
use crate::consts::*;
use crate::error::RuleViolation;

impl MatchState {
    /// Reject input while locked, or outside the allowed phases
    pub(crate) fn require_phase(&self, allowed: &[GamePhase]) -> Result<(), RuleViolation> {
        if self.interaction_blocked() {
            return Err(RuleViolation::InteractionBlocked);
        }
        if !allowed.contains(&self.phase) {
            return Err(RuleViolation::WrongPhase(self.phase));
        }
        Ok(())
    }

    /// Pick the cosmetic character and open the first placement phase
    pub fn select_character(&mut self, character: Character) -> Result<(), RuleViolation> {
        self.require_phase(&[GamePhase::AwaitingCharacterSelect])?;
        self.character = Some(character);
        self.phase = GamePhase::Placement;
        log::info!("Character selected: {}", character.as_str());
        self.push_event(GameEvent::CharacterSelected(character));
        Ok(())
    }

    /// Place one player unit at the back of a lane
    pub fn place_unit(&mut self, lane: usize) -> Result<UnitId, RuleViolation> {
        self.require_phase(&[GamePhase::Placement])?;
        let lane = clamp_lane(lane);
        if self.player_pool == 0 {
            return Err(RuleViolation::PoolEmpty);
        }
        let occupied = self.round_state.player_lanes[lane];
        if occupied >= self.config.effective_lane_cap() {
            return Err(RuleViolation::LaneFull { lane });
        }

        let y = FIELD_DEPTH - PLAYER_SPAWN_OFFSET - SPAWN_STACK_SPACING * occupied as f32;
        let id = self.units.spawn(Side::Player, lane, y, UnitFlags::default());
        self.player_pool -= 1;
        self.round_state.player_lanes[lane] += 1;
        self.round_state.player_units += 1;
        self.round_state.undo_stack.push(id);
        debug_assert!(self.round_state.undo_stack.len() as u32 <= self.round_state.player_units);

        self.push_event(GameEvent::UnitPlaced { id, lane });
        Ok(id)
    }

    /// Take back the most recent placement
    pub fn undo_last(&mut self) -> Result<UnitId, RuleViolation> {
        self.require_phase(&[GamePhase::Placement])?;
        let id = *self.round_state.undo_stack.last().ok_or(RuleViolation::UndoEmpty)?;
        self.round_state.undo_stack.pop();

        let Some(unit) = self.units.remove(id) else {
            unreachable!("undo stack refers to missing unit {id}");
        };
        let lane = unit.lane;
        assert!(
            self.round_state.player_lanes[lane] > 0,
            "lane {lane} occupancy underflow"
        );
        self.round_state.player_lanes[lane] -= 1;
        self.round_state.player_units -= 1;
        self.player_pool += 1;
        assert!(self.player_pool <= self.config.max_spawns, "pool overflow");

        self.push_event(GameEvent::PlacementUndone { id, lane });
        Ok(id)
    }

    /// Whether "start round" would be accepted right now
    pub fn can_start_round(&self) -> bool {
        self.round_state.player_units > 0 || self.player_pool == 0
    }

    /// Spawn the round's enemies and begin simulating
    pub fn start_round(&mut self) -> Result<(), RuleViolation> {
        self.require_phase(&[GamePhase::Placement])?;
        if !self.can_start_round() {
            return Err(RuleViolation::NothingPlaced);
        }
        self.begin_simulation();
        Ok(())
    }

    /// Enemy spawn step and phase switch; callers have validated already
    fn begin_simulation(&mut self) {
        let round = self.round_index();
        if self.plan.needs_resolution(round) {
            let gate_lanes = self.obstacles.gate_lanes();
            let player_lanes = self.round_state.player_lanes;
            self.plan
                .resolve_weighted(round, &player_lanes, &gate_lanes, &mut self.rng);
        }

        if self.is_overflow_round() {
            self.round_state.hazard_lane = Some(CENTER_LANE);
            log::info!("Stack overflow live in lane {}", CENTER_LANE);
            self.push_event(GameEvent::HazardAnnounced { lane: CENTER_LANE });
        }

        let planned = self.round_state.planned_enemy_spawns;
        for index in 0..planned as usize {
            self.spawn_enemy(SpawnSlot { round, index });
        }
        self.round_state.spawn_cursor = planned as usize;

        // Placements are committed once the round runs
        self.round_state.undo_stack.clear();
        self.phase = GamePhase::Simulating;

        log::info!(
            "Round {} started: {} players vs {} enemies",
            self.round,
            self.round_state.player_units,
            self.round_state.enemy_units
        );
        self.push_event(GameEvent::RoundStarted {
            round: self.round,
            enemy_spawns: self.round_state.enemy_units,
        });
    }

    fn spawn_enemy(&mut self, slot: SpawnSlot) {
        let lane = self.plan.lane_at(slot);
        debug_assert!(self.enemy_pool > 0, "enemy pool exhausted before plan");
        self.enemy_pool = self.enemy_pool.saturating_sub(1);

        if self.round_state.water_lane == Some(lane) {
            log::debug!("Enemy crashed in flooded lane {}", lane);
            self.push_event(GameEvent::EnemyCrashed { lane });
            return;
        }

        let flags = UnitFlags::enemy(
            lane == CENTER_LANE && self.plan.is_immortal(slot),
            self.round_state.hazard_lane == Some(lane),
        );
        let stacked = self.round_state.enemy_lanes[lane];
        let y = ENEMY_SPAWN_DEPTH - SPAWN_STACK_SPACING * stacked as f32;
        self.units.spawn(Side::Enemy, lane, y, flags);
        self.round_state.enemy_lanes[lane] += 1;
        self.round_state.enemy_units += 1;
    }

    /// Deferred actions from the scheduler
    pub(crate) fn run_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::AutoStartRound => {
                if self.phase == GamePhase::Placement && self.can_start_round() {
                    self.begin_simulation();
                } else {
                    log::warn!("Auto start skipped in {:?}", self.phase);
                }
            }
            DeferredAction::Unblock => {}
        }
    }

    /// Tally the round, fold it into the match score and pick the next phase
    pub(crate) fn resolve_round(&mut self) {
        debug_assert_eq!(self.phase, GamePhase::Simulating);
        let player_score = self.round_state.player_score;
        let enemy_score = self.round_state.enemy_score;
        let outcome = round_outcome(player_score, enemy_score);
        match outcome {
            RoundOutcome::PlayerWin => self.player_wins += 1,
            RoundOutcome::EnemyWin => self.enemy_wins += 1,
            RoundOutcome::Draw => {}
        }

        let record = RoundRecord {
            round: self.round,
            player_score,
            enemy_score,
            outcome,
        };
        self.history.push(record);
        self.previous_round_lanes = self.round_state.player_lanes;
        log::info!(
            "Round {} resolved {}-{}: {:?} (match {}-{})",
            self.round,
            player_score,
            enemy_score,
            outcome,
            self.player_wins,
            self.enemy_wins
        );
        self.push_event(GameEvent::RoundResolved(record));

        if self.is_final_round() {
            self.resolve_match();
        } else {
            self.phase = GamePhase::RoundResolved;
        }
    }

    fn resolve_match(&mut self) {
        let outcome = match_outcome(self.player_wins, self.enemy_wins);
        let units_used = self.units_used();
        let abilities_used = self.abilities.used_count;
        let summary = MatchSummary {
            outcome,
            player_wins: self.player_wins,
            enemy_wins: self.enemy_wins,
            decided_by_tie_break: outcome == MatchOutcome::EnemyWin
                && self.player_wins == self.enemy_wins,
            units_used,
            abilities_used,
            points: completion_points(units_used, abilities_used),
        };
        self.summary = Some(summary);
        self.phase = GamePhase::MatchResolved;
        log::info!("Match over: {:?} ({} points)", outcome, summary.points);
        self.push_event(GameEvent::MatchResolved(summary));
    }

    /// Move from a resolved round to the next placement phase
    pub fn proceed_next_round(&mut self) -> Result<(), RuleViolation> {
        self.require_phase(&[GamePhase::RoundResolved])?;
        self.round += 1;
        self.abilities.on_next_round();
        self.reset_round();
        self.phase = GamePhase::Placement;

        // Swallow the click that pressed "next round"
        let lock = self.config.tuning.next_round_lock_ms;
        self.scheduler.schedule(lock, DeferredAction::Unblock, true);
        log::info!("Round {} placement", self.round);
        Ok(())
    }

    /// Throw the match away and start over on the same level.
    ///
    /// Pending tasks die with the old state. The character choice carries over.
    pub fn restart(&mut self) {
        let seed = self.next_seed();
        let character = self.character;
        *self = MatchState::new(self.config.clone(), seed);
        if let Some(character) = character {
            self.character = Some(character);
            self.phase = GamePhase::Placement;
        }
        log::info!("Match restarted (seed {})", seed);
    }
}

/// Round result from the survivor counts
pub fn round_outcome(player_score: u32, enemy_score: u32) -> RoundOutcome {
    match player_score.cmp(&enemy_score) {
        std::cmp::Ordering::Greater => RoundOutcome::PlayerWin,
        std::cmp::Ordering::Less => RoundOutcome::EnemyWin,
        std::cmp::Ordering::Equal => RoundOutcome::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LevelConfig;
    use proptest::prelude::*;

    fn placing(level: u8) -> MatchState {
        let mut state = MatchState::new(LevelConfig::preset(level).unwrap(), 9);
        state.select_character(Character::Adventurer).unwrap();
        state
    }

    fn lane_sum(state: &MatchState) -> u32 {
        state.round_state.player_lanes.iter().sum()
    }

    #[test]
    fn test_placement_and_undo_accounting() {
        // MAX_SPAWNS = 7: place in lanes 0, 2, 1, then undo the last one
        let mut state = placing(1);
        let mut placed = Vec::new();
        for lane in [0, 2, 1] {
            placed.push(state.place_unit(lane).unwrap());
        }
        assert_eq!(state.player_pool, 4);
        assert_eq!(state.round_state.player_lanes[..3], [1, 1, 1]);

        assert_eq!(state.undo_last(), Ok(placed[2]));
        assert_eq!(state.player_pool, 5);
        assert_eq!(state.round_state.player_lanes[..3], [1, 0, 1]);
        assert_eq!(state.round_state.player_units, 2);
        assert!(state.units.get(placed[2]).is_none());
    }

    #[test]
    fn test_single_undo_restores_pool() {
        let mut state = placing(1);
        state.place_unit(0).unwrap();
        state.place_unit(1).unwrap();
        state.place_unit(1).unwrap();
        state.undo_last().unwrap();
        assert_eq!(state.player_pool, 5);
        assert_eq!(state.round_state.player_lanes[1], 1);
    }

    #[test]
    fn test_placement_needs_placement_phase() {
        let mut state = MatchState::new(LevelConfig::preset(1).unwrap(), 1);
        assert_eq!(
            state.place_unit(0),
            Err(RuleViolation::WrongPhase(GamePhase::AwaitingCharacterSelect))
        );
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_lane_cap_rejects_without_mutation() {
        let mut state = placing(4);
        state.place_unit(3).unwrap();
        state.place_unit(3).unwrap();
        let pool = state.player_pool;
        assert_eq!(state.place_unit(3), Err(RuleViolation::LaneFull { lane: 3 }));
        assert_eq!(state.player_pool, pool);
        assert_eq!(state.round_state.player_lanes[3], 2);
    }

    #[test]
    fn test_gated_levels_cap_lanes_at_two() {
        for level in [2, 3] {
            let mut state = placing(level);
            state.place_unit(0).unwrap();
            state.place_unit(0).unwrap();
            assert_eq!(state.place_unit(0), Err(RuleViolation::LaneFull { lane: 0 }));
            assert_eq!(state.round_state.player_lanes[0], 2);
            assert!(state.place_unit(1).is_ok());
        }
    }

    #[test]
    fn test_out_of_range_lane_clamps() {
        let mut state = placing(1);
        let id = state.place_unit(99).unwrap();
        assert_eq!(state.units.get(id).unwrap().lane, LANE_COUNT - 1);
    }

    #[test]
    fn test_pool_empty() {
        let mut state = placing(1);
        for _ in 0..7 {
            state.place_unit(0).unwrap();
        }
        assert_eq!(state.place_unit(1), Err(RuleViolation::PoolEmpty));
    }

    #[test]
    fn test_undo_empty() {
        let mut state = placing(1);
        assert_eq!(state.undo_last(), Err(RuleViolation::UndoEmpty));
    }

    #[test]
    fn test_start_requires_a_unit() {
        let mut state = placing(1);
        assert_eq!(state.start_round(), Err(RuleViolation::NothingPlaced));
        assert_eq!(state.phase, GamePhase::Placement);

        state.place_unit(2).unwrap();
        state.start_round().unwrap();
        assert_eq!(state.phase, GamePhase::Simulating);
        assert!(state.round_state.undo_stack.is_empty());
        assert_eq!(
            state.units.active_count(Side::Enemy) as u32,
            state.round_state.planned_enemy_spawns
        );
    }

    #[test]
    fn test_start_with_empty_pool_and_nothing_placed() {
        let mut state = placing(1);
        state.player_pool = 0;
        assert!(state.start_round().is_ok());
    }

    #[test]
    fn test_flooded_lane_enemies_never_spawn() {
        let mut state = placing(1);
        state.place_unit(0).unwrap();
        let round = state.round_index();
        let flooded = state.plan.lanes_for_round(round)[0];
        let expected = state
            .plan
            .lanes_for_round(round)
            .iter()
            .filter(|&&l| l != flooded)
            .count() as u32;

        state.round_state.water_lane = Some(flooded);
        state.start_round().unwrap();
        assert_eq!(state.round_state.enemy_units, expected);
        assert!(
            state
                .units
                .iter()
                .all(|u| u.side == Side::Player || u.lane != flooded)
        );
        let crashed = state
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyCrashed { .. }))
            .count() as u32;
        assert_eq!(crashed + expected, state.round_state.planned_enemy_spawns);
    }

    #[test]
    fn test_round_outcome_rules() {
        assert_eq!(round_outcome(4, 2), RoundOutcome::PlayerWin);
        assert_eq!(round_outcome(0, 1), RoundOutcome::EnemyWin);
        assert_eq!(round_outcome(1, 1), RoundOutcome::Draw);
    }

    #[test]
    fn test_round_win_and_final_draw_goes_to_enemy() {
        let mut state = placing(1);

        // Round 1: 4-2 for the player
        state.phase = GamePhase::Simulating;
        state.round_state.player_score = 4;
        state.round_state.enemy_score = 2;
        state.resolve_round();
        assert_eq!(state.player_wins, 1);
        assert_eq!(state.phase, GamePhase::RoundResolved);

        // Round 2: enemy
        state.proceed_next_round().unwrap();
        state.scheduler.clear();
        state.phase = GamePhase::Simulating;
        state.round_state.enemy_score = 3;
        state.resolve_round();
        assert_eq!(state.enemy_wins, 1);

        // Round 3 (final): 1-1 draw
        state.proceed_next_round().unwrap();
        state.scheduler.clear();
        state.phase = GamePhase::Simulating;
        state.round_state.player_score = 1;
        state.round_state.enemy_score = 1;
        state.resolve_round();

        assert_eq!(state.phase, GamePhase::MatchResolved);
        let summary = state.summary.unwrap();
        assert_eq!(summary.outcome, MatchOutcome::EnemyWin);
        assert!(summary.decided_by_tie_break);
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history[2].outcome, RoundOutcome::Draw);
    }

    #[test]
    fn test_next_round_locks_input_briefly() {
        let mut state = placing(1);
        state.phase = GamePhase::Simulating;
        state.resolve_round();
        state.proceed_next_round().unwrap();
        assert_eq!(state.round, 2);
        assert!(state.interaction_blocked());
        assert_eq!(state.place_unit(0), Err(RuleViolation::InteractionBlocked));

        for action in state.scheduler.advance(0.25) {
            state.run_deferred(action);
        }
        assert!(!state.interaction_blocked());
        assert!(state.place_unit(0).is_ok());
    }

    #[test]
    fn test_restart_discards_everything() {
        let mut state = placing(1);
        state.place_unit(1).unwrap();
        state.scheduler.schedule(1000, DeferredAction::AutoStartRound, true);
        state.restart();

        assert_eq!(state.phase, GamePhase::Placement);
        assert_eq!(state.character, Some(Character::Adventurer));
        assert_eq!(state.player_pool, 7);
        assert!(state.units.is_empty());
        assert!(!state.interaction_blocked());
    }

    proptest! {
        #[test]
        fn prop_place_undo_conserves_pool(ops in prop::collection::vec((any::<bool>(), 0usize..6), 0..40)) {
            let mut state = placing(4);
            for (place, lane) in ops {
                let before = (state.player_pool, state.round_state.player_lanes, state.round_state.player_units);
                let result = if place {
                    state.place_unit(lane).map(|_| ())
                } else {
                    state.undo_last().map(|_| ())
                };
                if result.is_err() {
                    let after = (state.player_pool, state.round_state.player_lanes, state.round_state.player_units);
                    prop_assert_eq!(before, after);
                }
                prop_assert_eq!(state.player_pool + lane_sum(&state), state.config.max_spawns);
                prop_assert!(state.round_state.undo_stack.len() as u32 <= state.round_state.player_units);
                let cap = state.config.effective_lane_cap();
                prop_assert!(state.round_state.player_lanes.iter().all(|&n| n <= cap));
            }
        }
    }
}
