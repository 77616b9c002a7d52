//! One-shot abilities
//!
//! Threat-hash resolves immediately. Tactical, recursive-call and
//! merge-protocol enter a targeting phase and resolve on the next lane pick.

use super::schedule::DeferredAction;
use super::state::{Ability, GameEvent, GamePhase, MatchState};
use super::unit::{Fate, Side, UnitFlags, UnitId};
use crate::clamp_lane;
use crate::consts::*;
use crate::error::RuleViolation;

impl Ability {
    /// Targeting phase for lane-targeted abilities
    pub fn targeting_phase(self) -> Option<GamePhase> {
        match self {
            Ability::Tactical => Some(GamePhase::Tactical),
            Ability::RecursiveCall => Some(GamePhase::Recursive),
            Ability::MergeProtocol => Some(GamePhase::Merge),
            Ability::ThreatHash => None,
        }
    }
}

/// Ability waiting for a lane in the given phase
fn targeting_ability(phase: GamePhase) -> Option<Ability> {
    match phase {
        GamePhase::Tactical => Some(Ability::Tactical),
        GamePhase::Recursive => Some(Ability::RecursiveCall),
        GamePhase::Merge => Some(Ability::MergeProtocol),
        _ => None,
    }
}

impl MatchState {
    /// Activate an ability from the placement phase
    pub fn use_ability(&mut self, ability: Ability) -> Result<(), RuleViolation> {
        self.require_phase(&[GamePhase::Placement])?;
        if !self.abilities.is_available(ability) {
            return Err(RuleViolation::AbilityUnavailable(ability));
        }

        match ability.targeting_phase() {
            Some(phase) => {
                if ability == Ability::Tactical && !self.can_start_round() {
                    return Err(RuleViolation::NothingPlaced);
                }
                self.phase = phase;
                self.push_event(GameEvent::TargetingStarted(ability));
            }
            None => self.reveal_threat(),
        }
        Ok(())
    }

    fn reveal_threat(&mut self) {
        self.abilities.consume(Ability::ThreatHash);
        let enemy_spawns = self.round_state.planned_enemy_spawns;
        log::info!("Threat hash: {} enemies incoming", enemy_spawns);
        self.push_event(GameEvent::ThreatRevealed { enemy_spawns });
    }

    /// Abandon a targeting phase without consuming anything
    pub fn cancel_targeting(&mut self) -> Result<(), RuleViolation> {
        self.require_phase(&[GamePhase::Tactical, GamePhase::Recursive, GamePhase::Merge])?;
        if let Some(ability) = targeting_ability(self.phase) {
            self.push_event(GameEvent::TargetingCancelled(ability));
        }
        self.phase = GamePhase::Placement;
        Ok(())
    }

    /// A lane was picked. Meaning depends on the phase: placement, or the
    /// target of the pending ability.
    pub fn select_lane(&mut self, lane: usize) -> Result<(), RuleViolation> {
        if self.phase == GamePhase::Placement {
            return self.place_unit(lane).map(|_| ());
        }
        self.require_phase(&[GamePhase::Tactical, GamePhase::Recursive, GamePhase::Merge])?;
        let lane = clamp_lane(lane);
        match self.phase {
            GamePhase::Tactical => {
                self.flood_lane(lane);
                Ok(())
            }
            GamePhase::Recursive => {
                self.revive_lane(lane);
                Ok(())
            }
            GamePhase::Merge => self.merge_lane(lane).map(|_| ()),
            _ => unreachable!("phase checked above"),
        }
    }

    /// Tactical: enemies planned for `lane` this round never arrive. The round
    /// starts on its own after a short delay, with input locked meanwhile.
    fn flood_lane(&mut self, lane: usize) {
        self.abilities.consume(Ability::Tactical);
        self.round_state.water_lane = Some(lane);
        self.phase = GamePhase::Placement;

        let delay = self.config.tuning.tactical_start_delay_ms;
        self.scheduler
            .schedule(delay, DeferredAction::AutoStartRound, true);
        log::info!("Lane {} flooded, round starts in {} ms", lane, delay);
        self.push_event(GameEvent::LaneFlooded { lane });
    }

    /// Recursive call: bring back last round's units in `lane`. Consumed even
    /// when nothing comes back. Returns the number revived.
    fn revive_lane(&mut self, lane: usize) -> u32 {
        self.abilities.consume(Ability::RecursiveCall);
        self.phase = GamePhase::Placement;

        let wanted = self.previous_round_lanes[lane];
        let room = self
            .config
            .effective_lane_cap()
            .saturating_sub(self.round_state.player_lanes[lane]);
        let count = wanted.min(room);
        if count == 0 {
            log::info!("Nothing to revive in lane {}", lane);
            self.push_event(GameEvent::NothingToRevive { lane });
            return 0;
        }

        for _ in 0..count {
            let stacked = self.round_state.player_lanes[lane];
            let y = FIELD_DEPTH - REVIVE_SPAWN_OFFSET - SPAWN_STACK_SPACING * stacked as f32;
            self.units.spawn(Side::Player, lane, y, UnitFlags::revived());
            self.round_state.player_lanes[lane] += 1;
            self.round_state.player_units += 1;
        }
        log::info!("Revived {} units in lane {}", count, lane);
        self.push_event(GameEvent::Revived { lane, count });
        count
    }

    /// Merge protocol: fuse the two oldest player units in `lane`.
    ///
    /// With fewer than two, the attempt cancels itself: back to placement,
    /// ability still available.
    fn merge_lane(&mut self, lane: usize) -> Result<UnitId, RuleViolation> {
        let candidates = self.units.active_in_lane(Side::Player, lane);
        let &[first, second, ..] = candidates.as_slice() else {
            self.phase = GamePhase::Placement;
            self.push_event(GameEvent::TargetingCancelled(Ability::MergeProtocol));
            return Err(RuleViolation::NotEnoughToMerge { lane });
        };

        let mut anchor_y = None;
        for id in [first, second] {
            if let Some(unit) = self.units.remove(id) {
                anchor_y.get_or_insert(unit.y);
                self.push_event(GameEvent::UnitRemoved {
                    id,
                    side: Side::Player,
                    fate: Fate::Merged,
                });
            }
        }
        self.round_state.undo_stack.retain(|&id| id != first && id != second);
        self.round_state.player_lanes[lane] -= 1;
        self.round_state.player_units -= 1;

        let y = anchor_y.unwrap_or(FIELD_DEPTH - PLAYER_SPAWN_OFFSET);
        let id = self.units.spawn(Side::Player, lane, y, UnitFlags::merged());
        self.abilities.consume(Ability::MergeProtocol);
        self.phase = GamePhase::Placement;

        log::info!("Merged units {} and {} into {} in lane {}", first, second, id, lane);
        self.push_event(GameEvent::Merged { lane, id });
        Ok(id)
    }
}
