//! Read-only view of a match for presentation
//!
//! The presentation layer never touches `MatchState` directly. It takes a
//! `Snapshot` every frame: units in draw order plus the HUD numbers.

use serde::{Deserialize, Serialize};

use super::state::{AbilityFlags, Character, GamePhase, MatchState, MatchSummary};
use super::unit::{GateHold, Side, UnitId};
use crate::consts::LANE_COUNT;

/// One unit as the renderer needs it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub side: Side,
    pub lane: usize,
    pub y: f32,
    pub holding_gate: bool,
    pub queued: bool,
    pub immortal: bool,
    pub merged: bool,
    pub hazard: bool,
    pub from_portal: bool,
    pub revived: bool,
}

/// Gate state for drawing bars and plates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateView {
    pub lane: usize,
    pub gate_y: f32,
    pub plate_y: f32,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudView {
    pub level: u8,
    pub phase: GamePhase,
    pub character: Option<Character>,
    pub round: u32,
    pub total_rounds: u32,
    pub player_wins: u32,
    pub enemy_wins: u32,
    pub player_pool: u32,
    pub enemy_pool: u32,
    pub round_player_score: u32,
    pub round_enemy_score: u32,
    pub lane_counts: [u32; LANE_COUNT],
    pub abilities: AbilityFlags,
    pub can_undo: bool,
    pub can_start: bool,
    pub water_lane: Option<usize>,
    pub hazard_lane: Option<usize>,
    pub interaction_blocked: bool,
    pub summary: Option<MatchSummary>,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Back to front (horizon first)
    pub units: Vec<UnitView>,
    pub gates: Vec<GateView>,
    pub hud: HudView,
}

impl Snapshot {
    pub fn capture(state: &MatchState) -> Self {
        let mut units: Vec<UnitView> = state
            .units
            .iter()
            .filter(|u| u.is_active())
            .map(|u| UnitView {
                id: u.id,
                side: u.side,
                lane: u.lane,
                y: u.y,
                holding_gate: matches!(u.gate, GateHold::Holding { .. }),
                queued: matches!(u.gate, GateHold::Queued { .. }),
                immortal: u.flags.immortal,
                merged: u.flags.merged,
                hazard: u.flags.hazard,
                from_portal: u.flags.from_portal,
                revived: u.flags.revived,
            })
            .collect();
        units.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.id.cmp(&b.id)));

        let gates = state
            .obstacles
            .gates
            .iter()
            .map(|g| GateView {
                lane: g.lane,
                gate_y: g.gate_y,
                plate_y: g.plate_y,
                open: g.open,
            })
            .collect();

        let round = &state.round_state;
        let hud = HudView {
            level: state.config.level,
            phase: state.phase,
            character: state.character,
            round: state.round,
            total_rounds: state.config.total_rounds,
            player_wins: state.player_wins,
            enemy_wins: state.enemy_wins,
            player_pool: state.player_pool,
            enemy_pool: state.enemy_pool,
            round_player_score: round.player_score,
            round_enemy_score: round.enemy_score,
            lane_counts: round.player_lanes,
            abilities: state.abilities,
            can_undo: state.phase == GamePhase::Placement && !round.undo_stack.is_empty(),
            can_start: state.phase == GamePhase::Placement && state.can_start_round(),
            water_lane: round.water_lane,
            hazard_lane: round.hazard_lane,
            interaction_blocked: state.interaction_blocked(),
            summary: state.summary,
        };

        Self { units, gates, hud }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("Snapshot serialization failed: {}", e);
            String::from("{}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LevelConfig;

    #[test]
    fn test_units_sorted_for_drawing() {
        let mut state = MatchState::new(LevelConfig::preset(4).unwrap(), 31);
        state.select_character(Character::Adventurer).unwrap();
        state.place_unit(0).unwrap();
        state.place_unit(0).unwrap();
        state.place_unit(3).unwrap();
        state.start_round().unwrap();

        let snap = Snapshot::capture(&state);
        assert!(snap.units.windows(2).all(|w| w[0].y <= w[1].y));
        assert_eq!(snap.hud.phase, GamePhase::Simulating);
        assert_eq!(snap.hud.lane_counts[0], 2);
        assert_eq!(snap.gates.len(), 2);
        assert!(!snap.hud.can_undo);
    }

    #[test]
    fn test_json_carries_hud() {
        let state = MatchState::new(LevelConfig::preset(1).unwrap(), 1);
        let json = Snapshot::capture(&state).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["hud"]["player_pool"], 7);
        assert_eq!(value["hud"]["phase"], "AwaitingCharacterSelect");
    }
}
