//! Fixed timestep simulation tick
//!
//! One tick: fire due scheduled actions, consume at most one discrete input,
//! then (while simulating) move units, apply obstacles, score, collide and check
//! for the end of the round.

use super::collision::resolve_collisions;
use super::obstacles::{advance_unit, apply_overflow, apply_portals, check_platforms};
use super::state::{Ability, Character, GameEvent, GamePhase, MatchState};
use super::unit::{Fate, Side};
use crate::consts::*;
use crate::error::RuleViolation;

/// A single discrete player action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    SelectCharacter(Character),
    /// Lane picked on the field (placement or ability target)
    Target { lane: usize },
    StartRound,
    Undo,
    UseAbility(Ability),
    /// Back out of an ability's lane selection
    Cancel,
    NextRound,
    Restart,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub event: Option<InputEvent>,
    /// Let the scripted player drive when no event is given
    pub autoplay: bool,
}

/// Advance the match by one fixed timestep
pub fn tick(state: &mut MatchState, input: &TickInput, dt: f32) {
    state.time_ticks += 1;

    for action in state.scheduler.advance(dt) {
        state.run_deferred(action);
    }

    let event = match input.event {
        Some(event) => Some(event),
        None if input.autoplay => autoplay_input(state),
        None => None,
    };
    if let Some(event) = event {
        dispatch(state, event);
    }

    if state.phase == GamePhase::Simulating {
        simulate(state, dt);
    }
}

/// Apply one input. Rejections become warnings.
pub fn dispatch(state: &mut MatchState, event: InputEvent) {
    let result = match event {
        InputEvent::Restart => {
            state.restart();
            Ok(())
        }
        InputEvent::SelectCharacter(character) => state.select_character(character),
        InputEvent::Target { lane } => state.select_lane(lane),
        InputEvent::StartRound => state.start_round(),
        InputEvent::Undo => state.undo_last().map(|_| ()),
        InputEvent::UseAbility(ability) => state.use_ability(ability),
        InputEvent::Cancel => state.cancel_targeting(),
        InputEvent::NextRound => state.proceed_next_round(),
    };

    if let Err(violation) = result {
        log::warn!("{:?} rejected: {}", event, violation);
        state.push_event(GameEvent::Warning(violation));
    }
}

fn simulate(state: &mut MatchState, dt: f32) {
    let step = state.config.tuning.unit_speed * dt;
    let hazard_lane = state.round_state.hazard_lane;
    let mut events = Vec::new();

    // Victims flagged last tick go now, before they can move
    apply_overflow(&mut state.units, hazard_lane);

    for unit in state.units.iter_mut().filter(|u| u.is_active()) {
        advance_unit(unit, &mut state.obstacles.gates, step, &mut events);
    }

    check_platforms(
        &mut state.units,
        &state.obstacles.platforms,
        state.config.tuning.platform_death_chance,
        &mut state.rng,
        &mut events,
    );
    apply_portals(&mut state.units, state.obstacles.portals.as_ref(), &mut events);

    for unit in state.units.iter_mut().filter(|u| u.is_active()) {
        let home = match unit.side {
            Side::Player => unit.y < 0.0,
            Side::Enemy => unit.y > FIELD_DEPTH,
        };
        if home && unit.destroy(Fate::Scored) {
            match unit.side {
                Side::Player => state.round_state.player_score += 1,
                Side::Enemy => state.round_state.enemy_score += 1,
            }
        }
    }

    let reach = state.config.tuning.collision_reach;
    for hit in resolve_collisions(&mut state.units, reach, hazard_lane) {
        events.push(GameEvent::CollisionResolved {
            player: hit.player,
            enemy: hit.enemy,
            outcome: hit.outcome,
        });
    }

    for gone in state.units.sweep() {
        if let Some(fate) = gone.fate {
            log::debug!("{:?} unit {} removed: {:?}", gone.side, gone.id, fate);
            events.push(GameEvent::UnitRemoved {
                id: gone.id,
                side: gone.side,
                fate,
            });
        }
    }
    state.units.normalize_order();

    for event in events {
        state.push_event(event);
    }

    if state.units.moving_count(Side::Player) == 0 && state.units.moving_count(Side::Enemy) == 0 {
        state.resolve_round();
    }
}

/// Scripted player used by the demo binary and attract mode.
///
/// Spreads the pool evenly over the remaining rounds, fills the emptiest
/// lanes first and peeks at the threat once.
pub fn autoplay_input(state: &MatchState) -> Option<InputEvent> {
    if state.interaction_blocked() {
        return None;
    }
    match state.phase {
        GamePhase::AwaitingCharacterSelect => Some(InputEvent::SelectCharacter(Character::Adventurer)),
        GamePhase::Placement => {
            if state.abilities.threat_hash {
                return Some(InputEvent::UseAbility(Ability::ThreatHash));
            }
            let rounds_left = state.config.total_rounds.saturating_sub(state.round) + 1;
            let available = state.player_pool + state.round_state.player_units;
            let quota = available.div_ceil(rounds_left.max(1));
            if state.round_state.player_units < quota && state.player_pool > 0 {
                let cap = state.config.effective_lane_cap();
                let lane = (0..LANE_COUNT)
                    .filter(|&l| state.round_state.player_lanes[l] < cap)
                    .min_by_key(|&l| (state.round_state.player_lanes[l], (l + state.round as usize) % LANE_COUNT));
                if let Some(lane) = lane {
                    return Some(InputEvent::Target { lane });
                }
            }
            Some(InputEvent::StartRound)
        }
        GamePhase::Tactical | GamePhase::Recursive | GamePhase::Merge => Some(InputEvent::Cancel),
        GamePhase::RoundResolved => Some(InputEvent::NextRound),
        GamePhase::Simulating | GamePhase::MatchResolved => None,
    }
}

/// Rejections raised during the last drain window
pub fn warnings(events: &[GameEvent]) -> impl Iterator<Item = RuleViolation> + '_ {
    events.iter().filter_map(|e| match e {
        GameEvent::Warning(v) => Some(*v),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LevelConfig;
    use crate::sim::state::MatchOutcome;

    fn send(state: &mut MatchState, event: InputEvent) {
        tick(
            state,
            &TickInput {
                event: Some(event),
                autoplay: false,
            },
            SIM_DT,
        );
    }

    fn run_round(state: &mut MatchState) {
        for _ in 0..10_000 {
            if state.phase != GamePhase::Simulating {
                return;
            }
            tick(state, &TickInput::default(), SIM_DT);
        }
        panic!("round never ended");
    }

    fn play_out(level: u8, seed: u64) -> MatchState {
        let mut state = MatchState::new(LevelConfig::preset(level).unwrap(), seed);
        let input = TickInput {
            event: None,
            autoplay: true,
        };
        for _ in 0..100_000 {
            if state.phase == GamePhase::MatchResolved {
                break;
            }
            tick(&mut state, &input, SIM_DT);
        }
        state
    }

    #[test]
    fn test_rejections_surface_as_warnings() {
        let mut state = MatchState::new(LevelConfig::preset(1).unwrap(), 3);
        send(&mut state, InputEvent::StartRound);
        let events = state.drain_events();
        assert_eq!(
            warnings(&events).collect::<Vec<_>>(),
            vec![RuleViolation::WrongPhase(GamePhase::AwaitingCharacterSelect)]
        );
    }

    #[test]
    fn test_lone_unit_scores() {
        let mut state = MatchState::new(LevelConfig::preset(1).unwrap(), 11);
        send(&mut state, InputEvent::SelectCharacter(Character::Male));
        send(&mut state, InputEvent::Target { lane: 0 });
        // Flood every enemy lane by hand so nothing opposes the runner
        state.round_state.planned_enemy_spawns = 0;
        send(&mut state, InputEvent::StartRound);
        run_round(&mut state);

        assert_eq!(state.history[0].player_score, 1);
        assert_eq!(state.player_wins, 1);
        assert_eq!(state.phase, GamePhase::RoundResolved);
    }

    #[test]
    fn test_platform_failure_never_scores() {
        let mut config = LevelConfig::preset(2).unwrap();
        config.tuning.platform_death_chance = 1.0;
        let mut state = MatchState::new(config, 17);
        send(&mut state, InputEvent::SelectCharacter(Character::Female));
        send(&mut state, InputEvent::Target { lane: CENTER_LANE });
        // Center-lane enemies crash so the runner meets only the platform
        state.round_state.water_lane = Some(CENTER_LANE);
        send(&mut state, InputEvent::StartRound);
        run_round(&mut state);

        assert_eq!(state.history[0].player_score, 0);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::UnitRemoved {
                side: Side::Player,
                fate: Fate::PlatformFailed,
                ..
            }
        )));
    }

    #[test]
    fn test_platform_survivor_keeps_running() {
        let mut config = LevelConfig::preset(2).unwrap();
        config.tuning.platform_death_chance = 0.0;
        let mut state = MatchState::new(config, 17);
        send(&mut state, InputEvent::SelectCharacter(Character::Female));
        send(&mut state, InputEvent::Target { lane: CENTER_LANE });
        state.round_state.water_lane = Some(CENTER_LANE);
        send(&mut state, InputEvent::StartRound);
        run_round(&mut state);

        assert_eq!(state.history[0].player_score, 1);
    }

    #[test]
    fn test_gate_holder_does_not_block_round_end() {
        let mut state = MatchState::new(LevelConfig::preset(2).unwrap(), 4);
        send(&mut state, InputEvent::SelectCharacter(Character::Adventurer));
        send(&mut state, InputEvent::Target { lane: 1 });
        state.round_state.planned_enemy_spawns = 0;
        send(&mut state, InputEvent::StartRound);
        run_round(&mut state);

        // The only runner holds the gate and never scores
        assert_eq!(state.phase, GamePhase::RoundResolved);
        assert_eq!(state.history[0].player_score, 0);
        assert!(state.obstacles.gates[0].open);
    }

    #[test]
    fn test_overflow_victim_dies_next_tick() {
        let mut state = MatchState::new(LevelConfig::preset(5).unwrap(), 8);
        send(&mut state, InputEvent::SelectCharacter(Character::Adventurer));
        send(&mut state, InputEvent::Target { lane: CENTER_LANE });
        state.round_state.planned_enemy_spawns = 0;
        state.start_round().unwrap();
        state.round_state.hazard_lane = Some(CENTER_LANE);

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.units.active_count(Side::Player), 1);
        assert!(state.units.iter().all(|u| u.flags.overflow_victim));
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.units.active_count(Side::Player), 0);
        assert_eq!(state.phase, GamePhase::RoundResolved);
    }

    #[test]
    fn test_blocked_input_rejected_except_restart() {
        let mut state = MatchState::new(LevelConfig::preset(1).unwrap(), 2);
        send(&mut state, InputEvent::SelectCharacter(Character::Adventurer));
        send(&mut state, InputEvent::Target { lane: 0 });
        send(&mut state, InputEvent::UseAbility(Ability::Tactical));
        send(&mut state, InputEvent::Target { lane: 4 });
        state.drain_events();

        send(&mut state, InputEvent::Target { lane: 1 });
        assert_eq!(
            warnings(&state.drain_events()).collect::<Vec<_>>(),
            vec![RuleViolation::InteractionBlocked]
        );
        assert_eq!(state.round_state.player_units, 1);

        send(&mut state, InputEvent::Restart);
        assert!(!state.interaction_blocked());
        assert_eq!(state.player_pool, 7);
    }

    #[test]
    fn test_full_match_reaches_a_verdict() {
        for level in 1..=LevelConfig::MAX_LEVEL {
            let state = play_out(level, 1234 + u64::from(level));
            assert_eq!(state.phase, GamePhase::MatchResolved, "level {level}");
            assert_eq!(state.history.len() as u32, state.config.total_rounds);
            assert_eq!(state.enemy_pool, 0);

            let summary = state.summary.unwrap();
            assert_eq!(
                summary.outcome == MatchOutcome::PlayerWin,
                state.player_wins > state.enemy_wins
            );
        }
    }

    #[test]
    fn test_same_seed_same_match() {
        let a = play_out(5, 99);
        let b = play_out(5, 99);
        assert_eq!(a.history, b.history);
        assert_eq!(a.summary, b.summary);
    }
}
