//! Match and round state
//!
//! One `MatchState` owns everything a match needs: configuration, the spawn
//! plan, the unit registry, obstacle state, per-round bookkeeping and the RNG.
//! Nothing lives in globals, so matches can run side by side in tests.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::CollisionOutcome;
use super::obstacles::Obstacles;
use super::schedule::Scheduler;
use super::spawn::SpawnPlan;
use super::unit::{Fate, Side, UnitId, UnitRegistry};
use crate::consts::LANE_COUNT;
use crate::error::RuleViolation;
use crate::settings::{AbilitySet, LevelConfig};

/// Current phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the player to pick a character
    AwaitingCharacterSelect,
    /// Placing units, using abilities
    Placement,
    /// Picking the lane to flood
    Tactical,
    /// Picking the lane to revive
    Recursive,
    /// Picking the lane to merge
    Merge,
    /// Units are running
    Simulating,
    /// Round over, next round available
    RoundResolved,
    /// Final round over
    MatchResolved,
}

/// Cosmetic character choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Character {
    #[default]
    Adventurer,
    Female,
    Male,
}

impl Character {
    pub const ALL: [Character; 3] = [Character::Adventurer, Character::Female, Character::Male];

    pub fn as_str(&self) -> &'static str {
        match self {
            Character::Adventurer => "Adventurer",
            Character::Female => "Female",
            Character::Male => "Male",
        }
    }
}

/// One-shot player abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Flood a lane: enemies planned there never arrive
    Tactical,
    /// Reveal this round's enemy count
    ThreatHash,
    /// Re-create last round's units in a lane
    RecursiveCall,
    /// Fuse two units in a lane into one unstoppable unit
    MergeProtocol,
}

/// Availability of each ability for the rest of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityFlags {
    pub tactical: bool,
    pub threat_hash: bool,
    pub recursive_call: bool,
    pub merge_protocol: bool,
    /// Recursive call becomes available from round 2 until used
    pub recursive_used: bool,
    enabled: AbilitySet,
    /// Abilities consumed this match (feeds the completion score)
    pub used_count: u32,
}

impl AbilityFlags {
    pub fn new(enabled: AbilitySet) -> Self {
        Self {
            tactical: enabled.tactical,
            threat_hash: enabled.threat_hash,
            recursive_call: false,
            merge_protocol: enabled.merge_protocol,
            recursive_used: false,
            enabled,
            used_count: 0,
        }
    }

    pub fn is_available(&self, ability: Ability) -> bool {
        match ability {
            Ability::Tactical => self.tactical,
            Ability::ThreatHash => self.threat_hash,
            Ability::RecursiveCall => self.recursive_call,
            Ability::MergeProtocol => self.merge_protocol,
        }
    }

    /// Flip an ability to unavailable and count it
    pub fn consume(&mut self, ability: Ability) {
        debug_assert!(self.is_available(ability));
        match ability {
            Ability::Tactical => self.tactical = false,
            Ability::ThreatHash => self.threat_hash = false,
            Ability::RecursiveCall => {
                self.recursive_call = false;
                self.recursive_used = true;
            }
            Ability::MergeProtocol => self.merge_protocol = false,
        }
        self.used_count += 1;
    }

    /// Called when a new round (2+) begins
    pub fn on_next_round(&mut self) {
        if self.enabled.recursive_call && !self.recursive_used {
            self.recursive_call = true;
        }
    }
}

/// Per-round bookkeeping, reset at the start of every round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoundState {
    /// Survivors that reached the far horizon
    pub player_score: u32,
    pub enemy_score: u32,
    /// Player units fielded this round
    pub player_units: u32,
    /// Enemy units that actually spawned this round
    pub enemy_units: u32,
    /// Player lane occupancy
    pub player_lanes: [u32; LANE_COUNT],
    pub enemy_lanes: [u32; LANE_COUNT],
    /// Lane flooded by the tactical ability
    pub water_lane: Option<usize>,
    /// Enemy count for this round, fixed before placement
    pub planned_enemy_spawns: u32,
    /// Next unconsumed slot in this round's lane list
    pub spawn_cursor: usize,
    /// Lane that is lethal to players this round
    pub hazard_lane: Option<usize>,
    /// Placements not yet committed, most recent last
    pub undo_stack: Vec<UnitId>,
}

/// Result of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    PlayerWin,
    EnemyWin,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round number
    pub round: u32,
    pub player_score: u32,
    pub enemy_score: u32,
    pub outcome: RoundOutcome,
}

/// Result of a whole match. A tie goes to the enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    PlayerWin,
    EnemyWin,
}

/// Terminal summary exposed once the final round resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub outcome: MatchOutcome,
    pub player_wins: u32,
    pub enemy_wins: u32,
    /// True when the win counts were level and the enemy took it
    pub decided_by_tie_break: bool,
    pub units_used: u32,
    pub abilities_used: u32,
    pub points: i32,
}

/// Something that happened, for presentation and messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Rejected action (transient user message)
    Warning(RuleViolation),
    CharacterSelected(Character),
    UnitPlaced { id: UnitId, lane: usize },
    PlacementUndone { id: UnitId, lane: usize },
    /// Waiting for a lane choice for an ability
    TargetingStarted(Ability),
    /// Lane choice abandoned; nothing was consumed
    TargetingCancelled(Ability),
    LaneFlooded { lane: usize },
    ThreatRevealed { enemy_spawns: u32 },
    Revived { lane: usize, count: u32 },
    NothingToRevive { lane: usize },
    Merged { lane: usize, id: UnitId },
    RoundStarted { round: u32, enemy_spawns: u32 },
    /// The stack-overflow lane is live this round
    HazardAnnounced { lane: usize },
    /// A planned enemy hit the flooded lane and never spawned
    EnemyCrashed { lane: usize },
    GateOpened { gate: usize, holder: UnitId },
    PlatformSurvived { id: UnitId, platform: usize },
    PortalTransform { from: UnitId, to: UnitId, side: Side, lane: usize },
    CollisionResolved { player: UnitId, enemy: UnitId, outcome: CollisionOutcome },
    UnitRemoved { id: UnitId, side: Side, fate: Fate },
    RoundResolved(RoundRecord),
    MatchResolved(MatchSummary),
    CompletionSubmitted { level: u8, points: i32 },
    CompletionFailed(String),
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct MatchState {
    pub config: LevelConfig,
    /// Match seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub phase: GamePhase,
    pub character: Option<Character>,
    /// 1-based current round
    pub round: u32,
    pub player_wins: u32,
    pub enemy_wins: u32,
    /// Units left to deploy for the rest of the match
    pub player_pool: u32,
    pub enemy_pool: u32,
    pub abilities: AbilityFlags,
    /// Player lane occupancy at the end of the previous round
    pub previous_round_lanes: [u32; LANE_COUNT],
    pub plan: SpawnPlan,
    pub units: UnitRegistry,
    pub obstacles: Obstacles,
    pub round_state: RoundState,
    pub history: Vec<RoundRecord>,
    pub summary: Option<MatchSummary>,
    pub scheduler: Scheduler,
    /// Completion already handed to a sink
    pub completion_submitted: bool,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub(crate) events: Vec<GameEvent>,
}

impl MatchState {
    /// Create a match for a level
    pub fn new(config: LevelConfig, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let plan = SpawnPlan::generate(&config, &mut rng);
        let obstacles = Obstacles::from_layout(&config.obstacles);
        log::info!(
            "New match: level {}, {} rounds, {} spawns, seed {}",
            config.level,
            config.total_rounds,
            config.max_spawns,
            seed
        );

        let mut state = Self {
            seed,
            rng,
            phase: GamePhase::AwaitingCharacterSelect,
            character: None,
            round: 1,
            player_wins: 0,
            enemy_wins: 0,
            player_pool: config.max_spawns,
            enemy_pool: config.max_spawns,
            abilities: AbilityFlags::new(config.abilities),
            previous_round_lanes: [0; LANE_COUNT],
            plan,
            units: UnitRegistry::new(),
            obstacles,
            round_state: RoundState::default(),
            history: Vec::new(),
            summary: None,
            scheduler: Scheduler::new(),
            completion_submitted: false,
            time_ticks: 0,
            events: Vec::new(),
            config,
        };
        state.reset_round();
        state
    }

    /// Draw a fresh seed from the match RNG (used for restarts)
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// 0-based index of the current round
    pub fn round_index(&self) -> usize {
        self.round.saturating_sub(1) as usize
    }

    pub fn is_final_round(&self) -> bool {
        self.round >= self.config.total_rounds
    }

    /// Whether the current round is the designated stack-overflow round
    pub fn is_overflow_round(&self) -> bool {
        self.plan.overflow_round() == Some(self.round_index())
    }

    /// Input is locked while a blocking scheduled task is pending
    pub fn interaction_blocked(&self) -> bool {
        self.scheduler.is_blocking()
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Clear the field and per-round counters; fix this round's enemy count
    pub(crate) fn reset_round(&mut self) {
        for id in self.obstacles.reset_round() {
            log::debug!("Gate holder {} leaves the field", id);
        }
        for unit in self.units.take_all() {
            self.push_event(GameEvent::UnitRemoved {
                id: unit.id,
                side: unit.side,
                fate: Fate::RoundReset,
            });
        }

        self.round_state = RoundState {
            planned_enemy_spawns: self.plan.count_for_round(self.round_index()),
            ..Default::default()
        };
    }

    /// Units fielded so far this match
    pub fn units_used(&self) -> u32 {
        self.config.max_spawns - self.player_pool
    }
}
