//! Level presets and balance tuning
//!
//! Each level is a data-driven bundle of pool sizes, round counts, obstacle
//! layout and enabled abilities. Tuning is persisted separately in LocalStorage
//! so balance can be tweaked without a rebuild.

use serde::{Deserialize, Serialize};

use crate::consts::{CENTER_LANE, LANE_COUNT};
use crate::error::ConfigError;
use crate::platform::storage;
use crate::sim::Ability;

/// How enemy lanes are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EnemyLaneRule {
    /// Every lane equally likely, drawn at match start
    #[default]
    Uniform,
    /// Drawn at round start; avoids the platform lane and empty gate lanes
    Weighted,
    /// Center lane guaranteed, the rest spread over lanes 1..=3, shuffled
    CenterBiased,
}

impl EnemyLaneRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyLaneRule::Uniform => "Uniform",
            EnemyLaneRule::Weighted => "Weighted",
            EnemyLaneRule::CenterBiased => "CenterBiased",
        }
    }
}

/// Which one-shot abilities a level offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AbilitySet {
    pub tactical: bool,
    pub threat_hash: bool,
    pub recursive_call: bool,
    pub merge_protocol: bool,
}

impl AbilitySet {
    pub fn contains(&self, ability: Ability) -> bool {
        match ability {
            Ability::Tactical => self.tactical,
            Ability::ThreatHash => self.threat_hash,
            Ability::RecursiveCall => self.recursive_call,
            Ability::MergeProtocol => self.merge_protocol,
        }
    }
}

/// Obstacle placement for a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObstacleLayout {
    /// Lanes carrying a gate (at most two)
    pub gate_lanes: Vec<usize>,
    /// Number of survival platforms in the center lane (0..=2)
    pub platforms: u8,
    /// Linked portal lanes
    pub portal_lanes: Option<(usize, usize)>,
}

/// Balance values shared by every level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Unit travel speed (field units per second)
    pub unit_speed: f32,
    /// Two opposing units in one lane collide within this depth distance
    pub collision_reach: f32,
    /// Probability a unit dies on a survival platform check
    pub platform_death_chance: f64,
    /// Delay between picking a tactical lane and the round auto-starting
    pub tactical_start_delay_ms: u32,
    /// Input lock after proceeding to the next round
    pub next_round_lock_ms: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            unit_speed: 60.0,
            collision_reach: 30.0,
            platform_death_chance: 0.5,
            tactical_start_delay_ms: 1000,
            next_round_lock_ms: 200,
        }
    }
}

impl Tuning {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "glitch_lanes_tuning";

    /// Load tuning overrides (defaults natively or when nothing is stored)
    pub fn load() -> Self {
        match storage::load_json::<Tuning>(Self::STORAGE_KEY) {
            Some(tuning) => {
                log::info!("Loaded tuning overrides");
                tuning
            }
            None => Self::default(),
        }
    }

    pub fn save(&self) {
        if storage::save_json(Self::STORAGE_KEY, self) {
            log::info!("Tuning saved");
        }
    }
}

/// Complete description of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Level number (1..=5)
    pub level: u8,
    /// Units each side may deploy over the whole match
    pub max_spawns: u32,
    /// Rounds per match
    pub total_rounds: u32,
    /// Maximum player units per lane per round
    pub lane_cap: Option<u32>,
    pub enemy_lanes: EnemyLaneRule,
    pub abilities: AbilitySet,
    pub obstacles: ObstacleLayout,
    /// Two immortal enemies plus one stack-overflow round
    pub enemy_specials: bool,
    #[serde(default)]
    pub tuning: Tuning,
}

impl LevelConfig {
    /// Highest level in the campaign
    pub const MAX_LEVEL: u8 = 5;

    /// Build the preset for a level number
    pub fn preset(level: u8) -> Result<Self, ConfigError> {
        let gated = ObstacleLayout {
            gate_lanes: vec![1, 3],
            platforms: 1,
            portal_lanes: None,
        };
        let full = ObstacleLayout {
            gate_lanes: vec![1, 3],
            platforms: 2,
            portal_lanes: Some((0, LANE_COUNT - 1)),
        };
        let basic_abilities = AbilitySet {
            tactical: true,
            threat_hash: true,
            recursive_call: true,
            merge_protocol: false,
        };
        let all_abilities = AbilitySet {
            merge_protocol: true,
            ..basic_abilities
        };

        let config = match level {
            1 => Self {
                level,
                max_spawns: 7,
                total_rounds: 3,
                lane_cap: None,
                enemy_lanes: EnemyLaneRule::Uniform,
                abilities: AbilitySet {
                    tactical: true,
                    ..Default::default()
                },
                obstacles: ObstacleLayout::default(),
                enemy_specials: false,
                tuning: Tuning::default(),
            },
            2 => Self {
                level,
                max_spawns: 15,
                total_rounds: 3,
                lane_cap: Some(2),
                enemy_lanes: EnemyLaneRule::Weighted,
                abilities: basic_abilities,
                obstacles: gated.clone(),
                enemy_specials: false,
                tuning: Tuning::default(),
            },
            3 => Self {
                level,
                max_spawns: 15,
                total_rounds: 3,
                lane_cap: Some(2),
                enemy_lanes: EnemyLaneRule::Weighted,
                abilities: basic_abilities,
                obstacles: gated,
                enemy_specials: false,
                tuning: Tuning::default(),
            },
            4 => Self {
                level,
                max_spawns: 20,
                total_rounds: 5,
                lane_cap: Some(2),
                enemy_lanes: EnemyLaneRule::CenterBiased,
                abilities: all_abilities,
                obstacles: full.clone(),
                enemy_specials: false,
                tuning: Tuning::default(),
            },
            5 => Self {
                level,
                max_spawns: 25,
                total_rounds: 5,
                lane_cap: Some(2),
                enemy_lanes: EnemyLaneRule::CenterBiased,
                abilities: all_abilities,
                obstacles: full,
                enemy_specials: true,
                tuning: Tuning::default(),
            },
            other => return Err(ConfigError::UnknownLevel(other)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the preset is internally consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level == 0 || self.level > Self::MAX_LEVEL {
            return Err(ConfigError::UnknownLevel(self.level));
        }
        if self.total_rounds == 0 || self.max_spawns < self.total_rounds {
            return Err(ConfigError::TooFewSpawns {
                max_spawns: self.max_spawns,
                rounds: self.total_rounds,
            });
        }
        for &lane in &self.obstacles.gate_lanes {
            if lane >= LANE_COUNT {
                return Err(ConfigError::LaneOutOfRange { what: "gate", lane });
            }
        }
        if let Some((a, b)) = self.obstacles.portal_lanes {
            for lane in [a, b] {
                if lane >= LANE_COUNT {
                    return Err(ConfigError::LaneOutOfRange { what: "portal", lane });
                }
            }
        }
        debug_assert!(CENTER_LANE < LANE_COUNT);
        Ok(())
    }

    /// Lane cap as a usable bound
    pub fn effective_lane_cap(&self) -> u32 {
        self.lane_cap.unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_valid() {
        for level in 1..=LevelConfig::MAX_LEVEL {
            let config = LevelConfig::preset(level).unwrap();
            assert_eq!(config.level, level);
            assert!(config.max_spawns >= config.total_rounds);
        }
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert_eq!(LevelConfig::preset(0), Err(ConfigError::UnknownLevel(0)));
        assert_eq!(LevelConfig::preset(6), Err(ConfigError::UnknownLevel(6)));
    }

    #[test]
    fn test_validate_catches_bad_layout() {
        let mut config = LevelConfig::preset(3).unwrap();
        config.obstacles.gate_lanes.push(9);
        assert_eq!(
            config.validate(),
            Err(ConfigError::LaneOutOfRange { what: "gate", lane: 9 })
        );

        let mut config = LevelConfig::preset(1).unwrap();
        config.max_spawns = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooFewSpawns { .. })
        ));
    }

    #[test]
    fn test_tuning_roundtrips_with_missing_fields() {
        let tuning: Tuning = serde_json::from_str(r#"{"unit_speed": 90.0}"#).unwrap();
        assert_eq!(tuning.unit_speed, 90.0);
        assert_eq!(tuning.platform_death_chance, 0.5);
    }

    #[test]
    fn test_final_level_has_specials_and_caps() {
        let config = LevelConfig::preset(5).unwrap();
        assert!(config.enemy_specials);
        assert_eq!(config.lane_cap, Some(2));
        assert_eq!(config.effective_lane_cap(), 2);
        assert!(config.abilities.contains(Ability::MergeProtocol));
        assert!(!LevelConfig::preset(1).unwrap().abilities.contains(Ability::ThreatHash));
    }
}
