//! Enemy spawn planning
//!
//! The plan is drawn once per match: how many enemies arrive each round and,
//! for planned lane rules, which lane each one takes. Rounds consume it through
//! a cursor; the plan itself is never mutated by spawning.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::consts::{CENTER_LANE, LANE_COUNT};
use crate::settings::{EnemyLaneRule, LevelConfig};

/// Number of immortal enemies per match when specials are enabled
pub const IMMORTALS_PER_MATCH: usize = 2;
/// Guaranteed center-lane spawns per round under the center-biased rule
pub const MIN_CENTER_SPAWNS: u32 = 2;
/// Lanes filled round-robin after the center quota
const BIASED_FILL_LANES: [usize; 3] = [1, 2, 3];

/// Lane weights for the weighted rule
const PLATFORM_LANE_WEIGHT: f64 = 0.3;
const EMPTY_GATE_LANE_WEIGHT: f64 = 0.2;

/// One round of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPlan {
    /// Enemies arriving this round
    pub count: u32,
    /// Lane per spawn, in spawn order (empty until resolved for weighted rounds)
    pub lanes: Vec<usize>,
}

/// Identifies a single planned spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnSlot {
    /// 0-based round index
    pub round: usize,
    /// Position in that round's lane list
    pub index: usize,
}

/// Per-match enemy schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPlan {
    rounds: Vec<RoundPlan>,
    immortals: Vec<SpawnSlot>,
    overflow_round: Option<usize>,
}

impl SpawnPlan {
    /// Draw a full plan for a level
    pub fn generate<R: Rng + ?Sized>(config: &LevelConfig, rng: &mut R) -> Self {
        let counts = partition_spawns(config.max_spawns, config.total_rounds, rng);
        let rounds: Vec<RoundPlan> = counts
            .into_iter()
            .map(|count| {
                let lanes = match config.enemy_lanes {
                    EnemyLaneRule::Uniform => uniform_lanes(count, rng),
                    EnemyLaneRule::CenterBiased => center_biased_lanes(count, rng),
                    EnemyLaneRule::Weighted => Vec::new(),
                };
                RoundPlan { count, lanes }
            })
            .collect();

        let (immortals, overflow_round) = if config.enemy_specials {
            let immortals = pick_immortals(&rounds);
            let overflow = rng.random_range(0..rounds.len());
            (immortals, Some(overflow))
        } else {
            (Vec::new(), None)
        };

        log::info!(
            "Spawn plan: {:?} (rule {}, overflow round {:?})",
            rounds.iter().map(|r| r.count).collect::<Vec<_>>(),
            config.enemy_lanes.as_str(),
            overflow_round.map(|r| r + 1),
        );

        Self {
            rounds,
            immortals,
            overflow_round,
        }
    }

    /// Sum over every round
    pub fn total(&self) -> u32 {
        self.rounds.iter().map(|r| r.count).sum()
    }

    /// Planned count for a 0-based round (0 past the end)
    pub fn count_for_round(&self, round: usize) -> u32 {
        self.rounds.get(round).map_or(0, |r| r.count)
    }

    pub fn lanes_for_round(&self, round: usize) -> &[usize] {
        self.rounds.get(round).map_or(&[], |r| r.lanes.as_slice())
    }

    /// Lane for a planned spawn; missing entries fall back to the center lane
    pub fn lane_at(&self, slot: SpawnSlot) -> usize {
        self.lanes_for_round(slot.round)
            .get(slot.index)
            .copied()
            .unwrap_or(CENTER_LANE)
    }

    pub fn is_immortal(&self, slot: SpawnSlot) -> bool {
        self.immortals.contains(&slot)
    }

    pub fn immortals(&self) -> &[SpawnSlot] {
        &self.immortals
    }

    pub fn overflow_round(&self) -> Option<usize> {
        self.overflow_round
    }

    /// Whether the lanes for a round still need to be drawn
    pub fn needs_resolution(&self, round: usize) -> bool {
        self.rounds
            .get(round)
            .is_some_and(|r| r.lanes.is_empty() && r.count > 0)
    }

    /// Fill a weighted round's lanes from the current player layout.
    /// A round is resolved at most once.
    pub fn resolve_weighted<R: Rng + ?Sized>(
        &mut self,
        round: usize,
        player_lanes: &[u32; LANE_COUNT],
        gate_lanes: &[usize],
        rng: &mut R,
    ) {
        if !self.needs_resolution(round) {
            return;
        }
        let count = self.rounds[round].count;
        self.rounds[round].lanes = weighted_lanes(count, player_lanes, gate_lanes, rng);
    }
}

/// Split `total` spawns over `rounds`: one each, then the remainder one at a
/// time into random rounds.
pub fn partition_spawns<R: Rng + ?Sized>(total: u32, rounds: u32, rng: &mut R) -> Vec<u32> {
    if rounds == 0 {
        return Vec::new();
    }
    let base = total.min(rounds);
    let mut counts: Vec<u32> = (0..rounds).map(|i| u32::from(i < base)).collect();
    for _ in 0..total - base {
        let idx = rng.random_range(0..rounds as usize);
        counts[idx] += 1;
    }
    counts
}

/// Every enemy in any lane with equal probability
pub fn uniform_lanes<R: Rng + ?Sized>(count: u32, rng: &mut R) -> Vec<usize> {
    (0..count).map(|_| rng.random_range(0..LANE_COUNT)).collect()
}

/// At least `min(2, count)` center spawns, the rest spread over the inner lanes,
/// shuffled so the order gives nothing away
pub fn center_biased_lanes<R: Rng + ?Sized>(count: u32, rng: &mut R) -> Vec<usize> {
    let center = count.min(MIN_CENTER_SPAWNS) as usize;
    let mut lanes = vec![CENTER_LANE; center];
    lanes.extend(
        (0..count as usize - center).map(|i| BIASED_FILL_LANES[i % BIASED_FILL_LANES.len()]),
    );
    lanes.shuffle(rng);
    lanes
}

/// Weighted draw that steers enemies away from the platform lane and from gate
/// lanes the player left empty (those gates would never open)
pub fn weighted_lanes<R: Rng + ?Sized>(
    count: u32,
    player_lanes: &[u32; LANE_COUNT],
    gate_lanes: &[usize],
    rng: &mut R,
) -> Vec<usize> {
    let mut weights = [1.0f64; LANE_COUNT];
    weights[CENTER_LANE] = PLATFORM_LANE_WEIGHT;
    for &lane in gate_lanes {
        if lane < LANE_COUNT && player_lanes[lane] == 0 {
            weights[lane] = EMPTY_GATE_LANE_WEIGHT;
        }
    }
    let total: f64 = weights.iter().sum();

    (0..count)
        .map(|_| {
            let mut roll = rng.random::<f64>() * total;
            for (lane, &w) in weights.iter().enumerate() {
                if roll < w {
                    return lane;
                }
                roll -= w;
            }
            LANE_COUNT - 1
        })
        .collect()
}

/// First center-lane slot of each round, earliest rounds first, until the
/// match quota is filled
pub fn pick_immortals(rounds: &[RoundPlan]) -> Vec<SpawnSlot> {
    rounds
        .iter()
        .enumerate()
        .filter_map(|(round, plan)| {
            plan.lanes
                .iter()
                .position(|&lane| lane == CENTER_LANE)
                .map(|index| SpawnSlot { round, index })
        })
        .take(IMMORTALS_PER_MATCH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_center_biased_quota() {
        let mut rng = Pcg32::seed_from_u64(7);
        for count in 0..12 {
            let lanes = center_biased_lanes(count, &mut rng);
            assert_eq!(lanes.len(), count as usize);
            let center = lanes.iter().filter(|&&l| l == CENTER_LANE).count() as u32;
            assert!(center >= count.min(MIN_CENTER_SPAWNS));
            assert!(lanes.iter().all(|l| (1..=3).contains(l)));
        }
    }

    #[test]
    fn test_immortals_first_center_slot_per_round() {
        let rounds = vec![
            RoundPlan { count: 3, lanes: vec![1, 2, 2] },
            RoundPlan { count: 1, lanes: vec![3] },
            RoundPlan { count: 2, lanes: vec![2, 1] },
            RoundPlan { count: 2, lanes: vec![2, 2] },
        ];
        let slots = pick_immortals(&rounds);
        assert_eq!(
            slots,
            vec![SpawnSlot { round: 0, index: 1 }, SpawnSlot { round: 2, index: 0 }]
        );
    }

    #[test]
    fn test_plain_levels_have_no_specials() {
        let config = LevelConfig::preset(4).unwrap();
        let mut rng = Pcg32::seed_from_u64(99);
        let plan = SpawnPlan::generate(&config, &mut rng);
        assert!(plan.immortals().is_empty());
        assert_eq!(plan.overflow_round(), None);
    }

    #[test]
    fn test_weighted_round_resolves_once() {
        let config = LevelConfig::preset(2).unwrap();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut plan = SpawnPlan::generate(&config, &mut rng);
        assert!(plan.needs_resolution(0));

        let players = [0, 1, 0, 0, 0];
        plan.resolve_weighted(0, &players, &[1, 3], &mut rng);
        let first = plan.lanes_for_round(0).to_vec();
        assert_eq!(first.len(), plan.count_for_round(0) as usize);

        plan.resolve_weighted(0, &[3, 0, 0, 0, 0], &[1, 3], &mut rng);
        assert_eq!(plan.lanes_for_round(0), first.as_slice());
    }

    #[test]
    fn test_lane_at_falls_back_to_center() {
        let config = LevelConfig::preset(2).unwrap();
        let mut rng = Pcg32::seed_from_u64(5);
        let plan = SpawnPlan::generate(&config, &mut rng);
        assert_eq!(plan.lane_at(SpawnSlot { round: 0, index: 0 }), CENTER_LANE);
    }

    proptest! {
        #[test]
        fn partition_sums_to_total(
            total in 0u32..200,
            rounds in 1u32..8,
            seed in any::<u64>(),
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let counts = partition_spawns(total, rounds, &mut rng);
            prop_assert_eq!(counts.len(), rounds as usize);
            prop_assert_eq!(counts.iter().sum::<u32>(), total);
            if rounds <= total {
                prop_assert!(counts.iter().all(|&c| c >= 1));
            }
        }

        #[test]
        fn final_level_has_two_center_immortals(seed in any::<u64>()) {
            let config = LevelConfig::preset(5).unwrap();
            let mut rng = Pcg32::seed_from_u64(seed);
            let plan = SpawnPlan::generate(&config, &mut rng);
            prop_assert_eq!(plan.total(), config.max_spawns);
            prop_assert_eq!(plan.immortals().len(), IMMORTALS_PER_MATCH);
            for &slot in plan.immortals() {
                prop_assert_eq!(plan.lane_at(slot), CENTER_LANE);
            }
            let overflow = plan.overflow_round();
            prop_assert!(overflow.is_some_and(|r| r < config.total_rounds as usize));
        }

        #[test]
        fn weighted_lanes_stay_in_range(count in 0u32..40, seed in any::<u64>()) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let lanes = weighted_lanes(count, &[0; LANE_COUNT], &[1, 3], &mut rng);
            prop_assert_eq!(lanes.len(), count as usize);
            prop_assert!(lanes.iter().all(|&l| l < LANE_COUNT));
        }
    }
}
