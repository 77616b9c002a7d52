//! Collision detection and resolution
//!
//! A player and an enemy collide when they share a lane and their depths are
//! within reach. Precedence, first match wins:
//! 1. merged player: enemy destroyed, player survives
//! 2. immortal enemy: player destroyed, enemy survives
//! 3. both in the stack-overflow lane: player destroyed, enemy survives
//! 4. otherwise both destroyed

use serde::{Deserialize, Serialize};

use super::unit::{Fate, Side, Unit, UnitId, UnitRegistry};

/// How a single collision ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionOutcome {
    /// Merged player wins
    PlayerSurvives,
    /// Immortal enemy wins
    EnemySurvives,
    /// Stack-overflow lane kills the player, the enemy keeps going
    Overflow,
    /// Both destroyed
    Mutual,
}

/// Record of one resolved collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub player: UnitId,
    pub enemy: UnitId,
    pub outcome: CollisionOutcome,
}

/// Whether two units touch
pub fn overlaps(a: &Unit, b: &Unit, reach: f32) -> bool {
    a.lane == b.lane && (a.y - b.y).abs() <= reach
}

/// Decide a collision between a player and an enemy
pub fn resolve_pair(player: &Unit, enemy: &Unit, hazard_lane: Option<usize>) -> CollisionOutcome {
    if player.flags.merged {
        CollisionOutcome::PlayerSurvives
    } else if enemy.flags.immortal {
        CollisionOutcome::EnemySurvives
    } else if hazard_lane.is_some_and(|lane| player.lane == lane && enemy.lane == lane) {
        CollisionOutcome::Overflow
    } else {
        CollisionOutcome::Mutual
    }
}

/// Resolve every overlapping pair for this tick.
///
/// Destroyed units are marked immediately, so a unit is never resolved twice in
/// the same tick.
pub fn resolve_collisions(
    units: &mut UnitRegistry,
    reach: f32,
    hazard_lane: Option<usize>,
) -> Vec<Collision> {
    let players: Vec<UnitId> = units
        .iter()
        .filter(|u| u.side == Side::Player && u.is_active())
        .map(|u| u.id)
        .collect();
    let enemies: Vec<UnitId> = units
        .iter()
        .filter(|u| u.side == Side::Enemy && u.is_active())
        .map(|u| u.id)
        .collect();

    let mut collisions = Vec::new();
    for &pid in &players {
        for &eid in &enemies {
            let (Some(player), Some(enemy)) = (units.get(pid), units.get(eid)) else {
                continue;
            };
            if !player.is_active() {
                break;
            }
            if !enemy.is_active() || !overlaps(player, enemy, reach) {
                continue;
            }

            let outcome = resolve_pair(player, enemy, hazard_lane);
            match outcome {
                CollisionOutcome::PlayerSurvives => {
                    units.destroy(eid, Fate::Collided);
                }
                CollisionOutcome::EnemySurvives | CollisionOutcome::Overflow => {
                    units.destroy(pid, Fate::Collided);
                }
                CollisionOutcome::Mutual => {
                    units.destroy(pid, Fate::Collided);
                    units.destroy(eid, Fate::Collided);
                }
            }
            collisions.push(Collision {
                player: pid,
                enemy: eid,
                outcome,
            });
        }
    }
    collisions
}
