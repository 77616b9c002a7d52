//! Obstacle interaction rules
//!
//! Applied once per simulation tick: gates (pressure-plate hold-open), survival
//! platforms (one coin flip per unit per platform), portals (side-swapping
//! teleport) and the stack-overflow lane.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::GameEvent;
use super::unit::{Fate, GateHold, Side, Unit, UnitFlags, UnitId, UnitRegistry};
use crate::consts::*;
use crate::settings::ObstacleLayout;

/// A lane gate. Players open it by standing on its plate; enemies queue behind
/// it until it opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub lane: usize,
    /// Depth of the gate bars
    pub gate_y: f32,
    /// Depth of the pressure plate
    pub plate_y: f32,
    pub open: bool,
    pub holder: Option<UnitId>,
}

impl Gate {
    pub fn new(lane: usize) -> Self {
        let gate_y = FIELD_DEPTH * GATE_DEPTH_FRACTION;
        Self {
            lane,
            gate_y,
            plate_y: gate_y + GATE_PLATE_OFFSET,
            open: false,
            holder: None,
        }
    }

    /// Where the holder stands (also the player trigger depth)
    pub fn hold_y(&self) -> f32 {
        self.plate_y + GATE_HOLD_OFFSET
    }

    /// Where enemies wait while the gate is closed
    pub fn queue_y(&self) -> f32 {
        self.gate_y - GATE_QUEUE_OFFSET
    }

    /// Close the gate and release the holder for removal
    pub fn reset(&mut self) -> Option<UnitId> {
        self.open = false;
        self.holder.take()
    }
}

/// A center-lane platform where every crossing unit rolls for survival
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPlatform {
    pub lane: usize,
    pub y: f32,
    pub radius: f32,
}

impl SurvivalPlatform {
    pub fn contains(&self, unit: &Unit) -> bool {
        unit.lane == self.lane && (unit.y - self.y).abs() < self.radius
    }
}

/// One end of a portal pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub lane: usize,
    pub y: f32,
}

impl Portal {
    pub fn contains(&self, unit: &Unit) -> bool {
        unit.lane == self.lane && (unit.y - self.y).abs() <= PORTAL_RADIUS
    }
}

/// Static obstacle set plus per-round gate state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Obstacles {
    pub gates: Vec<Gate>,
    pub platforms: Vec<SurvivalPlatform>,
    pub portals: Option<(Portal, Portal)>,
}

impl Obstacles {
    pub fn from_layout(layout: &ObstacleLayout) -> Self {
        let mid = FIELD_DEPTH / 2.0;
        let platforms = (0..layout.platforms.min(2))
            .map(|i| SurvivalPlatform {
                lane: CENTER_LANE,
                y: mid - f32::from(i) * PLATFORM_SPACING,
                radius: PLATFORM_RADIUS,
            })
            .collect();
        let portals = layout.portal_lanes.map(|(a, b)| {
            let y = mid - PORTAL_OFFSET;
            (Portal { lane: a, y }, Portal { lane: b, y })
        });
        Self {
            gates: layout.gate_lanes.iter().take(2).map(|&l| Gate::new(l)).collect(),
            platforms,
            portals,
        }
    }

    pub fn gate_lanes(&self) -> Vec<usize> {
        self.gates.iter().map(|g| g.lane).collect()
    }

    /// Close every gate; returns the holders that must leave the field
    pub fn reset_round(&mut self) -> Vec<UnitId> {
        self.gates.iter_mut().filter_map(Gate::reset).collect()
    }
}

/// Move a unit one step, honouring its lane gate if there is one
pub fn advance_unit(
    unit: &mut Unit,
    gates: &mut [Gate],
    step: f32,
    events: &mut Vec<GameEvent>,
) {
    let Some(gi) = gates.iter().position(|g| g.lane == unit.lane) else {
        unit.y += unit.side.direction() * step;
        return;
    };
    let gate = &mut gates[gi];

    match unit.side {
        Side::Player => {
            if let GateHold::Holding { .. } = unit.gate {
                unit.y = gate.hold_y();
            } else if !unit.flags.passed_gate(gi) && unit.y <= gate.hold_y() {
                unit.flags.mark_passed_gate(gi);
                if gate.open {
                    unit.y -= step;
                } else {
                    unit.y = gate.hold_y();
                    unit.gate = GateHold::Holding { gate: gi };
                    gate.open = true;
                    gate.holder = Some(unit.id);
                    log::debug!("Unit {} holds gate {} open", unit.id, gi);
                    events.push(GameEvent::GateOpened {
                        gate: gi,
                        holder: unit.id,
                    });
                }
            } else {
                unit.y -= step;
            }
        }
        Side::Enemy => {
            if let GateHold::Queued { .. } = unit.gate {
                if gate.open {
                    unit.gate = GateHold::Free;
                    unit.flags.mark_passed_gate(gi);
                    unit.y += step;
                } else {
                    unit.y = gate.queue_y();
                }
            } else if !unit.flags.passed_gate(gi) && unit.y >= gate.queue_y() {
                if gate.open {
                    unit.flags.mark_passed_gate(gi);
                    unit.y += step;
                } else {
                    unit.y = gate.queue_y();
                    unit.gate = GateHold::Queued { gate: gi };
                }
            } else {
                unit.y += step;
            }
        }
    }
}

/// Roll survival for every unit entering a platform for the first time
pub fn check_platforms<R: Rng + ?Sized>(
    units: &mut UnitRegistry,
    platforms: &[SurvivalPlatform],
    death_chance: f64,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) {
    let death_chance = death_chance.clamp(0.0, 1.0);
    for unit in units.iter_mut() {
        for (pi, platform) in platforms.iter().enumerate() {
            if !unit.is_active() || unit.flags.checked_platform(pi) || !platform.contains(unit) {
                continue;
            }
            unit.flags.mark_checked_platform(pi);
            if rng.random_bool(death_chance) {
                log::debug!("Unit {} fell on platform {}", unit.id, pi);
                unit.destroy(Fate::PlatformFailed);
            } else {
                events.push(GameEvent::PlatformSurvived {
                    id: unit.id,
                    platform: pi,
                });
            }
        }
    }
}

/// Swap units that touch a portal to the other side at the paired portal
pub fn apply_portals(
    units: &mut UnitRegistry,
    portals: Option<&(Portal, Portal)>,
    events: &mut Vec<GameEvent>,
) {
    let Some(&(a, b)) = portals else {
        return;
    };

    let mut transforms: Vec<(UnitId, Side, Portal)> = Vec::new();
    for unit in units.iter_mut() {
        if !unit.is_active() || unit.flags.from_portal {
            continue;
        }
        let exit = if a.contains(unit) {
            b
        } else if b.contains(unit) {
            a
        } else {
            continue;
        };
        unit.destroy(Fate::PortalTransformed);
        transforms.push((unit.id, unit.side.opponent(), exit));
    }

    for (from, side, exit) in transforms {
        let to = units.spawn(side, exit.lane, exit.y, UnitFlags::portal_born());
        log::debug!("Portal: unit {} -> {:?} unit {} in lane {}", from, side, to, exit.lane);
        events.push(GameEvent::PortalTransform {
            from,
            to,
            side,
            lane: exit.lane,
        });
    }
}

/// Stack-overflow lane: a player found in the lane is flagged, and destroyed on
/// the next tick
pub fn apply_overflow(units: &mut UnitRegistry, hazard_lane: Option<usize>) {
    let Some(lane) = hazard_lane else {
        return;
    };
    for unit in units.iter_mut() {
        if unit.side != Side::Player || !unit.is_active() || unit.lane != lane {
            continue;
        }
        if unit.flags.overflow_victim {
            unit.destroy(Fate::Overflowed);
        } else {
            unit.flags.overflow_victim = true;
        }
    }
}
