//! Units and the registry that owns them
//!
//! Every unit on the field lives in exactly one `UnitRegistry`. Other systems
//! refer to units by `UnitId` and never keep copies of their state.

use serde::{Deserialize, Serialize};

use crate::consts::LANE_COUNT;

/// Stable unit identifier (never reused within a match)
pub type UnitId = u32;

/// Which army a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Runs from the home wall toward the horizon
    Player,
    /// Runs from the horizon toward the home wall
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    /// Sign of travel along the depth axis
    pub fn direction(self) -> f32 {
        match self {
            Side::Player => -1.0,
            Side::Enemy => 1.0,
        }
    }
}

/// Why a unit left the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fate {
    /// Reached the far horizon and scored
    Scored,
    /// Lost a collision
    Collided,
    /// Failed a survival platform roll
    PlatformFailed,
    /// Entered a portal and came out as the other side
    PortalTransformed,
    /// Caught in the stack-overflow lane
    Overflowed,
    /// Consumed by merge protocol
    Merged,
    /// Still on the field when the round was reset
    RoundReset,
}

/// Relationship between a unit and a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GateHold {
    /// Moving normally
    #[default]
    Free,
    /// Standing on the pressure plate keeping the gate open
    Holding { gate: usize },
    /// Waiting behind a closed gate
    Queued { gate: usize },
}

/// Named status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnitFlags {
    /// Enemy that survives every standard collision
    pub immortal: bool,
    /// Player produced by merge protocol; wins every collision
    pub merged: bool,
    /// Enemy spawned in the stack-overflow lane during its round
    pub hazard: bool,
    /// Player detected in the overflow lane, destroyed on the following tick
    pub overflow_victim: bool,
    /// Came out of a portal; portals ignore it
    pub from_portal: bool,
    /// Re-created by recursive call
    pub revived: bool,
    passed_gates: u8,
    checked_platforms: u8,
}

impl UnitFlags {
    /// Flags for an enemy entering from the horizon
    pub fn enemy(immortal: bool, hazard: bool) -> Self {
        Self {
            immortal,
            hazard,
            ..Self::default()
        }
    }

    pub fn merged() -> Self {
        Self {
            merged: true,
            ..Self::default()
        }
    }

    pub fn revived() -> Self {
        Self {
            revived: true,
            ..Self::default()
        }
    }

    /// A unit created by a portal starts with clean gate and platform history
    pub fn portal_born() -> Self {
        Self {
            from_portal: true,
            ..Self::default()
        }
    }

    pub fn passed_gate(&self, gate: usize) -> bool {
        self.passed_gates & (1 << gate) != 0
    }

    pub fn mark_passed_gate(&mut self, gate: usize) {
        self.passed_gates |= 1 << gate;
    }

    /// Whether this unit already rolled on the given platform
    pub fn checked_platform(&self, platform: usize) -> bool {
        self.checked_platforms & (1 << platform) != 0
    }

    pub fn mark_checked_platform(&mut self, platform: usize) {
        self.checked_platforms |= 1 << platform;
    }
}

/// A unit on the field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub side: Side,
    pub lane: usize,
    /// Depth coordinate: 0 is the horizon, FIELD_DEPTH the home wall
    pub y: f32,
    pub gate: GateHold,
    pub flags: UnitFlags,
    /// Set once the unit is destroyed; it stops colliding immediately and is
    /// swept from the registry at the end of the tick
    pub fate: Option<Fate>,
}

impl Unit {
    pub fn is_active(&self) -> bool {
        self.fate.is_none()
    }

    /// Active and able to keep moving on its own
    pub fn is_moving(&self) -> bool {
        self.is_active() && self.gate == GateHold::Free
    }

    /// Mark destroyed. Returns false if it was already gone.
    pub fn destroy(&mut self, fate: Fate) -> bool {
        if self.fate.is_some() {
            return false;
        }
        self.fate = Some(fate);
        true
    }
}

/// Owner of every unit in a match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    next_id: UnitId,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            next_id: 1,
        }
    }

    /// Create a unit and return its id
    pub fn spawn(&mut self, side: Side, lane: usize, y: f32, flags: UnitFlags) -> UnitId {
        assert!(lane < LANE_COUNT, "lane {lane} out of range");
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.units.push(Unit {
            id,
            side,
            lane,
            y,
            gate: GateHold::Free,
            flags,
            fate: None,
        });
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Mark a unit destroyed. Returns false if unknown or already destroyed.
    pub fn destroy(&mut self, id: UnitId, fate: Fate) -> bool {
        self.get_mut(id).is_some_and(|u| u.destroy(fate))
    }

    /// Destroy and drop a unit right away (used outside the tick loop)
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        let idx = self.units.iter().position(|u| u.id == id)?;
        Some(self.units.remove(idx))
    }

    /// Remove destroyed units and hand them back for reporting
    pub fn sweep(&mut self) -> Vec<Unit> {
        let (gone, kept): (Vec<_>, Vec<_>) = self.units.drain(..).partition(|u| !u.is_active());
        self.units = kept;
        gone
    }

    /// Remove every unit, handing them back (round reset)
    pub fn take_all(&mut self) -> Vec<Unit> {
        std::mem::take(&mut self.units)
    }

    /// Ids of active units of a side in a lane, oldest first
    pub fn active_in_lane(&self, side: Side, lane: usize) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.is_active() && u.side == side && u.lane == lane)
            .map(|u| u.id)
            .collect()
    }

    /// Active units of a side that can still move
    pub fn moving_count(&self, side: Side) -> usize {
        self.units
            .iter()
            .filter(|u| u.side == side && u.is_moving())
            .count()
    }

    pub fn active_count(&self, side: Side) -> usize {
        self.units
            .iter()
            .filter(|u| u.side == side && u.is_active())
            .count()
    }

    /// Keep iteration order stable (by id)
    pub fn normalize_order(&mut self) {
        self.units.sort_by_key(|u| u.id);
    }
}
