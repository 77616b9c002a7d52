//! Converging-lane perspective projection
//!
//! The five stone paths fan out from a narrow band at the horizon to the full
//! width at the bottom of the play area. Field depth maps linearly onto screen
//! y between the two.

use glam::Vec2;

use crate::consts::{CENTER_LANE, FIELD_DEPTH, LANE_COUNT};

/// Path centers at the horizon, as a fraction of screen width
const TOP_CENTERS: [f32; LANE_COUNT] = [0.31, 0.375, 0.5, 0.628, 0.695];
/// Path centers at the bottom edge
const BOTTOM_CENTERS: [f32; LANE_COUNT] = [0.15, 0.29, 0.5, 0.69, 0.81];
/// Path width at the horizon / bottom (fraction of screen width)
const TOP_WIDTH: f32 = 0.035;
const BOTTOM_WIDTH: f32 = 0.10;
/// Overlays on the center lane are drawn wider
const CENTER_OVERLAY_SCALE: f32 = 1.5;

/// Sprite scale at the horizon and at the bottom
const FAR_SCALE: f32 = 0.45;
const NEAR_SCALE: f32 = 1.1;

/// Screen-space layout of the lanes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneGeometry {
    pub width: f32,
    /// Screen y of the horizon (field depth 0)
    pub horizon_y: f32,
    /// Screen y of the home wall (field depth FIELD_DEPTH)
    pub bottom_y: f32,
}

impl LaneGeometry {
    /// Horizon at mid-screen, play area ending `hud_height` above the bottom
    pub fn new(width: f32, height: f32, hud_height: f32) -> Self {
        Self {
            width,
            horizon_y: height * 0.5,
            bottom_y: (height - hud_height).max(height * 0.5 + 1.0),
        }
    }

    /// 0 at the horizon, 1 at the home wall
    fn depth_t(depth: f32) -> f32 {
        (depth / FIELD_DEPTH).clamp(0.0, 1.0)
    }

    /// Screen position of a unit
    pub fn project(&self, lane: usize, depth: f32) -> Vec2 {
        let lane = lane.min(LANE_COUNT - 1);
        let t = Self::depth_t(depth);
        let top = TOP_CENTERS[lane] * self.width;
        let bottom = BOTTOM_CENTERS[lane] * self.width;
        Vec2::new(
            top + (bottom - top) * t,
            self.horizon_y + (self.bottom_y - self.horizon_y) * t,
        )
    }

    /// Sprite scale at a depth (smaller toward the horizon)
    pub fn scale_at(&self, depth: f32) -> f32 {
        FAR_SCALE + (NEAR_SCALE - FAR_SCALE) * Self::depth_t(depth)
    }

    /// Trapezoid covering a whole lane (for the water and hazard overlays),
    /// clockwise from the top-left
    pub fn lane_quad(&self, lane: usize) -> [Vec2; 4] {
        let lane = lane.min(LANE_COUNT - 1);
        let widen = if lane == CENTER_LANE {
            CENTER_OVERLAY_SCALE
        } else {
            1.0
        };
        let top = TOP_CENTERS[lane] * self.width;
        let bottom = BOTTOM_CENTERS[lane] * self.width;
        let top_half = TOP_WIDTH * self.width * widen / 2.0;
        let bottom_half = BOTTOM_WIDTH * self.width * widen / 2.0;
        [
            Vec2::new(top - top_half, self.horizon_y),
            Vec2::new(top + top_half, self.horizon_y),
            Vec2::new(bottom + bottom_half, self.bottom_y),
            Vec2::new(bottom - bottom_half, self.bottom_y),
        ]
    }

    /// Column hit-test: equal-width columns, clamped to the lane range
    pub fn lane_at(&self, x: f32) -> usize {
        if self.width <= 0.0 || !x.is_finite() || x <= 0.0 {
            return 0;
        }
        let column = (x / (self.width / LANE_COUNT as f32)) as usize;
        column.min(LANE_COUNT - 1)
    }
}
