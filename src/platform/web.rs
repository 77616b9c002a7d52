//! Browser binding
//!
//! The page owns the canvas, sprites and buttons. It drives a `WebMatch` from
//! `requestAnimationFrame`, forwards clicks and keys, and draws from the JSON
//! snapshot.

use std::collections::VecDeque;

use wasm_bindgen::prelude::*;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::leaderboard::Leaderboard;
use crate::platform::input;
use crate::renderer::LaneGeometry;
use crate::settings::{LevelConfig, Tuning};
use crate::sim::{GameEvent, InputEvent, MatchState, Snapshot, TickInput, tick};

/// Height reserved for the HUD strip under the field
const HUD_HEIGHT: f32 = 120.0;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Failed to init logger: {e}").into());
    }
    log::info!("Glitch Lanes starting...");
}

/// One match running in the page
#[wasm_bindgen]
pub struct WebMatch {
    state: MatchState,
    leaderboard: Leaderboard,
    geometry: LaneGeometry,
    accumulator: f32,
    /// Discrete inputs, one consumed per tick
    queue: VecDeque<InputEvent>,
    autoplay: bool,
    events: Vec<GameEvent>,
}

#[wasm_bindgen]
impl WebMatch {
    #[wasm_bindgen(constructor)]
    pub fn new(level: u8, seed: f64, width: f32, height: f32) -> Result<WebMatch, JsValue> {
        let mut config = LevelConfig::preset(level).map_err(|e| JsValue::from_str(&e.to_string()))?;
        config.tuning = Tuning::load();
        Ok(Self {
            state: MatchState::new(config, seed as u64),
            leaderboard: Leaderboard::load(),
            geometry: LaneGeometry::new(width, height, HUD_HEIGHT),
            accumulator: 0.0,
            queue: VecDeque::new(),
            autoplay: false,
            events: Vec::new(),
        })
    }

    /// Advance by the wall-clock time since the last frame
    pub fn frame(&mut self, dt_ms: f32) {
        let dt = (dt_ms / 1000.0).clamp(0.0, 0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = TickInput {
                event: self.queue.pop_front(),
                autoplay: self.autoplay,
            };
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        self.state.submit_completion(&mut self.leaderboard);
        self.events.extend(self.state.drain_events());
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.geometry = LaneGeometry::new(width, height, HUD_HEIGHT);
    }

    /// Click or tap at screen x
    pub fn input_pointer(&mut self, x: f32) {
        self.queue
            .push_back(input::pointer_event(&self.geometry, x));
    }

    /// Keyboard shortcut. Returns false for unmapped keys.
    pub fn input_key(&mut self, key: &str) -> bool {
        match input::key_event(key) {
            Some(event) => {
                self.queue.push_back(event);
                true
            }
            None => false,
        }
    }

    pub fn input_character(&mut self, name: &str) -> bool {
        match input::character_from_name(name) {
            Some(character) => {
                self.queue.push_back(InputEvent::SelectCharacter(character));
                true
            }
            None => false,
        }
    }

    /// Restart jumps the queue: pending clicks belong to the old match
    pub fn input_restart(&mut self) {
        self.queue.clear();
        self.queue.push_back(InputEvent::Restart);
    }

    pub fn set_autoplay(&mut self, on: bool) {
        self.autoplay = on;
        log::info!("Autoplay: {}", on);
    }

    pub fn snapshot_json(&self) -> String {
        Snapshot::capture(&self.state).to_json()
    }

    /// Events since the last call, as a JSON array
    pub fn drain_events_json(&mut self) -> String {
        let events = std::mem::take(&mut self.events);
        serde_json::to_string(&events).unwrap_or_else(|_| String::from("[]"))
    }

    /// `[x, y, scale]` for a unit at `(lane, depth)`
    pub fn project(&self, lane: usize, depth: f32) -> Vec<f32> {
        let pos = self.geometry.project(lane, depth);
        vec![pos.x, pos.y, self.geometry.scale_at(depth)]
    }

    /// Overlay trapezoid for a lane as `[x0, y0, .. x3, y3]`
    pub fn lane_quad(&self, lane: usize) -> Vec<f32> {
        self.geometry
            .lane_quad(lane)
            .iter()
            .flat_map(|p| [p.x, p.y])
            .collect()
    }

    /// Apply and persist balance overrides. Missing fields keep their defaults.
    pub fn set_tuning_json(&mut self, json: &str) -> bool {
        match serde_json::from_str::<Tuning>(json) {
            Ok(tuning) => {
                tuning.save();
                self.state.config.tuning = tuning;
                true
            }
            Err(e) => {
                log::warn!("Ignoring tuning override: {}", e);
                false
            }
        }
    }

    pub fn leaderboard_json(&self) -> String {
        serde_json::to_string(&self.leaderboard).unwrap_or_else(|_| String::from("{}"))
    }

    pub fn is_level_unlocked(&self, level: u8) -> bool {
        self.leaderboard.is_unlocked(level)
    }
}
