//! Raw input to game events
//!
//! Clicks resolve to a lane by column; the simulation decides what a lane pick
//! means in the current phase. Keyboard shortcuts mirror the on-screen buttons.

use crate::renderer::LaneGeometry;
use crate::sim::{Ability, Character, InputEvent};

/// A click or tap on the field
pub fn pointer_event(geometry: &LaneGeometry, x: f32) -> InputEvent {
    InputEvent::Target {
        lane: geometry.lane_at(x),
    }
}

/// Map a `KeyboardEvent.key` value
pub fn key_event(key: &str) -> Option<InputEvent> {
    let event = match key {
        " " | "Enter" => InputEvent::StartRound,
        "Backspace" | "u" | "U" => InputEvent::Undo,
        "Escape" => InputEvent::Cancel,
        "n" | "N" => InputEvent::NextRound,
        "t" | "T" => InputEvent::UseAbility(Ability::Tactical),
        "h" | "H" => InputEvent::UseAbility(Ability::ThreatHash),
        "r" | "R" => InputEvent::UseAbility(Ability::RecursiveCall),
        "m" | "M" => InputEvent::UseAbility(Ability::MergeProtocol),
        "1" | "2" | "3" | "4" | "5" => {
            let lane = key.parse::<usize>().ok()? - 1;
            InputEvent::Target { lane }
        }
        _ => return None,
    };
    Some(event)
}

/// Parse a character name coming from the selection panel
pub fn character_from_name(name: &str) -> Option<Character> {
    Character::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(name))
}
