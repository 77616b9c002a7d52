//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage on web, no-op natively)
//! - Input events (screen coordinates to lane targets)
//! - The wasm32 frame loop binding

pub mod input;
pub mod storage;

#[cfg(target_arch = "wasm32")]
pub mod web;
