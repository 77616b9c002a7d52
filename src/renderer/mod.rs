//! Presentation helpers
//!
//! Drawing itself happens in the page. This module only knows where things go
//! on screen.

pub mod projection;

pub use projection::LaneGeometry;
