//! # arcade_math
//!
//! Math primitives for the arcade object runtime. Re-exports [`glam`] for
//! vector algebra and defines the 2D spatial types the runtime works with.

pub mod angle;
pub mod rect;

// Re-export glam types for convenience.
pub use glam::Vec2;

pub use angle::{deg_to_rad, direction, rad_to_deg, wrap_angle};
pub use rect::Rect;
