//! Angle conversions. Rotations are stored in radians everywhere.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

#[must_use]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * PI / 180.0
}

#[must_use]
pub fn rad_to_deg(radians: f32) -> f32 {
    radians * 180.0 / PI
}

/// Wrap an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(radians: f32) -> f32 {
    let wrapped = (radians + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Unit vector pointing along `radians` (0 = +x, counter-clockwise).
#[must_use]
pub fn direction(radians: f32) -> Vec2 {
    Vec2::from_angle(radians)
}
