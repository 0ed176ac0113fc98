pub mod bezier;
pub mod circular_arc;
pub mod distance;

use std::f64::consts::{PI, TAU};

/// 2D vector type used for positions and offsets.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 2D rotation type.
pub type Rotation2 = nalgebra::Rotation2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Returns the direction of `v` in radians.
#[must_use]
pub fn angle_of(v: &Vector2) -> f64 {
    v.y.atan2(v.x)
}

/// Returns the unit vector pointing in direction `angle`.
#[must_use]
pub fn direction(angle: f64) -> Vector2 {
    Vector2::new(angle.cos(), angle.sin())
}

/// Rotates `v` counter-clockwise by `angle` radians.
#[must_use]
pub fn rotate(v: &Vector2, angle: f64) -> Vector2 {
    Rotation2::new(angle) * v
}

/// Linear interpolation between two positions.
#[must_use]
pub fn lerp(a: &Vector2, b: &Vector2, t: f64) -> Vector2 {
    a + (b - a) * t
}

/// Signed smallest rotation from `from` to `to`, in `(-π, π]`.
#[must_use]
pub fn angle_difference(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Mean of two directions, taken along the shorter arc between them.
#[must_use]
pub fn average_angle(a: f64, b: f64) -> f64 {
    a + angle_difference(a, b) * 0.5
}
