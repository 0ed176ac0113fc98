use std::f64::consts::TAU;

use crate::curve::PathType;
use crate::math::circular_arc::CircularArc;
use crate::math::{bezier, Vector2, TOLERANCE};
use crate::path::DistanceRelation;

use super::template::{TumourSize, TumourTemplate};

/// Target spacing between samples on curved templates, in path units.
const DETAIL_SPACING: f64 = 4.0;

/// Upper bound on the detail any built-in template asks for.
const MAX_DETAIL: usize = 256;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn detail_for_length(length: f64, min: usize) -> usize {
    let n = (length / DETAIL_SPACING).ceil();
    if n.is_finite() && n > 0.0 {
        (n as usize).clamp(min, MAX_DETAIL)
    } else {
        min
    }
}

/// Isosceles triangle with its apex at the middle of the base.
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangle;

impl TumourTemplate for Triangle {
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2 {
        Vector2::new(0.0, size.width * (1.0 - (2.0 * t - 1.0).abs()))
    }

    fn detail_level(&self, _size: &TumourSize) -> usize {
        2
    }

    fn critical_points(&self, _size: &TumourSize) -> Vec<f64> {
        vec![0.5]
    }

    fn reconstruction_hint(&self, size: &TumourSize) -> Vec<Vector2> {
        vec![
            Vector2::zeros(),
            Vector2::new(size.length * 0.5, size.width),
            Vector2::new(size.length, 0.0),
        ]
    }
}

/// Rectangle standing on the base. `t` runs along its outline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl Square {
    /// Outline fractions of the two top corners.
    fn corners(size: &TumourSize) -> Option<(f64, f64)> {
        let perimeter = 2.0 * size.width.abs() + size.length;
        if perimeter <= TOLERANCE {
            return None;
        }
        let side = size.width.abs() / perimeter;
        Some((side, 1.0 - side))
    }
}

impl TumourTemplate for Square {
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2 {
        let Some((c0, c1)) = Self::corners(size) else {
            return Vector2::zeros();
        };
        let outline = if t < c0 {
            Vector2::new(0.0, size.width * t / c0)
        } else if t <= c1 {
            let along = if c1 > c0 { (t - c0) / (c1 - c0) } else { 0.5 };
            Vector2::new(along * size.length, size.width)
        } else {
            Vector2::new(size.length, size.width * (1.0 - t) / (1.0 - c1))
        };
        outline - Vector2::new(t * size.length, 0.0)
    }

    fn detail_level(&self, _size: &TumourSize) -> usize {
        3
    }

    fn critical_points(&self, size: &TumourSize) -> Vec<f64> {
        Self::corners(size).map_or_else(Vec::new, |(c0, c1)| vec![c0, c1])
    }

    fn reconstruction_hint(&self, size: &TumourSize) -> Vec<Vector2> {
        vec![
            Vector2::zeros(),
            Vector2::new(0.0, size.width),
            Vector2::new(size.length, size.width),
            Vector2::new(size.length, 0.0),
        ]
    }
}

/// Circular arc from the base start through the apex to the base end.
#[derive(Debug, Clone, Copy, Default)]
pub struct Circle;

impl Circle {
    fn arc(size: &TumourSize) -> Option<CircularArc> {
        CircularArc::through(
            &Vector2::zeros(),
            &Vector2::new(size.length * 0.5, size.width),
            &Vector2::new(size.length, 0.0),
        )
    }
}

impl TumourTemplate for Circle {
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2 {
        Self::arc(size).map_or_else(Vector2::zeros, |arc| {
            arc.point_at(t) - Vector2::new(t * size.length, 0.0)
        })
    }

    fn detail_level(&self, size: &TumourSize) -> usize {
        detail_for_length(Self::arc(size).map_or(size.length, |a| a.length()), 4)
    }

    fn critical_points(&self, _size: &TumourSize) -> Vec<f64> {
        vec![0.5]
    }

    fn reconstruction_hint(&self, size: &TumourSize) -> Vec<Vector2> {
        vec![
            Vector2::zeros(),
            Vector2::new(size.length * 0.5, size.width),
            Vector2::new(size.length, 0.0),
        ]
    }

    fn reconstruction_path_type(&self) -> PathType {
        PathType::PerfectCurve
    }
}

/// Parabolic bump. `t` is the quadratic Bézier parameter, not arc length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parabola;

impl TumourTemplate for Parabola {
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2 {
        Vector2::new(0.0, 4.0 * size.width * t * (1.0 - t))
    }

    fn detail_level(&self, size: &TumourSize) -> usize {
        detail_for_length(bezier::length(&self.reconstruction_hint(size), 1.0), 4)
    }

    fn critical_points(&self, _size: &TumourSize) -> Vec<f64> {
        vec![0.5]
    }

    fn reconstruction_hint(&self, size: &TumourSize) -> Vec<Vector2> {
        vec![
            Vector2::zeros(),
            Vector2::new(size.length * 0.5, 2.0 * size.width),
            Vector2::new(size.length, 0.0),
        ]
    }

    fn reconstruction_path_type(&self) -> PathType {
        PathType::Bezier
    }

    fn distance_relation(&self, size: &TumourSize) -> Option<DistanceRelation> {
        DistanceRelation::from_bezier(&self.reconstruction_hint(size), 64).ok()
    }
}

/// Sine wave with `parameter` periods along the base. Has no compact form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wave;

impl Wave {
    fn periods(size: &TumourSize) -> f64 {
        if size.parameter.is_finite() && size.parameter > 0.0 {
            size.parameter
        } else {
            1.0
        }
    }
}

impl TumourTemplate for Wave {
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2 {
        Vector2::new(0.0, size.width * (TAU * Self::periods(size) * t).sin())
    }

    fn detail_level(&self, size: &TumourSize) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let per_period = (Self::periods(size) * 8.0).ceil() as usize;
        per_period.max(detail_for_length(size.length, 8)).min(MAX_DETAIL)
    }

    fn critical_points(&self, size: &TumourSize) -> Vec<f64> {
        let periods = Self::periods(size);
        (0..)
            .map(|k| (f64::from(k) + 0.5) / (2.0 * periods))
            .take_while(|&t| t < 1.0)
            .take(MAX_DETAIL)
            .collect()
    }

    fn needs_parameter(&self) -> bool {
        true
    }
}
