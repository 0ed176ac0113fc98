use std::f64::consts::{FRAC_PI_2, TAU};

use super::{direction, Vector2, TOLERANCE};

/// A circular arc in center-radius-angle form.
///
/// `sweep` is signed: positive is counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularArc {
    pub center: Vector2,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep: f64,
}

impl CircularArc {
    /// Builds the arc that starts at `a`, passes through `b` and ends at `c`.
    ///
    /// Returns `None` when the points are collinear or coincide.
    #[must_use]
    pub fn through(a: &Vector2, b: &Vector2, c: &Vector2) -> Option<Self> {
        let cross = (b - a).perp(&(c - b));
        if cross.abs() < TOLERANCE {
            return None;
        }

        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        let a_sq = a.norm_squared();
        let b_sq = b.norm_squared();
        let c_sq = c.norm_squared();
        let center = Vector2::new(
            (a_sq * (b.y - c.y) + b_sq * (c.y - a.y) + c_sq * (a.y - b.y)) / d,
            (a_sq * (c.x - b.x) + b_sq * (a.x - c.x) + c_sq * (b.x - a.x)) / d,
        );

        let radius = (a - center).norm();
        let start_angle = super::angle_of(&(a - center));
        let end_angle = super::angle_of(&(c - center));

        // A left turn through b means the arc runs counter-clockwise.
        let sweep = if cross > 0.0 {
            (end_angle - start_angle).rem_euclid(TAU)
        } else {
            -(start_angle - end_angle).rem_euclid(TAU)
        };

        Some(Self {
            center,
            radius,
            start_angle,
            sweep,
        })
    }

    /// Point at fraction `t` of the sweep.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Vector2 {
        self.center + direction(self.start_angle + self.sweep * t) * self.radius
    }

    /// Arc length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.radius * self.sweep.abs()
    }

    /// Approximates the arc with cubic Béziers of at most a quarter turn each.
    #[must_use]
    pub fn to_cubic_beziers(&self) -> Vec<[Vector2; 4]> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pieces = ((self.sweep.abs() / FRAC_PI_2).ceil() as u32).max(1);
        let step = self.sweep / f64::from(pieces);
        let k = 4.0 / 3.0 * (step / 4.0).tan() * self.radius;

        (0..pieces)
            .map(|i| {
                let a0 = self.start_angle + step * f64::from(i);
                let a1 = a0 + step;
                let p0 = self.center + direction(a0) * self.radius;
                let p3 = self.center + direction(a1) * self.radius;
                let p1 = p0 + direction(a0 + FRAC_PI_2) * k;
                let p2 = p3 - direction(a1 + FRAC_PI_2) * k;
                [p0, p1, p2, p3]
            })
            .collect()
    }
}
