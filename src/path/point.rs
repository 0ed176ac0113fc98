use crate::math::{self, Vector2, TOLERANCE};

/// One sample of a decorated curve.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPoint {
    /// Current, possibly offset, position.
    pub pos: Vector2,
    /// Position before any decoration.
    pub og_pos: Vector2,
    /// Direction of travel arriving at this point, in radians.
    pub pre_angle: f64,
    /// Direction of travel leaving this point, in radians.
    pub post_angle: f64,
    /// Arc length from the path start.
    pub cumulative_length: f64,
    /// Secondary ordering key inside a run of equal `cumulative_length`.
    pub t: Option<f64>,
    /// Hard corner that must stay a sharp direction change.
    pub red: bool,
}

impl PathPoint {
    /// Creates an undecorated point. Metrics are filled in by recalculation.
    #[must_use]
    pub fn new(pos: Vector2, red: bool) -> Self {
        Self {
            pos,
            og_pos: pos,
            pre_angle: 0.0,
            post_angle: 0.0,
            cumulative_length: 0.0,
            t: None,
            red,
        }
    }

    /// Point between `a` and `b` at fraction `f`.
    ///
    /// Angles follow the chord from `a` to `b`; `t` is interpolated only when
    /// both ends carry one. The result is never red.
    #[must_use]
    pub fn lerp(a: &PathPoint, b: &PathPoint, f: f64) -> Self {
        let chord = b.pos - a.pos;
        let angle = if chord.norm_squared() > TOLERANCE * TOLERANCE {
            math::angle_of(&chord)
        } else {
            a.post_angle
        };
        Self {
            pos: math::lerp(&a.pos, &b.pos, f),
            og_pos: math::lerp(&a.og_pos, &b.og_pos, f),
            pre_angle: angle,
            post_angle: angle,
            cumulative_length: a.cumulative_length
                + (b.cumulative_length - a.cumulative_length) * f,
            t: match (a.t, b.t) {
                (Some(ta), Some(tb)) => Some(ta + (tb - ta) * f),
                _ => None,
            },
            red: false,
        }
    }

    /// Mean of the incoming and outgoing directions.
    #[must_use]
    pub fn avg_angle(&self) -> f64 {
        math::average_angle(self.pre_angle, self.post_angle)
    }

    /// Whether this is a red point whose incoming and outgoing directions differ.
    #[must_use]
    pub fn is_sharp_corner(&self) -> bool {
        self.red && math::angle_difference(self.pre_angle, self.post_angle).abs() > 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn lerp_interpolates_metrics() {
        let mut a = PathPoint::new(Vector2::new(0.0, 0.0), false);
        let mut b = PathPoint::new(Vector2::new(10.0, 0.0), true);
        b.cumulative_length = 10.0;
        a.t = Some(0.0);
        b.t = Some(2.0);

        let mid = PathPoint::lerp(&a, &b, 0.25);
        assert_relative_eq!(mid.pos, Vector2::new(2.5, 0.0));
        assert_relative_eq!(mid.cumulative_length, 2.5);
        assert_eq!(mid.t, Some(0.5));
        assert!(!mid.red);
    }

    #[test]
    fn only_red_points_with_turns_are_sharp() {
        let mut p = PathPoint::new(Vector2::zeros(), true);
        p.pre_angle = 0.0;
        p.post_angle = FRAC_PI_2;
        assert!(p.is_sharp_corner());
        assert_relative_eq!(p.avg_angle(), FRAC_PI_2 / 2.0);

        p.red = false;
        assert!(!p.is_sharp_corner());
    }
}
