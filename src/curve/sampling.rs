use crate::math::{self, bezier, Vector2, TOLERANCE};
use crate::path::PathPoint;

use super::{to_bezier_segments, PathType};

/// Minimum turn at a segment join, in radians, for the join to count as red.
const RED_TURN_THRESHOLD: f64 = 1e-3;

/// Samples the curve into path points.
///
/// Segment joins where the direction changes are marked red. Consecutive
/// duplicate samples are dropped. Metrics are not computed here.
#[must_use]
pub fn sample_curve(path_type: PathType, control_points: &[Vector2], tolerance: f64) -> Vec<PathPoint> {
    let segments = to_bezier_segments(path_type, control_points);
    let mut points: Vec<PathPoint> = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let red_join = i > 0 && is_corner(&segments[i - 1], segment);
        for (j, pos) in bezier::flatten(segment, tolerance).into_iter().enumerate() {
            if let Some(last) = points.last_mut() {
                if (last.pos - pos).norm_squared() < TOLERANCE * TOLERANCE {
                    if j == 0 && red_join {
                        last.red = true;
                    }
                    continue;
                }
            }
            points.push(PathPoint::new(pos, j == 0 && red_join));
        }
    }

    points
}

/// Arc length of the curve described by the control points.
#[must_use]
pub fn geometric_length(path_type: PathType, control_points: &[Vector2], tolerance: f64) -> f64 {
    to_bezier_segments(path_type, control_points)
        .iter()
        .map(|s| bezier::length(s, tolerance))
        .sum()
}

fn is_corner(incoming: &[Vector2], outgoing: &[Vector2]) -> bool {
    match (end_tangent(incoming), start_tangent(outgoing)) {
        (Some(a), Some(b)) => {
            math::angle_difference(math::angle_of(&a), math::angle_of(&b)).abs() > RED_TURN_THRESHOLD
        }
        _ => false,
    }
}

fn start_tangent(segment: &[Vector2]) -> Option<Vector2> {
    let first = segment.first()?;
    segment
        .iter()
        .map(|p| p - first)
        .find(|d| d.norm_squared() > TOLERANCE * TOLERANCE)
}

fn end_tangent(segment: &[Vector2]) -> Option<Vector2> {
    let last = segment.last()?;
    segment
        .iter()
        .rev()
        .map(|p| last - p)
        .find(|d| d.norm_squared() > TOLERANCE * TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_corners_are_red() {
        let pts = sample_curve(
            PathType::Linear,
            &[
                Vector2::new(0.0, 0.0),
                Vector2::new(100.0, 0.0),
                Vector2::new(200.0, 0.0),
                Vector2::new(200.0, 100.0),
            ],
            0.1,
        );
        assert_eq!(pts.len(), 4);
        let reds: Vec<bool> = pts.iter().map(|p| p.red).collect();
        assert_eq!(reds, vec![false, false, true, false]);
    }

    #[test]
    fn smooth_arc_has_no_red_points() {
        let pts = sample_curve(
            PathType::PerfectCurve,
            &[
                Vector2::new(0.0, 0.0),
                Vector2::new(50.0, 50.0),
                Vector2::new(100.0, 0.0),
            ],
            0.1,
        );
        assert!(pts.len() > 10);
        assert!(pts.iter().all(|p| !p.red));
    }

    #[test]
    fn geometric_length_of_polyline() {
        let len = geometric_length(
            PathType::Linear,
            &[Vector2::new(0.0, 0.0), Vector2::new(30.0, 40.0), Vector2::new(30.0, 0.0)],
            0.1,
        );
        assert_relative_eq!(len, 90.0);
    }

    #[test]
    fn semicircle_length() {
        let len = geometric_length(
            PathType::PerfectCurve,
            &[
                Vector2::new(0.0, 0.0),
                Vector2::new(50.0, 50.0),
                Vector2::new(100.0, 0.0),
            ],
            0.01,
        );
        assert_relative_eq!(len, std::f64::consts::PI * 50.0, max_relative = 1e-3);
    }
}
