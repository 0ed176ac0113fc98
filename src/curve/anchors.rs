use crate::math::circular_arc::CircularArc;
use crate::math::{Vector2, TOLERANCE};

use super::PathType;

/// Converts control points of the given type into Bézier segments.
///
/// Consecutive segments share their boundary point. A `PerfectCurve` that is
/// not exactly three non-collinear points falls back to `Bezier`, and a curve
/// with fewer than two points yields a single degenerate segment.
#[must_use]
pub fn to_bezier_segments(path_type: PathType, points: &[Vector2]) -> Vec<Vec<Vector2>> {
    if points.len() < 2 {
        return if points.is_empty() {
            Vec::new()
        } else {
            vec![points.to_vec()]
        };
    }

    match path_type {
        PathType::Linear => linear_segments(points),
        PathType::PerfectCurve => perfect_curve_segments(points),
        PathType::Bezier => bezier_segments(points),
        PathType::Catmull => catmull_segments(points),
    }
}

fn same_point(a: &Vector2, b: &Vector2) -> bool {
    (a - b).norm_squared() < TOLERANCE * TOLERANCE
}

fn linear_segments(points: &[Vector2]) -> Vec<Vec<Vector2>> {
    let segments: Vec<Vec<Vector2>> = points
        .windows(2)
        .filter(|w| !same_point(&w[0], &w[1]))
        .map(<[Vector2]>::to_vec)
        .collect();
    if segments.is_empty() {
        vec![vec![points[0], points[0]]]
    } else {
        segments
    }
}

fn perfect_curve_segments(points: &[Vector2]) -> Vec<Vec<Vector2>> {
    match points {
        [a, b] => linear_segments(&[*a, *b]),
        [a, b, c] => match CircularArc::through(a, b, c) {
            Some(arc) => {
                let mut segments: Vec<Vec<Vector2>> =
                    arc.to_cubic_beziers().iter().map(|c| c.to_vec()).collect();
                // Pin the endpoints to the exact control points.
                if let Some(first) = segments.first_mut() {
                    first[0] = *a;
                }
                if let Some(last) = segments.last_mut() {
                    last[3] = *c;
                }
                segments
            }
            None => bezier_segments(points),
        },
        _ => bezier_segments(points),
    }
}

fn bezier_segments(points: &[Vector2]) -> Vec<Vec<Vector2>> {
    let mut segments = Vec::new();
    let mut current = vec![points[0]];

    for pair in points.windows(2) {
        if same_point(&pair[0], &pair[1]) {
            if current.len() >= 2 {
                segments.push(std::mem::replace(&mut current, vec![pair[1]]));
            }
            continue;
        }
        current.push(pair[1]);
    }

    if current.len() >= 2 {
        segments.push(current);
    }
    if segments.is_empty() {
        segments.push(vec![points[0], points[0]]);
    }
    segments
}

fn catmull_segments(points: &[Vector2]) -> Vec<Vec<Vector2>> {
    let n = points.len();
    let mut segments = Vec::with_capacity(n - 1);

    for i in 0..n - 1 {
        let v1 = if i > 0 { points[i - 1] } else { points[i] };
        let v2 = points[i];
        let v3 = points[i + 1];
        let v4 = if i + 2 < n {
            points[i + 2]
        } else {
            v3 * 2.0 - v2
        };

        if same_point(&v2, &v3) {
            continue;
        }
        segments.push(vec![v2, v2 + (v3 - v1) / 6.0, v3 - (v4 - v2) / 6.0, v3]);
    }

    if segments.is_empty() {
        segments.push(vec![points[0], points[0]]);
    }
    segments
}
