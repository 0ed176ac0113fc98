use super::Vector2;

/// Returns the minimum distance from `p` to the segment from `a` to `b`.
#[must_use]
pub fn point_to_segment(p: &Vector2, a: &Vector2, b: &Vector2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    if len_sq < 1e-20 {
        return (p - a).norm();
    }

    // Project onto the infinite line, clamp to the segment.
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Simplifies a polyline with the Ramer-Douglas-Peucker algorithm.
///
/// The first and last points are always kept. Returns the indices of the
/// kept points in order.
#[must_use]
pub fn simplify_indices(points: &[Vector2], tolerance: f64) -> Vec<usize> {
    if points.len() < 3 {
        return (0..points.len()).collect();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0, points.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let (a, b) = (&points[lo], &points[hi]);
        let (index, dist) = (lo + 1..hi)
            .map(|i| (i, point_to_segment(&points[i], a, b)))
            .fold((lo, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if dist > tolerance {
            keep[index] = true;
            stack.push((lo, index));
            stack.push((index, hi));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}
