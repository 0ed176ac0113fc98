use super::Vector2;

/// Maximum recursion depth for adaptive flattening.
const MAX_FLATTEN_DEPTH: u32 = 16;

/// Number of uniform parameter samples used for arc-length lookups.
const ARC_SAMPLES: u32 = 64;

/// Evaluates the curve at parameter `t` with de Casteljau's algorithm.
///
/// The curve has degree `points.len() - 1`.
///
/// Returns the origin for an empty control polygon.
#[must_use]
pub fn evaluate(points: &[Vector2], t: f64) -> Vector2 {
    let mut work = points.to_vec();
    let n = work.len();
    if n == 0 {
        return Vector2::zeros();
    }
    for level in 1..n {
        for i in 0..n - level {
            work[i] = work[i] * (1.0 - t) + work[i + 1] * t;
        }
    }
    work[0]
}

/// Splits the curve at `t`, returning the control points of both halves.
#[must_use]
pub fn split(points: &[Vector2], t: f64) -> (Vec<Vector2>, Vec<Vector2>) {
    let n = points.len();
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    let mut work = points.to_vec();

    for level in 0..n {
        left.push(work[0]);
        right.push(work[n - 1 - level]);
        for i in 0..n - 1 - level {
            work[i] = work[i] * (1.0 - t) + work[i + 1] * t;
        }
    }

    right.reverse();
    (left, right)
}

/// Returns the control points of the portion of the curve between `t0` and `t1`.
#[must_use]
pub fn sub_curve(points: &[Vector2], t0: f64, t1: f64) -> Vec<Vector2> {
    if t1 <= t0 {
        let p = evaluate(points, t0);
        return vec![p; points.len().max(2)];
    }
    let (head, _) = split(points, t1);
    if t0 <= 0.0 {
        return head;
    }
    let (_, tail) = split(&head, t0 / t1);
    tail
}

/// Flattens the curve into a polyline whose chords deviate from the curve by
/// roughly at most `tolerance`. Includes both endpoints.
#[must_use]
pub fn flatten(points: &[Vector2], tolerance: f64) -> Vec<Vector2> {
    match points.len() {
        0 => return Vec::new(),
        1 => return vec![points[0]],
        2 => return points.to_vec(),
        _ => {}
    }

    let mut output = vec![points[0]];
    let mut stack = vec![(points.to_vec(), 0u32)];

    // Depth-first so the output stays ordered: process left halves first.
    while let Some((curve, depth)) = stack.pop() {
        if depth >= MAX_FLATTEN_DEPTH || is_flat(&curve, tolerance) {
            if let Some(last) = curve.last() {
                output.push(*last);
            }
            continue;
        }
        let (left, right) = split(&curve, 0.5);
        stack.push((right, depth + 1));
        stack.push((left, depth + 1));
    }

    output
}

/// Flatness test on the second differences of the control polygon.
fn is_flat(points: &[Vector2], tolerance: f64) -> bool {
    let limit = tolerance * tolerance * 4.0;
    points
        .windows(3)
        .all(|w| (w[0] - w[1] * 2.0 + w[2]).norm_squared() <= limit)
}

/// Approximate arc length of the curve.
#[must_use]
pub fn length(points: &[Vector2], tolerance: f64) -> f64 {
    polyline_length(&flatten(points, tolerance))
}

/// Total length of a polyline.
#[must_use]
pub fn polyline_length(points: &[Vector2]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Finds the parameter whose arc-length fraction along the curve is `fraction`.
#[must_use]
pub fn parameter_at_fraction(points: &[Vector2], fraction: f64) -> f64 {
    if points.len() <= 2 {
        return fraction.clamp(0.0, 1.0);
    }

    let mut lengths = Vec::with_capacity(ARC_SAMPLES as usize + 1);
    let mut prev = evaluate(points, 0.0);
    let mut total = 0.0;
    lengths.push(0.0);
    for i in 1..=ARC_SAMPLES {
        let p = evaluate(points, f64::from(i) / f64::from(ARC_SAMPLES));
        total += (p - prev).norm();
        lengths.push(total);
        prev = p;
    }

    if total <= super::TOLERANCE {
        return fraction.clamp(0.0, 1.0);
    }

    let target = fraction.clamp(0.0, 1.0) * total;
    let idx = lengths.partition_point(|&l| l < target).max(1);
    let (l0, l1) = (lengths[idx - 1], lengths[idx.min(lengths.len() - 1)]);
    let local = if l1 - l0 > super::TOLERANCE {
        (target - l0) / (l1 - l0)
    } else {
        0.0
    };
    #[allow(clippy::cast_precision_loss)]
    let t = ((idx - 1) as f64 + local) / f64::from(ARC_SAMPLES);
    t.clamp(0.0, 1.0)
}
