use crate::curve::PathType;
use crate::error::GeometryError;
use crate::math::{bezier, Vector2};

use super::PointId;

/// Monotonic mapping from arc-length fraction to anchor-parameter fraction.
///
/// Stored as sampled pairs and evaluated by linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRelation {
    samples: Vec<(f64, f64)>,
}

impl DistanceRelation {
    /// Creates a relation from `(arc_fraction, parameter_fraction)` samples.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two samples are given or either
    /// coordinate decreases.
    pub fn new(samples: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        if samples.len() < 2 {
            return Err(GeometryError::Degenerate(
                "distance relation needs at least two samples".into(),
            ));
        }
        let monotonic = samples
            .windows(2)
            .all(|w| w[1].0 >= w[0].0 && w[1].1 >= w[0].1);
        if !monotonic {
            return Err(GeometryError::Degenerate(
                "distance relation must be non-decreasing".into(),
            ));
        }
        Ok(Self { samples })
    }

    /// Samples the arc-length parametrisation of a single Bézier curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve has no length.
    pub fn from_bezier(points: &[Vector2], resolution: u32) -> Result<Self, GeometryError> {
        let resolution = resolution.max(1);
        let params: Vec<f64> = (0..=resolution)
            .map(|i| f64::from(i) / f64::from(resolution))
            .collect();
        let mut lengths = vec![0.0];
        let mut prev = bezier::evaluate(points, 0.0);
        for &u in &params[1..] {
            let p = bezier::evaluate(points, u);
            let last = lengths.last().copied().unwrap_or(0.0);
            lengths.push(last + (p - prev).norm());
            prev = p;
        }
        let total = lengths.last().copied().unwrap_or(0.0);
        if total <= crate::math::TOLERANCE {
            return Err(GeometryError::Degenerate("curve has zero length".into()));
        }
        Self::new(
            lengths
                .iter()
                .zip(&params)
                .map(|(l, &u)| (l / total, u))
                .collect(),
        )
    }

    /// The relation of the same curve traversed end to start.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .rev()
                .map(|&(a, p)| (1.0 - a, 1.0 - p))
                .collect(),
        }
    }

    /// Parameter fraction at arc fraction `arc`.
    #[must_use]
    pub fn parameter_at(&self, arc: f64) -> f64 {
        interpolate(&self.samples, arc, |s| s.0, |s| s.1)
    }

    /// Arc fraction at parameter fraction `parameter`.
    #[must_use]
    pub fn arc_at(&self, parameter: f64) -> f64 {
        interpolate(&self.samples, parameter, |s| s.1, |s| s.0)
    }
}

fn interpolate(
    samples: &[(f64, f64)],
    x: f64,
    key: impl Fn(&(f64, f64)) -> f64,
    value: impl Fn(&(f64, f64)) -> f64,
) -> f64 {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return x;
    };
    if x <= key(first) {
        return value(first);
    }
    if x >= key(last) {
        return value(last);
    }
    let idx = samples.partition_point(|s| key(s) < x).max(1);
    let (a, b) = (&samples[idx - 1], &samples[idx]);
    let span = key(b) - key(a);
    if span <= 0.0 {
        return value(b);
    }
    value(a) + (value(b) - value(a)) * (x - key(a)) / span
}

/// Annotation telling the exporter how to turn a sub-range of the path back
/// into control points.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionHint {
    /// First point of the covered range.
    pub start: PointId,
    /// Last point of the covered range; strictly after `start`.
    pub end: PointId,
    /// Index of the layer that produced this hint; `None` for the initial span.
    pub layer: Option<usize>,
    /// Fixed control points, or `None` to fit the live point positions.
    pub anchors: Option<Vec<Vector2>>,
    /// Curve-fit kind of `anchors`.
    pub path_type: PathType,
    /// Start of the window into `anchors`, as an arc-length fraction.
    pub start_p: f64,
    /// End of the window into `anchors`, as an arc-length fraction.
    pub end_p: f64,
    /// Optional arc-fraction to parameter-fraction mapping for `anchors`.
    pub distance_relation: Option<DistanceRelation>,
    /// Cumulative lengths in the range still follow the template parameter
    /// of the placed shape. Cleared when the path is recalculated.
    pub(crate) lengths_follow_parameter: bool,
}

impl ReconstructionHint {
    /// Creates a hint covering the full window of its anchors.
    #[must_use]
    pub fn new(
        start: PointId,
        end: PointId,
        layer: Option<usize>,
        anchors: Option<Vec<Vector2>>,
        path_type: PathType,
    ) -> Self {
        Self {
            start,
            end,
            layer,
            anchors,
            path_type,
            start_p: 0.0,
            end_p: 1.0,
            distance_relation: None,
            lengths_follow_parameter: false,
        }
    }

    /// Sets the anchor window.
    #[must_use]
    pub fn with_window(mut self, start_p: f64, end_p: f64) -> Self {
        self.start_p = start_p;
        self.end_p = end_p;
        self
    }

    /// Sets the distance relation.
    #[must_use]
    pub fn with_distance_relation(mut self, relation: Option<DistanceRelation>) -> Self {
        self.distance_relation = relation;
        self
    }

    /// Marks the range lengths as following the template parameter.
    #[must_use]
    pub(crate) fn with_parameter_lengths(mut self) -> Self {
        self.lengths_follow_parameter = true;
        self
    }

    /// Copy of this hint moved to `[start, end]`, where `f0` and `f1` are the
    /// fractions of the old range the new boundaries sit at.
    ///
    /// The anchor window is rescaled only when anchors are present. While
    /// the range lengths follow the template parameter, the fractions are
    /// taken in parameter space and mapped back through the relation.
    #[must_use]
    pub(crate) fn trimmed(&self, start: PointId, end: PointId, f0: f64, f1: f64) -> Self {
        let mut hint = self.clone();
        hint.start = start;
        hint.end = end;
        if self.anchors.is_none() {
            return hint;
        }
        match self.distance_relation.as_ref().filter(|_| self.lengths_follow_parameter) {
            Some(relation) => {
                let t0 = relation.parameter_at(self.start_p);
                let t1 = relation.parameter_at(self.end_p);
                hint.start_p = relation.arc_at(t0 + (t1 - t0) * f0);
                hint.end_p = relation.arc_at(t0 + (t1 - t0) * f1);
            }
            None => {
                let span = self.end_p - self.start_p;
                hint.start_p = self.start_p + span * f0;
                hint.end_p = self.start_p + span * f1;
            }
        }
        hint
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn relation_interpolates_both_ways() {
        let rel = DistanceRelation::new(vec![(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]).unwrap();
        assert_relative_eq!(rel.parameter_at(0.25), 0.125);
        assert_relative_eq!(rel.arc_at(0.625), 0.75);
        assert_relative_eq!(rel.parameter_at(2.0), 1.0);
        assert_relative_eq!(rel.arc_at(-1.0), 0.0);

        let rev = rel.reversed();
        assert_relative_eq!(rev.parameter_at(0.5), 0.75);
        assert_relative_eq!(rev.arc_at(0.0), 0.0);
    }

    #[test]
    fn relation_rejects_decreasing_samples() {
        assert!(DistanceRelation::new(vec![(0.0, 0.0), (0.5, 0.6), (1.0, 0.4)]).is_err());
        assert!(DistanceRelation::new(vec![(0.0, 0.0)]).is_err());
    }

    #[test]
    fn bezier_relation_is_symmetric_for_symmetric_curve() {
        let pts = [
            Vector2::new(0.0, 0.0),
            Vector2::new(50.0, 80.0),
            Vector2::new(100.0, 0.0),
        ];
        let rel = DistanceRelation::from_bezier(&pts, 64).unwrap();
        assert_relative_eq!(rel.parameter_at(0.5), 0.5, epsilon = 1e-9);
        assert_relative_eq!(rel.parameter_at(0.0), 0.0);
        assert_relative_eq!(rel.parameter_at(1.0), 1.0);
        // The curve moves fastest near its ends.
        assert!(rel.parameter_at(0.25) < 0.25);
    }

    fn parabola_hint() -> ReconstructionHint {
        let anchors = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(40.0, 40.0),
            Vector2::new(80.0, 0.0),
        ];
        let relation = DistanceRelation::from_bezier(&anchors, 64).unwrap();
        let mut keys = slotmap::SlotMap::<PointId, ()>::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));
        ReconstructionHint::new(a, b, Some(0), Some(anchors), PathType::Bezier)
            .with_distance_relation(Some(relation))
    }

    #[test]
    fn trim_follows_arc_length_after_recalculation() {
        let hint = parabola_hint();
        let trimmed = hint.trimmed(hint.start, hint.end, 0.0, 0.25);
        assert_relative_eq!(trimmed.start_p, 0.0);
        assert_relative_eq!(trimmed.end_p, 0.25);
    }

    #[test]
    fn trim_maps_parameter_lengths_through_relation() {
        let hint = parabola_hint().with_parameter_lengths();
        let relation = hint.distance_relation.clone().unwrap();
        let trimmed = hint.trimmed(hint.start, hint.end, 0.0, 0.25);
        assert_relative_eq!(trimmed.start_p, 0.0);
        assert_relative_eq!(trimmed.end_p, relation.arc_at(0.25), epsilon = 1e-12);
        assert!(trimmed.end_p > 0.25);

        // A second trim composes with the first.
        let again = trimmed.trimmed(hint.start, hint.end, 0.5, 1.0);
        assert_relative_eq!(again.start_p, relation.arc_at(0.125), epsilon = 1e-9);
        assert_relative_eq!(again.end_p, trimmed.end_p, epsilon = 1e-9);
    }
}
