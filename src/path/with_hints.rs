use tracing::trace;

use crate::curve::{sampling, PathType};
use crate::error::{PathError, Result};
use crate::math::Vector2;

use super::{Path, PointId, ReconstructionHint};

/// Fractions closer than this to an existing point do not get a new point.
const CRITICAL_POINT_TOLERANCE: f64 = 1e-6;

/// A path together with reconstruction hints that partition it.
///
/// The hints are ordered; the first starts at the first point, the last ends
/// at the last point, and each hint ends where the next begins. Every
/// mutation keeps this partition intact.
#[derive(Debug, Clone)]
pub struct PathWithHints {
    path: Path,
    hints: Vec<ReconstructionHint>,
}

impl PathWithHints {
    /// Wraps `path` with a single full-span hint that has no anchors.
    ///
    /// Paths with fewer than two points get no hints, since there is no
    /// range to partition.
    #[must_use]
    pub fn new(path: Path) -> Self {
        let hints = match (path.first(), path.last()) {
            (Some(first), Some(last)) if first != last => vec![ReconstructionHint::new(
                first,
                last,
                None,
                None,
                PathType::Bezier,
            )],
            _ => Vec::new(),
        };
        Self { path, hints }
    }

    /// Samples a curve and wraps the result with a full-span hint.
    #[must_use]
    pub fn from_curve(path_type: PathType, control_points: &[Vector2], tolerance: f64) -> Self {
        let points = sampling::sample_curve(path_type, control_points, tolerance);
        Self::new(Path::from_points(points))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutable access to the points.
    ///
    /// Moving or inserting points cannot break the partition, since hints
    /// refer to stable handles.
    pub fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }

    #[must_use]
    pub fn hints(&self) -> &[ReconstructionHint] {
        &self.hints
    }

    #[must_use]
    pub fn into_parts(self) -> (Path, Vec<ReconstructionHint>) {
        (self.path, self.hints)
    }

    /// Refreshes lengths, angles and run keys. Hint boundaries do not move.
    pub fn recalculate(&mut self) {
        self.path.recalculate();
        for hint in &mut self.hints {
            hint.lengths_follow_parameter = false;
        }
    }

    /// Inserts `hint`, trimming, splitting or removing the hints it overlaps.
    ///
    /// Trimmed hints with anchors get their anchor window rescaled to the
    /// fraction of their original span that remains.
    ///
    /// # Errors
    ///
    /// - [`PathError::PointNotFound`] if either boundary is not in the path
    /// - [`PathError::EmptyRange`] if `start == end`
    /// - [`PathError::InvalidRange`] if `end` comes before `start`
    /// - [`PathError::InconsistentT`] if a zero-length range has partial keys
    pub fn add_reconstruction_hint(&mut self, hint: ReconstructionHint) -> Result<()> {
        if !self.path.contains(hint.start) || !self.path.contains(hint.end) {
            return Err(PathError::PointNotFound.into());
        }
        if hint.start == hint.end {
            return Err(PathError::EmptyRange.into());
        }

        let index = self.path.index_map();
        let position = |id: PointId| index.get(id).copied().ok_or(PathError::PointNotFound);
        let (s, e) = (position(hint.start)?, position(hint.end)?);
        if s > e {
            return Err(PathError::InvalidRange("hint end comes before its start".into()).into());
        }

        let mut result = Vec::with_capacity(self.hints.len() + 2);
        for existing in &self.hints {
            let (hs, he) = (position(existing.start)?, position(existing.end)?);

            if he <= s || hs >= e {
                result.push(existing.clone());
            } else if hs >= s && he <= e {
                trace!(layer = ?existing.layer, "hint covered by new hint, removed");
            } else if hs < s && he > e {
                let f0 = self.path.fraction_between(existing.start, existing.end, hint.start)?;
                let f1 = self.path.fraction_between(existing.start, existing.end, hint.end)?;
                result.push(existing.trimmed(existing.start, hint.start, 0.0, f0));
                result.push(existing.trimmed(hint.end, existing.end, f1, 1.0));
                trace!(layer = ?existing.layer, f0, f1, "hint split around new hint");
            } else if hs < s {
                let f = self.path.fraction_between(existing.start, existing.end, hint.start)?;
                result.push(existing.trimmed(existing.start, hint.start, 0.0, f));
            } else {
                let f = self.path.fraction_between(existing.start, existing.end, hint.end)?;
                result.push(existing.trimmed(hint.end, existing.end, f, 1.0));
            }
        }

        trace!(layer = ?hint.layer, start = s, end = e, anchored = hint.anchors.is_some(), "adding hint");
        result.push(hint);
        result.sort_by_key(|h| index.get(h.start).copied().unwrap_or(usize::MAX));
        self.hints = result;
        Ok(())
    }

    /// Checks that the hints exactly partition the path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidRange`] describing the first violation.
    pub fn validate(&self) -> std::result::Result<(), PathError> {
        let (Some(first), Some(last)) = (self.path.first(), self.path.last()) else {
            return if self.hints.is_empty() {
                Ok(())
            } else {
                Err(PathError::InvalidRange("hints on an empty path".into()))
            };
        };
        if first == last {
            return if self.hints.is_empty() {
                Ok(())
            } else {
                Err(PathError::InvalidRange("hints on a single-point path".into()))
            };
        }

        let index = self.path.index_map();
        let (Some(head), Some(tail)) = (self.hints.first(), self.hints.last()) else {
            return Err(PathError::InvalidRange("path has no hints".into()));
        };
        if head.start != first {
            return Err(PathError::InvalidRange("first hint does not start at the path start".into()));
        }
        if tail.end != last {
            return Err(PathError::InvalidRange("last hint does not end at the path end".into()));
        }
        for hint in &self.hints {
            match (index.get(hint.start), index.get(hint.end)) {
                (Some(s), Some(e)) if s < e => {}
                _ => return Err(PathError::InvalidRange("hint range is empty or reversed".into())),
            }
        }
        for pair in self.hints.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(PathError::InvalidRange("gap or overlap between hints".into()));
            }
        }
        Ok(())
    }

    /// Ensures `[start, end]` has at least `detail` segments by splitting
    /// segments evenly. Returns the number of points added.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is invalid.
    pub fn subdivide(&mut self, start: PointId, end: PointId, detail: usize) -> Result<usize> {
        let ids = self.path.range_ids(start, end)?;
        if ids.len() > detail || start == end {
            return Ok(0);
        }

        let fractions = self.fractions(start, end, &ids)?;
        #[allow(clippy::cast_precision_loss)]
        let detail_f = detail as f64;
        let mut added = 0;
        for (pair, f) in ids.windows(2).zip(fractions.windows(2)) {
            let span = f[1] - f[0];
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pieces = ((span * detail_f - 1e-9).ceil().max(1.0)) as usize;
            // Insert back to front; each new point splits `pair[0]` and the
            // point inserted just before it.
            for k in (1..pieces).rev() {
                #[allow(clippy::cast_precision_loss)]
                let local = k as f64 / (k + 1) as f64;
                self.path.insert_interpolated(pair[0], local)?;
                added += 1;
            }
        }
        Ok(added)
    }

    /// Inserts real points at each fractional position of `[start, end]`
    /// that is not already close to an existing point. Returns the number of
    /// points added.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is invalid.
    pub fn ensure_critical_points(
        &mut self,
        start: PointId,
        end: PointId,
        critical: &[f64],
    ) -> Result<usize> {
        if start == end {
            return Ok(0);
        }
        let mut added = 0;
        for &target in critical {
            if !(0.0..=1.0).contains(&target) {
                continue;
            }
            let ids = self.path.range_ids(start, end)?;
            let fractions = self.fractions(start, end, &ids)?;
            if fractions
                .iter()
                .any(|f| (f - target).abs() <= CRITICAL_POINT_TOLERANCE)
            {
                continue;
            }
            let Some(i) = fractions.windows(2).position(|w| w[0] < target && target < w[1]) else {
                continue;
            };
            let local = (target - fractions[i]) / (fractions[i + 1] - fractions[i]);
            self.path.insert_interpolated(ids[i], local)?;
            added += 1;
        }
        Ok(added)
    }

    /// Inserts a point `distance` before `start` and after `end` when the
    /// neighbouring segment is longer than twice that, so the surrounding
    /// curve keeps a sample close to the range. Returns the number of points
    /// added.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is not in the path.
    pub fn ensure_local_curvature(
        &mut self,
        start: PointId,
        end: PointId,
        distance: f64,
    ) -> Result<usize> {
        let mut added = 0;
        if distance <= 0.0 {
            return Ok(added);
        }
        if let Some(prev) = self.path.prev(start) {
            let span = self.path.get(start)?.cumulative_length - self.path.get(prev)?.cumulative_length;
            if span > 2.0 * distance {
                self.path.insert_interpolated(prev, (span - distance) / span)?;
                added += 1;
            }
        }
        if let Some(next) = self.path.next(end) {
            let span = self.path.get(next)?.cumulative_length - self.path.get(end)?.cumulative_length;
            if span > 2.0 * distance {
                self.path.insert_interpolated(end, distance / span)?;
                added += 1;
            }
        }
        Ok(added)
    }

    fn fractions(&mut self, start: PointId, end: PointId, ids: &[PointId]) -> Result<Vec<f64>> {
        ids.iter()
            .map(|&id| Ok(self.path.fraction_between(start, end, id)?))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::TumourError;
    use crate::path::PathPoint;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[allow(clippy::cast_precision_loss)]
    fn line(n: usize) -> (PathWithHints, Vec<PointId>) {
        let path = Path::from_points((0..n).map(|i| PathPoint::new(Vector2::new(i as f64, 0.0), false)));
        let ids = path.ids();
        (PathWithHints::new(path), ids)
    }

    fn anchored(start: PointId, end: PointId, tag: f64) -> ReconstructionHint {
        ReconstructionHint::new(
            start,
            end,
            Some(0),
            Some(vec![Vector2::new(tag, 0.0), Vector2::new(tag, 1.0)]),
            PathType::Linear,
        )
    }

    fn span(pwh: &PathWithHints, ids: &[PointId]) -> Vec<(usize, usize)> {
        let pos = |id| ids.iter().position(|&x| x == id).unwrap();
        pwh.hints().iter().map(|h| (pos(h.start), pos(h.end))).collect()
    }

    /// Builds the three-hint state: [0,2], [2,8], [8,10].
    fn scenario_a() -> (PathWithHints, Vec<PointId>) {
        let (mut pwh, ids) = line(11);
        pwh.add_reconstruction_hint(anchored(ids[0], ids[10], 0.0)).unwrap();
        pwh.add_reconstruction_hint(anchored(ids[2], ids[8], 1.0)).unwrap();
        (pwh, ids)
    }

    #[test]
    fn new_path_has_single_full_span_hint() {
        let (pwh, ids) = line(4);
        assert_eq!(span(&pwh, &ids), vec![(0, 3)]);
        assert!(pwh.hints()[0].anchors.is_none());
        pwh.validate().unwrap();
    }

    #[test]
    fn single_point_path_has_no_hints() {
        let (pwh, _) = line(1);
        assert!(pwh.hints().is_empty());
        pwh.validate().unwrap();
    }

    #[test]
    fn trim_both_sides() {
        let (pwh, ids) = scenario_a();
        assert_eq!(span(&pwh, &ids), vec![(0, 2), (2, 8), (8, 10)]);
        let h = pwh.hints();
        assert_relative_eq!(h[0].start_p, 0.0);
        assert_relative_eq!(h[0].end_p, 0.2);
        assert_relative_eq!(h[1].start_p, 0.0);
        assert_relative_eq!(h[1].end_p, 1.0);
        assert_eq!(h[1].anchors.as_ref().unwrap()[0].x, 1.0);
        assert_relative_eq!(h[2].start_p, 0.8);
        assert_relative_eq!(h[2].end_p, 1.0);
        pwh.validate().unwrap();
    }

    #[test]
    fn left_overlap_split() {
        let (mut pwh, ids) = scenario_a();
        pwh.add_reconstruction_hint(anchored(ids[1], ids[3], 2.0)).unwrap();
        assert_eq!(span(&pwh, &ids), vec![(0, 1), (1, 3), (3, 8), (8, 10)]);
        let h = pwh.hints();
        assert_relative_eq!(h[0].start_p, 0.0);
        assert_relative_eq!(h[0].end_p, 0.1);
        assert_relative_eq!(h[2].start_p, 1.0 / 6.0);
        assert_relative_eq!(h[2].end_p, 1.0);
        assert_relative_eq!(h[3].start_p, 0.8);
        pwh.validate().unwrap();
    }

    #[test]
    fn null_anchor_replace() {
        let (mut pwh, ids) = scenario_a();
        pwh.add_reconstruction_hint(anchored(ids[1], ids[3], 2.0)).unwrap();
        let before = pwh.hints().to_vec();

        pwh.add_reconstruction_hint(ReconstructionHint::new(ids[1], ids[2], Some(1), None, PathType::Bezier))
            .unwrap();
        assert_eq!(span(&pwh, &ids), vec![(0, 1), (1, 2), (2, 3), (3, 8), (8, 10)]);
        let h = pwh.hints();
        assert!(h[1].anchors.is_none());
        // Hints outside the new range keep their windows.
        assert_eq!(h[0], before[0]);
        assert_eq!(h[3], before[2]);
        assert_eq!(h[4], before[3]);
        // The anchored remainder of [1,3] keeps the far half of its window.
        assert_relative_eq!(h[2].start_p, 0.5);
        assert_relative_eq!(h[2].end_p, 1.0);
        pwh.validate().unwrap();
    }

    #[test]
    fn null_anchor_hints_keep_window_when_trimmed() {
        let (mut pwh, ids) = line(5);
        pwh.add_reconstruction_hint(ReconstructionHint::new(ids[1], ids[2], Some(0), None, PathType::Bezier))
            .unwrap();
        for h in pwh.hints() {
            assert_relative_eq!(h.start_p, 0.0);
            assert_relative_eq!(h.end_p, 1.0);
        }
    }

    #[test]
    fn empty_hint_is_rejected() {
        let (mut pwh, ids) = line(3);
        let err = pwh
            .add_reconstruction_hint(ReconstructionHint::new(ids[1], ids[1], None, None, PathType::Bezier))
            .unwrap_err();
        assert!(matches!(err, TumourError::Path(PathError::EmptyRange)));
        assert_eq!(pwh.hints().len(), 1);
    }

    #[test]
    fn reversed_and_foreign_hints_are_rejected() {
        let (mut pwh, ids) = line(3);
        let reversed = ReconstructionHint::new(ids[2], ids[0], None, None, PathType::Bezier);
        assert!(matches!(
            pwh.add_reconstruction_hint(reversed),
            Err(TumourError::Path(PathError::InvalidRange(_)))
        ));

        let (_, foreign) = line(3);
        let foreign = ReconstructionHint::new(foreign[0], foreign[1], None, None, PathType::Bezier);
        assert!(matches!(
            pwh.add_reconstruction_hint(foreign),
            Err(TumourError::Path(PathError::PointNotFound))
        ));
    }

    #[test]
    fn zero_length_hint_range_uses_run_keys() {
        let (mut pwh, ids) = line(3);
        let a = pwh.path_mut().duplicate_after(ids[1]).unwrap();
        let b = pwh.path_mut().duplicate_after(a).unwrap();
        pwh.add_reconstruction_hint(anchored(ids[1], b, 0.0)).unwrap();
        pwh.add_reconstruction_hint(anchored(ids[1], a, 1.0)).unwrap();
        let h = pwh.hints();
        assert_eq!(h.len(), 4);
        assert_relative_eq!(h[2].start_p, 0.5);
        pwh.validate().unwrap();
    }

    #[test]
    fn subdivide_reaches_detail_level() {
        let (mut pwh, ids) = line(3);
        let added = pwh.subdivide(ids[0], ids[2], 8).unwrap();
        assert_eq!(added, 6);
        let range = pwh.path().range_ids(ids[0], ids[2]).unwrap();
        assert_eq!(range.len(), 9);
        pwh.recalculate();
        let xs: Vec<f64> = pwh.path().positions().iter().map(|p| p.x).collect();
        for (i, x) in xs.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let expected = i as f64 * 0.25;
            assert_relative_eq!(*x, expected, epsilon = 1e-12);
        }
        pwh.validate().unwrap();
    }

    #[test]
    fn subdivide_is_noop_when_detailed_enough() {
        let (mut pwh, ids) = line(6);
        assert_eq!(pwh.subdivide(ids[0], ids[5], 3).unwrap(), 0);
    }

    #[test]
    fn critical_points_are_inserted_once() {
        let (mut pwh, ids) = line(3);
        let added = pwh.ensure_critical_points(ids[0], ids[2], &[0.25, 0.5, 0.25]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(pwh.path().len(), 4);
        let xs: Vec<f64> = pwh.path().positions().iter().map(|p| p.x).collect();
        assert_relative_eq!(xs[1], 0.5);
    }

    #[test]
    fn local_curvature_points_land_outside_range() {
        let (mut pwh, ids) = line(4);
        // Stretch the outer segments so they exceed twice the distance.
        for (&id, x) in ids.iter().zip([0.0, 10.0, 11.0, 21.0]) {
            pwh.path_mut().get_mut(id).unwrap().pos.x = x;
        }
        pwh.recalculate();
        let added = pwh.ensure_local_curvature(ids[1], ids[2], 2.0).unwrap();
        assert_eq!(added, 2);
        let xs: Vec<f64> = pwh.path().positions().iter().map(|p| p.x).collect();
        assert_relative_eq!(xs[1], 8.0);
        assert_relative_eq!(xs[4], 13.0);
        pwh.validate().unwrap();
    }

    proptest! {
        #[test]
        fn hints_always_partition(ranges in prop::collection::vec((0usize..20, 1usize..20, any::<bool>()), 1..25)) {
            let (mut pwh, ids) = line(21);
            for (i, (a, len, with_anchors)) in ranges.into_iter().enumerate() {
                let b = (a + len).min(20);
                if a == b {
                    continue;
                }
                let anchors = with_anchors.then(|| vec![Vector2::zeros(), Vector2::new(1.0, 0.0)]);
                let hint = ReconstructionHint::new(ids[a], ids[b], Some(i), anchors, PathType::Linear);
                pwh.add_reconstruction_hint(hint).unwrap();
                prop_assert!(pwh.validate().is_ok());
                for h in pwh.hints() {
                    prop_assert!(h.start_p <= h.end_p + 1e-12);
                }
            }
        }
    }
}
