pub mod hint;
pub mod point;
pub mod with_hints;

pub use hint::{DistanceRelation, ReconstructionHint};
pub use point::PathPoint;
pub use with_hints::PathWithHints;

use slotmap::{SecondaryMap, SlotMap};

use crate::error::PathError;
use crate::math::{self, Vector2};

slotmap::new_key_type! {
    /// Stable handle to a point in a [`Path`].
    ///
    /// Handles keep resolving to the same logical point across insertions.
    pub struct PointId;
}

#[derive(Debug, Clone)]
struct Node {
    point: PathPoint,
    prev: Option<PointId>,
    next: Option<PointId>,
}

/// Ordered, doubly linked sequence of path points stored in an arena.
///
/// Points reference each other via generational handles, so external
/// references (such as hint boundaries) survive insertions anywhere in the
/// sequence.
#[derive(Debug, Clone, Default)]
pub struct Path {
    nodes: SlotMap<PointId, Node>,
    first: Option<PointId>,
    last: Option<PointId>,
}

impl Path {
    /// Creates a new, empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a path from points in order and computes its metrics.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = PathPoint>) -> Self {
        let mut path = Self::new();
        for point in points {
            path.push_back(point);
        }
        path.recalculate();
        path
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the path has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<PointId> {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> Option<PointId> {
        self.last
    }

    /// Whether `id` refers to a live point of this path.
    #[must_use]
    pub fn contains(&self, id: PointId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the point for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::PointNotFound`] if the handle is not in this path.
    pub fn get(&self, id: PointId) -> Result<&PathPoint, PathError> {
        self.nodes
            .get(id)
            .map(|n| &n.point)
            .ok_or(PathError::PointNotFound)
    }

    /// Returns the point for `id` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::PointNotFound`] if the handle is not in this path.
    pub fn get_mut(&mut self, id: PointId) -> Result<&mut PathPoint, PathError> {
        self.nodes
            .get_mut(id)
            .map(|n| &mut n.point)
            .ok_or(PathError::PointNotFound)
    }

    /// Successor of `id`, if any.
    #[must_use]
    pub fn next(&self, id: PointId) -> Option<PointId> {
        self.nodes.get(id).and_then(|n| n.next)
    }

    /// Predecessor of `id`, if any.
    #[must_use]
    pub fn prev(&self, id: PointId) -> Option<PointId> {
        self.nodes.get(id).and_then(|n| n.prev)
    }

    /// Appends a point and returns its handle.
    pub fn push_back(&mut self, point: PathPoint) -> PointId {
        let id = self.nodes.insert(Node {
            point,
            prev: self.last,
            next: None,
        });
        match self.last {
            Some(last) => {
                if let Some(node) = self.nodes.get_mut(last) {
                    node.next = Some(id);
                }
            }
            None => self.first = Some(id),
        }
        self.last = Some(id);
        id
    }

    /// Inserts `point` directly after `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::PointNotFound`] if `id` is not in this path.
    pub fn insert_after(&mut self, id: PointId, point: PathPoint) -> Result<PointId, PathError> {
        let next = self.nodes.get(id).ok_or(PathError::PointNotFound)?.next;
        let new_id = self.nodes.insert(Node {
            point,
            prev: Some(id),
            next,
        });
        if let Some(node) = self.nodes.get_mut(id) {
            node.next = Some(new_id);
        }
        match next {
            Some(next) => {
                if let Some(node) = self.nodes.get_mut(next) {
                    node.prev = Some(new_id);
                }
            }
            None => self.last = Some(new_id),
        }
        Ok(new_id)
    }

    /// Inserts `point` directly before `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::PointNotFound`] if `id` is not in this path.
    pub fn insert_before(&mut self, id: PointId, point: PathPoint) -> Result<PointId, PathError> {
        let prev = self.nodes.get(id).ok_or(PathError::PointNotFound)?.prev;
        let new_id = self.nodes.insert(Node {
            point,
            prev,
            next: Some(id),
        });
        if let Some(node) = self.nodes.get_mut(id) {
            node.prev = Some(new_id);
        }
        match prev {
            Some(prev) => {
                if let Some(node) = self.nodes.get_mut(prev) {
                    node.next = Some(new_id);
                }
            }
            None => self.first = Some(new_id),
        }
        Ok(new_id)
    }

    /// Iterates over handles and points in path order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            path: self,
            cursor: self.first,
        }
    }

    /// Handles in path order.
    #[must_use]
    pub fn ids(&self) -> Vec<PointId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Current positions in path order.
    #[must_use]
    pub fn positions(&self) -> Vec<Vector2> {
        self.iter().map(|(_, p)| p.pos).collect()
    }

    /// Ordinal position of every point.
    #[must_use]
    pub fn index_map(&self) -> SecondaryMap<PointId, usize> {
        let mut map = SecondaryMap::with_capacity(self.len());
        for (i, (id, _)) in self.iter().enumerate() {
            map.insert(id, i);
        }
        map
    }

    /// Handles from `start` through `end`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::PointNotFound`] for foreign handles and
    /// [`PathError::InvalidRange`] if `end` does not follow `start`.
    pub fn range_ids(&self, start: PointId, end: PointId) -> Result<Vec<PointId>, PathError> {
        if !self.contains(start) || !self.contains(end) {
            return Err(PathError::PointNotFound);
        }
        let mut ids = vec![start];
        let mut cursor = start;
        while cursor != end {
            cursor = self
                .next(cursor)
                .ok_or_else(|| PathError::InvalidRange("end does not follow start".into()))?;
            ids.push(cursor);
        }
        Ok(ids)
    }

    /// Arc length of the whole path as of the last recalculation.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.last
            .and_then(|id| self.get(id).ok())
            .map_or(0.0, |p| p.cumulative_length)
    }

    /// Recomputes cumulative length, tangent angles and run keys from the
    /// live positions. Point order and handles are untouched.
    pub fn recalculate(&mut self) {
        let ids = self.ids();
        let n = ids.len();
        if n == 0 {
            return;
        }
        let positions: Vec<Vector2> = ids
            .iter()
            .filter_map(|&id| self.get(id).ok().map(|p| p.pos))
            .collect();

        // Direction of each segment i -> i+1, None when zero-length.
        let segments: Vec<Option<f64>> = positions
            .windows(2)
            .map(|w| {
                let d = w[1] - w[0];
                (d.norm_squared() > 0.0).then(|| math::angle_of(&d))
            })
            .collect();

        let mut backward = vec![None; n];
        for i in 1..n {
            backward[i] = segments[i - 1].or(backward[i - 1]);
        }
        let mut forward = vec![None; n];
        for i in (0..n - 1).rev() {
            forward[i] = segments[i].or(forward[i + 1]);
        }

        let mut cumulative = 0.0;
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                cumulative += (positions[i] - positions[i - 1]).norm();
            }
            if let Ok(point) = self.get_mut(id) {
                point.cumulative_length = cumulative;
                point.pre_angle = backward[i].or(forward[i]).unwrap_or(0.0);
                point.post_angle = forward[i].or(backward[i]).unwrap_or(0.0);
            }
        }

        self.refresh_run_keys(&ids);
    }

    /// Clears `t` outside zero-length runs and repairs it inside runs where it
    /// is missing or out of order.
    fn refresh_run_keys(&mut self, ids: &[PointId]) {
        let mut i = 0;
        while i < ids.len() {
            let length = self.length_of(ids[i]);
            let mut j = i + 1;
            while j < ids.len() && self.length_of(ids[j]) == length {
                j += 1;
            }
            let run = &ids[i..j];
            if run.len() == 1 {
                if let Ok(p) = self.get_mut(run[0]) {
                    p.t = None;
                }
            } else {
                let keys: Vec<Option<f64>> = run
                    .iter()
                    .map(|&id| self.get(id).ok().and_then(|p| p.t))
                    .collect();
                let complete = keys.iter().all(Option::is_some);
                let increasing = keys.windows(2).all(|w| match (w[0], w[1]) {
                    (Some(a), Some(b)) => a < b,
                    _ => false,
                });
                if !(complete && increasing) {
                    self.assign_even_keys(run);
                }
            }
            i = j;
        }
    }

    fn length_of(&self, id: PointId) -> f64 {
        self.get(id).map_or(f64::NAN, |p| p.cumulative_length)
    }

    fn assign_even_keys(&mut self, run: &[PointId]) {
        #[allow(clippy::cast_precision_loss)]
        let denom = (run.len() - 1) as f64;
        for (k, &id) in run.iter().enumerate() {
            if let Ok(p) = self.get_mut(id) {
                #[allow(clippy::cast_precision_loss)]
                let key = k as f64 / denom;
                p.t = Some(key);
            }
        }
    }

    /// The zero-length run containing `id`, from first to last point.
    fn run_of(&self, id: PointId) -> Result<Vec<PointId>, PathError> {
        let length = self.get(id)?.cumulative_length;
        let mut start = id;
        while let Some(prev) = self.prev(start) {
            if self.length_of(prev) != length {
                break;
            }
            start = prev;
        }
        let mut run = vec![start];
        let mut cursor = start;
        while let Some(next) = self.next(cursor) {
            if self.length_of(next) != length {
                break;
            }
            run.push(next);
            cursor = next;
        }
        Ok(run)
    }

    /// Makes sure every point of the zero-length run containing `id` has a
    /// `t` key, assigning them evenly the first time they are needed.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InconsistentT`] if only part of the run has keys.
    pub fn ensure_t(&mut self, id: PointId) -> Result<(), PathError> {
        let run = self.run_of(id)?;
        if run.len() < 2 {
            return Ok(());
        }
        let defined = run
            .iter()
            .filter(|&&p| self.get(p).is_ok_and(|p| p.t.is_some()))
            .count();
        if defined == run.len() {
            return Ok(());
        }
        if defined > 0 {
            return Err(PathError::InconsistentT(format!(
                "{defined} of {} points in a zero-length run have t",
                run.len()
            )));
        }
        self.assign_even_keys(&run);
        Ok(())
    }

    /// Position of `p` within `[start, end]` as a fraction in `[0, 1]`.
    ///
    /// Uses cumulative length, or the run keys when the range has zero length.
    ///
    /// # Errors
    ///
    /// Returns an error for foreign handles or an inconsistent zero-length run.
    pub fn fraction_between(
        &mut self,
        start: PointId,
        end: PointId,
        p: PointId,
    ) -> Result<f64, PathError> {
        let ls = self.get(start)?.cumulative_length;
        let le = self.get(end)?.cumulative_length;
        let lp = self.get(p)?.cumulative_length;
        if le > ls {
            return Ok(((lp - ls) / (le - ls)).clamp(0.0, 1.0));
        }

        self.ensure_t(start)?;
        let key = |path: &Self, id| path.get(id).ok().and_then(|p| p.t);
        match (key(self, start), key(self, end), key(self, p)) {
            (Some(ts), Some(te), Some(tp)) if te > ts => Ok(((tp - ts) / (te - ts)).clamp(0.0, 1.0)),
            (Some(_), Some(_), Some(_)) => Ok(0.0),
            _ => Err(PathError::InconsistentT(
                "zero-length range without run keys".into(),
            )),
        }
    }

    /// Finds the point at arc length `distance`, within `tolerance`.
    ///
    /// With `prefer_last`, the last matching point of a run is returned,
    /// otherwise the first.
    #[must_use]
    pub fn find_at_length(&self, distance: f64, tolerance: f64, prefer_last: bool) -> Option<PointId> {
        let mut found = None;
        for (id, point) in self.iter() {
            let diff = (point.cumulative_length - distance).abs();
            if diff <= tolerance {
                found = Some(id);
                if !prefer_last {
                    break;
                }
            } else if point.cumulative_length > distance {
                break;
            }
        }
        found
    }

    /// Returns the point at arc length `distance`, inserting an interpolated
    /// point when none lies within `tolerance`. `distance` is clamped to the
    /// path length.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Empty`] for an empty path.
    pub fn point_at_length(
        &mut self,
        distance: f64,
        tolerance: f64,
        prefer_last: bool,
    ) -> Result<PointId, PathError> {
        let last = self.last.ok_or(PathError::Empty)?;
        let distance = distance.clamp(0.0, self.total_length());
        if let Some(id) = self.find_at_length(distance, tolerance, prefer_last) {
            return Ok(id);
        }

        let after = self
            .iter()
            .find(|(_, p)| p.cumulative_length > distance)
            .map_or(last, |(id, _)| id);
        let Some(before) = self.prev(after) else {
            return Ok(after);
        };
        let a = self.get(before)?;
        let b = self.get(after)?;
        let f = (distance - a.cumulative_length) / (b.cumulative_length - a.cumulative_length);
        let point = PathPoint::lerp(a, b, f);
        self.insert_after(before, point)
    }

    /// Inserts a point between `a` and its successor at fraction `f`.
    ///
    /// # Errors
    ///
    /// Returns an error if `a` is not in the path or is the last point.
    pub fn insert_interpolated(&mut self, a: PointId, f: f64) -> Result<PointId, PathError> {
        let b = self
            .next(a)
            .ok_or_else(|| PathError::InvalidRange("cannot interpolate past the last point".into()))?;
        let point = PathPoint::lerp(self.get(a)?, self.get(b)?, f);
        self.insert_after(a, point)
    }

    /// Inserts a copy of `id` directly after it and returns the copy.
    ///
    /// The copy shares the cumulative length, so both points form a
    /// zero-length run whose keys stay consistent.
    ///
    /// # Errors
    ///
    /// Returns an error for a foreign handle or an inconsistent run.
    pub fn duplicate_after(&mut self, id: PointId) -> Result<PointId, PathError> {
        self.ensure_t(id)?;
        let mut copy = self.get(id)?.clone();
        if let Some(t) = copy.t {
            let next_t = self
                .next(id)
                .and_then(|n| self.get(n).ok())
                .filter(|n| n.cumulative_length == copy.cumulative_length)
                .and_then(|n| n.t);
            copy.t = Some(next_t.map_or(t + 1.0, |nt| (t + nt) * 0.5));
        }
        self.insert_after(id, copy)
    }

    /// Inserts a copy of `id` directly before it and returns the copy.
    ///
    /// # Errors
    ///
    /// Returns an error for a foreign handle or an inconsistent run.
    pub fn duplicate_before(&mut self, id: PointId) -> Result<PointId, PathError> {
        self.ensure_t(id)?;
        let mut copy = self.get(id)?.clone();
        if let Some(t) = copy.t {
            let prev_t = self
                .prev(id)
                .and_then(|p| self.get(p).ok())
                .filter(|p| p.cumulative_length == copy.cumulative_length)
                .and_then(|p| p.t);
            copy.t = Some(prev_t.map_or(t - 1.0, |pt| (t + pt) * 0.5));
        }
        self.insert_before(id, copy)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = (PointId, &'a PathPoint);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the points of a [`Path`] in order.
pub struct Iter<'a> {
    path: &'a Path,
    cursor: Option<PointId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (PointId, &'a PathPoint);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.path.nodes.get(id)?;
        self.cursor = node.next;
        Some((id, &node.point))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    #[allow(clippy::cast_precision_loss)]
    fn line_path(n: usize) -> Path {
        Path::from_points((0..n).map(|i| PathPoint::new(Vector2::new(i as f64, 0.0), false)))
    }

    #[test]
    fn push_and_iterate_in_order() {
        let path = line_path(4);
        assert_eq!(path.len(), 4);
        let xs: Vec<f64> = path.positions().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn insertions_keep_handles_valid() {
        let mut path = line_path(3);
        let ids = path.ids();
        let mid = path
            .insert_after(ids[0], PathPoint::new(Vector2::new(0.5, 0.0), false))
            .unwrap();
        let head = path
            .insert_before(ids[0], PathPoint::new(Vector2::new(-1.0, 0.0), false))
            .unwrap();

        assert_eq!(path.first(), Some(head));
        assert_eq!(path.next(ids[0]), Some(mid));
        assert_eq!(path.prev(ids[1]), Some(mid));
        assert_eq!(path.get(ids[2]).unwrap().pos.x, 2.0);
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn recalculate_computes_lengths_and_angles() {
        let mut path = Path::new();
        path.push_back(PathPoint::new(Vector2::new(0.0, 0.0), false));
        path.push_back(PathPoint::new(Vector2::new(3.0, 0.0), true));
        path.push_back(PathPoint::new(Vector2::new(3.0, 4.0), false));
        path.recalculate();

        let pts: Vec<&PathPoint> = path.iter().map(|(_, p)| p).collect();
        assert_eq!(pts[0].cumulative_length, 0.0);
        assert_relative_eq!(pts[1].cumulative_length, 3.0);
        assert_relative_eq!(pts[2].cumulative_length, 7.0);
        assert_relative_eq!(pts[1].pre_angle, 0.0);
        assert_relative_eq!(pts[1].post_angle, FRAC_PI_2);
        assert_relative_eq!(pts[0].pre_angle, pts[0].post_angle);
        assert_relative_eq!(pts[2].pre_angle, FRAC_PI_2);
        assert!(pts[1].is_sharp_corner());
    }

    #[test]
    fn recalculate_assigns_keys_to_zero_length_runs() {
        let mut path = line_path(3);
        let ids = path.ids();
        path.duplicate_after(ids[1]).unwrap();
        path.recalculate();

        let keys: Vec<Option<f64>> = path.iter().map(|(_, p)| p.t).collect();
        assert_eq!(keys[0], None);
        assert!(keys[1].is_some() && keys[2].is_some());
        assert!(keys[1].unwrap() < keys[2].unwrap());
        assert_eq!(keys[3], None);
    }

    #[test]
    fn recalculate_is_idempotent() {
        let mut path = line_path(5);
        let ids = path.ids();
        path.get_mut(ids[2]).unwrap().pos = Vector2::new(2.0, 1.5);
        path.duplicate_after(ids[3]).unwrap();
        path.recalculate();
        let once: Vec<PathPoint> = path.iter().map(|(_, p)| p.clone()).collect();
        path.recalculate();
        let twice: Vec<PathPoint> = path.iter().map(|(_, p)| p.clone()).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn ensure_t_rejects_partial_runs() {
        let mut path = line_path(3);
        let ids = path.ids();
        let copy = path.insert_after(ids[1], path.get(ids[1]).unwrap().clone()).unwrap();
        path.get_mut(copy).unwrap().t = Some(0.5);
        assert!(matches!(
            path.ensure_t(ids[1]),
            Err(PathError::InconsistentT(_))
        ));
    }

    #[test]
    fn ensure_t_assigns_evenly_once() {
        let mut path = line_path(3);
        let ids = path.ids();
        let a = path.insert_after(ids[1], path.get(ids[1]).unwrap().clone()).unwrap();
        let b = path.insert_after(a, path.get(ids[1]).unwrap().clone()).unwrap();
        path.ensure_t(a).unwrap();
        assert_eq!(path.get(ids[1]).unwrap().t, Some(0.0));
        assert_eq!(path.get(a).unwrap().t, Some(0.5));
        assert_eq!(path.get(b).unwrap().t, Some(1.0));
        assert_relative_eq!(path.fraction_between(ids[1], b, a).unwrap(), 0.5);
    }

    #[test]
    fn point_at_length_finds_or_inserts() {
        let mut path = line_path(3);
        let ids = path.ids();
        assert_eq!(path.point_at_length(1.0, 1e-6, false).unwrap(), ids[1]);

        let inserted = path.point_at_length(1.25, 1e-6, false).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.prev(inserted), Some(ids[1]));
        assert_relative_eq!(path.get(inserted).unwrap().pos.x, 1.25);
        assert_eq!(path.point_at_length(99.0, 1e-6, false).unwrap(), ids[2]);
    }

    #[test]
    fn find_at_length_respects_run_preference() {
        let mut path = line_path(3);
        let ids = path.ids();
        let copy = path.duplicate_after(ids[1]).unwrap();
        assert_eq!(path.find_at_length(1.0, 1e-9, false), Some(ids[1]));
        assert_eq!(path.find_at_length(1.0, 1e-9, true), Some(copy));
    }

    #[test]
    fn range_ids_rejects_reversed_range() {
        let path = line_path(4);
        let ids = path.ids();
        assert_eq!(path.range_ids(ids[1], ids[3]).unwrap().len(), 3);
        assert!(matches!(
            path.range_ids(ids[3], ids[1]),
            Err(PathError::InvalidRange(_))
        ));
    }

    proptest! {
        #[test]
        fn lengths_are_monotonic(coords in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 1..40)) {
            let path = Path::from_points(
                coords.iter().map(|&(x, y)| PathPoint::new(Vector2::new(x, y), false)),
            );
            let lengths: Vec<f64> = path.iter().map(|(_, p)| p.cumulative_length).collect();
            prop_assert_eq!(lengths[0], 0.0);
            prop_assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
