use tracing::{debug, trace};

use crate::config::GeneratorSettings;
use crate::curve::{to_bezier_segments, PathType};
use crate::error::{ReconstructionError, Result};
use crate::math::{bezier, distance, Vector2, TOLERANCE};
use crate::path::{DistanceRelation, PathWithHints, ReconstructionHint};

/// Converts a hinted path into control points and a curve-fit type.
pub trait Reconstructor: std::fmt::Debug {
    /// Builds control points that reproduce `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be represented.
    fn reconstruct(&self, path: &PathWithHints) -> Result<(Vec<Vector2>, PathType)>;
}

/// Reconstructs each hint independently and joins the pieces with red
/// anchors.
///
/// Hints with anchors contribute the window `[start_p, end_p]` of their
/// anchor curve. Hints without anchors contribute the simplified live
/// points as straight segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultReconstructor {
    /// Maximum deviation when simplifying unanchored point runs.
    pub simplify_tolerance: f64,
    /// Flattening tolerance used to measure anchor curves.
    pub flatten_tolerance: f64,
}

impl Default for DefaultReconstructor {
    fn default() -> Self {
        Self::from_settings(&GeneratorSettings::default())
    }
}

impl DefaultReconstructor {
    /// Creates a reconstructor using the tolerances in `settings`.
    #[must_use]
    pub fn from_settings(settings: &GeneratorSettings) -> Self {
        Self {
            simplify_tolerance: settings.simplify_tolerance,
            flatten_tolerance: settings.flatten_tolerance,
        }
    }

    /// Simplified live points of the hint range as straight segments.
    fn point_segments(
        &self,
        path: &PathWithHints,
        hint: &ReconstructionHint,
    ) -> Result<Vec<Vec<Vector2>>> {
        let points = path
            .path()
            .range_ids(hint.start, hint.end)?
            .into_iter()
            .map(|id| Ok(path.path().get(id)?.pos))
            .collect::<Result<Vec<_>>>()?;
        let kept = distance::simplify_indices(&points, self.simplify_tolerance);
        Ok(kept
            .windows(2)
            .map(|w| vec![points[w[0]], points[w[1]]])
            .collect())
    }

    /// The window of the hint's anchor curve, as Bézier segments.
    fn anchor_segments(&self, anchors: &[Vector2], hint: &ReconstructionHint) -> Result<Vec<Vec<Vector2>>> {
        let segments = to_bezier_segments(hint.path_type, anchors);
        if segments.is_empty() {
            return Err(ReconstructionError::Failed("hint has no anchors".into()).into());
        }
        if hint.end_p - hint.start_p <= TOLERANCE {
            return Ok(Vec::new());
        }

        let lengths: Vec<f64> = segments
            .iter()
            .map(|s| bezier::length(s, self.flatten_tolerance))
            .collect();
        let at = |p: f64| {
            locate(
                &segments,
                &lengths,
                hint.distance_relation.as_ref(),
                p.clamp(0.0, 1.0),
            )
        };
        let (i0, t0) = at(hint.start_p);
        let (i1, t1) = at(hint.end_p);

        if i0 == i1 {
            return Ok(vec![bezier::sub_curve(&segments[i0], t0, t1)]);
        }
        let mut window = Vec::with_capacity(i1 - i0 + 1);
        if t0 < 1.0 - TOLERANCE {
            window.push(bezier::sub_curve(&segments[i0], t0, 1.0));
        }
        window.extend(segments[i0 + 1..i1].iter().cloned());
        if t1 > TOLERANCE {
            window.push(bezier::sub_curve(&segments[i1], 0.0, t1));
        }
        Ok(window)
    }
}

/// Segment index and local parameter of window position `p`.
fn locate(
    segments: &[Vec<Vector2>],
    lengths: &[f64],
    relation: Option<&DistanceRelation>,
    p: f64,
) -> (usize, f64) {
    let last = segments.len() - 1;
    if let Some(relation) = relation {
        #[allow(clippy::cast_precision_loss)]
        let x = relation.parameter_at(p) * segments.len() as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (x.floor().max(0.0) as usize).min(last);
        #[allow(clippy::cast_precision_loss)]
        let local = (x - index as f64).clamp(0.0, 1.0);
        return (index, local);
    }

    let total: f64 = lengths.iter().sum();
    if total <= TOLERANCE {
        return (0, p);
    }
    let target = p * total;
    let mut start = 0.0;
    for (index, (segment, &length)) in segments.iter().zip(lengths).enumerate() {
        if start + length >= target || index == last {
            let fraction = if length > TOLERANCE {
                ((target - start) / length).clamp(0.0, 1.0)
            } else {
                0.0
            };
            return (index, bezier::parameter_at_fraction(segment, fraction));
        }
        start += length;
    }
    (last, 1.0)
}

impl Reconstructor for DefaultReconstructor {
    fn reconstruct(&self, path: &PathWithHints) -> Result<(Vec<Vector2>, PathType)> {
        if path.hints().is_empty() {
            let points = path.path().positions();
            if points.is_empty() {
                return Err(ReconstructionError::Failed("path is empty".into()).into());
            }
            return Ok((points, PathType::Linear));
        }

        let mut segments: Vec<Vec<Vector2>> = Vec::new();
        for hint in path.hints() {
            let start = path.path().get(hint.start)?.pos;
            let end = path.path().get(hint.end)?.pos;
            let mut pieces = match &hint.anchors {
                Some(anchors) => self.anchor_segments(anchors, hint)?,
                None => self.point_segments(path, hint)?,
            };
            if pieces.is_empty() {
                pieces.push(vec![start, end]);
            }
            // Pin the piece ends to the hint nodes so neighbours meet exactly.
            if let Some(first) = pieces.first_mut().and_then(|s| s.first_mut()) {
                *first = start;
            }
            if let Some(last) = pieces.last_mut().and_then(|s| s.last_mut()) {
                *last = end;
            }
            trace!(layer = ?hint.layer, pieces = pieces.len(), anchored = hint.anchors.is_some(), "reconstructed hint");
            segments.extend(pieces);
        }

        let linear = segments.iter().all(|s| s.len() == 2);
        let mut points: Vec<Vector2> = Vec::new();
        if linear {
            for segment in &segments {
                for p in segment {
                    if points.last().map_or(true, |last| (last - p).norm() > TOLERANCE) {
                        points.push(*p);
                    }
                }
            }
            if points.len() == 1 {
                points.push(points[0]);
            }
        } else {
            // Consecutive segments share a boundary point; repeating it
            // marks a red anchor.
            for segment in &segments {
                points.extend_from_slice(segment);
            }
        }

        let path_type = if linear { PathType::Linear } else { PathType::Bezier };
        debug!(
            hints = path.hints().len(),
            segments = segments.len(),
            points = points.len(),
            ?path_type,
            "path reconstructed"
        );
        Ok((points, path_type))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::curve::geometric_length;
    use crate::path::{Path, PathPoint, PointId};
    use approx::assert_relative_eq;

    #[allow(clippy::cast_precision_loss)]
    fn straight(n: usize) -> (PathWithHints, Vec<PointId>) {
        let path = Path::from_points((0..n).map(|i| PathPoint::new(Vector2::new(i as f64, 0.0), false)));
        let ids = path.ids();
        (PathWithHints::new(path), ids)
    }

    #[test]
    fn undecorated_line_simplifies_to_its_ends() {
        let (pwh, _) = straight(11);
        let (points, path_type) = DefaultReconstructor::default().reconstruct(&pwh).unwrap();
        assert_eq!(path_type, PathType::Linear);
        assert_eq!(points, vec![Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0)]);
    }

    #[test]
    fn linear_anchors_are_windowed() {
        let (mut pwh, ids) = straight(11);
        for (i, y) in [(3, 1.0), (4, 2.0), (5, 1.0)] {
            pwh.path_mut().get_mut(ids[i]).unwrap().pos.y = y;
        }
        let anchors = vec![Vector2::new(2.0, 0.0), Vector2::new(4.0, 2.0), Vector2::new(6.0, 0.0)];
        let hint = ReconstructionHint::new(ids[2], ids[6], Some(0), Some(anchors), PathType::Linear);
        pwh.add_reconstruction_hint(hint).unwrap();

        let (points, path_type) = DefaultReconstructor::default().reconstruct(&pwh).unwrap();
        assert_eq!(path_type, PathType::Linear);
        assert_eq!(
            points,
            vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(2.0, 0.0),
                Vector2::new(4.0, 2.0),
                Vector2::new(6.0, 0.0),
                Vector2::new(10.0, 0.0),
            ]
        );
    }

    #[test]
    fn half_window_keeps_half_the_anchor_curve() {
        let (mut pwh, ids) = straight(5);
        let anchors = vec![Vector2::new(-4.0, 0.0), Vector2::new(0.0, 4.0), Vector2::new(4.0, 0.0)];
        pwh.path_mut().get_mut(ids[0]).unwrap().pos = Vector2::new(0.0, 4.0);
        let hint = ReconstructionHint::new(ids[0], ids[4], Some(0), Some(anchors), PathType::Linear)
            .with_window(0.5, 1.0);
        pwh.add_reconstruction_hint(hint).unwrap();

        let (points, _) = DefaultReconstructor::default().reconstruct(&pwh).unwrap();
        assert_eq!(points, vec![Vector2::new(0.0, 4.0), Vector2::new(4.0, 0.0)]);
    }

    #[test]
    fn curved_anchors_produce_bezier_with_red_joins() {
        let (mut pwh, ids) = straight(11);
        let anchors = vec![Vector2::new(2.0, 0.0), Vector2::new(4.0, 4.0), Vector2::new(6.0, 0.0)];
        let relation = DistanceRelation::from_bezier(&anchors, 64).unwrap();
        let hint = ReconstructionHint::new(ids[2], ids[6], Some(0), Some(anchors), PathType::Bezier)
            .with_distance_relation(Some(relation));
        pwh.add_reconstruction_hint(hint).unwrap();

        let (points, path_type) = DefaultReconstructor::default().reconstruct(&pwh).unwrap();
        assert_eq!(path_type, PathType::Bezier);
        // [0,2] line, [2,6] quadratic, [6,10] line: every join is doubled.
        assert_eq!(points.len(), 2 + 3 + 2);
        assert_eq!(points[1], points[2]);
        assert_eq!(points[4], points[5]);
        assert_relative_eq!(points[3], Vector2::new(4.0, 4.0), epsilon = 1e-9);

        let length = geometric_length(path_type, &points, 0.01);
        assert!(length > 10.0);
    }

    #[test]
    fn relation_window_matches_parameter_split() {
        let (mut pwh, ids) = straight(5);
        let anchors = vec![Vector2::new(0.0, 0.0), Vector2::new(2.0, 4.0), Vector2::new(4.0, 0.0)];
        let relation = DistanceRelation::from_bezier(&anchors, 64).unwrap();
        let start_p = relation.arc_at(0.5);
        pwh.path_mut().get_mut(ids[2]).unwrap().pos = Vector2::new(2.0, 2.0);
        let hint = ReconstructionHint::new(ids[2], ids[4], Some(0), Some(anchors), PathType::Bezier)
            .with_window(start_p, 1.0)
            .with_distance_relation(Some(relation));
        pwh.add_reconstruction_hint(hint).unwrap();

        let (points, _) = DefaultReconstructor::default().reconstruct(&pwh).unwrap();
        // Second half of the quadratic: (2,2) -> (3,2) -> (4,0).
        let tail = &points[points.len() - 3..];
        assert_relative_eq!(tail[0], Vector2::new(2.0, 2.0), epsilon = 1e-9);
        assert_relative_eq!(tail[1], Vector2::new(3.0, 2.0), epsilon = 1e-6);
        assert_relative_eq!(tail[2], Vector2::new(4.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn single_point_path_has_no_hints() {
        let path = Path::from_points([PathPoint::new(Vector2::new(1.0, 1.0), false)]);
        let pwh = PathWithHints::new(path);
        let (points, path_type) = DefaultReconstructor::default().reconstruct(&pwh).unwrap();
        assert_eq!(path_type, PathType::Linear);
        assert_eq!(points, vec![Vector2::new(1.0, 1.0)]);
    }
}
