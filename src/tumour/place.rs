use tracing::trace;

use crate::config::GeneratorSettings;
use crate::curve::PathType;
use crate::error::{OperationError, PathError, Result};
use crate::math::{angle_of, average_angle, lerp, rotate, Vector2, TOLERANCE};
use crate::path::{PathWithHints, PointId, ReconstructionHint};

use super::layer::{TumourLayer, WrappingMode};
use super::template::{TumourSize, TumourTemplate};

/// Where one tumour goes on the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occurrence {
    /// First point of the affected range.
    pub start: PointId,
    /// Last point of the affected range.
    pub end: PointId,
    /// Template parameter at `start`; above `0` when clipped by the layer range.
    pub start_t: f64,
    /// Template parameter at `end`; below `1` when clipped by the layer range.
    pub end_t: f64,
    /// Normalised path position the layer functions are evaluated at.
    pub position: f64,
    /// Places the tumour on the right-hand side.
    pub other_side: bool,
}

/// Stamps one template occurrence onto a path and records its hint.
pub struct PlaceTumour<'a> {
    layer: &'a TumourLayer,
    layer_index: usize,
    occurrence: Occurrence,
    settings: &'a GeneratorSettings,
}

impl<'a> PlaceTumour<'a> {
    /// Creates a new `PlaceTumour` operation.
    #[must_use]
    pub fn new(
        layer: &'a TumourLayer,
        layer_index: usize,
        occurrence: Occurrence,
        settings: &'a GeneratorSettings,
    ) -> Self {
        Self {
            layer,
            layer_index,
            occurrence,
            settings,
        }
    }

    /// Moves the points of the occurrence range onto the template shape.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::PointNotFound`] if either node is not on the
    /// path, [`OperationError::InvalidInput`] for an empty template window,
    /// and propagates hint partition errors.
    pub fn execute(&self, pwh: &mut PathWithHints) -> Result<()> {
        let Occurrence {
            start,
            mut end,
            start_t,
            end_t,
            position,
            other_side,
        } = self.occurrence;
        let layer = self.layer;
        let template = &layer.template;
        let mode = layer.wrapping_mode;

        if !pwh.path().contains(start) || !pwh.path().contains(end) {
            return Err(PathError::PointNotFound.into());
        }
        let window = end_t - start_t;
        if window <= TOLERANCE {
            return Err(OperationError::InvalidInput(format!(
                "empty template window [{start_t}, {end_t}]"
            ))
            .into());
        }
        if start == end {
            end = pwh.path_mut().duplicate_after(start)?;
        }

        let (start_pos, start_len, start_angle) = {
            let p = pwh.path().get(start)?;
            (p.pos, p.cumulative_length, p.post_angle)
        };
        let (end_pos, end_len) = {
            let p = pwh.path().get(end)?;
            (p.pos, p.cumulative_length)
        };
        if end_len <= start_len {
            pwh.path_mut().ensure_t(start)?;
        }

        let chord = end_pos - start_pos;
        let between_angle = if chord.norm() > TOLERANCE {
            angle_of(&chord)
        } else {
            start_angle
        };
        let base_length = if mode.uses_chord_position() {
            chord.norm()
        } else {
            end_len - start_len
        };
        let side = if other_side { -1.0 } else { 1.0 };
        let size = TumourSize {
            length: base_length / window,
            width: side * layer.scale.evaluate(position),
            parameter: if template.needs_parameter() {
                layer.parameter.evaluate(position)
            } else {
                0.0
            },
        };
        let rotation = layer.rotation.evaluate(position).to_radians();
        let inverted = layer.inverted;
        let template_t = |local: f64| {
            let t = start_t + local * window;
            if inverted {
                1.0 - t
            } else {
                t
            }
        };

        let critical: Vec<f64> = template
            .critical_points(&size)
            .into_iter()
            .map(|c| {
                let t = if inverted { 1.0 - c } else { c };
                (t - start_t) / window
            })
            .filter(|f| *f > 0.0 && *f < 1.0)
            .collect();
        pwh.ensure_critical_points(start, end, &critical)?;

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let detail = ((template.detail_level(&size) as f64 * window).ceil() as usize).max(1);
        pwh.subdivide(start, end, detail)?;
        pwh.ensure_local_curvature(start, end, self.settings.local_curvature_distance)?;

        let ids = pwh.path().range_ids(start, end)?;
        let mut locals = Vec::with_capacity(ids.len());
        for &id in &ids {
            locals.push(pwh.path_mut().fraction_between(start, end, id)?);
        }

        let mut split = 0;
        for (&id, &local) in ids.iter().zip(&locals) {
            let mut offset = template.offset(template_t(local), &size);
            if inverted {
                offset.x = -offset.x;
            }
            let offset = rotate(&offset, rotation);

            let point = pwh.path().get(id)?;
            let base = if mode.uses_chord_position() {
                lerp(&start_pos, &end_pos, local)
            } else {
                point.og_pos
            };
            let (angle_in, angle_out) = if template.is_absolutely_angled() {
                (0.0, 0.0)
            } else if mode.uses_chord_angle() {
                (between_angle, between_angle)
            } else {
                (point.pre_angle, point.post_angle)
            };

            let corner = !mode.uses_chord_angle()
                && !template.is_absolutely_angled()
                && point.is_sharp_corner()
                && offset.norm() > TOLERANCE;
            if corner {
                let incoming = base + rotate(&offset, angle_in);
                let outgoing = base + rotate(&offset, angle_out);
                let path = pwh.path_mut();
                if id == end {
                    let copy = path.duplicate_before(id)?;
                    path.get_mut(copy)?.pos = incoming;
                    path.get_mut(id)?.pos = outgoing;
                } else {
                    let copy = path.duplicate_after(id)?;
                    path.get_mut(id)?.pos = incoming;
                    path.get_mut(copy)?.pos = outgoing;
                }
                split += 1;
            } else {
                pwh.path_mut().get_mut(id)?.pos =
                    base + rotate(&offset, average_angle(angle_in, angle_out));
            }
        }

        let hint = self.hint(start, end, &start_pos, between_angle, rotation, &size);
        pwh.add_reconstruction_hint(hint)?;

        trace!(
            layer = self.layer_index,
            points = ids.len(),
            split,
            start_t,
            end_t,
            "placed tumour"
        );
        Ok(())
    }

    /// Builds the hint for the placed range, with anchors when the shape
    /// can be reproduced by the template's compact form.
    fn hint(
        &self,
        start: PointId,
        end: PointId,
        start_pos: &Vector2,
        between_angle: f64,
        rotation: f64,
        size: &TumourSize,
    ) -> ReconstructionHint {
        let template = &self.layer.template;
        let Occurrence { start_t, end_t, .. } = self.occurrence;
        let plain = ReconstructionHint::new(start, end, Some(self.layer_index), None, PathType::Bezier);

        let compact = self.layer.wrapping_mode == WrappingMode::Simple
            && rotation.abs() <= TOLERANCE
            && !template.is_absolutely_angled();
        if !compact {
            return plain;
        }
        let mut anchors = template.reconstruction_hint(size);
        if anchors.is_empty() {
            return plain;
        }
        let mut relation = template.distance_relation(size);
        if self.layer.inverted {
            anchors = anchors
                .into_iter()
                .rev()
                .map(|a| Vector2::new(size.length - a.x, a.y))
                .collect();
            relation = relation.map(|r| r.reversed());
        }

        // Template frame origin sits `start_t` of a full base before `start`.
        let origin = start_pos - rotate(&Vector2::new(start_t * size.length, 0.0), between_angle);
        let world: Vec<Vector2> = anchors
            .iter()
            .map(|a| origin + rotate(a, between_angle))
            .collect();
        let (start_p, end_p) = relation
            .as_ref()
            .map_or((start_t, end_t), |r| (r.arc_at(start_t), r.arc_at(end_t)));

        ReconstructionHint::new(
            start,
            end,
            Some(self.layer_index),
            Some(world),
            template.reconstruction_path_type(),
        )
        .with_window(start_p, end_p)
        .with_distance_relation(relation)
        .with_parameter_lengths()
    }
}
