use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::{GeneratorSettings, TumourGeneratorConfig};
use crate::curve::{geometric_length, DecoratableCurve};
use crate::error::{OperationError, Result};
use crate::math::TOLERANCE;
use crate::path::PathWithHints;
use crate::reconstruct::{DefaultReconstructor, Reconstructor};

use super::layer::TumourLayer;
use super::place::{Occurrence, PlaceTumour};

/// Upper bound on occurrences per layer.
const MAX_OCCURRENCES: usize = 10_000;

/// One occurrence in arc-length terms, before nodes are looked up.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    from: f64,
    to: f64,
    start_t: f64,
    end_t: f64,
    position: f64,
    other_side: bool,
}

/// Applies tumour layers to curves.
///
/// Layers run in declared order; each one sees the geometry left by the
/// layers before it.
#[derive(Debug)]
pub struct TumourGenerator {
    layers: Vec<TumourLayer>,
    settings: GeneratorSettings,
    reconstructor: Box<dyn Reconstructor>,
    rng: StdRng,
}

impl TumourGenerator {
    /// Creates a generator with the default reconstructor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`](crate::error::ConfigError::Invalid)
    /// if a tolerance in `settings` is out of range.
    pub fn new(layers: Vec<TumourLayer>, settings: GeneratorSettings) -> Result<Self> {
        settings.validate()?;
        let rng = settings
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Ok(Self {
            layers,
            reconstructor: Box::new(DefaultReconstructor::from_settings(&settings)),
            settings,
            rng,
        })
    }

    /// Creates a generator from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn from_config(config: TumourGeneratorConfig) -> Result<Self> {
        Self::new(config.layers, config.settings)
    }

    /// Replaces the reconstructor.
    #[must_use]
    pub fn with_reconstructor(mut self, reconstructor: Box<dyn Reconstructor>) -> Self {
        self.reconstructor = reconstructor;
        self
    }

    #[must_use]
    pub fn layers(&self) -> &[TumourLayer] {
        &self.layers
    }

    #[must_use]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Decorates `curve` in place.
    ///
    /// Returns `false` without touching the curve when no layer is active,
    /// the sampled path has no extent, or no occurrence was placed.
    /// Otherwise the control points are replaced and the velocity is scaled
    /// by `old_length / new_length`.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer is invalid, placement fails, or the
    /// reconstructed curve has no length.
    pub fn generate<C: DecoratableCurve + ?Sized>(&mut self, curve: &mut C) -> Result<bool> {
        if !self.layers.iter().any(|l| l.is_active) {
            return Ok(false);
        }
        let tolerance = self.settings.flatten_tolerance;
        let mut pwh = PathWithHints::from_curve(curve.path_type(), curve.control_points(), tolerance);
        if pwh.path().len() < 2 {
            return Ok(false);
        }

        let placed = self.decorate(&mut pwh)?;
        if placed == 0 {
            return Ok(false);
        }

        let old_length = geometric_length(curve.path_type(), curve.control_points(), tolerance);
        let (points, path_type) = self.reconstructor.reconstruct(&pwh)?;
        let new_length = geometric_length(path_type, &points, tolerance);
        if new_length <= TOLERANCE {
            return Err(OperationError::Failed("decorated curve has zero length".into()).into());
        }

        let velocity = curve.velocity() * old_length / new_length;
        debug!(
            placed,
            old_length,
            new_length,
            old_velocity = curve.velocity(),
            velocity,
            control_points = points.len(),
            "curve decorated"
        );
        curve.set_curve(points, path_type);
        curve.set_velocity(velocity);
        Ok(true)
    }

    /// Decorates each curve independently. A failure on one curve leaves the
    /// others unaffected.
    pub fn generate_all<C: DecoratableCurve>(&mut self, curves: &mut [C]) -> Vec<Result<bool>> {
        curves
            .iter_mut()
            .enumerate()
            .map(|(index, curve)| {
                let result = self.generate(curve);
                if let Err(e) = &result {
                    warn!(index, error = %e, "curve decoration failed");
                }
                result
            })
            .collect()
    }

    /// Runs every active layer over `pwh` and returns the number of
    /// occurrences placed. Metrics are recomputed at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer is invalid or placement fails.
    pub fn decorate(&mut self, pwh: &mut PathWithHints) -> Result<usize> {
        let Self {
            layers,
            settings,
            rng,
            ..
        } = self;

        let mut placed = 0;
        for (index, layer) in layers.iter().enumerate().filter(|(_, l)| l.is_active) {
            layer.validate()?;
            if layer.recalculate {
                pwh.recalculate();
            }
            let count = apply_layer(pwh, index, layer, settings, rng)?;
            debug!(layer = index, occurrences = count, "layer applied");
            placed += count;
        }
        pwh.recalculate();
        Ok(placed)
    }
}

/// Lays out and places the occurrences of one layer.
fn apply_layer(
    pwh: &mut PathWithHints,
    index: usize,
    layer: &TumourLayer,
    settings: &GeneratorSettings,
    rng: &mut impl Rng,
) -> Result<usize> {
    let total = pwh.path().total_length();
    if total <= TOLERANCE {
        return Ok(0);
    }

    let spans = layout(layer, total, rng)?;
    for span in &spans {
        let path = pwh.path_mut();
        let start = path.point_at_length(span.from, settings.lookup_tolerance, false)?;
        let end = path.point_at_length(span.to, settings.lookup_tolerance, true)?;
        let occurrence = Occurrence {
            start,
            end,
            start_t: span.start_t,
            end_t: span.end_t,
            position: span.position,
            other_side: span.other_side,
        };
        PlaceTumour::new(layer, index, occurrence, settings).execute(pwh)?;
    }
    Ok(spans.len())
}

/// Occurrence spans of `layer` on a path of length `total`, clipped to the
/// layer range.
fn layout(layer: &TumourLayer, total: f64, rng: &mut impl Rng) -> Result<Vec<Span>> {
    let range_start = layer.start * total;
    let range_end = layer.end * total;
    if range_end - range_start <= TOLERANCE {
        return Ok(Vec::new());
    }

    // (start, length, position) of each unclipped occurrence.
    let mut raw = Vec::new();
    if layer.count > 0 {
        let count = if layer.count > MAX_OCCURRENCES {
            warn!(count = layer.count, limit = MAX_OCCURRENCES, "occurrence limit reached, count reduced");
            MAX_OCCURRENCES
        } else {
            layer.count
        };
        #[allow(clippy::cast_precision_loss)]
        let spacing = (range_end - range_start) / count as f64;
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let centre = range_start + (i as f64 + 0.5) * spacing;
            let position = centre / total;
            let length = layer.length.evaluate(position);
            raw.push((centre - length * 0.5, length, position));
        }
    } else {
        let mut cursor = range_start;
        while cursor < range_end - TOLERANCE {
            if raw.len() >= MAX_OCCURRENCES {
                warn!(limit = MAX_OCCURRENCES, "occurrence limit reached, layer truncated");
                break;
            }
            let position = cursor / total;
            let step = layer.distance.evaluate(position);
            if !(step.is_finite() && step > TOLERANCE) {
                return Err(OperationError::InvalidInput(format!(
                    "tumour distance must be positive, got {step} at {position}"
                ))
                .into());
            }
            raw.push((cursor, layer.length.evaluate(position), position));
            cursor += step;
        }
    }

    let mut spans = Vec::with_capacity(raw.len());
    for (i, (from, length, position)) in raw.into_iter().enumerate() {
        let other_side = layer.sidedness.is_other_side(i, rng);
        if !(length.is_finite() && length > TOLERANCE) {
            warn!(occurrence = i, length, "skipping occurrence with non-positive length");
            continue;
        }
        let to = from + length;
        let (clipped_from, clipped_to) = (from.max(range_start), to.min(range_end));
        if clipped_to - clipped_from <= TOLERANCE {
            continue;
        }
        spans.push(Span {
            from: clipped_from,
            to: clipped_to,
            start_t: (clipped_from - from) / length,
            end_t: (clipped_to - from) / length,
            position,
            other_side,
        });
    }
    Ok(spans)
}
