use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OperationError;

use super::template::TemplateKind;

/// A value that varies with normalised position along the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerFunction {
    Constant(f64),
    /// Linear ramp from `from` at position 0 to `to` at position 1.
    Linear { from: f64, to: f64 },
    /// Piecewise-linear graph through `(position, value)` points, held
    /// constant beyond its ends.
    Points(Vec<(f64, f64)>),
}

impl LayerFunction {
    /// Value at normalised position `x`.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Linear { from, to } => from + (to - from) * x,
            Self::Points(points) => {
                let (Some(first), Some(last)) = (points.first(), points.last()) else {
                    return 0.0;
                };
                if x <= first.0 {
                    return first.1;
                }
                if x >= last.0 {
                    return last.1;
                }
                let idx = points.partition_point(|p| p.0 < x).max(1);
                let (a, b) = (points[idx - 1], points[idx]);
                if b.0 - a.0 <= 0.0 {
                    return b.1;
                }
                a.1 + (b.1 - a.1) * (x - a.0) / (b.0 - a.0)
            }
        }
    }

    fn has_sorted_points(&self) -> bool {
        match self {
            Self::Points(points) => points.windows(2).all(|w| w[0].0 <= w[1].0),
            _ => true,
        }
    }
}

/// Which side of the path each occurrence goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sidedness {
    #[default]
    Left,
    Right,
    /// Alternates, starting on the left.
    AlternatingLeft,
    /// Alternates, starting on the right.
    AlternatingRight,
    Random,
}

impl Sidedness {
    /// Whether occurrence `index` goes on the right-hand side.
    pub fn is_other_side(self, index: usize, rng: &mut impl Rng) -> bool {
        match self {
            Self::Left => false,
            Self::Right => true,
            Self::AlternatingLeft => index % 2 == 1,
            Self::AlternatingRight => index % 2 == 0,
            Self::Random => rng.gen_bool(0.5),
        }
    }
}

/// How a tumour's base geometry relates to the path it is stamped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappingMode {
    /// Straight chord base; eligible for compact reconstruction.
    #[default]
    Simple,
    /// Straight chord base, always reconstructed from the points.
    Replace,
    /// Chord position, local curve direction.
    RoundReplace,
    /// Chord position, local curve direction.
    RoundWrap,
    /// Each point's original position and direction.
    Wrap,
}

impl WrappingMode {
    /// Whether offsets follow the fixed start-to-end direction.
    #[must_use]
    pub fn uses_chord_angle(self) -> bool {
        matches!(self, Self::Simple | Self::Replace)
    }

    /// Whether base positions are interpolated along the start-to-end chord.
    #[must_use]
    pub fn uses_chord_position(self) -> bool {
        !matches!(self, Self::Wrap)
    }
}

fn default_true() -> bool {
    true
}

fn default_end() -> f64 {
    1.0
}

fn default_length() -> LayerFunction {
    LayerFunction::Constant(20.0)
}

fn default_scale() -> LayerFunction {
    LayerFunction::Constant(10.0)
}

fn default_rotation() -> LayerFunction {
    LayerFunction::Constant(0.0)
}

fn default_distance() -> LayerFunction {
    LayerFunction::Constant(40.0)
}

fn default_parameter() -> LayerFunction {
    LayerFunction::Constant(1.0)
}

/// One decoration pass over a path.
///
/// Positions are normalised path fractions. Functions are evaluated at the
/// occurrence centre in count mode and at its start in distance mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TumourLayer {
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Start of the decorated range.
    #[serde(default)]
    pub start: f64,
    /// End of the decorated range.
    #[serde(default = "default_end")]
    pub end: f64,
    /// Evenly spaced occurrences; `0` places them by `distance` instead.
    #[serde(default)]
    pub count: usize,
    /// Occurrence length along the path.
    #[serde(default = "default_length")]
    pub length: LayerFunction,
    /// Template height.
    #[serde(default = "default_scale")]
    pub scale: LayerFunction,
    /// Rotation of the offsets, in degrees.
    #[serde(default = "default_rotation")]
    pub rotation: LayerFunction,
    /// Spacing between occurrence starts when `count` is `0`.
    #[serde(default = "default_distance")]
    pub distance: LayerFunction,
    /// Free shape parameter for templates that use one.
    #[serde(default = "default_parameter")]
    pub parameter: LayerFunction,
    #[serde(default)]
    pub sidedness: Sidedness,
    #[serde(default)]
    pub wrapping_mode: WrappingMode,
    /// Runs the template back to front.
    #[serde(default)]
    pub inverted: bool,
    /// Refresh path metrics before this layer runs.
    #[serde(default = "default_true")]
    pub recalculate: bool,
    #[serde(default)]
    pub template: TemplateKind,
}

impl Default for TumourLayer {
    fn default() -> Self {
        Self {
            is_active: true,
            start: 0.0,
            end: 1.0,
            count: 0,
            length: default_length(),
            scale: default_scale(),
            rotation: default_rotation(),
            distance: default_distance(),
            parameter: default_parameter(),
            sidedness: Sidedness::default(),
            wrapping_mode: WrappingMode::default(),
            inverted: false,
            recalculate: true,
            template: TemplateKind::default(),
        }
    }
}

impl TumourLayer {
    /// Creates an active layer with default settings and the given template.
    #[must_use]
    pub fn new(template: TemplateKind) -> Self {
        Self {
            template,
            ..Self::default()
        }
    }

    /// Checks the layer range and function graphs.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] describing the problem.
    pub fn validate(&self) -> Result<(), OperationError> {
        if !(0.0..=1.0).contains(&self.start) || !(0.0..=1.0).contains(&self.end) {
            return Err(OperationError::InvalidInput(format!(
                "layer range [{}, {}] is outside [0, 1]",
                self.start, self.end
            )));
        }
        if self.start > self.end {
            return Err(OperationError::InvalidInput(format!(
                "layer start {} is after its end {}",
                self.start, self.end
            )));
        }
        let functions = [
            &self.length,
            &self.scale,
            &self.rotation,
            &self.distance,
            &self.parameter,
        ];
        if !functions.iter().all(|f| f.has_sorted_points()) {
            return Err(OperationError::InvalidInput(
                "function points must be sorted by position".into(),
            ));
        }
        Ok(())
    }
}
