use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::curve::PathType;
use crate::math::Vector2;
use crate::path::DistanceRelation;

use super::shapes::{Circle, Parabola, Square, Triangle, Wave};

/// Dimensions of one tumour occurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TumourSize {
    /// Length of the template base, in path units.
    pub length: f64,
    /// Signed height; negative places the tumour on the other side.
    pub width: f64,
    /// Free shape parameter, for templates that need one.
    pub parameter: f64,
}

/// A shape that can be stamped onto a path.
///
/// Offsets are expressed in the template frame: `x` runs along the base from
/// `0` to `size.length`, `y` points to the left of the direction of travel.
/// `offset(t)` is the displacement of the shape point at `t` from the base
/// point at `t * size.length`.
pub trait TumourTemplate: fmt::Debug + Send + Sync {
    /// Displacement at parameter `t` in `[0, 1]`.
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2;

    /// Minimum number of segments needed to show the shape.
    fn detail_level(&self, size: &TumourSize) -> usize;

    /// Parameters that must land on real path points.
    fn critical_points(&self, _size: &TumourSize) -> Vec<f64> {
        Vec::new()
    }

    /// Compact control points reproducing the shape in the template frame.
    /// Empty when the shape has no compact form.
    fn reconstruction_hint(&self, _size: &TumourSize) -> Vec<Vector2> {
        Vec::new()
    }

    /// Curve-fit kind of [`TumourTemplate::reconstruction_hint`].
    fn reconstruction_path_type(&self) -> PathType {
        PathType::Linear
    }

    /// Mapping from arc fraction to anchor parameter, when `t` is not
    /// already an arc fraction of the anchors.
    fn distance_relation(&self, _size: &TumourSize) -> Option<DistanceRelation> {
        None
    }

    /// Whether [`TumourSize::parameter`] affects the shape.
    fn needs_parameter(&self) -> bool {
        false
    }

    /// Whether offsets are in absolute orientation instead of following
    /// the base direction.
    fn is_absolutely_angled(&self) -> bool {
        false
    }
}

/// Built-in templates plus user-supplied ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    Triangle,
    Square,
    Circle,
    Parabola,
    Wave,
    #[serde(skip)]
    Custom(Arc<dyn TumourTemplate>),
}

impl TemplateKind {
    fn inner(&self) -> &dyn TumourTemplate {
        match self {
            Self::Triangle => &Triangle,
            Self::Square => &Square,
            Self::Circle => &Circle,
            Self::Parabola => &Parabola,
            Self::Wave => &Wave,
            Self::Custom(template) => template.as_ref(),
        }
    }
}

impl TumourTemplate for TemplateKind {
    fn offset(&self, t: f64, size: &TumourSize) -> Vector2 {
        self.inner().offset(t, size)
    }

    fn detail_level(&self, size: &TumourSize) -> usize {
        self.inner().detail_level(size)
    }

    fn critical_points(&self, size: &TumourSize) -> Vec<f64> {
        self.inner().critical_points(size)
    }

    fn reconstruction_hint(&self, size: &TumourSize) -> Vec<Vector2> {
        self.inner().reconstruction_hint(size)
    }

    fn reconstruction_path_type(&self) -> PathType {
        self.inner().reconstruction_path_type()
    }

    fn distance_relation(&self, size: &TumourSize) -> Option<DistanceRelation> {
        self.inner().distance_relation(size)
    }

    fn needs_parameter(&self) -> bool {
        self.inner().needs_parameter()
    }

    fn is_absolutely_angled(&self) -> bool {
        self.inner().is_absolutely_angled()
    }
}
