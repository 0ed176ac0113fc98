pub mod anchors;
pub mod sampling;

pub use anchors::to_bezier_segments;
pub use sampling::{geometric_length, sample_curve};

use serde::{Deserialize, Serialize};

use crate::math::Vector2;

/// Curve-fit algorithm that turns control points into a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathType {
    /// Straight segments between consecutive control points.
    Linear,
    /// Circular arc through exactly three control points.
    PerfectCurve,
    /// Piecewise Bézier; a repeated control point starts a new segment.
    #[default]
    Bezier,
    /// Uniform Catmull-Rom spline through the control points.
    Catmull,
}

/// The curve collaborator decorated by the generator.
///
/// The generator reads the control points once, then writes back the
/// reconstructed control points and a rescaled traversal velocity.
pub trait DecoratableCurve {
    /// Curve-fit algorithm of the current control points.
    fn path_type(&self) -> PathType;

    /// Ordered control points.
    fn control_points(&self) -> &[Vector2];

    /// Velocity factor of the curve. Decoration scales it by
    /// `old_length / new_length`.
    fn velocity(&self) -> f64;

    /// Replaces the control points and curve-fit algorithm.
    fn set_curve(&mut self, control_points: Vec<Vector2>, path_type: PathType);

    /// Replaces the traversal velocity.
    fn set_velocity(&mut self, velocity: f64);
}

/// A plain slider curve: control points, fit type and velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderCurve {
    pub path_type: PathType,
    pub control_points: Vec<Vector2>,
    pub velocity: f64,
}

impl SliderCurve {
    /// Creates a new slider curve.
    #[must_use]
    pub fn new(path_type: PathType, control_points: Vec<Vector2>, velocity: f64) -> Self {
        Self {
            path_type,
            control_points,
            velocity,
        }
    }
}

impl DecoratableCurve for SliderCurve {
    fn path_type(&self) -> PathType {
        self.path_type
    }

    fn control_points(&self) -> &[Vector2] {
        &self.control_points
    }

    fn velocity(&self) -> f64 {
        self.velocity
    }

    fn set_curve(&mut self, control_points: Vec<Vector2>, path_type: PathType) {
        self.control_points = control_points;
        self.path_type = path_type;
    }

    fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }
}
