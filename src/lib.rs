pub mod config;
pub mod curve;
pub mod error;
pub mod math;
pub mod path;
pub mod reconstruct;
pub mod tumour;

pub use config::{GeneratorSettings, TumourGeneratorConfig};
pub use curve::{DecoratableCurve, PathType, SliderCurve};
pub use error::{Result, TumourError};
pub use path::{Path, PathPoint, PathWithHints, PointId, ReconstructionHint};
pub use reconstruct::{DefaultReconstructor, Reconstructor};
pub use tumour::{LayerFunction, Sidedness, TemplateKind, TumourGenerator, TumourLayer, TumourTemplate, WrappingMode};
