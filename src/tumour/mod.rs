pub mod generator;
pub mod layer;
pub mod place;
pub mod shapes;
pub mod template;

pub use generator::TumourGenerator;
pub use layer::{LayerFunction, Sidedness, TumourLayer, WrappingMode};
pub use place::{Occurrence, PlaceTumour};
pub use shapes::{Circle, Parabola, Square, Triangle, Wave};
pub use template::{TemplateKind, TumourSize, TumourTemplate};
