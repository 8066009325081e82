pub mod geometry;
pub mod state;

pub use geometry::{presets, KiteGeometry, KiteGeometryBuilder, Point, Surface};
pub use state::KiteState;
