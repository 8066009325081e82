pub mod aerodynamics;
pub mod gravity;
pub mod wind;

pub use aerodynamics::{AeroLoads, AerodynamicModel, SurfaceForces};
pub use wind::{WindField, WindParams};
