pub mod config;
pub mod control;
pub mod dynamics;
pub mod error;
pub mod kite;
pub mod lines;
pub mod physics;
pub mod sim;

pub use error::{Result, SimError};

// Flat re-exports for hosts driving the simulation
pub mod types {
    pub use crate::config::{PhysicsConfig, PhysicsConstants, G0};
    pub use crate::control::ControlBar;
    pub use crate::kite::{presets, KiteGeometry, KiteState};
    pub use crate::lines::{HandlePositions, LineSide, LineState};
    pub use crate::physics::WindParams;
    pub use crate::sim::{FlightMetrics, Simulation, StepOutput, WarningEvent, WarningKind};
}
