pub mod metrics;
pub mod runner;
pub mod safety;

pub use metrics::FlightMetrics;
pub use runner::{Simulation, StepOutput};
pub use safety::{SafetyMonitor, StepSnapshot, WarningEvent, WarningKind};
