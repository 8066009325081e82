pub mod integrator;

pub use integrator::{IntegrationReport, Loads, RigidBodyIntegrator};
