use nalgebra::Vector3;

use crate::error::{ensure_positive, ensure_range, Result, SimError};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665; // standard gravity, m/s^2
pub const RHO_SEA_LEVEL: f64 = 1.225; // ISA sea-level air density, kg/m^3
pub const KMH_TO_MS: f64 = 1.0 / 3.6;

// ---------------------------------------------------------------------------
// Engine constants (thresholds, safety ceilings)
// ---------------------------------------------------------------------------

/// Named numeric constants read by every stage of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConstants {
    pub epsilon: f64,                    // near-zero comparisons
    pub control_deadzone: f64,           // bar steering input deadzone
    pub line_constraint_tolerance: f64,  // m
    pub line_tension_factor: f64,        // N per m of over-extension
    pub ground_friction: f64,            // fraction of horizontal velocity lost on contact
    pub catenary_segments: usize,        // line display sampling
    pub max_force: f64,                  // N
    pub max_velocity: f64,               // m/s
    pub max_angular_velocity: f64,       // rad/s
    pub max_acceleration: f64,           // m/s^2
    pub max_angular_acceleration: f64,   // rad/s^2
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            control_deadzone: 0.01,
            line_constraint_tolerance: 5e-4,
            line_tension_factor: 200.0,
            ground_friction: 0.85,
            catenary_segments: 20,
            max_force: 1000.0,
            max_velocity: 30.0,
            max_angular_velocity: 25.0,
            max_acceleration: 200.0,
            max_angular_acceleration: 100.0,
        }
    }
}

impl PhysicsConstants {
    /// Validate the constants.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("epsilon", self.epsilon)?;
        ensure_range("control_deadzone", self.control_deadzone, 0.0, 1.0)?;
        ensure_range(
            "line_constraint_tolerance",
            self.line_constraint_tolerance,
            0.0,
            f64::MAX,
        )?;
        ensure_positive("line_tension_factor", self.line_tension_factor)?;
        ensure_range("ground_friction", self.ground_friction, 0.0, 1.0)?;
        if self.catenary_segments == 0 {
            return Err(SimError::invalid_config("catenary_segments must be at least 1"));
        }
        ensure_positive("max_force", self.max_force)?;
        ensure_positive("max_velocity", self.max_velocity)?;
        ensure_positive("max_angular_velocity", self.max_angular_velocity)?;
        ensure_positive("max_acceleration", self.max_acceleration)?;
        ensure_positive("max_angular_acceleration", self.max_angular_acceleration)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulation configuration
// ---------------------------------------------------------------------------

/// Everything fixed at simulation start: constants, mass properties,
/// environment, line setup and solver tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig {
    pub constants: PhysicsConstants,
    pub mass: f64,                   // kg
    pub inertia: Vector3<f64>,       // [Ixx, Iyy, Izz] principal moments, kg·m^2 (kite frame)
    pub air_density: f64,            // kg/m^3
    pub gravity: f64,                // m/s^2, acts along -Z
    pub line_length: f64,            // m
    pub linear_damping: f64,         // 1/s, exponential velocity decay rate
    pub angular_damping: f64,        // 1/s
    pub angular_drag_coeff: f64,     // 1/rad, decay proportional to |omega|
    pub min_altitude: f64,           // m, center-of-mass floor
    pub delta_time_max: f64,         // s, integration step cap
    pub constraint_iterations: usize,
    pub constraint_relaxation: f64,  // fraction of the violation removed per pass
    pub line_break_tension: f64,     // N
    pub release_on_break: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            constants: PhysicsConstants::default(),
            mass: 0.31,
            inertia: Vector3::new(0.053, 0.042, 0.017),
            air_density: RHO_SEA_LEVEL,
            gravity: G0,
            line_length: 15.0,
            linear_damping: 0.15,
            angular_damping: 2.0,
            angular_drag_coeff: 0.05,
            min_altitude: 0.5,
            delta_time_max: 1.0 / 30.0,
            constraint_iterations: 4,
            constraint_relaxation: 0.3,
            line_break_tension: 400.0,
            release_on_break: false,
        }
    }
}

impl PhysicsConfig {
    /// Set the line length.
    #[must_use]
    pub fn with_line_length(mut self, line_length: f64) -> Self {
        self.line_length = line_length;
        self
    }

    /// Set the kite mass.
    #[must_use]
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Set the principal moments of inertia.
    #[must_use]
    pub fn with_inertia(mut self, inertia: Vector3<f64>) -> Self {
        self.inertia = inertia;
        self
    }

    /// Set the engine constants.
    #[must_use]
    pub fn with_constants(mut self, constants: PhysicsConstants) -> Self {
        self.constants = constants;
        self
    }

    /// Set the tension above which a line is reported as broken.
    #[must_use]
    pub fn with_line_break_tension(mut self, tension: f64) -> Self {
        self.line_break_tension = tension;
        self
    }

    /// Release a line's constraint automatically once it breaks.
    #[must_use]
    pub fn releasing_broken_lines(mut self) -> Self {
        self.release_on_break = true;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = 0.0;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.constants.validate()?;
        ensure_positive("mass", self.mass)?;
        for (axis, moment) in ["inertia.x", "inertia.y", "inertia.z"]
            .into_iter()
            .zip(self.inertia.iter())
        {
            ensure_positive(axis, *moment)?;
        }
        ensure_positive("air_density", self.air_density)?;
        ensure_range("gravity", self.gravity, 0.0, f64::MAX)?;
        ensure_positive("line_length", self.line_length)?;
        ensure_range("linear_damping", self.linear_damping, 0.0, f64::MAX)?;
        ensure_range("angular_damping", self.angular_damping, 0.0, f64::MAX)?;
        ensure_range("angular_drag_coeff", self.angular_drag_coeff, 0.0, f64::MAX)?;
        if !self.min_altitude.is_finite() {
            return Err(SimError::invalid_config("min_altitude must be finite"));
        }
        ensure_positive("delta_time_max", self.delta_time_max)?;
        if self.delta_time_max > 1.0 {
            return Err(SimError::invalid_config(
                "delta_time_max > 1 second is likely an error",
            ));
        }
        if self.constraint_iterations == 0 {
            return Err(SimError::invalid_config(
                "constraint_iterations must be at least 1",
            ));
        }
        // Strictly below 1: a pass never removes the whole violation
        if !(self.constraint_relaxation > 0.0 && self.constraint_relaxation < 1.0) {
            return Err(SimError::OutsideOpenRange {
                name: "constraint_relaxation",
                value: self.constraint_relaxation,
                min: 0.0,
                max: 1.0,
            });
        }
        ensure_positive("line_break_tension", self.line_break_tension)?;
        Ok(())
    }

    /// Kite weight, N.
    pub fn weight(&self) -> f64 {
        self.mass * self.gravity
    }
}
