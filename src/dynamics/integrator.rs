use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::config::PhysicsConfig;
use crate::kite::state::{clamp_norm, is_finite_vec};
use crate::kite::KiteState;
use crate::physics::gravity;

// ---------------------------------------------------------------------------
// External loads and integration report
// ---------------------------------------------------------------------------

/// Loads applied to the kite for one step, excluding gravity and ground
/// friction (the integrator adds those itself).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loads {
    pub force: Vector3<f64>,    // N, world frame
    pub torque: Vector3<f64>,   // N·m about the center of mass, world frame
}

impl Loads {
    pub fn new(force: Vector3<f64>, torque: Vector3<f64>) -> Self {
        Self { force, torque }
    }

    pub fn add(&mut self, force: Vector3<f64>, torque: Vector3<f64>) {
        self.force += force;
        self.torque += torque;
    }
}

/// What happened while integrating one step. Each `Option` carries the
/// offending magnitude when the matching guard fired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrationReport {
    pub dt: f64,
    pub linear_acceleration: Vector3<f64>,
    pub angular_acceleration: Vector3<f64>,
    pub acceleration_clamped: Option<f64>,
    pub angular_acceleration_clamped: Option<f64>,
    pub velocity_clamped: Option<f64>,
    pub angular_velocity_clamped: Option<f64>,
    pub invalid_force: Option<f64>,
    pub invalid_torque: Option<f64>,
    pub position_reset: Option<f64>,
    pub grounded: bool,
}

// ---------------------------------------------------------------------------
// Semi-implicit Euler rigid-body integrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RigidBodyIntegrator {
    mass: f64,
    inertia: Vector3<f64>,   // principal moments, kite frame
    gravity: f64,
    linear_damping: f64,
    angular_damping: f64,
    angular_drag_coeff: f64,
    min_altitude: f64,
    delta_time_max: f64,
    ground_friction: f64,
    epsilon: f64,
    max_velocity: f64,
    max_angular_velocity: f64,
    max_acceleration: f64,
    max_angular_acceleration: f64,
    last_valid: Option<(Vector3<f64>, UnitQuaternion<f64>)>,
}

impl RigidBodyIntegrator {
    pub fn new(config: &PhysicsConfig) -> Self {
        let c = &config.constants;
        Self {
            mass: config.mass,
            inertia: config.inertia,
            gravity: config.gravity,
            linear_damping: config.linear_damping,
            angular_damping: config.angular_damping,
            angular_drag_coeff: config.angular_drag_coeff,
            min_altitude: config.min_altitude,
            delta_time_max: config.delta_time_max,
            ground_friction: c.ground_friction,
            epsilon: c.epsilon,
            max_velocity: c.max_velocity,
            max_angular_velocity: c.max_angular_velocity,
            max_acceleration: c.max_acceleration,
            max_angular_acceleration: c.max_angular_acceleration,
            last_valid: None,
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Forget the last valid pose (after an external reset).
    pub fn reset(&mut self) {
        self.last_valid = None;
    }

    /// Step actually integrated for a requested wall-clock `dt`.
    pub fn effective_dt(&self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            dt.min(self.delta_time_max)
        } else {
            0.0
        }
    }

    /// World-frame inverse inertia tensor for the given orientation.
    pub fn inverse_inertia_world(&self, orientation: &UnitQuaternion<f64>) -> Matrix3<f64> {
        let r = orientation.to_rotation_matrix();
        let inv_body = Matrix3::from_diagonal(&self.inertia.map(|i| 1.0 / i));
        r.matrix() * inv_body * r.matrix().transpose()
    }

    /// Euler's equation `I·dω = τ − ω × (I·ω)`, evaluated in the kite frame.
    /// Takes and returns world-frame vectors.
    pub fn angular_acceleration(
        &self,
        orientation: &UnitQuaternion<f64>,
        angular_velocity: &Vector3<f64>,
        torque: &Vector3<f64>,
    ) -> Vector3<f64> {
        let to_body = orientation.inverse();
        let omega = to_body * angular_velocity;
        let tau = to_body * torque;
        let i_omega = self.inertia.component_mul(&omega);
        let gyro = omega.cross(&i_omega);
        let domega = (tau - gyro).component_div(&self.inertia);
        orientation * domega
    }

    /// Advance `state` by `dt` (capped at `delta_time_max`) under `loads`,
    /// gravity and ground contact.
    pub fn integrate(
        &mut self,
        state: &KiteState,
        loads: &Loads,
        dt: f64,
    ) -> (KiteState, IntegrationReport) {
        let dt = self.effective_dt(dt);
        let mut report = IntegrationReport {
            dt,
            ..Default::default()
        };
        if dt == 0.0 {
            return (state.clone(), report);
        }

        // --- Net force / torque ---
        let mut force = loads.force;
        if !is_finite_vec(&force) {
            report.invalid_force = Some(force.norm());
            force = Vector3::zeros();
        }
        let mut torque = loads.torque;
        if !is_finite_vec(&torque) {
            report.invalid_torque = Some(torque.norm());
            torque = Vector3::zeros();
        }
        force += gravity::gravity_force(self.mass, self.gravity);
        if gravity::on_ground(state.altitude(), self.min_altitude) {
            report.grounded = true;
            force += gravity::ground_friction_force(
                &state.velocity,
                self.mass,
                self.gravity,
                self.ground_friction,
                dt,
                self.epsilon,
            );
        }

        // --- Accelerations, clamped before integration ---
        let mut accel = force / self.mass;
        report.acceleration_clamped = clamp_norm(&mut accel, self.max_acceleration);
        let mut alpha = self.angular_acceleration(&state.orientation, &state.angular_velocity, &torque);
        if !is_finite_vec(&alpha) {
            report.invalid_torque.get_or_insert(alpha.norm());
            alpha = Vector3::zeros();
        }
        report.angular_acceleration_clamped = clamp_norm(&mut alpha, self.max_angular_acceleration);
        report.linear_acceleration = accel;
        report.angular_acceleration = alpha;

        let mut next = state.clone();

        // --- Translation ---
        next.velocity += accel * dt;
        next.velocity *= (-self.linear_damping * dt).exp();
        report.velocity_clamped = clamp_norm(&mut next.velocity, self.max_velocity);
        next.position += next.velocity * dt;

        // --- Rotation ---
        next.angular_velocity += alpha * dt;
        let spin = next.angular_velocity.norm();
        next.angular_velocity *=
            (-(self.angular_damping + self.angular_drag_coeff * spin) * dt).exp();
        report.angular_velocity_clamped =
            clamp_norm(&mut next.angular_velocity, self.max_angular_velocity);
        let delta = UnitQuaternion::from_scaled_axis(next.angular_velocity * dt);
        next.orientation = UnitQuaternion::new_normalize((delta * next.orientation).into_inner());

        // --- Ground ---
        if gravity::apply_ground_clamp(
            &mut next.position,
            &mut next.velocity,
            self.min_altitude,
            self.ground_friction,
        ) {
            report.grounded = true;
        }

        self.guard_non_finite(state, &mut next, &mut report);
        (next, report)
    }

    /// Clamp velocities after an external correction, recording into `report`.
    pub fn clamp_velocities(&self, state: &mut KiteState, report: &mut IntegrationReport) {
        if let Some(v) = clamp_norm(&mut state.velocity, self.max_velocity) {
            report.velocity_clamped.get_or_insert(v);
        }
        if let Some(w) = clamp_norm(&mut state.angular_velocity, self.max_angular_velocity) {
            report.angular_velocity_clamped.get_or_insert(w);
        }
    }

    /// Reset non-finite components to the last valid pose and remember
    /// finite results.
    pub fn guard_non_finite(
        &mut self,
        previous: &KiteState,
        next: &mut KiteState,
        report: &mut IntegrationReport,
    ) {
        let pose_ok = is_finite_vec(&next.position)
            && next.orientation.coords.iter().all(|c| c.is_finite());
        let motion_ok = is_finite_vec(&next.velocity) && is_finite_vec(&next.angular_velocity);

        if pose_ok && motion_ok {
            self.last_valid = Some((next.position, next.orientation));
            return;
        }

        report.position_reset.get_or_insert(if pose_ok {
            next.velocity.norm() + next.angular_velocity.norm()
        } else {
            next.position.norm()
        });

        if !pose_ok {
            let (position, orientation) = self.last_valid.unwrap_or_else(|| {
                if previous.is_finite() {
                    (previous.position, previous.orientation)
                } else {
                    (Vector3::new(0.0, 0.0, self.min_altitude), UnitQuaternion::identity())
                }
            });
            next.position = position;
            next.orientation = orientation;
        }
        next.velocity = Vector3::zeros();
        next.angular_velocity = Vector3::zeros();
    }
}
