use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Kite kinematic state
// ---------------------------------------------------------------------------

/// Pose and velocities of the kite at one instant.
/// Frame: East-North-Up (ENU), origin at the pilot.
#[derive(Debug, Clone, PartialEq)]
pub struct KiteState {
    pub position: Vector3<f64>,             // m, center of mass
    pub orientation: UnitQuaternion<f64>,   // kite→world rotation
    pub velocity: Vector3<f64>,             // m/s
    pub angular_velocity: Vector3<f64>,     // rad/s, world frame
    pub angle_of_attack: f64,               // rad, against the apparent wind
}

impl KiteState {
    /// Kite at rest at `position` with the given orientation.
    pub fn at_rest(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            angle_of_attack: 0.0,
        }
    }

    pub fn altitude(&self) -> f64 {
        self.position.z
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Sail normal in world frame (kite +X, pointing out of the back of the sail).
    pub fn sail_normal(&self) -> Vector3<f64> {
        self.orientation * Vector3::x()
    }

    /// World position of a point given relative to the center of mass in kite frame.
    pub fn to_world(&self, local_offset: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.orientation * local_offset
    }

    /// Velocity of a body-fixed point with the given world-frame offset from the center of mass.
    pub fn point_velocity(&self, world_offset: &Vector3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity.cross(world_offset)
    }

    /// Angle between the apparent wind and the sail plane (rad).
    pub fn angle_of_attack_in(&self, apparent_wind: &Vector3<f64>, epsilon: f64) -> f64 {
        let speed = apparent_wind.norm();
        if speed < epsilon {
            return 0.0;
        }
        let sin_alpha = (apparent_wind.dot(&self.sail_normal()) / speed).abs();
        sin_alpha.clamp(0.0, 1.0).asin()
    }

    /// True when every component of the state is finite.
    pub fn is_finite(&self) -> bool {
        is_finite_vec(&self.position)
            && is_finite_vec(&self.velocity)
            && is_finite_vec(&self.angular_velocity)
            && self.orientation.coords.iter().all(|c| c.is_finite())
    }
}

pub(crate) fn is_finite_vec(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Scale `v` down to `max` magnitude. Returns the original magnitude when clamped.
pub(crate) fn clamp_norm(v: &mut Vector3<f64>, max: f64) -> Option<f64> {
    let norm = v.norm();
    if norm > max {
        *v *= max / norm;
        Some(norm)
    } else {
        None
    }
}
