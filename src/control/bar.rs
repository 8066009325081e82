use nalgebra::{UnitQuaternion, Vector3};

use crate::lines::HandlePositions;
use crate::physics::WindParams;

/// Handle spacing of a typical two-line bar, m.
pub const DEFAULT_WIDTH: f64 = 0.6;
/// Hand height above the ground, m.
pub const DEFAULT_HEIGHT: f64 = 1.0;
/// Bar rotation at full steering input, rad.
pub const DEFAULT_MAX_STEER: f64 = 0.5;

// ---------------------------------------------------------------------------
// Control bar held by the pilot
// ---------------------------------------------------------------------------
//
// The pilot faces `heading_deg` (same convention as the wind direction).
// Positive steering rotates the bar counter-clockwise seen from above,
// pulling the left handle back toward the pilot: the kite turns left.

#[derive(Debug, Clone, PartialEq)]
pub struct ControlBar {
    pub center: Vector3<f64>,   // world frame
    pub width: f64,             // m between handles
    pub heading_deg: f64,
    pub max_steer: f64,         // rad
    deadzone: f64,
    steering: f64,              // [-1, 1] after deadzone
}

impl ControlBar {
    pub fn new(center: Vector3<f64>, heading_deg: f64, deadzone: f64) -> Self {
        Self {
            center,
            width: DEFAULT_WIDTH,
            heading_deg,
            max_steer: DEFAULT_MAX_STEER,
            deadzone: deadzone.abs(),
            steering: 0.0,
        }
    }

    /// Pilot at the origin facing downwind.
    pub fn facing_wind(wind: &WindParams, deadzone: f64) -> Self {
        let heading = if wind.direction_deg.is_finite() {
            wind.direction_deg
        } else {
            0.0
        };
        Self::new(Vector3::new(0.0, 0.0, DEFAULT_HEIGHT), heading, deadzone)
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_max_steer(mut self, max_steer: f64) -> Self {
        self.max_steer = max_steer;
        self
    }

    pub fn steering(&self) -> f64 {
        self.steering
    }

    /// Set the steering input. Inputs inside the deadzone (or non-finite)
    /// read as centered; the rest is clamped to [-1, 1].
    /// Returns the applied value.
    pub fn set_steering(&mut self, input: f64) -> f64 {
        self.steering = if !input.is_finite() || input.abs() < self.deadzone {
            0.0
        } else {
            input.clamp(-1.0, 1.0)
        };
        self.steering
    }

    /// Horizontal unit vector the pilot faces.
    pub fn facing(&self) -> Vector3<f64> {
        let h = self.heading_deg.to_radians();
        Vector3::new(h.cos(), h.sin(), 0.0)
    }

    /// Bar rotation about the vertical, rad.
    pub fn steer_angle(&self) -> f64 {
        self.steering * self.max_steer
    }

    /// World positions of the `[left, right]` handles.
    pub fn handles(&self) -> HandlePositions {
        let left = Vector3::z().cross(&self.facing());
        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.steer_angle());
        let half = turn * left * (0.5 * self.width);
        [self.center + half, self.center - half]
    }
}
