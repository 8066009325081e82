use crate::kite::KiteState;
use crate::lines::LineState;
use crate::physics::AeroLoads;

/// Summary figures for display, one per step. Every figure describes the
/// same pose: the state and aerodynamics passed to `measure`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightMetrics {
    pub altitude: f64,              // m
    pub speed: f64,                 // m/s
    pub apparent_wind_speed: f64,   // m/s
    pub lift: f64,                  // N
    pub drag: f64,                  // N
    pub lift_to_drag: f64,
    pub angle_of_attack_deg: f64,
    pub tension: [f64; 2],          // N, [left, right]
}

impl FlightMetrics {
    pub fn measure(
        state: &KiteState,
        aero: &AeroLoads,
        lines: &[LineState; 2],
        epsilon: f64,
    ) -> Self {
        Self {
            altitude: state.altitude(),
            speed: state.speed(),
            apparent_wind_speed: aero.apparent_wind.norm(),
            lift: aero.lift.norm(),
            drag: aero.drag.norm(),
            lift_to_drag: aero.lift_to_drag(epsilon),
            angle_of_attack_deg: state.angle_of_attack.to_degrees(),
            tension: [lines[0].tension, lines[1].tension],
        }
    }

    pub fn total_tension(&self) -> f64 {
        self.tension[0] + self.tension[1]
    }

    /// Relative difference between the two line tensions, 0 when both are slack.
    pub fn tension_imbalance(&self) -> f64 {
        let [l, r] = self.tension;
        let peak = l.max(r);
        if peak > 0.0 {
            (l - r).abs() / peak
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn metrics_follow_loads() {
        let mut state = KiteState::at_rest(Vector3::new(5.0, 0.0, 9.0), UnitQuaternion::identity());
        state.angle_of_attack = std::f64::consts::FRAC_PI_6;
        let aero = AeroLoads {
            lift: Vector3::new(0.0, 0.0, 6.0),
            drag: Vector3::new(2.0, 0.0, 0.0),
            apparent_wind: Vector3::new(3.0, 4.0, 0.0),
            ..Default::default()
        };
        let lines = [
            LineState { distance: 15.1, taut: true, tension: 20.0 },
            LineState { distance: 15.1, taut: true, tension: 19.0 },
        ];
        let m = FlightMetrics::measure(&state, &aero, &lines, 1e-4);
        assert_eq!(m.altitude, 9.0);
        assert!((m.apparent_wind_speed - 5.0).abs() < 1e-12);
        assert!((m.lift_to_drag - 3.0).abs() < 1e-12);
        assert!((m.angle_of_attack_deg - 30.0).abs() < 1e-9);
        assert_eq!(m.total_tension(), 39.0);
        assert!((m.tension_imbalance() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn slack_lines_have_no_imbalance() {
        let m = FlightMetrics::default();
        assert_eq!(m.tension_imbalance(), 0.0);
    }
}
