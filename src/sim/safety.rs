use std::fmt;

use crate::config::PhysicsConfig;
use crate::dynamics::IntegrationReport;
use crate::kite::KiteState;
use crate::lines::{LineSide, SolveReport};
use crate::physics::AeroLoads;

// ---------------------------------------------------------------------------
// Warning events
// ---------------------------------------------------------------------------

/// Kinds of physically invalid or clamped conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    ExcessiveAcceleration,
    ExcessiveVelocity,
    ExcessiveAngular,
    InvalidForces,
    InvalidTorque,
    PositionNan,
    LineBreak(LineSide),
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::ExcessiveAcceleration => write!(f, "EXCESSIVE_ACCELERATION"),
            WarningKind::ExcessiveVelocity => write!(f, "EXCESSIVE_VELOCITY"),
            WarningKind::ExcessiveAngular => write!(f, "EXCESSIVE_ANGULAR"),
            WarningKind::InvalidForces => write!(f, "INVALID_FORCES"),
            WarningKind::InvalidTorque => write!(f, "INVALID_TORQUE"),
            WarningKind::PositionNan => write!(f, "POSITION_NAN"),
            WarningKind::LineBreak(side) => write!(f, "LINE_BREAK ({})", side.name()),
        }
    }
}

/// One warning raised during a step. `value` is the offending magnitude
/// (acceleration, velocity, tension, ...) before any clamp.
///
/// EXCESSIVE_ANGULAR carries rad/s² when the angular acceleration clamp
/// fired during the step, rad/s (the larger of the clamped or residual
/// spin rate) otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct WarningEvent {
    pub kind: WarningKind,
    pub frame: u64,
    pub time: f64,
    pub value: f64,
}

impl fmt::Display for WarningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[frame {} t={:.3}s] {} value={:.3}",
            self.frame, self.time, self.kind, self.value
        )
    }
}

// ---------------------------------------------------------------------------
// Per-step inputs to the monitor
// ---------------------------------------------------------------------------

/// Everything a finished step reports, borrowed for inspection.
pub struct StepSnapshot<'a> {
    pub frame: u64,
    pub time: f64,
    pub state: &'a KiteState,
    pub aero: &'a AeroLoads,
    pub integration: &'a IntegrationReport,
    pub lines: &'a SolveReport,
}

// ---------------------------------------------------------------------------
// Safety monitor
// ---------------------------------------------------------------------------
//
// Stateless: the same snapshot always yields the same events, at most one
// per kind (per line for LINE_BREAK). Clamps detected by the aerodynamic
// model, the integrator and the line solver all end up here.

#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    mass: f64,
    max_velocity: f64,
    max_angular_velocity: f64,
    epsilon: f64,
}

impl SafetyMonitor {
    pub fn new(config: &PhysicsConfig) -> Self {
        let c = &config.constants;
        Self {
            mass: config.mass,
            max_velocity: c.max_velocity,
            max_angular_velocity: c.max_angular_velocity,
            epsilon: c.epsilon,
        }
    }

    pub fn inspect(&self, snap: &StepSnapshot<'_>) -> Vec<WarningEvent> {
        let mut events = Vec::new();
        let mut emit = |kind: WarningKind, value: Option<f64>| {
            if let Some(value) = value {
                events.push(WarningEvent {
                    kind,
                    frame: snap.frame,
                    time: snap.time,
                    value,
                });
            }
        };
        let report = snap.integration;
        let state = snap.state;

        emit(
            WarningKind::ExcessiveAcceleration,
            largest(&[
                report.acceleration_clamped,
                snap.aero.force_clamped.map(|f| f / self.mass),
            ]),
        );

        let overspeed = (state.speed() > self.max_velocity + self.epsilon).then(|| state.speed());
        emit(
            WarningKind::ExcessiveVelocity,
            largest(&[report.velocity_clamped, overspeed]),
        );

        let spin = state.angular_velocity.norm();
        let overspin = (spin > self.max_angular_velocity + self.epsilon).then_some(spin);
        emit(
            WarningKind::ExcessiveAngular,
            report
                .angular_acceleration_clamped
                .or_else(|| largest(&[report.angular_velocity_clamped, overspin])),
        );

        emit(
            WarningKind::InvalidForces,
            snap.aero.invalid_force.or(report.invalid_force),
        );
        emit(
            WarningKind::InvalidTorque,
            snap.aero.invalid_torque.or(report.invalid_torque),
        );

        let not_finite = (!state.is_finite()).then(|| state.position.norm());
        emit(WarningKind::PositionNan, report.position_reset.or(not_finite));

        for side in LineSide::BOTH {
            emit(WarningKind::LineBreak(side), snap.lines.broken[side.index()]);
        }

        events
    }
}

/// Largest of the present values. Non-finite values win so they are not
/// hidden behind a finite one.
fn largest(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(|a, b| {
        if !a.is_finite() {
            a
        } else if !b.is_finite() || b > a {
            b
        } else {
            a
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    fn inspect_with(
        state: &KiteState,
        aero: &AeroLoads,
        integration: &IntegrationReport,
        lines: &SolveReport,
    ) -> Vec<WarningEvent> {
        let monitor = SafetyMonitor::new(&PhysicsConfig::default());
        monitor.inspect(&StepSnapshot {
            frame: 7,
            time: 0.5,
            state,
            aero,
            integration,
            lines,
        })
    }

    fn calm_state() -> KiteState {
        KiteState::at_rest(Vector3::new(10.0, 0.0, 8.0), UnitQuaternion::identity())
    }

    #[test]
    fn clean_step_raises_nothing() {
        let events = inspect_with(
            &calm_state(),
            &AeroLoads::default(),
            &IntegrationReport::default(),
            &SolveReport::default(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn acceleration_sources_merge_into_one_event() {
        let integration = IntegrationReport {
            acceleration_clamped: Some(5000.0),
            ..Default::default()
        };
        let aero = AeroLoads {
            force_clamped: Some(3100.0),
            ..Default::default()
        };
        let events = inspect_with(&calm_state(), &aero, &integration, &SolveReport::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, WarningKind::ExcessiveAcceleration);
        assert_eq!(events[0].frame, 7);
        // 3100 N on 0.31 kg is the larger acceleration
        assert!((events[0].value - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_state_is_position_nan() {
        let mut state = calm_state();
        state.position.x = f64::NAN;
        let events = inspect_with(
            &state,
            &AeroLoads::default(),
            &IntegrationReport::default(),
            &SolveReport::default(),
        );
        assert!(events.iter().any(|e| e.kind == WarningKind::PositionNan));
    }

    #[test]
    fn invalid_aero_is_reported_once() {
        let aero = AeroLoads {
            invalid_force: Some(f64::INFINITY),
            invalid_torque: Some(f64::NAN),
            ..Default::default()
        };
        let integration = IntegrationReport {
            invalid_force: Some(f64::INFINITY),
            ..Default::default()
        };
        let events = inspect_with(&calm_state(), &aero, &integration, &SolveReport::default());
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![WarningKind::InvalidForces, WarningKind::InvalidTorque]);
    }

    #[test]
    fn line_break_per_side() {
        let lines = SolveReport {
            broken: [None, Some(512.0)],
            ..Default::default()
        };
        let events = inspect_with(
            &calm_state(),
            &AeroLoads::default(),
            &IntegrationReport::default(),
            &lines,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, WarningKind::LineBreak(LineSide::Right));
        assert_eq!(events[0].value, 512.0);
    }

    #[test]
    fn angular_acceleration_takes_precedence() {
        let integration = IntegrationReport {
            angular_acceleration_clamped: Some(14.0),
            angular_velocity_clamped: Some(31.0),
            ..Default::default()
        };
        let events = inspect_with(
            &calm_state(),
            &AeroLoads::default(),
            &integration,
            &SolveReport::default(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, WarningKind::ExcessiveAngular);
        // rad/s², even though the spin rate figure is larger
        assert_eq!(events[0].value, 14.0);
    }

    #[test]
    fn angular_without_acceleration_clamp_reports_spin_rate() {
        let integration = IntegrationReport {
            angular_velocity_clamped: Some(31.0),
            ..Default::default()
        };
        let mut state = calm_state();
        state.angular_velocity = Vector3::new(0.0, 0.0, 27.0);
        let events = inspect_with(
            &state,
            &AeroLoads::default(),
            &integration,
            &SolveReport::default(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, WarningKind::ExcessiveAngular);
        assert_eq!(events[0].value, 31.0);
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(WarningKind::PositionNan.to_string(), "POSITION_NAN");
        assert_eq!(
            WarningKind::LineBreak(LineSide::Left).to_string(),
            "LINE_BREAK (left)"
        );
    }
}
