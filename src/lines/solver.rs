use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::config::PhysicsConfig;
use crate::dynamics::Loads;
use crate::kite::{KiteGeometry, KiteState};

// ---------------------------------------------------------------------------
// Line identity and per-step line state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineSide {
    Left,
    Right,
}

impl LineSide {
    /// Fixed correction order.
    pub const BOTH: [LineSide; 2] = [LineSide::Left, LineSide::Right];

    pub fn index(self) -> usize {
        match self {
            LineSide::Left => 0,
            LineSide::Right => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LineSide::Left => "left",
            LineSide::Right => "right",
        }
    }
}

/// Handle positions on the control bar, `[left, right]`, world frame.
pub type HandlePositions = [Vector3<f64>; 2];

/// One line for one step.
///
/// `tension` is a penalty-spring estimate, `line_tension_factor` times the
/// over-length. The position correction keeps the over-length small, so it
/// reads well below the load the line actually carries (the aerodynamic
/// force it holds back). Use it for display and break detection only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineState {
    pub distance: f64,   // m, kite anchor → bar handle
    pub taut: bool,
    pub tension: f64,    // N, line_tension_factor · (distance − length)
}

/// Outcome of one position-based correction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    pub lines: [LineState; 2],         // measured before correction
    pub iterations: usize,             // passes that corrected something
    pub broken: [Option<f64>; 2],      // tension when above the breaking threshold
    pub correction: Vector3<f64>,      // total positional correction, m
}

// ---------------------------------------------------------------------------
// Position-based line constraint solver
// ---------------------------------------------------------------------------
//
// Each line is an inequality constraint |anchor − handle| ≤ length. A taut
// line pulls its anchor back along the line; the correction is shared
// between translation and rotation by the generalized inverse mass of the
// anchor point, and only `relaxation` of the violation is removed per
// pass. When both lines are taut several passes run; every pass measures
// both lines on the same pose and applies the summed corrections.

#[derive(Debug, Clone)]
pub struct LineConstraintSolver {
    anchors: [Vector3<f64>; 2],   // kite frame, relative to center of mass
    length: f64,
    tolerance: f64,
    tension_factor: f64,
    relaxation: f64,
    iterations: usize,
    break_tension: f64,
    epsilon: f64,
    enabled: [bool; 2],
}

impl LineConstraintSolver {
    pub fn new(config: &PhysicsConfig, geometry: &KiteGeometry) -> Self {
        let c = &config.constants;
        Self {
            anchors: geometry.control_points(),
            length: config.line_length,
            tolerance: c.line_constraint_tolerance,
            tension_factor: c.line_tension_factor,
            relaxation: config.constraint_relaxation,
            iterations: config.constraint_iterations,
            break_tension: config.line_break_tension,
            epsilon: c.epsilon,
            enabled: [true, true],
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_enabled(&self, side: LineSide) -> bool {
        self.enabled[side.index()]
    }

    /// Release or reattach one line. A released line is never taut.
    pub fn set_enabled(&mut self, side: LineSide, enabled: bool) {
        self.enabled[side.index()] = enabled;
    }

    /// World position of a line anchor on the kite.
    pub fn anchor_world(&self, state: &KiteState, side: LineSide) -> Vector3<f64> {
        state.to_world(&self.anchors[side.index()])
    }

    /// Tension for a given anchor-handle distance.
    pub fn tension_at(&self, distance: f64) -> f64 {
        let excess = distance - self.length;
        if excess > self.tolerance {
            self.tension_factor * excess
        } else {
            0.0
        }
    }

    /// Distance, taut flag and tension of one line for the given pose.
    pub fn measure_line(
        &self,
        state: &KiteState,
        handles: &HandlePositions,
        side: LineSide,
    ) -> LineState {
        let distance = (self.anchor_world(state, side) - handles[side.index()]).norm();
        let tension = if self.is_enabled(side) {
            self.tension_at(distance)
        } else {
            0.0
        };
        LineState {
            distance,
            taut: tension > 0.0,
            tension,
        }
    }

    pub fn measure(&self, state: &KiteState, handles: &HandlePositions) -> [LineState; 2] {
        LineSide::BOTH.map(|side| self.measure_line(state, handles, side))
    }

    /// Tension pulling each taut anchor toward its handle, as a force and
    /// torque about the center of mass.
    pub fn tension_loads(
        &self,
        state: &KiteState,
        handles: &HandlePositions,
    ) -> (Loads, [LineState; 2]) {
        let lines = self.measure(state, handles);
        let mut loads = Loads::default();
        for side in LineSide::BOTH {
            let line = lines[side.index()];
            if !line.taut || line.distance < self.epsilon {
                continue;
            }
            let anchor = self.anchor_world(state, side);
            let toward_handle = (handles[side.index()] - anchor) / line.distance;
            let force = toward_handle * line.tension;
            let arm = anchor - state.position;
            loads.add(force, arm.cross(&force));
        }
        (loads, lines)
    }

    /// Correct the pose so taut lines move back toward their length, then
    /// derive velocities from the correction over `dt`.
    pub fn solve(
        &self,
        state: &mut KiteState,
        handles: &HandlePositions,
        inv_mass: f64,
        inv_inertia: &Matrix3<f64>,
        dt: f64,
    ) -> SolveReport {
        let lines = self.measure(state, handles);
        let mut report = SolveReport {
            lines,
            ..Default::default()
        };
        for side in LineSide::BOTH {
            let tension = lines[side.index()].tension;
            if tension > self.break_tension {
                report.broken[side.index()] = Some(tension);
            }
        }

        let passes = if lines.iter().all(|l| l.taut) {
            self.iterations
        } else {
            1
        };

        let start_position = state.position;
        let mut total_rotation = Vector3::zeros();

        for _ in 0..passes {
            let mut dx = Vector3::zeros();
            let mut dtheta = Vector3::zeros();
            let mut corrected = false;

            for side in LineSide::BOTH {
                if !self.is_enabled(side) {
                    continue;
                }
                let anchor = self.anchor_world(state, side);
                let offset = anchor - handles[side.index()];
                let distance = offset.norm();
                let violation = distance - self.length;
                if violation <= self.tolerance || distance < self.epsilon {
                    continue;
                }

                let n = offset / distance;
                let arm = anchor - state.position;
                let rn = arm.cross(&n);
                let w = inv_mass + rn.dot(&(inv_inertia * rn));
                if !(w > self.epsilon) {
                    continue;
                }
                let lambda = -self.relaxation * violation / w;
                dx += n * (inv_mass * lambda);
                dtheta += inv_inertia * rn * lambda;
                corrected = true;
            }

            if !corrected {
                break;
            }
            state.position += dx;
            state.orientation = UnitQuaternion::new_normalize(
                (UnitQuaternion::from_scaled_axis(dtheta) * state.orientation).into_inner(),
            );
            total_rotation += dtheta;
            report.iterations += 1;
        }

        report.correction = state.position - start_position;
        if dt > 0.0 && report.iterations > 0 {
            state.velocity += report.correction / dt;
            state.angular_velocity += total_rotation / dt;
        }
        report
    }
}
