use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, info, trace, warn};

use crate::config::PhysicsConfig;
use crate::control::ControlBar;
use crate::dynamics::{IntegrationReport, Loads, RigidBodyIntegrator};
use crate::error::{Result, SimError};
use crate::kite::{KiteGeometry, KiteState};
use crate::lines::{catenary, HandlePositions, LineConstraintSolver, LineSide, LineState};
use crate::physics::{gravity, AerodynamicModel, WindField, WindParams};

use super::metrics::FlightMetrics;
use super::safety::{SafetyMonitor, StepSnapshot, WarningEvent};

// ---------------------------------------------------------------------------
// Step output
// ---------------------------------------------------------------------------

/// Everything one step produces for the host.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub frame: u64,
    pub time: f64,                    // s, after the step
    pub state: KiteState,
    pub lines: [LineState; 2],
    pub warnings: Vec<WarningEvent>,
    pub metrics: FlightMetrics,
    pub integration: IntegrationReport,
}

// ---------------------------------------------------------------------------
// Simulation context
// ---------------------------------------------------------------------------
//
// Owns every component explicitly; one call to `step` per host frame.
// Pipeline per step:
//   1. aerodynamic loads at the current pose and time
//   2. line tension from the current pose (applied in this same step)
//   3. rigid-body integration (gravity, ground contact, clamps)
//   4. position-based line correction and velocity update
//   5. velocity clamps again, safety inspection, metrics

pub struct Simulation {
    config: PhysicsConfig,
    geometry: KiteGeometry,
    wind: WindField,
    aero: AerodynamicModel,
    integrator: RigidBodyIntegrator,
    lines: LineConstraintSolver,
    monitor: SafetyMonitor,
    state: KiteState,
    initial: KiteState,
    frame: u64,
    time: f64,
}

impl Simulation {
    /// Validate the configuration and place the kite on the ground,
    /// downwind of a centered bar, lines at full length.
    pub fn new(config: PhysicsConfig, geometry: KiteGeometry, wind: WindParams) -> Result<Self> {
        Self::with_wind_field(config, geometry, WindField::new(wind))
    }

    /// Same as [`new`](Self::new) with an explicit turbulence seed.
    pub fn with_seed(
        config: PhysicsConfig,
        geometry: KiteGeometry,
        wind: WindParams,
        seed: u64,
    ) -> Result<Self> {
        Self::with_wind_field(config, geometry, WindField::with_seed(wind, seed))
    }

    fn with_wind_field(
        config: PhysicsConfig,
        geometry: KiteGeometry,
        wind: WindField,
    ) -> Result<Self> {
        config.validate()?;
        if geometry.surfaces().is_empty() {
            return Err(SimError::invalid_geometry("kite has no surfaces"));
        }
        let c = &config.constants;
        let aero = AerodynamicModel::new(config.air_density, c.max_force, c.epsilon);
        let integrator = RigidBodyIntegrator::new(&config);
        let lines = LineConstraintSolver::new(&config, &geometry);
        let monitor = SafetyMonitor::new(&config);
        let placeholder = KiteState::at_rest(
            Vector3::new(0.0, 0.0, config.min_altitude),
            UnitQuaternion::identity(),
        );

        let mut sim = Self {
            config,
            geometry,
            wind,
            aero,
            integrator,
            lines,
            monitor,
            state: placeholder.clone(),
            initial: placeholder,
            frame: 0,
            time: 0.0,
        };
        let bar = ControlBar::facing_wind(sim.wind.params(), sim.config.constants.control_deadzone);
        sim.launch(sim.config.min_altitude, 0.0, &bar)?;

        info!(
            kite = %sim.geometry.name,
            area = sim.geometry.total_area(),
            mass = sim.config.mass,
            line_length = sim.config.line_length,
            "simulation ready"
        );
        Ok(sim)
    }

    // --- Accessors ---

    pub fn state(&self) -> &KiteState {
        &self.state
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn geometry(&self) -> &KiteGeometry {
        &self.geometry
    }

    pub fn wind(&self) -> &WindField {
        &self.wind
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_line_attached(&self, side: LineSide) -> bool {
        self.lines.is_enabled(side)
    }

    /// New wind settings from the host, effective from the next step.
    pub fn set_wind_params(&mut self, params: WindParams) {
        debug!(
            speed_kmh = params.speed_kmh,
            direction_deg = params.direction_deg,
            turbulence_pct = params.turbulence_pct,
            "wind changed"
        );
        self.wind.set_params(params);
    }

    // --- Placement and resets ---

    /// Put the kite at rest at `altitude`, directly downwind of the bar
    /// with the lines at full length, facing the wind with the nose leaned
    /// `pitch` rad toward the pilot.
    pub fn launch(&mut self, altitude: f64, pitch: f64, bar: &ControlBar) -> Result<()> {
        let line_length = self.config.line_length;
        if !altitude.is_finite() || !pitch.is_finite() {
            return Err(SimError::invalid_config("launch altitude and pitch must be finite"));
        }
        let altitude = altitude.max(self.config.min_altitude);

        let downwind = bar.facing();
        let heading = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), bar.heading_deg.to_radians());
        let lean = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -pitch);
        let orientation = heading * lean;

        let handles = bar.handles();
        let anchors = self.geometry.control_points().map(|a| orientation * a);
        let handle_mid = (handles[0] + handles[1]) * 0.5;
        let anchor_mid = (anchors[0] + anchors[1]) * 0.5;
        let origin = Vector3::new(handle_mid.x - anchor_mid.x, handle_mid.y - anchor_mid.y, altitude);

        // Slide downwind until the first line reaches full length
        let mut reach = f64::INFINITY;
        for side in LineSide::BOTH {
            let w = origin + anchors[side.index()] - handles[side.index()];
            let wd = w.dot(&downwind);
            let disc = wd * wd - w.norm_squared() + line_length * line_length;
            if disc < 0.0 {
                return Err(SimError::Unreachable {
                    altitude,
                    line_length,
                });
            }
            reach = reach.min(-wd + disc.sqrt());
        }

        let state = KiteState::at_rest(origin + downwind * reach, orientation);
        info!(
            altitude,
            pitch,
            x = state.position.x,
            y = state.position.y,
            "kite launched"
        );
        self.reset_to(state);
        Ok(())
    }

    /// Restart from the last launch pose.
    pub fn reset(&mut self) {
        let initial = self.initial.clone();
        self.reset_to(initial);
    }

    /// Replace the kite state and restart the clock. The new state becomes
    /// the pose [`reset`](Self::reset) returns to.
    pub fn reset_to(&mut self, state: KiteState) {
        self.integrator.reset();
        self.wind.reset_clock();
        self.frame = 0;
        self.time = 0.0;
        self.initial = state.clone();
        self.state = state;
        debug!("simulation reset");
    }

    /// Stop enforcing one line (it flies free until reattached).
    pub fn release_line(&mut self, side: LineSide) {
        if self.lines.is_enabled(side) {
            info!(line = side.name(), "line released");
        }
        self.lines.set_enabled(side, false);
    }

    pub fn reattach_lines(&mut self) {
        for side in LineSide::BOTH {
            self.lines.set_enabled(side, true);
        }
        info!("lines reattached");
    }

    // --- Stepping ---

    /// Advance one frame of `dt` seconds (capped at `delta_time_max`).
    /// A non-positive `dt` leaves the state untouched (paused host).
    pub fn step(&mut self, dt: f64, handles: &HandlePositions) -> StepOutput {
        let eps = self.config.constants.epsilon;
        let aero = self.aero.compute(&self.geometry, &self.state, &self.wind, self.time);

        let step_dt = self.integrator.effective_dt(dt);
        if step_dt == 0.0 {
            let lines = self.lines.measure(&self.state, handles);
            return StepOutput {
                frame: self.frame,
                time: self.time,
                metrics: FlightMetrics::measure(&self.state, &aero, &lines, eps),
                state: self.state.clone(),
                lines,
                warnings: Vec::new(),
                integration: IntegrationReport::default(),
            };
        }

        // Tension from the pose at the start of the step
        let (tension, _) = self.lines.tension_loads(&self.state, handles);
        let mut loads = Loads::new(aero.force, aero.torque);
        loads.add(tension.force, tension.torque);

        let (mut next, mut report) = self.integrator.integrate(&self.state, &loads, step_dt);

        let inv_inertia = self.integrator.inverse_inertia_world(&next.orientation);
        let solved = self.lines.solve(
            &mut next,
            handles,
            1.0 / self.integrator.mass(),
            &inv_inertia,
            step_dt,
        );
        self.integrator.clamp_velocities(&mut next, &mut report);
        if gravity::apply_ground_clamp(
            &mut next.position,
            &mut next.velocity,
            self.config.min_altitude,
            self.config.constants.ground_friction,
        ) {
            report.grounded = true;
        }
        self.integrator.guard_non_finite(&self.state, &mut next, &mut report);

        self.wind.advance(step_dt);
        self.time += step_dt;
        self.frame += 1;

        // Aerodynamics at the post-step pose, for the reported figures
        let settled = self.aero.compute(&self.geometry, &next, &self.wind, self.time);
        next.angle_of_attack = next.angle_of_attack_in(&settled.apparent_wind, eps);

        let warnings = self.monitor.inspect(&StepSnapshot {
            frame: self.frame,
            time: self.time,
            state: &next,
            aero: &aero,
            integration: &report,
            lines: &solved,
        });

        if self.config.release_on_break {
            for side in LineSide::BOTH {
                if let Some(tension) = solved.broken[side.index()] {
                    if self.lines.is_enabled(side) {
                        warn!(line = side.name(), tension, "line broke");
                        self.release_line(side);
                    }
                }
            }
        }

        let metrics = FlightMetrics::measure(&next, &settled, &solved.lines, eps);
        trace!(
            frame = self.frame,
            altitude = metrics.altitude,
            speed = metrics.speed,
            tension_left = metrics.tension[0],
            tension_right = metrics.tension[1],
            warnings = warnings.len(),
            "step"
        );

        self.state = next.clone();
        StepOutput {
            frame: self.frame,
            time: self.time,
            state: next,
            lines: solved.lines,
            warnings,
            metrics,
            integration: report,
        }
    }

    /// Fly `steps` frames with the bar held as given; returns every step.
    pub fn run(&mut self, steps: usize, dt: f64, bar: &ControlBar) -> Vec<StepOutput> {
        let handles = bar.handles();
        (0..steps).map(|_| self.step(dt, &handles)).collect()
    }

    /// Display polyline of one line from its handle to the kite.
    pub fn line_points(&self, side: LineSide, handles: &HandlePositions) -> Vec<Vector3<f64>> {
        let anchor = self.lines.anchor_world(&self.state, side);
        catenary::sample_line(
            &handles[side.index()],
            &anchor,
            self.lines.length(),
            self.config.constants.catenary_segments,
            self.config.constants.epsilon,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kite::presets;
    use crate::sim::safety::WarningKind;

    const DT: f64 = 1.0 / 60.0;

    fn sim_with(config: PhysicsConfig, wind: WindParams) -> Simulation {
        Simulation::new(config, presets::delta().unwrap(), wind).unwrap()
    }

    fn bar_for(sim: &Simulation) -> ControlBar {
        ControlBar::facing_wind(sim.wind().params(), sim.config().constants.control_deadzone)
    }

    #[test]
    fn invalid_config_fails_construction() {
        let config = PhysicsConfig::default().with_mass(-1.0);
        let err = Simulation::new(config, presets::delta().unwrap(), WindParams::default());
        assert!(matches!(err, Err(SimError::NonPositive { name: "mass", .. })));
    }

    #[test]
    fn launch_puts_both_lines_at_full_length() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::new(20.0, 0.0, 0.0));
        let bar = bar_for(&sim);
        sim.launch(10.0, 0.3, &bar).unwrap();
        assert!((sim.state().altitude() - 10.0).abs() < 1e-12);
        assert!(sim.state().position.x > 0.0, "kite sits downwind");
        let handles = bar.handles();
        for side in LineSide::BOTH {
            let d = (sim.lines.anchor_world(sim.state(), side) - handles[side.index()]).norm();
            assert!((d - 15.0).abs() < 1e-9);
        }
    }

    #[test]
    fn launch_beyond_line_reach_is_an_error() {
        let config = PhysicsConfig::default().with_line_length(30.0);
        let mut sim = sim_with(config, WindParams::default());
        let bar = bar_for(&sim);
        assert!(sim.launch(25.0, 0.0, &bar).is_ok());
        let err = sim.launch(40.0, 0.0, &bar);
        assert!(matches!(err, Err(SimError::Unreachable { line_length, .. }) if line_length == 30.0));
    }

    #[test]
    fn quaternion_stays_unit() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::new(25.0, 15.0, 60.0));
        let mut bar = bar_for(&sim);
        sim.launch(8.0, 0.3, &bar).unwrap();
        for i in 0..600 {
            bar.set_steering(((i as f64) * 0.02).sin());
            let out = sim.step(DT, &bar.handles());
            let norm = out.state.orientation.coords.norm();
            assert!((norm - 1.0).abs() < 1e-6, "step {i}: |q| = {norm}");
        }
    }

    #[test]
    fn huge_force_clamps_once_per_step() {
        let config = PhysicsConfig::default();
        let mut integrator = RigidBodyIntegrator::new(&config);
        let monitor = SafetyMonitor::new(&config);
        let mut state = KiteState::at_rest(Vector3::new(0.0, 0.0, 20.0), UnitQuaternion::identity());
        let loads = Loads::new(Vector3::new(0.0, 1.0e6, 1.0e6), Vector3::zeros());
        for frame in 0..20 {
            let (next, report) = integrator.integrate(&state, &loads, DT);
            let accel = report.linear_acceleration.norm();
            assert!(
                (accel - config.constants.max_acceleration).abs() < 1e-9,
                "acceleration {accel} past the ceiling"
            );
            let events = monitor.inspect(&StepSnapshot {
                frame,
                time: frame as f64 * DT,
                state: &next,
                aero: &Default::default(),
                integration: &report,
                lines: &Default::default(),
            });
            let count = events
                .iter()
                .filter(|e| e.kind == WarningKind::ExcessiveAcceleration)
                .count();
            assert_eq!(count, 1, "frame {frame}");
            state = next;
        }
    }

    #[test]
    fn zero_wind_kite_stays_put() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::calm());
        let bar = bar_for(&sim);
        let start = sim.state().position;
        let handles = bar.handles();
        for _ in 0..600 {
            let out = sim.step(DT, &handles);
            assert!(out.warnings.is_empty());
        }
        let drift = (sim.state().position - start).norm();
        assert!(drift < sim.config().constants.epsilon, "drifted {drift} m");
    }

    #[test]
    fn ground_clamp_in_same_step() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::calm());
        let bar = bar_for(&sim);
        let mut buried = KiteState::at_rest(Vector3::new(4.0, 0.0, -2.0), UnitQuaternion::identity());
        buried.velocity = Vector3::new(1.0, 0.0, -5.0);
        sim.reset_to(buried);
        let out = sim.step(DT, &bar.handles());
        assert_eq!(out.state.altitude(), sim.config().min_altitude);
        assert_eq!(out.state.velocity.z, 0.0);
        assert!(out.state.velocity.x < 1.0);
        assert!(out.integration.grounded);
    }

    #[test]
    fn steady_wind_flight_is_symmetric() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::new(20.0, 0.0, 0.0));
        let bar = bar_for(&sim);
        sim.launch(10.0, 0.3, &bar).unwrap();
        let flight = sim.run(300, DT, &bar);
        let max_velocity = sim.config().constants.max_velocity;
        for out in &flight {
            assert!(out.state.speed() <= max_velocity + 1e-9);
            assert!(out.warnings.iter().all(|w| w.kind != WarningKind::PositionNan));
        }
        let last = flight.last().unwrap();
        assert!(
            last.metrics.tension_imbalance() <= 0.05,
            "tensions {:?}",
            last.metrics.tension
        );
    }

    #[test]
    fn metrics_describe_the_returned_state() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::new(20.0, 0.0, 40.0));
        let bar = bar_for(&sim);
        sim.launch(10.0, 0.3, &bar).unwrap();
        for out in sim.run(30, DT, &bar) {
            let apparent = sim.wind().wind_at(&out.state.position, out.time) - out.state.velocity;
            assert!((out.metrics.apparent_wind_speed - apparent.norm()).abs() < 1e-9);
            assert!(
                (out.metrics.angle_of_attack_deg - out.state.angle_of_attack.to_degrees()).abs()
                    < 1e-9
            );
            assert_eq!(out.metrics.altitude, out.state.altitude());
        }
    }

    #[test]
    fn paused_step_changes_nothing() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::default());
        let bar = bar_for(&sim);
        let before = sim.state().clone();
        let out = sim.step(0.0, &bar.handles());
        assert_eq!(out.state, before);
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn overstretched_lines_break_and_release() {
        let config = PhysicsConfig::default()
            .with_line_break_tension(50.0)
            .releasing_broken_lines();
        let mut sim = sim_with(config, WindParams::calm());
        let bar = bar_for(&sim);
        // About 1 m past the reach of both lines: ~220 N each
        sim.reset_to(KiteState::at_rest(Vector3::new(16.0, 0.0, 5.0), UnitQuaternion::identity()));
        let out = sim.step(DT, &bar.handles());
        let broke: Vec<_> = out
            .warnings
            .iter()
            .filter_map(|w| match w.kind {
                WarningKind::LineBreak(side) => Some(side),
                _ => None,
            })
            .collect();
        assert_eq!(broke, vec![LineSide::Left, LineSide::Right]);
        assert!(!sim.is_line_attached(LineSide::Left));
        assert!(!sim.is_line_attached(LineSide::Right));

        sim.reattach_lines();
        assert!(sim.is_line_attached(LineSide::Left) && sim.is_line_attached(LineSide::Right));
    }

    #[test]
    fn tension_below_break_threshold_holds() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::calm());
        let bar = bar_for(&sim);
        sim.reset_to(KiteState::at_rest(Vector3::new(16.0, 0.0, 5.0), UnitQuaternion::identity()));
        let out = sim.step(DT, &bar.handles());
        assert!(out.lines.iter().all(|l| l.taut && l.tension < 400.0));
        assert!(!out
            .warnings
            .iter()
            .any(|w| matches!(w.kind, WarningKind::LineBreak(_))));
    }

    #[test]
    fn line_break_is_advisory_by_default() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::calm());
        let bar = bar_for(&sim);
        sim.reset_to(KiteState::at_rest(Vector3::new(20.0, 0.0, 5.0), UnitQuaternion::identity()));
        let out = sim.step(DT, &bar.handles());
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w.kind, WarningKind::LineBreak(_))));
        assert!(sim.is_line_attached(LineSide::Left));
        assert!(out.lines.iter().all(|l| l.taut));
    }

    #[test]
    fn reset_returns_to_launch_pose() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::new(20.0, 0.0, 20.0));
        let bar = bar_for(&sim);
        sim.launch(9.0, 0.2, &bar).unwrap();
        let launched = sim.state().clone();
        sim.run(120, DT, &bar);
        assert_eq!(sim.frame(), 120);
        sim.reset();
        assert_eq!(sim.state(), &launched);
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.wind().elapsed(), 0.0);
    }

    #[test]
    fn same_seed_same_flight() {
        let wind = WindParams::new(22.0, 10.0, 50.0);
        let fly = || {
            let mut sim =
                Simulation::with_seed(PhysicsConfig::default(), presets::delta().unwrap(), wind, 99)
                    .unwrap();
            let bar = bar_for(&sim);
            sim.launch(8.0, 0.3, &bar).unwrap();
            sim.run(200, DT, &bar).pop().unwrap().state
        };
        assert_eq!(fly(), fly());
    }

    #[test]
    fn line_points_end_at_the_kite() {
        let mut sim = sim_with(PhysicsConfig::default(), WindParams::default());
        let bar = bar_for(&sim);
        sim.launch(10.0, 0.3, &bar).unwrap();
        let handles = bar.handles();
        let pts = sim.line_points(LineSide::Left, &handles);
        assert_eq!(pts.len(), sim.config().constants.catenary_segments + 1);
        assert_eq!(pts[0], handles[0]);
        let anchor = sim.lines.anchor_world(sim.state(), LineSide::Left);
        assert!((pts[pts.len() - 1] - anchor).norm() < 1e-12);
    }
}
