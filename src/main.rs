use std::error::Error;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kite_sim::types::{
    presets, ControlBar, LineSide, PhysicsConfig, Simulation, StepOutput, WindParams,
};

const DT: f64 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    info!("kite-sim v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // Setup: delta kite on 15 m lines, 20 km/h steady wind
    // -----------------------------------------------------------------------
    let config = PhysicsConfig::default();
    let kite = presets::delta()?;
    let wind = WindParams::new(20.0, 0.0, 0.0);
    let mut sim = Simulation::new(config.clone(), kite, wind)?;

    let mut bar = ControlBar::facing_wind(&wind, config.constants.control_deadzone);
    sim.launch(10.0, 0.3, &bar)?;

    // -----------------------------------------------------------------------
    // Fly: 5 s centered, 2 s left turn, 2 s right turn, 3 s centered
    // -----------------------------------------------------------------------
    let mut flight: Vec<StepOutput> = Vec::new();
    for (steering, seconds) in [(0.0, 5.0), (0.6, 2.0), (-0.6, 2.0), (0.0, 3.0)] {
        bar.set_steering(steering);
        let steps = (seconds / DT) as usize;
        flight.extend(sim.run(steps, DT, &bar));
    }

    for w in flight.iter().flat_map(|s| &s.warnings) {
        warn!(kind = %w.kind, frame = w.frame, value = w.value, "physics warning");
    }

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    let max_alt = flight.iter().map(|s| s.metrics.altitude).fold(0.0_f64, f64::max);
    let max_speed = flight.iter().map(|s| s.metrics.speed).fold(0.0_f64, f64::max);
    let max_tension = flight
        .iter()
        .map(|s| s.metrics.tension[0].max(s.metrics.tension[1]))
        .fold(0.0_f64, f64::max);
    let warnings: usize = flight.iter().map(|s| s.warnings.len()).sum();
    let geometry = sim.geometry();

    println!();
    println!("====================================================================");
    println!("  KITE FLIGHT SIMULATION: {}", geometry.name);
    println!("====================================================================");
    println!();
    println!("  Kite and Lines");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Mass:          {:>8.2} kg    Sail area:    {:>8.3} m^2",
        config.mass,
        geometry.total_area()
    );
    println!(
        "  Weight:        {:>8.2} N     Wing loading: {:>8.2} N/m^2",
        config.weight(),
        config.weight() / geometry.total_area()
    );
    println!(
        "  Span:          {:>8.2} m     Line length:  {:>8.1} m",
        geometry.span(),
        config.line_length
    );
    println!(
        "  Wind:          {:>8.1} km/h  Direction:    {:>8.0} deg",
        wind.speed_kmh, wind.direction_deg
    );
    println!();

    println!("  Flight Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Max altitude:  {:>8.2} m", max_alt);
    println!("  Max speed:     {:>8.2} m/s", max_speed);
    println!("  Max tension:   {:>8.2} N", max_tension);
    println!("  Warnings:      {:>8}", warnings);
    println!();

    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>6}  {:>7}  {:>7}  {:>7}  {:>6}  {:>5}  {:>7}  {:>7}",
        "t (s)", "x (m)", "y (m)", "alt (m)", "v m/s", "L/D", "T_L (N)", "T_R (N)"
    );
    println!("  {}", "─".repeat(66));

    let sample_interval = (flight.len() / 24).max(1);
    for (i, s) in flight.iter().enumerate() {
        if i % sample_interval != 0 && i != flight.len() - 1 {
            continue;
        }
        let p = s.state.position;
        println!(
            "  {:>6.2}  {:>7.2}  {:>7.2}  {:>7.2}  {:>6.2}  {:>5.2}  {:>7.2}  {:>7.2}",
            s.time,
            p.x,
            p.y,
            p.z,
            s.metrics.speed,
            s.metrics.lift_to_drag,
            s.metrics.tension[0],
            s.metrics.tension[1]
        );
    }

    if let Some(last) = flight.last() {
        let taut = |side: LineSide| if last.lines[side.index()].taut { "taut" } else { "slack" };
        println!();
        println!(
            "  Final: AoA {:.1} deg, apparent wind {:.2} m/s, lines {}/{}",
            last.metrics.angle_of_attack_deg,
            last.metrics.apparent_wind_speed,
            taut(LineSide::Left),
            taut(LineSide::Right)
        );
    }

    println!();
    println!("  Simulation: {} steps, dt={:.4} s", flight.len(), DT);
    println!("====================================================================");
    println!();
    Ok(())
}
