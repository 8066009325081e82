use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use kite_sim::types::{presets, ControlBar, PhysicsConfig, Simulation, StepOutput, WindParams};

const DT: f64 = 1.0 / 60.0;

fn main() -> eframe::Result {
    let config = PhysicsConfig::default();
    let wind = WindParams::new(20.0, 0.0, 25.0);
    let flight = match record_flight(config, wind) {
        Ok(flight) => flight,
        Err(e) => {
            eprintln!("cannot start simulation: {e}");
            Vec::new()
        }
    };

    let app = FlightViz { flight, wind };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Kite Flight Telemetry", options, Box::new(|_| Ok(Box::new(app))))
}

/// 20 s flight with a slow figure-eight on the bar.
fn record_flight(config: PhysicsConfig, wind: WindParams) -> kite_sim::Result<Vec<StepOutput>> {
    let mut sim = Simulation::new(config.clone(), presets::delta()?, wind)?;
    let mut bar = ControlBar::facing_wind(&wind, config.constants.control_deadzone);
    sim.launch(10.0, 0.3, &bar)?;

    let steps = (20.0 / DT) as usize;
    let mut flight = Vec::with_capacity(steps);
    for i in 0..steps {
        let t = i as f64 * DT;
        bar.set_steering(0.5 * (0.6 * t).sin());
        flight.push(sim.step(DT, &bar.handles()));
    }
    Ok(flight)
}

struct FlightViz {
    flight: Vec<StepOutput>,
    wind: WindParams,
}

impl FlightViz {
    fn series(&self, f: impl Fn(&StepOutput) -> f64) -> PlotPoints<'static> {
        self.flight.iter().map(|s| [s.time, f(s)]).collect()
    }
}

impl eframe::App for FlightViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading("Delta kite, two-line flight");
            let max_alt = self.flight.iter().map(|s| s.metrics.altitude).fold(0.0_f64, f64::max);
            let warnings: usize = self.flight.iter().map(|s| s.warnings.len()).sum();
            ui.label(format!(
                "Wind: {:.0} km/h, {:.0}% turbulence  |  Max altitude: {:.1} m  |  Warnings: {}  |  Flight: {:.0} s",
                self.wind.speed_kmh,
                self.wind.turbulence_pct,
                max_alt,
                warnings,
                self.flight.last().map_or(0.0, |s| s.time),
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Altitude (m)");
                    let points = self.series(|s| s.metrics.altitude);
                    Plot::new("altitude")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Altitude", points));
                        });
                });

                ui.vertical(|ui| {
                    ui.label("Speed (m/s)");
                    let speed = self.series(|s| s.metrics.speed);
                    let apparent = self.series(|s| s.metrics.apparent_wind_speed);
                    Plot::new("speed")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Kite", speed));
                            plot_ui.line(Line::new("Apparent wind", apparent));
                        });
                });
            });

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Line tension (N)");
                    let left = self.series(|s| s.metrics.tension[0]);
                    let right = self.series(|s| s.metrics.tension[1]);
                    Plot::new("tension")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Left", left));
                            plot_ui.line(Line::new("Right", right));
                        });
                });

                ui.vertical(|ui| {
                    ui.label("Angle of attack (deg)");
                    let points = self.series(|s| s.metrics.angle_of_attack_deg);
                    Plot::new("aoa")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("AoA", points));
                        });
                });
            });
        });
    }
}
