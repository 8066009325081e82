//! Wind field: steady horizontal wind plus smooth, bounded turbulence.
//!
//! Direction convention: 0° blows toward +X (East); angles grow
//! counter-clockwise seen from above, so 90° blows toward +Y (North).
//! The control bar and launch placement use the same convention.

use std::f64::consts::TAU;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::KMH_TO_MS;

/// Gust amplitude at 100 % turbulence, as a fraction of the base speed.
const MAX_GUST_FRACTION: f64 = 0.5;
/// Vertical gusts are weaker than horizontal ones near the ground.
const VERTICAL_GUST_SCALE: f64 = 0.3;
/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 0x6b69_7465;

// ---------------------------------------------------------------------------
// Wind parameters (set by the host UI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindParams {
    pub speed_kmh: f64,
    pub direction_deg: f64,
    pub turbulence_pct: f64,
}

impl WindParams {
    /// Speed is floored at zero and turbulence clamped to [0, 100] %.
    pub fn new(speed_kmh: f64, direction_deg: f64, turbulence_pct: f64) -> Self {
        Self {
            speed_kmh: speed_kmh.max(0.0),
            direction_deg,
            turbulence_pct: turbulence_pct.clamp(0.0, 100.0),
        }
    }

    pub fn calm() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Base speed in m/s (zero for non-finite or negative input).
    pub fn speed_ms(&self) -> f64 {
        if self.speed_kmh.is_finite() {
            self.speed_kmh.max(0.0) * KMH_TO_MS
        } else {
            0.0
        }
    }

    /// Horizontal unit vector the wind blows toward.
    pub fn direction(&self) -> Vector3<f64> {
        let theta = if self.direction_deg.is_finite() {
            self.direction_deg.to_radians()
        } else {
            0.0
        };
        Vector3::new(theta.cos(), theta.sin(), 0.0)
    }

    /// Turbulence as a fraction in [0, 1].
    pub fn turbulence(&self) -> f64 {
        if self.turbulence_pct.is_finite() {
            self.turbulence_pct.clamp(0.0, 100.0) / 100.0
        } else {
            0.0
        }
    }
}

impl Default for WindParams {
    fn default() -> Self {
        Self::new(20.0, 0.0, 10.0)
    }
}

// ---------------------------------------------------------------------------
// Gust modes (frozen turbulence advected with the mean wind)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct GustMode {
    weight: f64,              // weights sum to 1 so each axis stays in [-1, 1]
    frequency: f64,           // rad/s
    cross: Vector3<f64>,      // rad/m, spatial variation across the wind
    phase: [f64; 3],          // per axis
}

const MODE_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];
const MODE_FREQUENCIES: [f64; 3] = [0.4, 1.1, 2.3];

#[derive(Debug, Clone)]
pub struct WindField {
    params: WindParams,
    modes: [GustMode; 3],
    elapsed: f64,
}

impl WindField {
    pub fn new(params: WindParams) -> Self {
        Self::with_seed(params, DEFAULT_SEED)
    }

    /// Same seed and time sequence give the same gusts.
    pub fn with_seed(params: WindParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let modes = std::array::from_fn(|i| GustMode {
            weight: MODE_WEIGHTS[i],
            frequency: MODE_FREQUENCIES[i] * rng.gen_range(0.8..1.25),
            cross: Vector3::new(
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.02..0.02),
            ),
            phase: [
                rng.gen_range(0.0..TAU),
                rng.gen_range(0.0..TAU),
                rng.gen_range(0.0..TAU),
            ],
        });
        Self {
            params,
            modes,
            elapsed: 0.0,
        }
    }

    pub fn params(&self) -> &WindParams {
        &self.params
    }

    pub fn set_params(&mut self, params: WindParams) {
        self.params = params;
    }

    /// Time accumulated through [`advance`](Self::advance), s.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn advance(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    pub fn reset_clock(&mut self) {
        self.elapsed = 0.0;
    }

    /// Steady component of the wind, m/s.
    pub fn base_wind(&self) -> Vector3<f64> {
        self.params.direction() * self.params.speed_ms()
    }

    /// Wind velocity at `position` and simulation time `time`, m/s.
    ///
    /// Pure function of its arguments and the parameters; always finite.
    pub fn wind_at(&self, position: &Vector3<f64>, time: f64) -> Vector3<f64> {
        let speed = self.params.speed_ms();
        let base = self.params.direction() * speed;
        let amplitude = speed * MAX_GUST_FRACTION * self.params.turbulence();
        if amplitude <= 0.0 || !time.is_finite() {
            return base;
        }

        let pos = if position.iter().all(|c| c.is_finite()) {
            *position
        } else {
            Vector3::zeros()
        };

        // Gusts travel downwind at the mean speed, so the along-wind
        // wavenumber is frequency / speed.
        let along = self.params.direction() / speed.max(1.0);
        let mut gust = Vector3::zeros();
        for mode in &self.modes {
            let wave = mode.frequency * along + mode.cross;
            let arg = mode.frequency * time - wave.dot(&pos);
            for axis in 0..3 {
                gust[axis] += mode.weight * (arg + mode.phase[axis]).sin();
            }
        }
        gust.z *= VERTICAL_GUST_SCALE;

        base + gust * amplitude
    }

    /// Wind at `position` at the accumulated time.
    pub fn current(&self, position: &Vector3<f64>) -> Vector3<f64> {
        self.wind_at(position, self.elapsed)
    }
}
