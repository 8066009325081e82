use nalgebra::Vector3;

use crate::kite::state::{clamp_norm, is_finite_vec};
use crate::kite::{KiteGeometry, KiteState};
use crate::physics::wind::WindField;

// ---------------------------------------------------------------------------
// Flat-plate coefficients
// ---------------------------------------------------------------------------
//
// The plate only feels the wind component along its normal. The normal
// force coefficient grows monotonically with the angle of attack
// (C_N = 2 sin α on [0, 90°]) and splits into lift and drag by the angle
// itself, so no per-kite tuning enters the model.

/// Normal force coefficient of a flat plate at angle of attack `alpha` (rad).
pub fn normal_coefficient(alpha: f64) -> f64 {
    2.0 * alpha.sin()
}

pub fn lift_coefficient(alpha: f64) -> f64 {
    normal_coefficient(alpha) * alpha.cos()
}

pub fn drag_coefficient(alpha: f64) -> f64 {
    normal_coefficient(alpha) * alpha.sin()
}

// ---------------------------------------------------------------------------
// Single surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceForces {
    pub lift: Vector3<f64>,        // N, perpendicular to the apparent wind
    pub drag: Vector3<f64>,        // N, along the apparent wind
    pub torque_arm: Vector3<f64>,  // m, center of mass → centroid, world frame
    pub alpha: f64,                // rad
}

impl SurfaceForces {
    pub fn zero(torque_arm: Vector3<f64>) -> Self {
        Self {
            lift: Vector3::zeros(),
            drag: Vector3::zeros(),
            torque_arm,
            alpha: 0.0,
        }
    }

    pub fn total(&self) -> Vector3<f64> {
        self.lift + self.drag
    }

    pub fn torque(&self) -> Vector3<f64> {
        self.torque_arm.cross(&self.total())
    }
}

/// Lift and drag on one flat surface.
///
/// `normal` is the surface's unit normal in world frame (either side).
/// Returns zero forces when the apparent wind is below `epsilon`.
pub fn surface_forces(
    apparent_wind: &Vector3<f64>,
    normal: &Vector3<f64>,
    area: f64,
    air_density: f64,
    torque_arm: Vector3<f64>,
    epsilon: f64,
) -> SurfaceForces {
    let speed = apparent_wind.norm();
    if speed < epsilon {
        return SurfaceForces::zero(torque_arm);
    }
    let wind_dir = apparent_wind / speed;

    let cos_normal = wind_dir.dot(normal);
    let alpha = cos_normal.abs().clamp(0.0, 1.0).asin();

    // Dynamic pressure times area
    let q_area = 0.5 * air_density * speed * speed * area;

    // Normal force pushes the plate toward the lee side
    let lee_normal = if cos_normal >= 0.0 { *normal } else { -normal };
    let resultant = lee_normal * (q_area * normal_coefficient(alpha));
    let drag = wind_dir * resultant.dot(&wind_dir);

    SurfaceForces {
        lift: resultant - drag,
        drag,
        torque_arm,
        alpha,
    }
}

// ---------------------------------------------------------------------------
// Whole kite
// ---------------------------------------------------------------------------

/// Aerodynamic loads summed over all surfaces (gravity excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct AeroLoads {
    pub force: Vector3<f64>,           // N, world frame
    pub torque: Vector3<f64>,          // N·m about the center of mass
    pub lift: Vector3<f64>,
    pub drag: Vector3<f64>,
    pub apparent_wind: Vector3<f64>,   // m/s, at the center of mass
    pub force_clamped: Option<f64>,    // original magnitude when above max_force
    pub invalid_force: Option<f64>,    // first non-finite force magnitude
    pub invalid_torque: Option<f64>,   // first non-finite torque magnitude
    pub skipped_surfaces: usize,
}

impl Default for AeroLoads {
    fn default() -> Self {
        Self {
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            lift: Vector3::zeros(),
            drag: Vector3::zeros(),
            apparent_wind: Vector3::zeros(),
            force_clamped: None,
            invalid_force: None,
            invalid_torque: None,
            skipped_surfaces: 0,
        }
    }
}

impl AeroLoads {
    /// Lift-over-drag ratio, zero when there is no drag.
    pub fn lift_to_drag(&self, epsilon: f64) -> f64 {
        let drag = self.drag.norm();
        if drag > epsilon {
            self.lift.norm() / drag
        } else {
            0.0
        }
    }

    /// Sum surface contributions. A surface whose force or torque is not
    /// finite is flagged and left out; the others still count.
    pub fn aggregate<I>(contributions: I) -> Self
    where
        I: IntoIterator<Item = SurfaceForces>,
    {
        let mut loads = AeroLoads::default();
        for c in contributions {
            let total = c.total();
            if !is_finite_vec(&total) {
                loads.invalid_force.get_or_insert(total.norm());
                loads.skipped_surfaces += 1;
                continue;
            }
            let torque = c.torque();
            if !is_finite_vec(&torque) {
                loads.invalid_torque.get_or_insert(torque.norm());
                loads.skipped_surfaces += 1;
                continue;
            }
            loads.lift += c.lift;
            loads.drag += c.drag;
            loads.force += total;
            loads.torque += torque;
        }
        loads
    }
}

/// Flat-plate model over a kite's surfaces.
#[derive(Debug, Clone)]
pub struct AerodynamicModel {
    pub air_density: f64,
    pub max_force: f64,
    pub epsilon: f64,
}

impl AerodynamicModel {
    pub fn new(air_density: f64, max_force: f64, epsilon: f64) -> Self {
        Self {
            air_density,
            max_force,
            epsilon,
        }
    }

    /// Forces on each surface. Each surface sees the wind at its centroid
    /// minus the centroid's own velocity (translation plus rotation).
    pub fn surface_loads(
        &self,
        geometry: &KiteGeometry,
        state: &KiteState,
        wind: &WindField,
        time: f64,
    ) -> Vec<SurfaceForces> {
        geometry
            .surfaces()
            .iter()
            .map(|surface| {
                let arm = state.orientation * surface.centroid;
                let centroid = state.position + arm;
                let apparent = wind.wind_at(&centroid, time) - state.point_velocity(&arm);
                let normal = state.orientation * surface.normal;
                surface_forces(
                    &apparent,
                    &normal,
                    surface.area,
                    self.air_density,
                    arm,
                    self.epsilon,
                )
            })
            .collect()
    }

    /// Net aerodynamic force and torque on the kite, clamped to `max_force`.
    pub fn compute(
        &self,
        geometry: &KiteGeometry,
        state: &KiteState,
        wind: &WindField,
        time: f64,
    ) -> AeroLoads {
        let mut loads = AeroLoads::aggregate(self.surface_loads(geometry, state, wind, time));
        loads.apparent_wind = wind.wind_at(&state.position, time) - state.velocity;

        if let Some(original) = clamp_norm(&mut loads.force, self.max_force) {
            let scale = self.max_force / original;
            loads.torque *= scale;
            loads.lift *= scale;
            loads.drag *= scale;
            loads.force_clamped = Some(original);
        }
        loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kite::presets;
    use crate::physics::wind::WindParams;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_4;

    const EPS: f64 = 1e-4;

    #[test]
    fn coefficients_follow_flat_plate() {
        assert!(lift_coefficient(0.0).abs() < 1e-12);
        assert!((lift_coefficient(FRAC_PI_4) - 1.0).abs() < 1e-12);
        assert!((drag_coefficient(FRAC_PI_4) - 1.0).abs() < 1e-12);
        assert!((drag_coefficient(std::f64::consts::FRAC_PI_2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn normal_coefficient_is_monotonic() {
        let mut prev = -1.0;
        for deg in 0..=90 {
            let cn = normal_coefficient((deg as f64).to_radians());
            assert!(cn > prev);
            prev = cn;
        }
    }

    #[test]
    fn no_force_below_epsilon() {
        let f = surface_forces(
            &Vector3::new(1e-6, 0.0, 0.0),
            &Vector3::x(),
            1.0,
            1.225,
            Vector3::z(),
            EPS,
        );
        assert_eq!(f.total(), Vector3::zeros());
    }

    #[test]
    fn head_on_plate_is_pure_drag() {
        let wind = Vector3::new(10.0, 0.0, 0.0);
        let f = surface_forces(&wind, &Vector3::x(), 0.5, 1.225, Vector3::zeros(), EPS);
        let q_area = 0.5 * 1.225 * 100.0 * 0.5;
        assert!(f.lift.norm() < 1e-9);
        assert!((f.drag.x - 2.0 * q_area).abs() < 1e-9);
    }

    #[test]
    fn drag_follows_wind_and_normal_sign_is_irrelevant() {
        let wind = Vector3::new(8.0, 0.0, 0.0);
        let normal = Vector3::new(1.0, 0.0, 1.0).normalize();
        let a = surface_forces(&wind, &normal, 0.3, 1.225, Vector3::zeros(), EPS);
        let b = surface_forces(&wind, &-normal, 0.3, 1.225, Vector3::zeros(), EPS);
        assert!((a.total() - b.total()).norm() < 1e-12);
        assert!(a.drag.x > 0.0);
        assert!(a.lift.dot(&wind).abs() < 1e-9);
        // Lee normal leans up, so the plate lifts
        assert!(a.lift.z > 1e-3);
    }

    #[test]
    fn torque_is_arm_cross_force() {
        let wind = Vector3::new(10.0, 0.0, 0.0);
        let arm = Vector3::new(0.0, 0.0, 0.5);
        let f = surface_forces(&wind, &Vector3::x(), 0.2, 1.225, arm, EPS);
        let expected = arm.cross(&f.total());
        assert!((f.torque() - expected).norm() < 1e-12);
        assert!(f.torque().y > 0.0);
    }

    #[test]
    fn non_finite_surface_is_skipped() {
        let good = SurfaceForces {
            lift: Vector3::new(0.0, 0.0, 2.0),
            drag: Vector3::new(1.0, 0.0, 0.0),
            torque_arm: Vector3::new(0.0, 0.1, 0.0),
            alpha: 0.3,
        };
        let bad_force = SurfaceForces {
            lift: Vector3::new(f64::NAN, 0.0, 0.0),
            ..good
        };
        let bad_arm = SurfaceForces {
            torque_arm: Vector3::new(f64::INFINITY, 0.0, 0.0),
            ..good
        };
        let loads = AeroLoads::aggregate([good, bad_force, bad_arm]);
        assert_eq!(loads.force, good.total());
        assert!(loads.invalid_force.is_some());
        assert!(loads.invalid_torque.is_some());
        assert_eq!(loads.skipped_surfaces, 2);
    }

    #[test]
    fn kite_facing_wind_is_pushed_downwind() {
        let kite = presets::delta().unwrap();
        let model = AerodynamicModel::new(1.225, 1000.0, EPS);
        let wind = WindField::new(WindParams::new(20.0, 0.0, 0.0));
        let state = KiteState::at_rest(
            Vector3::new(10.0, 0.0, 10.0),
            UnitQuaternion::from_euler_angles(0.0, -0.5, 0.0),
        );
        let loads = model.compute(&kite, &state, &wind, 0.0);
        assert!(loads.force.x > 0.0, "drag pushes downwind");
        assert!(loads.force.z > 0.0, "nose leaning upwind makes lift");
        assert!(loads.lift_to_drag(EPS) > 0.0);
        // Symmetric kite in symmetric wind: no side force
        assert!(loads.force.y.abs() < 1e-9);
    }

    #[test]
    fn kite_velocity_reduces_apparent_wind() {
        let kite = presets::delta().unwrap();
        let model = AerodynamicModel::new(1.225, 1000.0, EPS);
        let wind = WindField::new(WindParams::new(36.0, 0.0, 0.0));
        let mut state = KiteState::at_rest(Vector3::new(0.0, 0.0, 10.0), UnitQuaternion::identity());
        state.velocity = Vector3::new(10.0, 0.0, 0.0);
        let loads = model.compute(&kite, &state, &wind, 0.0);
        assert!(loads.apparent_wind.norm() < 1e-9);
        assert!(loads.force.norm() < 1e-9);
    }

    #[test]
    fn force_clamped_to_max() {
        let kite = presets::delta().unwrap();
        let model = AerodynamicModel::new(1.225, 5.0, EPS);
        let wind = WindField::new(WindParams::new(100.0, 0.0, 0.0));
        let state = KiteState::at_rest(Vector3::new(0.0, 0.0, 10.0), UnitQuaternion::identity());
        let loads = model.compute(&kite, &state, &wind, 0.0);
        assert!((loads.force.norm() - 5.0).abs() < 1e-9);
        assert!(loads.force_clamped.unwrap() > 5.0);
    }
}
