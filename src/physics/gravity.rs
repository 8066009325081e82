use nalgebra::Vector3;

/// Uniform gravity force on the kite (world frame, ENU).
pub fn gravity_force(mass: f64, gravity: f64) -> Vector3<f64> {
    Vector3::new(0.0, 0.0, -mass * gravity)
}

/// True when the center of mass rests on or below the ground floor.
pub fn on_ground(altitude: f64, min_altitude: f64) -> bool {
    altitude <= min_altitude
}

// ---------------------------------------------------------------------------
// Ground contact
// ---------------------------------------------------------------------------

/// Sliding friction on the ground, opposing horizontal velocity.
///
/// Coulomb friction `μ·m·g`, limited so that it can at most stop the
/// horizontal motion within `dt` (it never reverses it).
pub fn ground_friction_force(
    velocity: &Vector3<f64>,
    mass: f64,
    gravity: f64,
    friction: f64,
    dt: f64,
    epsilon: f64,
) -> Vector3<f64> {
    let horizontal = Vector3::new(velocity.x, velocity.y, 0.0);
    let speed = horizontal.norm();
    if speed < epsilon || dt <= 0.0 {
        return Vector3::zeros();
    }
    let coulomb = friction * mass * gravity;
    let stopping = mass * speed / dt;
    -horizontal / speed * coulomb.min(stopping)
}

/// Hard floor: lift the kite back to `min_altitude`, cancel downward
/// velocity and bleed horizontal velocity by `friction`.
/// Returns true when the floor was hit.
pub fn apply_ground_clamp(
    position: &mut Vector3<f64>,
    velocity: &mut Vector3<f64>,
    min_altitude: f64,
    friction: f64,
) -> bool {
    if position.z >= min_altitude {
        return false;
    }
    position.z = min_altitude;
    if velocity.z < 0.0 {
        velocity.z = 0.0;
    }
    let keep = 1.0 - friction.clamp(0.0, 1.0);
    velocity.x *= keep;
    velocity.y *= keep;
    true
}
