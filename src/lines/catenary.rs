use nalgebra::Vector3;

/// Sample a line between `start` and `end` for display.
///
/// A taut line (chord at or beyond `length`) is straight. A slack line
/// sags downward along a parabola whose mid-span sag matches the arc
/// length: `s = sqrt(3·d·(L − d) / 8)`, capped by the sag of a line folded
/// into a V. Returns `segments + 1` points, endpoints exact.
pub fn sample_line(
    start: &Vector3<f64>,
    end: &Vector3<f64>,
    length: f64,
    segments: usize,
    epsilon: f64,
) -> Vec<Vector3<f64>> {
    let segments = segments.max(1);
    let chord = end - start;
    let d = chord.norm();

    let sag = if length.is_finite() && d > epsilon && d < length - epsilon {
        let parabolic = (3.0 * d * (length - d) / 8.0).sqrt();
        let folded = 0.5 * (length * length - d * d).sqrt();
        parabolic.min(folded)
    } else {
        0.0
    };

    (0..=segments)
        .map(|i| {
            if i == 0 {
                return *start;
            }
            if i == segments {
                return *end;
            }
            let t = i as f64 / segments as f64;
            let mut p = start + chord * t;
            p.z -= 4.0 * sag * t * (1.0 - t);
            p
        })
        .collect()
}

/// Polyline length of sampled points.
pub fn polyline_length(points: &[Vector3<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}
