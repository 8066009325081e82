use nalgebra::Vector3;

use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Named structural points of a two-line kite
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Point {
    Nose,
    SpineBase,
    LeftEdge,      // left leading-edge tip
    RightEdge,
    LeftWhisker,
    RightWhisker,
    LeftControl,   // left line attachment
    RightControl,
}

impl Point {
    pub const ALL: [Point; 8] = [
        Point::Nose,
        Point::SpineBase,
        Point::LeftEdge,
        Point::RightEdge,
        Point::LeftWhisker,
        Point::RightWhisker,
        Point::LeftControl,
        Point::RightControl,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Aerodynamic surface (flat polygon)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Surface {
    pub name: String,
    pub vertices: Vec<Vector3<f64>>,   // kite frame, relative to center of mass
    pub area: f64,                     // m^2
    pub normal: Vector3<f64>,          // unit, kite frame (winding order)
    pub centroid: Vector3<f64>,        // kite frame, relative to center of mass
}

impl Surface {
    fn from_vertices(name: String, vertices: Vec<Vector3<f64>>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(SimError::invalid_geometry(format!(
                "surface '{name}' needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        // Newell normal: magnitude is twice the polygon area
        let mut newell = Vector3::zeros();
        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            newell += a.cross(b);
        }
        let area = 0.5 * newell.norm();
        if !(area > 1e-9) {
            return Err(SimError::invalid_geometry(format!(
                "surface '{name}' is degenerate (area {area})"
            )));
        }

        // Area-weighted centroid over a triangle fan
        let mut weighted = Vector3::zeros();
        let mut total = 0.0;
        for pair in vertices[1..].windows(2) {
            let tri_area = 0.5 * (pair[0] - vertices[0]).cross(&(pair[1] - vertices[0])).norm();
            weighted += (vertices[0] + pair[0] + pair[1]) / 3.0 * tri_area;
            total += tri_area;
        }
        let centroid = if total > 1e-12 {
            weighted / total
        } else {
            vertices.iter().sum::<Vector3<f64>>() / vertices.len() as f64
        };

        Ok(Self {
            name,
            normal: newell / newell.norm(),
            vertices,
            area,
            centroid,
        })
    }

    fn shifted(mut self, origin: &Vector3<f64>) -> Self {
        for v in &mut self.vertices {
            *v -= origin;
        }
        self.centroid -= origin;
        self
    }
}

// ---------------------------------------------------------------------------
// Kite geometry (immutable after construction)
// ---------------------------------------------------------------------------

/// Structural points and aerodynamic surfaces of a kite.
///
/// Points are given in a design frame (+Z toward the nose, +Y toward the
/// left tip, +X out of the back of the sail) and stored relative to the
/// center of mass, taken as the area-weighted centroid of the sail.
#[derive(Debug, Clone)]
pub struct KiteGeometry {
    pub name: String,
    points: [Vector3<f64>; 8],
    surfaces: Vec<Surface>,
    design_center_of_mass: Vector3<f64>,
}

impl KiteGeometry {
    /// Position of a named point relative to the center of mass (kite frame).
    pub fn point(&self, point: Point) -> Vector3<f64> {
        self.points[point.index()]
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn total_area(&self) -> f64 {
        self.surfaces.iter().map(|s| s.area).sum()
    }

    /// Center of mass in the design frame the points were given in.
    pub fn design_center_of_mass(&self) -> Vector3<f64> {
        self.design_center_of_mass
    }

    /// Line attachment points `[left, right]` relative to the center of mass.
    pub fn control_points(&self) -> [Vector3<f64>; 2] {
        [self.point(Point::LeftControl), self.point(Point::RightControl)]
    }

    /// Span between the leading-edge tips, m.
    pub fn span(&self) -> f64 {
        (self.point(Point::LeftEdge) - self.point(Point::RightEdge)).norm()
    }
}

// ---------------------------------------------------------------------------
// Geometry builder
// ---------------------------------------------------------------------------

pub struct KiteGeometryBuilder {
    name: String,
    points: [Vector3<f64>; 8],
    surfaces: Vec<(String, Vec<Point>)>,
}

impl KiteGeometryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: [Vector3::zeros(); 8],
            surfaces: vec![],
        }
    }

    pub fn point(mut self, point: Point, position: Vector3<f64>) -> Self {
        self.points[point.index()] = position;
        self
    }

    /// Add a flat surface through the given points, in winding order.
    pub fn surface(mut self, name: impl Into<String>, outline: &[Point]) -> Self {
        self.surfaces.push((name.into(), outline.to_vec()));
        self
    }

    pub fn build(self) -> Result<KiteGeometry> {
        if self.surfaces.is_empty() {
            return Err(SimError::invalid_geometry("kite has no surfaces"));
        }
        if self.points.iter().any(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(SimError::invalid_geometry("non-finite point coordinate"));
        }

        let surfaces = self
            .surfaces
            .into_iter()
            .map(|(name, outline)| {
                let vertices = outline.iter().map(|p| self.points[p.index()]).collect();
                Surface::from_vertices(name, vertices)
            })
            .collect::<Result<Vec<_>>>()?;

        let total_area: f64 = surfaces.iter().map(|s| s.area).sum();
        let com = surfaces
            .iter()
            .map(|s| s.centroid * s.area)
            .sum::<Vector3<f64>>()
            / total_area;

        let mut points = self.points;
        for p in &mut points {
            *p -= com;
        }

        Ok(KiteGeometry {
            name: self.name,
            points,
            surfaces: surfaces.into_iter().map(|s| s.shifted(&com)).collect(),
            design_center_of_mass: com,
        })
    }
}

// ---------------------------------------------------------------------------
// Preset kites
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Delta sport kite: 1.65 m span, 0.65 m high, whiskers 15 cm behind the sail.
    pub fn delta() -> Result<KiteGeometry> {
        delta_builder().build()
    }

    pub fn delta_builder() -> KiteGeometryBuilder {
        KiteGeometryBuilder::new("Delta")
            .point(Point::Nose, Vector3::new(0.0, 0.0, 0.65))
            .point(Point::SpineBase, Vector3::new(0.0, 0.0, 0.0))
            .point(Point::LeftEdge, Vector3::new(0.0, 0.825, 0.0))
            .point(Point::RightEdge, Vector3::new(0.0, -0.825, 0.0))
            .point(Point::LeftWhisker, Vector3::new(0.15, 0.4125, 0.1))
            .point(Point::RightWhisker, Vector3::new(0.15, -0.4125, 0.1))
            .point(Point::LeftControl, Vector3::new(-0.35, 0.15, 0.3))
            .point(Point::RightControl, Vector3::new(-0.35, -0.15, 0.3))
            // Mirrored pairs: side forces sum to exactly zero in symmetric flight
            .surface("left-outer", &[Point::Nose, Point::LeftEdge, Point::LeftWhisker])
            .surface("right-outer", &[Point::Nose, Point::RightWhisker, Point::RightEdge])
            .surface("left-inner", &[Point::Nose, Point::LeftWhisker, Point::SpineBase])
            .surface("right-inner", &[Point::Nose, Point::SpineBase, Point::RightWhisker])
    }
}
