use serde::{Deserialize, Serialize};

use crate::point::{Point, Vector};

/// A closed planar or near-planar polygon. The closing segment is implicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Newell normal scaled by twice the polygon area.
    pub fn area_vector(&self) -> Vector {
        let n = self.points.len();
        let mut acc = Vector::default();
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            acc = acc
                + Vector::new(
                    (a.y - b.y) * (a.z + b.z),
                    (a.z - b.z) * (a.x + b.x),
                    (a.x - b.x) * (a.y + b.y),
                );
        }
        acc
    }

    pub fn normal(&self) -> Option<Vector> {
        self.area_vector().unitized()
    }

    pub fn area(&self) -> f64 {
        self.area_vector().length() * 0.5
    }

    pub fn centroid(&self) -> Point {
        Point::centroid(&self.points)
    }
}

/// An indexed polygon mesh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub faces: Vec<Vec<usize>>,
}

impl Mesh {
    pub fn from_vertices_and_faces(vertices: Vec<Point>, faces: Vec<Vec<usize>>) -> Self {
        Self { vertices, faces }
    }

    pub fn from_polygons(polygons: &[Polygon]) -> Self {
        let mut mesh = Mesh::default();
        for polygon in polygons {
            let start = mesh.vertices.len();
            mesh.vertices.extend(polygon.points.iter().copied());
            mesh.faces.push((start..mesh.vertices.len()).collect());
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Append `other`, re-indexing its faces.
    pub fn join(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend(other.vertices.iter().copied());
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| f.iter().map(|i| i + offset).collect::<Vec<_>>()),
        );
    }

    /// Faces as point polygons. Faces with out-of-range indices are skipped.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        self.faces
            .iter()
            .filter_map(|f| {
                f.iter()
                    .map(|&i| self.vertices.get(i).copied())
                    .collect::<Option<Vec<_>>>()
                    .map(Polygon::new)
            })
            .collect()
    }

    /// Signed volume enclosed by a closed, consistently oriented mesh.
    pub fn volume(&self) -> f64 {
        let mut v = 0.0;
        for face in &self.faces {
            for k in 1..face.len().saturating_sub(1) {
                let (a, b, c) = (
                    self.vertices[face[0]].to_vector(),
                    self.vertices[face[k]].to_vector(),
                    self.vertices[face[k + 1]].to_vector(),
                );
                v += a.dot(&b.cross(&c));
            }
        }
        v / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetra() -> Mesh {
        Mesh::from_vertices_and_faces(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
                Point::new(0.0, 0.0, 1.0),
            ],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]],
        )
    }

    #[test]
    fn test_tetra_volume() {
        assert_relative_eq!(tetra().volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_join_reindexes() {
        let mut a = tetra();
        a.join(&tetra());
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.faces[4], vec![4, 6, 5]);
    }

    #[test]
    fn test_polygon_area() {
        let p = Polygon::new(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 3.0, 0.0),
            Point::new(0.0, 3.0, 0.0),
        ]);
        assert_relative_eq!(p.area(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(p.normal().unwrap().z, 1.0, epsilon = 1e-12);
    }
}
