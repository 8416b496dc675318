//! Area, volume and centroids by Gauss quadrature over the parameter-space
//! triangulation of each face.

use tracing::instrument;

use super::discretize::EdgeDiscretizer;
use super::face_mesher::FaceMesh;
use super::{mesh_faces, MeshParams};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;
use crate::topology::{EntityStore, Orientation, Shape};
use crate::types::KernelError;

/// Degree-5 rule on the reference triangle: barycentric coordinates and
/// weights summing to one.
const GAUSS: [([f64; 3], f64); 7] = [
    ([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 0.225),
    ([0.059715871789770, 0.470142064105115, 0.470142064105115], 0.132394152788506),
    ([0.470142064105115, 0.059715871789770, 0.470142064105115], 0.132394152788506),
    ([0.470142064105115, 0.470142064105115, 0.059715871789770], 0.132394152788506),
    ([0.797426985353087, 0.101286507323456, 0.101286507323456], 0.125939180544827),
    ([0.101286507323456, 0.797426985353087, 0.101286507323456], 0.125939180544827),
    ([0.101286507323456, 0.101286507323456, 0.797426985353087], 0.125939180544827),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub area: f64,
    /// Signed enclosed volume; meaningful for closed shapes.
    pub volume: f64,
    pub area_centroid: Point3d,
    /// Present when the shape encloses a non-negligible volume.
    pub volume_centroid: Option<Point3d>,
}

impl MassProperties {
    /// Volume centroid of solids, area centroid otherwise.
    pub fn centroid(&self) -> Point3d {
        self.volume_centroid.unwrap_or(self.area_centroid)
    }
}

#[derive(Default)]
struct Accumulator {
    area: f64,
    area_moment: Vec3,
    volume: f64,
    volume_moment: Vec3,
}

impl Accumulator {
    fn add_face(&mut self, surface: &Surface, mesh: &FaceMesh, sign: f64, reference: Point3d) {
        for t in &mesh.triangles {
            let (a, b, c) = (
                mesh.uvs[t[0] as usize],
                mesh.uvs[t[1] as usize],
                mesh.uvs[t[2] as usize],
            );
            // Reversed faces have their triangles flipped; the magnitude is
            // what matters here.
            let uv_area = 0.5 * (b - a).cross(&(c - a)).abs();
            for (bary, w) in GAUSS {
                let u = bary[0] * a.x + bary[1] * b.x + bary[2] * c.x;
                let v = bary[0] * a.y + bary[1] * b.y + bary[2] * c.y;
                let p = surface.evaluate(u, v) - reference;
                let (su, sv) = surface.derivatives(u, v);
                let n = su.cross(&sv) * sign;
                let dw = w * uv_area;
                let da = n.length() * dw;
                self.area += da;
                self.area_moment = self.area_moment + p * da;
                self.volume += p.dot(&n) * dw / 3.0;
                self.volume_moment = self.volume_moment
                    + Vec3::new(p.x * p.x * n.x, p.y * p.y * n.y, p.z * p.z * n.z) * (0.5 * dw);
            }
        }
    }

    fn finish(self, reference: Point3d) -> MassProperties {
        let area_centroid = if self.area > 0.0 {
            reference + self.area_moment / self.area
        } else {
            reference
        };
        let scale = self.area.powf(1.5);
        let volume_centroid = (self.volume.abs() > 1e-9 * scale && self.volume != 0.0)
            .then(|| reference + self.volume_moment / self.volume);
        MassProperties {
            area: self.area,
            volume: self.volume,
            area_centroid,
            volume_centroid,
        }
    }
}

/// Mass properties of every face of `shape`, each face oriented as seen
/// from `shape`.
#[instrument(skip(store))]
pub fn mass_properties(
    store: &EntityStore,
    shape: Shape,
    params: &MeshParams,
) -> Result<MassProperties, KernelError> {
    let mut disc = EdgeDiscretizer::new(*params);
    let faces = mesh_faces(store, shape, &mut disc)?;
    let reference = Point3d::centroid(
        &faces
            .iter()
            .flat_map(|(_, m)| m.positions.iter().copied())
            .collect::<Vec<_>>(),
    )
    .unwrap_or(Point3d::ORIGIN);
    let mut acc = Accumulator::default();
    for (face, m) in &faces {
        let sign = match face.orientation {
            Orientation::Forward => 1.0,
            Orientation::Reversed => -1.0,
        };
        acc.add_face(store.face_surface(face.id)?, m, sign, reference);
    }
    Ok(acc.finish(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frame::Ax3;
    use crate::primitives;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_properties() {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Ax3::world(), 1.0, 2.0, 4.0).unwrap();
        let m = mass_properties(&store, b, &MeshParams::default()).unwrap();
        assert_relative_eq!(m.area, 2.0 * (2.0 + 4.0 + 8.0), epsilon = 1e-9);
        assert_relative_eq!(m.volume, 8.0, epsilon = 1e-9);
        let c = m.centroid();
        assert_relative_eq!(c.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(c.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(c.z, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_centroid_off_origin() {
        let mut store = EntityStore::new();
        let frame = Ax3::new(Point3d::new(1.0, -2.0, 3.0), Vec3::new(1.0, 1.0, 0.0), Vec3::Z);
        let s = primitives::make_sphere(&mut store, &frame, 1.0).unwrap();
        let m = mass_properties(&store, s, &MeshParams::default()).unwrap();
        assert_relative_eq!(m.area, 4.0 * std::f64::consts::PI, max_relative = 1e-3);
        let c = m.centroid();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(c.y, -2.0, epsilon = 1e-6);
        assert_relative_eq!(c.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_open_face_has_no_volume_centroid() {
        let mut store = EntityStore::new();
        let f = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 2.0), (0.0, 1.0))
            .unwrap();
        let m = mass_properties(&store, f, &MeshParams::default()).unwrap();
        assert_relative_eq!(m.area, 2.0, epsilon = 1e-12);
        assert!(m.volume_centroid.is_none());
        assert_relative_eq!(m.centroid().x, 1.0, epsilon = 1e-12);
    }
}
