//! Reconstruction of a [`Brep`] from face records.
//!
//! Only the face records are read; the top-level vertex and edge lists of
//! [`BrepData`] are informational. Edges written in 3D are shared between
//! faces when their records match exactly, vertices when their coordinates
//! do. Edges written in a parameter plane belong to their face.

use std::collections::HashMap;

use brep_kernel::geometry::{
    CylindricalSurface, Curve, Curve2d, Line3d, PlaneSurface, SphericalSurface, Surface,
};
use brep_kernel::topology::{
    builders, check, heal, EntityStore, Orientation, Shape, SurfaceId,
};
use brep_kernel::Tolerance;
use brep_types::{Circle, Cylinder, Ellipse, Line, Point, Sphere};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::brep::Brep;
use crate::conversions::{
    circle2d_to_kernel, circle_to_kernel, ellipse2d_to_kernel, ellipse_to_kernel,
    frame_to_kernel, line2d_to_kernel, point_to_kernel, vector_to_kernel,
};
use crate::data::{BrepData, EdgeData, FaceData, NurbsCurveData, NurbsSurfaceData};
use crate::errors::{BrepError, Result};
use crate::kinds::{CurveKind, SurfaceKind};
use crate::nurbs_curve::NurbsCurve;
use crate::nurbs_surface::NurbsSurface;

const OP: &str = "Brep::from_data";

fn decode<T: DeserializeOwned>(what: &str, value: &serde_json::Value) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| BrepError::construction(OP, format!("bad {what} payload: {e}")))
}

fn unsupported(what: &str, kind: impl std::fmt::Display) -> BrepError {
    BrepError::construction(OP, format!("unsupported {what} type: {kind}"))
}

fn point_key(p: &Point) -> [u64; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

fn edge_key(record: &EdgeData) -> String {
    format!(
        "{}|{}|{:x}|{:x}",
        record.kind,
        record.curve,
        record.domain[0].to_bits(),
        record.domain[1].to_bits()
    )
}

/// Incremental builder of a shell from face records.
#[derive(Debug, Default)]
pub struct BrepBuilder {
    store: EntityStore,
    vertices: HashMap<[u64; 3], Shape>,
    edges: HashMap<String, Shape>,
    faces: Vec<Shape>,
}

impl BrepBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn vertex(&mut self, p: &Point) -> Shape {
        let store = &mut self.store;
        *self
            .vertices
            .entry(point_key(p))
            .or_insert_with(|| store.add_vertex(point_to_kernel(p), Tolerance::default().confusion))
    }

    fn surface(face: &FaceData) -> Result<Surface> {
        let position = frame_to_kernel(&face.frame);
        Ok(match face.kind {
            SurfaceKind::Plane => Surface::Plane(PlaneSurface { position }),
            SurfaceKind::Cylinder => {
                let c: Cylinder = decode("cylinder", &face.surface)?;
                Surface::Cylinder(CylindricalSurface {
                    position,
                    radius: c.radius,
                })
            }
            SurfaceKind::Sphere => {
                let s: Sphere = decode("sphere", &face.surface)?;
                Surface::Sphere(SphericalSurface {
                    position,
                    radius: s.radius,
                })
            }
            SurfaceKind::BsplineSurface => {
                let data: NurbsSurfaceData = decode("bspline surface", &face.surface)?;
                NurbsSurface::from_data(&data)?.to_surface()
            }
            SurfaceKind::BezierSurface => {
                let data: NurbsSurfaceData = decode("bezier surface", &face.surface)?;
                Surface::Bezier(NurbsSurface::from_data(&data)?.native().clone())
            }
            other => return Err(unsupported("surface", other)),
        })
    }

    fn curve3d(record: &EdgeData) -> Result<Curve> {
        Ok(match record.kind {
            CurveKind::Line => {
                let line: Line = decode("line", &record.curve)?;
                let a = point_to_kernel(&line.start);
                let dir = vector_to_kernel(&(line.end - line.start))
                    .normalized()
                    .ok_or_else(|| BrepError::construction(OP, "zero-length line"))?;
                Curve::Line(Line3d::new(a + dir * -record.domain[0], dir))
            }
            CurveKind::Circle => {
                let c: Circle = decode("circle", &record.curve)?;
                Curve::Circle(circle_to_kernel(&c))
            }
            CurveKind::Ellipse => {
                let e: Ellipse = decode("ellipse", &record.curve)?;
                Curve::Ellipse(ellipse_to_kernel(&e))
            }
            CurveKind::Bspline => {
                let data: NurbsCurveData = decode("bspline", &record.curve)?;
                NurbsCurve::from_data(&data)?.to_curve()
            }
            other => return Err(unsupported("3D curve", other)),
        })
    }

    fn curve2d(record: &EdgeData) -> Result<Curve2d> {
        let range = (record.domain[0], record.domain[1]);
        Ok(match record.kind {
            CurveKind::Line => line2d_to_kernel(&decode::<Line>("line", &record.curve)?, range),
            CurveKind::Circle => circle2d_to_kernel(&decode::<Circle>("circle", &record.curve)?),
            CurveKind::Ellipse => {
                ellipse2d_to_kernel(&decode::<Ellipse>("ellipse", &record.curve)?)
            }
            CurveKind::Bspline => {
                let data: NurbsCurveData = decode("bspline", &record.curve)?;
                Curve2d::BSpline(NurbsCurve::from_data(&data)?.native().clone())
            }
            other => return Err(unsupported("2D curve", other)),
        })
    }

    /// Edge occurrence for `record` on the surface `sid`.
    fn edge(
        &mut self,
        record: &EdgeData,
        sid: SurfaceId,
        local: &mut HashMap<String, Shape>,
    ) -> Result<Shape> {
        let key = edge_key(record);
        let range = (record.domain[0], record.domain[1]);
        let shared = match record.dimension {
            3 => self.edges.get(&key).copied(),
            2 => local.get(&key).copied(),
            d => {
                return Err(BrepError::construction(
                    OP,
                    format!("edge dimension must be 2 or 3, got {d}"),
                ))
            }
        };
        let edge = match shared {
            Some(e) => e,
            None if record.dimension == 3 => {
                let curve = Self::curve3d(record)?;
                let v0 = self.vertex(&record.start);
                let v1 = self.vertex(&record.end);
                let e = builders::curve_edge(&mut self.store, curve, range, Some(v0), Some(v1))
                    .map_err(BrepError::kernel(OP))?;
                self.edges.insert(key, e);
                e
            }
            None => {
                let curve = Self::curve2d(record)?;
                let e = if self.collapses(sid, &curve, range)? {
                    let v = self.vertex(&record.start);
                    builders::degenerated_edge(&mut self.store, v, sid, curve, range)
                } else {
                    builders::pcurve_edge(&mut self.store, sid, curve, range)
                }
                .map_err(BrepError::kernel(OP))?;
                local.insert(key, e);
                e
            }
        };
        Ok(match record.orientation {
            Orientation::Forward => edge,
            Orientation::Reversed => edge.reversed(),
        })
    }

    /// Whether a parameter-plane curve maps to a single point in space.
    fn collapses(&self, sid: SurfaceId, curve: &Curve2d, range: (f64, f64)) -> Result<bool> {
        let surface = self.store.surface(sid).map_err(BrepError::kernel(OP))?;
        let at = |t: f64| {
            let p = curve.evaluate(t);
            surface.evaluate(p.x, p.y)
        };
        let a = at(range.0);
        let tol = Tolerance::default().sewing;
        Ok([0.5, 1.0]
            .iter()
            .all(|s| a.distance_to(&at(range.0 + (range.1 - range.0) * s)) < tol))
    }

    /// Add one face; the first loop is the outer boundary.
    pub fn add_face(&mut self, face: &FaceData) -> Result<Shape> {
        if face.loops.is_empty() {
            return Err(BrepError::construction(OP, "face has no loops"));
        }
        let sid = self.store.add_surface(Self::surface(face)?);
        let mut local = HashMap::new();
        let mut wires = Vec::with_capacity(face.loops.len());
        for records in &face.loops {
            let edges = records
                .iter()
                .map(|r| self.edge(r, sid, &mut local))
                .collect::<Result<Vec<_>>>()?;
            wires.push(builders::make_wire(&mut self.store, edges).map_err(BrepError::kernel(OP))?);
        }
        let shape = self
            .store
            .add_face(sid, wires, Tolerance::default().confusion)
            .map_err(BrepError::kernel(OP))?;
        let defects = check::check_face(&self.store, shape.id).map_err(BrepError::kernel(OP))?;
        if !defects.is_empty() {
            debug!(defects = defects.len(), "fixing rebuilt face");
            heal::fix_face(&mut self.store, shape.id).map_err(BrepError::kernel(OP))?;
        }
        let shape = match face.orientation {
            Orientation::Forward => shape,
            Orientation::Reversed => shape.reversed(),
        };
        self.faces.push(shape);
        Ok(shape)
    }

    /// Shell of the added faces, healed, and made solid when `solid` is set
    /// and the shell is closed.
    pub fn finish(mut self, solid: bool) -> Result<Brep> {
        let shell = self
            .store
            .add_shell(self.faces, false)
            .map_err(BrepError::kernel(OP))?;
        let mut brep = Brep::from_parts(self.store, shell);
        brep.heal()?;
        if solid {
            brep.make_solid()?;
        }
        Ok(brep)
    }
}

#[instrument(skip_all, fields(faces = data.faces.len()))]
pub(crate) fn build_brep(data: &BrepData) -> Result<Brep> {
    let mut builder = BrepBuilder::new();
    for face in &data.faces {
        builder.add_face(face)?;
    }
    let brep = builder.finish(true)?;
    info!(kind = ?brep.kind()?, "brep rebuilt");
    Ok(brep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::Face;
    use crate::loops::Loop;
    use approx::assert_relative_eq;
    use brep_types::{Cuboid, Frame, Plane, Vector};

    fn holed_face() -> Brep {
        let mut face = Face::from_plane(&Plane::worldxy(), (-10.0, 10.0), (-10.0, 10.0)).unwrap();
        let at = |x: f64, y: f64| Frame {
            point: Point::new(x, y, 0.0),
            ..Frame::worldxy()
        };
        let holes = [
            Loop::from_circle(&Circle::new(at(-5.0, -5.0), 1.0)).unwrap(),
            Loop::from_circle(&Circle::new(at(4.0, 4.0), 2.0)).unwrap(),
            Loop::from_circle(&Circle::new(at(5.0, -5.0), 0.5)).unwrap(),
        ];
        face.add_loops(&holes).unwrap();
        Brep::from_faces(&[face]).unwrap()
    }

    #[test]
    fn test_box_round_trip() {
        let b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 2.0, 3.0)).unwrap();
        let data = b.to_data().unwrap();
        assert_eq!(data.faces.len(), 6);
        assert!(data.faces.iter().all(|f| f.kind == SurfaceKind::Plane));
        let back = Brep::from_data(&data).unwrap();
        assert!(back.is_solid().unwrap());
        assert_eq!(back.faces().unwrap().len(), 6);
        assert_eq!(back.points().unwrap().len(), 8);
        assert_relative_eq!(back.volume().unwrap(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_holes_survive_round_trip() {
        let b = holed_face();
        let data = b.to_data().unwrap();
        assert_eq!(data.faces[0].loops.len(), 4);
        assert!(data.faces[0].loops[1..]
            .iter()
            .all(|l| l.len() == 1 && l[0].kind == CurveKind::Circle));

        let back = Brep::from_json(&b.to_json().unwrap()).unwrap();
        let faces = back.faces().unwrap();
        assert_eq!(faces.len(), 1);
        assert!(faces[0].is_plane());
        assert_eq!(faces[0].loops().unwrap().len(), 4);
        assert_eq!(faces[0].innerloops().unwrap().len(), 3);
        assert_relative_eq!(
            back.area().unwrap(),
            b.area().unwrap(),
            epsilon = 1e-6
        );

        let again = back.to_data().unwrap();
        let sizes = |d: &BrepData| -> Vec<usize> { d.faces[0].loops.iter().map(Vec::len).collect() };
        assert_eq!(sizes(&again), sizes(&data));
    }

    #[test]
    fn test_cylinder_round_trip() {
        let c = Cylinder::new(Frame::worldxy(), 1.0, 2.0);
        let b = Brep::from_cylinder(&c).unwrap();
        let back = Brep::from_data(&b.to_data().unwrap()).unwrap();
        assert!(back.is_solid().unwrap());
        assert_relative_eq!(back.volume().unwrap(), b.volume().unwrap(), epsilon = 1e-6);
        assert!(back.faces().unwrap().iter().any(Face::is_cylinder));
    }

    #[test]
    fn test_sphere_poles_are_written_in_parameter_plane() {
        let b = Brep::from_sphere(&Sphere::new(Point::origin(), 1.0)).unwrap();
        let data = b.to_data().unwrap();
        assert!(data.faces[0]
            .loops
            .iter()
            .flatten()
            .any(|e| e.dimension == 2));
        let back = Brep::from_data(&data).unwrap();
        assert_relative_eq!(back.volume().unwrap(), b.volume().unwrap(), epsilon = 1e-6);
    }

    #[test]
    fn test_parameter_plane_edges() {
        let s = NurbsSurface::from_points(
            &[
                vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.5)],
                vec![Point::new(1.0, 0.0, 0.0), Point::new(1.0, 1.0, 0.5)],
            ],
            1,
            1,
        )
        .unwrap();
        let b = Brep::from_faces(&[Face::from_surface(&s).unwrap()]).unwrap();
        let data = b.to_data().unwrap();
        assert_eq!(data.faces[0].kind, SurfaceKind::BsplineSurface);
        assert!(data.faces[0].loops[0].iter().all(|e| e.dimension == 2));
        let back = Brep::from_data(&data).unwrap();
        assert_relative_eq!(back.area().unwrap(), b.area().unwrap(), epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_surface_is_construction_error() {
        let b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
        let mut data = b.to_data().unwrap();
        data.faces[0].kind = SurfaceKind::Torus;
        let err = Brep::from_data(&data).unwrap_err();
        assert!(matches!(err, BrepError::Construction { .. }));
        assert_eq!(err.operation(), OP);
    }

    #[test]
    fn test_unknown_curve_is_construction_error() {
        let b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
        let mut data = b.to_data().unwrap();
        data.faces[2].loops[0][1].kind = CurveKind::Other;
        assert!(matches!(
            Brep::from_data(&data),
            Err(BrepError::Construction { .. })
        ));

        let mut data = b.to_data().unwrap();
        data.faces[0].loops[0][0].curve = serde_json::json!({"radius": "wide"});
        assert!(matches!(
            Brep::from_data(&data),
            Err(BrepError::Construction { .. })
        ));
    }

    #[test]
    fn test_reversed_face_orientation_is_kept() {
        let f = Face::from_plane(&Plane::new(Point::origin(), Vector::zaxis()), (0.0, 1.0), (0.0, 1.0))
            .unwrap();
        let mut data = Brep::from_faces(&[f]).unwrap().to_data().unwrap();
        data.faces[0].orientation = Orientation::Reversed;
        let back = Brep::from_data(&data).unwrap();
        let face = back.faces().unwrap().remove(0);
        assert_relative_eq!(face.normal_at(0.5, 0.5).z, -1.0, epsilon = 1e-12);
    }
}
