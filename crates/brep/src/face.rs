use std::sync::Arc;

use brep_kernel::geometry::{Curve2d, Point2d, Surface, Vec3};
use brep_kernel::mesh::discretize::EdgeDiscretizer;
use brep_kernel::mesh::{mass, uv, MeshParams};
use brep_kernel::topology::{
    builders, check, explorer, heal, EntityStore, ImportMap, Orientation, Shape, ShapeKind,
};
use brep_kernel::{primitives, KernelError, Tolerance};
use brep_types::{Cone, Cylinder, Frame, Plane, Point, Polygon, Sphere, Torus, Vector};
use tracing::debug;

use crate::conversions::{
    cone_base_frame, cylinder_base_frame, frame_from_kernel, frame_to_kernel, plane_from_kernel,
    plane_to_kernel, point_from_kernel, point_to_kernel, vector_from_kernel,
};
use crate::edge::Edge;
use crate::errors::{BrepError, Result};
use crate::kinds::SurfaceKind;
use crate::loops::Loop;
use crate::nurbs_surface::NurbsSurface;
use crate::vertex::Vertex;

/// A view of a face: a trimmed region of one surface.
#[derive(Debug, Clone)]
pub struct Face {
    store: Arc<EntityStore>,
    shape: Shape,
    surface: Surface,
}

impl Face {
    pub(crate) fn view(store: &Arc<EntityStore>, shape: Shape) -> Result<Self> {
        let sid = store.face(shape.id).map_err(BrepError::kernel("Face"))?.surface;
        let surface = store
            .surface(sid)
            .map_err(BrepError::kernel("Face"))?
            .clone();
        Ok(Self {
            store: Arc::clone(store),
            shape,
            surface,
        })
    }

    fn build(
        operation: &str,
        make: impl FnOnce(&mut EntityStore) -> std::result::Result<Shape, KernelError>,
    ) -> Result<Self> {
        let mut store = EntityStore::new();
        let shape = make(&mut store).map_err(BrepError::kernel(operation))?;
        Self::view(&Arc::new(store), shape)
    }

    /// The face of a primitive solid lying on a surface of `kind`.
    fn primitive_face(
        operation: &str,
        kind: SurfaceKind,
        make: impl FnOnce(&mut EntityStore) -> std::result::Result<Shape, KernelError>,
    ) -> Result<Self> {
        let mut scratch = EntityStore::new();
        let solid = make(&mut scratch).map_err(BrepError::kernel(operation))?;
        let faces = explorer::map_shapes(&scratch, solid, ShapeKind::Face)
            .map_err(BrepError::kernel(operation))?;
        for f in faces {
            let surface = scratch
                .face_surface(f.id)
                .map_err(BrepError::kernel(operation))?;
            if SurfaceKind::of_surface(surface) == kind {
                let (store, face) = scratch.extract(f).map_err(BrepError::kernel(operation))?;
                return Self::view(&Arc::new(store), face);
            }
        }
        Err(BrepError::construction(operation, format!("primitive has no {kind} face")))
    }

    // ─── Constructors ───────────────────────────────────────────────────────

    /// Rectangle of `plane` over the given parameter ranges.
    pub fn from_plane(plane: &Plane, domain_u: (f64, f64), domain_v: (f64, f64)) -> Result<Self> {
        let frame = plane_to_kernel(plane);
        Self::build("Face::from_plane", |store| {
            primitives::make_plane_face(store, &frame, domain_u, domain_v)
        })
    }

    /// Rectangle of the plane of `frame`, keeping the frame's x axis as u.
    pub fn from_frame(frame: &Frame, domain_u: (f64, f64), domain_v: (f64, f64)) -> Result<Self> {
        let frame = frame_to_kernel(frame);
        Self::build("Face::from_frame", |store| {
            primitives::make_plane_face(store, &frame, domain_u, domain_v)
        })
    }

    /// Lateral face of a cylinder.
    pub fn from_cylinder(cylinder: &Cylinder) -> Result<Self> {
        let frame = cylinder_base_frame(cylinder);
        Self::primitive_face("Face::from_cylinder", SurfaceKind::Cylinder, |store| {
            primitives::make_cylinder(store, &frame, cylinder.radius, cylinder.height)
        })
    }

    /// Lateral face of a cone.
    pub fn from_cone(cone: &Cone) -> Result<Self> {
        let frame = cone_base_frame(cone);
        Self::primitive_face("Face::from_cone", SurfaceKind::Cone, |store| {
            primitives::make_cone(store, &frame, cone.radius, 0.0, cone.height)
        })
    }

    pub fn from_sphere(sphere: &Sphere) -> Result<Self> {
        let frame = frame_to_kernel(&sphere.frame);
        Self::primitive_face("Face::from_sphere", SurfaceKind::Sphere, |store| {
            primitives::make_sphere(store, &frame, sphere.radius)
        })
    }

    pub fn from_torus(torus: &Torus) -> Result<Self> {
        let frame = frame_to_kernel(&torus.frame);
        Self::primitive_face("Face::from_torus", SurfaceKind::Torus, |store| {
            primitives::make_torus(store, &frame, torus.radius_axis, torus.radius_pipe)
        })
    }

    /// The whole parameter rectangle of a NURBS surface.
    pub fn from_surface(surface: &NurbsSurface) -> Result<Self> {
        let (u0, u1) = surface.domain_u();
        let (v0, v1) = surface.domain_v();
        let corners = [
            Point2d::new(u0, v0),
            Point2d::new(u1, v0),
            Point2d::new(u1, v1),
            Point2d::new(u0, v1),
        ];
        Self::build("Face::from_surface", |store| {
            let sid = store.add_surface(surface.to_surface());
            let mut edges = Vec::with_capacity(4);
            for i in 0..4 {
                let curve = Curve2d::line(corners[i], corners[(i + 1) % 4], 0.0, 1.0);
                edges.push(builders::pcurve_edge(store, sid, curve, (0.0, 1.0))?);
            }
            let wire = builders::make_wire(store, edges)?;
            store.add_face(sid, vec![wire], Tolerance::default().confusion)
        })
    }

    /// Planar face bounded by a polygon.
    pub fn from_polygon(polygon: &Polygon) -> Result<Self> {
        let points: Vec<_> = polygon.points.iter().map(point_to_kernel).collect();
        Self::build("Face::from_polygon", |store| {
            primitives::make_polygon_face(store, &points)
        })
    }

    // ─── Loops ──────────────────────────────────────────────────────────────

    /// Add a boundary loop, then put the loops back in order: the loop
    /// enclosing the largest area first, holes clockwise.
    ///
    /// A face viewed from a shape is detached from that shape by this call.
    pub fn add_loop(&mut self, l: &Loop) -> Result<()> {
        self.add_loops(std::slice::from_ref(l))
    }

    pub fn add_loops(&mut self, loops: &[Loop]) -> Result<()> {
        const OP: &str = "Face::add_loops";
        let face = self.shape.id;
        let store = Arc::make_mut(&mut self.store);
        for l in loops {
            let wire = store
                .import(l.store(), l.shape(), &mut ImportMap::default())
                .map_err(BrepError::kernel(OP))?;
            store
                .face_mut(face)
                .map_err(BrepError::kernel(OP))?
                .wires
                .push(wire);
        }
        heal::fix_face(store, face).map_err(BrepError::kernel(OP))?;
        debug!(added = loops.len(), "loops added to face");
        self.refresh(OP)
    }

    fn refresh(&mut self, operation: &str) -> Result<()> {
        let fresh = Self::view(&self.store, self.shape)
            .map_err(|e| BrepError::construction(operation, e.to_string()))?;
        *self = fresh;
        Ok(())
    }

    /// Every loop, in stored order.
    pub fn loops(&self) -> Result<Vec<Loop>> {
        self.store
            .children(self.shape)
            .map_err(BrepError::kernel("Face::loops"))?
            .into_iter()
            .map(|w| Loop::view(&self.store, w))
            .collect()
    }

    /// The loop enclosing the largest parameter area.
    pub fn outerloop(&self) -> Result<Loop> {
        const OP: &str = "Face::outerloop";
        let mut disc = EdgeDiscretizer::new(MeshParams::default());
        let loops = uv::face_loops(&self.store, self.shape.id, &mut disc)
            .map_err(BrepError::kernel(OP))?;
        let outer = loops
            .iter()
            .max_by(|a, b| a.signed_area().abs().total_cmp(&b.signed_area().abs()))
            .ok_or_else(|| BrepError::construction(OP, "face has no loops"))?;
        Loop::view(&self.store, outer.wire.composed(self.shape.orientation))
    }

    /// Every loop that is not the outer one.
    pub fn innerloops(&self) -> Result<Vec<Loop>> {
        let outer = self.outerloop()?;
        Ok(self
            .loops()?
            .into_iter()
            .filter(|l| !l.is_same(&outer))
            .collect())
    }

    pub fn edges(&self) -> Result<Vec<Edge>> {
        explorer::explore(&self.store, self.shape, ShapeKind::Edge)
            .map_err(BrepError::kernel("Face::edges"))?
            .into_iter()
            .map(|e| Edge::view(&self.store, e))
            .collect()
    }

    pub fn vertices(&self) -> Result<Vec<Vertex>> {
        explorer::explore(&self.store, self.shape, ShapeKind::Vertex)
            .map_err(BrepError::kernel("Face::vertices"))?
            .into_iter()
            .map(|v| Vertex::view(&self.store, v))
            .collect()
    }

    /// Corners of the outer loop.
    pub fn to_polygon(&self) -> Result<Polygon> {
        Ok(Polygon::new(
            self.outerloop()?
                .vertices()?
                .iter()
                .map(Vertex::point)
                .collect(),
        ))
    }

    // ─── Identity ───────────────────────────────────────────────────────────

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub(crate) fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn is_same(&self, other: &Face) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_same(&other.shape)
    }

    pub fn is_equal(&self, other: &Face) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_equal(&other.shape)
    }

    pub fn orientation(&self) -> Orientation {
        self.shape.orientation
    }

    pub fn is_reversed(&self) -> bool {
        self.shape.orientation == Orientation::Reversed
    }

    // ─── Surface ────────────────────────────────────────────────────────────

    pub fn kind(&self) -> SurfaceKind {
        SurfaceKind::of_surface(&self.surface)
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn is_plane(&self) -> bool {
        self.kind() == SurfaceKind::Plane
    }

    pub fn is_cylinder(&self) -> bool {
        self.kind() == SurfaceKind::Cylinder
    }

    pub fn is_cone(&self) -> bool {
        self.kind() == SurfaceKind::Cone
    }

    pub fn is_sphere(&self) -> bool {
        self.kind() == SurfaceKind::Sphere
    }

    pub fn is_torus(&self) -> bool {
        self.kind() == SurfaceKind::Torus
    }

    pub fn is_bezier(&self) -> bool {
        self.kind() == SurfaceKind::BezierSurface
    }

    pub fn is_bspline(&self) -> bool {
        self.kind() == SurfaceKind::BsplineSurface
    }

    fn mismatch(&self, operation: &str, expected: SurfaceKind) -> BrepError {
        BrepError::domain(operation, expected.name(), self.kind())
    }

    /// Parameter ranges covered by the face's boundary.
    pub fn domain(&self) -> Result<((f64, f64), (f64, f64))> {
        uv::face_parameter_bounds(&self.store, self.shape.id).map_err(BrepError::kernel("Face::domain"))
    }

    pub fn domain_u(&self) -> Result<(f64, f64)> {
        Ok(self.domain()?.0)
    }

    pub fn domain_v(&self) -> Result<(f64, f64)> {
        Ok(self.domain()?.1)
    }

    pub fn to_plane(&self) -> Result<Plane> {
        match &self.surface {
            Surface::Plane(p) => Ok(plane_from_kernel(&p.position)),
            _ => Err(self.mismatch("Face::to_plane", SurfaceKind::Plane)),
        }
    }

    /// The cylinder spanned by the face's height range.
    pub fn to_cylinder(&self) -> Result<Cylinder> {
        match &self.surface {
            Surface::Cylinder(c) => {
                let (v0, v1) = self.domain_v()?;
                let mut frame = frame_from_kernel(&c.position);
                frame.point = point_from_kernel(&c.position.to_global(0.0, 0.0, (v0 + v1) / 2.0));
                Ok(Cylinder::new(frame, c.radius, v1 - v0))
            }
            _ => Err(self.mismatch("Face::to_cylinder", SurfaceKind::Cylinder)),
        }
    }

    /// The full cone from the face's lower boundary to the apex.
    pub fn to_cone(&self) -> Result<Cone> {
        match &self.surface {
            Surface::Cone(c) => {
                let (v0, _) = self.domain_v()?;
                let (sa, ca) = c.semi_angle.sin_cos();
                let radius = c.radius + v0 * sa;
                if sa.abs() < Tolerance::default().angular {
                    return Err(BrepError::domain("Face::to_cone", "cone", "cylinder-like cone"));
                }
                let mut frame = frame_from_kernel(&c.position);
                frame.point = point_from_kernel(&c.position.to_global(0.0, 0.0, v0 * ca));
                Ok(Cone::new(frame, radius, radius / (sa / ca).abs()))
            }
            _ => Err(self.mismatch("Face::to_cone", SurfaceKind::Cone)),
        }
    }

    pub fn to_sphere(&self) -> Result<Sphere> {
        match &self.surface {
            Surface::Sphere(s) => Ok(Sphere {
                frame: frame_from_kernel(&s.position),
                radius: s.radius,
            }),
            _ => Err(self.mismatch("Face::to_sphere", SurfaceKind::Sphere)),
        }
    }

    pub fn to_torus(&self) -> Result<Torus> {
        match &self.surface {
            Surface::Torus(t) => Ok(Torus::new(
                frame_from_kernel(&t.position),
                t.major_radius,
                t.minor_radius,
            )),
            _ => Err(self.mismatch("Face::to_torus", SurfaceKind::Torus)),
        }
    }

    pub fn to_nurbs(&self) -> Result<NurbsSurface> {
        match &self.surface {
            Surface::BSpline(n) | Surface::Bezier(n) => Ok(NurbsSurface::from_native(n.clone())),
            _ => Err(self.mismatch("Face::to_nurbs", SurfaceKind::BsplineSurface)),
        }
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point {
        point_from_kernel(&self.surface.evaluate(u, v))
    }

    /// Normal pointing away from the material side of the face.
    pub fn normal_at(&self, u: f64, v: f64) -> Vector {
        vector_from_kernel(&self.oriented_normal(u, v))
    }

    fn oriented_normal(&self, u: f64, v: f64) -> Vec3 {
        let n = self.surface.normal(u, v);
        if self.is_reversed() {
            -n
        } else {
            n
        }
    }

    pub fn frame_at(&self, u: f64, v: f64) -> Frame {
        let (du, _) = self.surface.derivatives(u, v);
        let n = self.oriented_normal(u, v);
        let x = du.normalized_or(n.any_perpendicular());
        let y = n.cross(&x);
        Frame::new(self.point_at(u, v), vector_from_kernel(&x), vector_from_kernel(&y))
    }

    // ─── Properties ─────────────────────────────────────────────────────────

    fn mass(&self, operation: &str) -> Result<mass::MassProperties> {
        mass::mass_properties(&self.store, self.shape, &MeshParams::default())
            .map_err(BrepError::kernel(operation))
    }

    pub fn area(&self) -> Result<f64> {
        Ok(self.mass("Face::area")?.area)
    }

    pub fn centroid(&self) -> Result<Point> {
        Ok(point_from_kernel(&self.mass("Face::centroid")?.area_centroid))
    }

    pub fn is_valid(&self) -> Result<bool> {
        Ok(check::check_face(&self.store, self.shape.id)
            .map_err(BrepError::kernel("Face::is_valid"))?
            .is_empty())
    }

    /// Reorder and reorient the loops. Detaches the face from any shape it
    /// was viewed from.
    pub fn fix(&mut self) -> Result<()> {
        const OP: &str = "Face::fix";
        let face = self.shape.id;
        heal::fix_face(Arc::make_mut(&mut self.store), face).map_err(BrepError::kernel(OP))?;
        self.refresh(OP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brep_types::Circle;
    use std::f64::consts::PI;

    fn square() -> Face {
        Face::from_plane(&Plane::worldxy(), (-5.0, 5.0), (-5.0, 5.0)).unwrap()
    }

    #[test]
    fn test_plane_face_area_and_kind() {
        let f = square();
        assert!(f.is_plane());
        assert_relative_eq!(f.area().unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(f.loops().unwrap().len(), 1);
        assert!(f.innerloops().unwrap().is_empty());
        assert!(f.to_sphere().is_err());
        assert_relative_eq!(f.normal_at(0.0, 0.0).z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hole_reduces_area() {
        let mut f = square();
        let hole = Loop::from_circle(&Circle::new(
            Frame {
                point: Point::new(1.0, 1.0, 0.0),
                ..Frame::worldxy()
            },
            1.0,
        ))
        .unwrap();
        f.add_loop(&hole).unwrap();
        assert_eq!(f.loops().unwrap().len(), 2);
        assert_eq!(f.innerloops().unwrap().len(), 1);
        assert_relative_eq!(f.area().unwrap(), 100.0 - PI, epsilon = 1e-2);
        assert!(f.is_valid().unwrap());
    }

    #[test]
    fn test_add_loop_detaches_from_copy() {
        let f = square();
        let mut g = f.clone();
        let hole = Loop::from_circle(&Circle::new(Frame::worldxy(), 1.0)).unwrap();
        g.add_loop(&hole).unwrap();
        assert_eq!(f.loops().unwrap().len(), 1);
        assert_eq!(g.loops().unwrap().len(), 2);
        assert!(!f.is_same(&g));
    }

    #[test]
    fn test_cylinder_face_narrowing() {
        let c = Cylinder::new(Frame::worldxy(), 2.0, 4.0);
        let f = Face::from_cylinder(&c).unwrap();
        assert!(f.is_cylinder());
        let back = f.to_cylinder().unwrap();
        assert_relative_eq!(back.radius, 2.0);
        assert_relative_eq!(back.height, 4.0, epsilon = 1e-9);
        assert_relative_eq!(back.frame.point.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(f.area().unwrap(), 2.0 * PI * 2.0 * 4.0, epsilon = 1e-2);
    }

    #[test]
    fn test_surface_face_covers_domain() {
        let s = NurbsSurface::from_points(
            &[
                vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 3.0, 0.0)],
                vec![Point::new(2.0, 0.0, 0.0), Point::new(2.0, 3.0, 0.0)],
            ],
            1,
            1,
        )
        .unwrap();
        let f = Face::from_surface(&s).unwrap();
        assert!(f.is_bspline());
        assert_eq!(f.edges().unwrap().len(), 4);
        assert_relative_eq!(f.area().unwrap(), 6.0, epsilon = 1e-9);
        assert!(f.to_nurbs().is_ok());
    }

    #[test]
    fn test_polygon_face_round_trip() {
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ]);
        let f = Face::from_polygon(&poly).unwrap();
        let back = f.to_polygon().unwrap();
        assert_eq!(back.points.len(), 4);
        let c = f.centroid().unwrap();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_non_planar_polygon_face_is_filled() {
        let points: Vec<Point> = (0..5)
            .map(|k| {
                let a = k as f64 * 2.0 * PI / 5.0;
                Point::new(a.cos(), a.sin(), if k == 1 { 1.0 } else { 0.0 })
            })
            .collect();
        let f = Face::from_polygon(&Polygon::new(points)).unwrap();
        assert_ne!(f.kind(), SurfaceKind::Plane);
        assert!(f.is_valid().unwrap());
    }
}
