use std::f64::consts::PI;
use std::sync::Arc;

use brep_kernel::geometry::{Curve, Curve2d, Point3d};
use brep_kernel::topology::{builders, check, EntityStore, Orientation, Shape, TEdge};
use brep_kernel::KernelError;
use brep_types::{Circle, Ellipse, Hyperbola, Line, Parabola, Point, Polyline};

use crate::conversions::{
    circle_from_kernel, circle_to_kernel, ellipse_from_kernel, ellipse_to_kernel,
    hyperbola_from_kernel, line_from_kernel, line_to_kernel, parabola_from_kernel,
    point_from_kernel, point_to_kernel,
};
use crate::errors::{BrepError, Result};
use crate::kinds::CurveKind;
use crate::nurbs_curve::NurbsCurve;
use crate::nurbs_surface::NurbsSurface;
use crate::vertex::Vertex;

/// A view of an edge occurrence.
#[derive(Debug, Clone)]
pub struct Edge {
    store: Arc<EntityStore>,
    shape: Shape,
    edge: TEdge,
}

impl Edge {
    pub(crate) fn view(store: &Arc<EntityStore>, shape: Shape) -> Result<Self> {
        let edge = store
            .edge(shape.id)
            .map_err(BrepError::kernel("Edge"))?
            .clone();
        Ok(Self {
            store: Arc::clone(store),
            shape,
            edge,
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

    // ─── Constructors ───────────────────────────────────────────────────────

    pub fn from_point_point(a: &Point, b: &Point) -> Result<Self> {
        Self::build("Edge::from_point_point", |store| {
            let tol = brep_kernel::Tolerance::default().confusion;
            let v0 = store.add_vertex(point_to_kernel(a), tol);
            let v1 = store.add_vertex(point_to_kernel(b), tol);
            builders::line_edge(store, v0, v1)
        })
    }

    /// Straight edge between the positions of two vertices. The new edge
    /// gets vertices of its own.
    pub fn from_vertex_vertex(a: &Vertex, b: &Vertex) -> Result<Self> {
        let (a, b) = (point_to_kernel(&a.point()), point_to_kernel(&b.point()));
        Self::build("Edge::from_vertex_vertex", |store| {
            let tol = brep_kernel::Tolerance::default().confusion;
            let v0 = store.add_vertex(a, tol);
            let v1 = store.add_vertex(b, tol);
            builders::line_edge(store, v0, v1)
        })
    }

    pub fn from_line(line: &Line) -> Result<Self> {
        let (l, range) = line_to_kernel(line);
        Self::from_kernel_curve("Edge::from_line", Curve::Line(l), range)
    }

    /// Full circle.
    pub fn from_circle(circle: &Circle) -> Result<Self> {
        Self::from_kernel_curve(
            "Edge::from_circle",
            Curve::Circle(circle_to_kernel(circle)),
            (0.0, 2.0 * PI),
        )
    }

    /// Full ellipse.
    pub fn from_ellipse(ellipse: &Ellipse) -> Result<Self> {
        Self::from_kernel_curve(
            "Edge::from_ellipse",
            Curve::Ellipse(ellipse_to_kernel(ellipse)),
            (0.0, 2.0 * PI),
        )
    }

    /// Edge over the whole domain of a NURBS curve.
    pub fn from_curve(curve: &NurbsCurve) -> Result<Self> {
        Self::from_kernel_curve("Edge::from_curve", curve.to_curve(), curve.domain())
    }

    /// Edge along a kernel curve over `range`.
    pub fn from_kernel_curve(operation: &str, curve: Curve, range: (f64, f64)) -> Result<Self> {
        Self::build(operation, |store| {
            builders::curve_edge(store, curve, range, None, None)
        })
    }

    /// Edge given as a curve in the parameter plane of `surface`. The
    /// curve's z coordinates are ignored.
    pub fn from_curve2d_on_surface(curve: &NurbsCurve, surface: &NurbsSurface) -> Result<Self> {
        let mut flat = curve.native().clone();
        for p in &mut flat.control_points {
            p.z = 0.0;
        }
        let range = flat.domain();
        Self::build("Edge::from_curve2d_on_surface", |store| {
            let sid = store.add_surface(surface.to_surface());
            builders::pcurve_edge(store, sid, Curve2d::BSpline(flat), range)
        })
    }

    // ─── Identity ───────────────────────────────────────────────────────────

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub(crate) fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn is_same(&self, other: &Edge) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_same(&other.shape)
    }

    pub fn is_equal(&self, other: &Edge) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_equal(&other.shape)
    }

    pub fn orientation(&self) -> Orientation {
        self.shape.orientation
    }

    pub fn is_reversed(&self) -> bool {
        self.shape.orientation == Orientation::Reversed
    }

    /// The same edge traversed the other way.
    pub fn reversed(&self) -> Self {
        Self {
            shape: self.shape.reversed(),
            ..self.clone()
        }
    }

    // ─── Topology ───────────────────────────────────────────────────────────

    /// Start vertex, following the orientation of this occurrence.
    pub fn first_vertex(&self) -> Result<Vertex> {
        let v = self
            .store
            .first_vertex(self.shape)
            .map_err(BrepError::kernel("Edge::first_vertex"))?;
        Vertex::view(&self.store, v)
    }

    pub fn last_vertex(&self) -> Result<Vertex> {
        let v = self
            .store
            .last_vertex(self.shape)
            .map_err(BrepError::kernel("Edge::last_vertex"))?;
        Vertex::view(&self.store, v)
    }

    pub fn vertices(&self) -> Result<Vec<Vertex>> {
        Ok(vec![self.first_vertex()?, self.last_vertex()?])
    }

    pub fn is_closed(&self) -> bool {
        self.edge.is_closed()
    }

    pub fn is_degenerated(&self) -> bool {
        self.edge.degenerated
    }

    /// Whether the curve ends meet the edge's vertices and its parameter
    /// range is non-empty.
    pub fn is_valid(&self) -> Result<bool> {
        Ok(check::check_edge(&self.store, self.shape.id)
            .map_err(BrepError::kernel("Edge::is_valid"))?
            .is_empty())
    }

    // ─── Geometry ───────────────────────────────────────────────────────────

    pub fn kind(&self) -> CurveKind {
        CurveKind::of_edge(&self.edge)
    }

    pub fn is_line(&self) -> bool {
        self.kind() == CurveKind::Line
    }

    pub fn is_circle(&self) -> bool {
        self.kind() == CurveKind::Circle
    }

    pub fn is_ellipse(&self) -> bool {
        self.kind() == CurveKind::Ellipse
    }

    pub fn is_hyperbola(&self) -> bool {
        self.kind() == CurveKind::Hyperbola
    }

    pub fn is_parabola(&self) -> bool {
        self.kind() == CurveKind::Parabola
    }

    pub fn is_bezier(&self) -> bool {
        self.kind() == CurveKind::Bezier
    }

    pub fn is_bspline(&self) -> bool {
        self.kind() == CurveKind::Bspline
    }

    /// Known only through parameter-plane curves.
    pub fn is_curve2d(&self) -> bool {
        self.kind() == CurveKind::Curve2d
    }

    pub fn is_other(&self) -> bool {
        self.kind() == CurveKind::Other
    }

    /// Parameter range of the underlying curve.
    pub fn domain(&self) -> (f64, f64) {
        self.edge.range
    }

    pub fn curve(&self) -> Option<&Curve> {
        self.edge.curve.as_ref()
    }

    fn mismatch(&self, operation: &str, expected: CurveKind) -> BrepError {
        BrepError::domain(operation, expected.name(), self.kind())
    }

    pub fn to_line(&self) -> Result<Line> {
        match &self.edge.curve {
            Some(Curve::Line(l)) => Ok(line_from_kernel(l, self.edge.range)),
            _ => Err(self.mismatch("Edge::to_line", CurveKind::Line)),
        }
    }

    pub fn to_circle(&self) -> Result<Circle> {
        match &self.edge.curve {
            Some(Curve::Circle(c)) => Ok(circle_from_kernel(c)),
            _ => Err(self.mismatch("Edge::to_circle", CurveKind::Circle)),
        }
    }

    pub fn to_ellipse(&self) -> Result<Ellipse> {
        match &self.edge.curve {
            Some(Curve::Ellipse(e)) => Ok(ellipse_from_kernel(e)),
            _ => Err(self.mismatch("Edge::to_ellipse", CurveKind::Ellipse)),
        }
    }

    pub fn to_hyperbola(&self) -> Result<Hyperbola> {
        match &self.edge.curve {
            Some(Curve::Hyperbola(h)) => Ok(hyperbola_from_kernel(h)),
            _ => Err(self.mismatch("Edge::to_hyperbola", CurveKind::Hyperbola)),
        }
    }

    pub fn to_parabola(&self) -> Result<Parabola> {
        match &self.edge.curve {
            Some(Curve::Parabola(p)) => Ok(parabola_from_kernel(p)),
            _ => Err(self.mismatch("Edge::to_parabola", CurveKind::Parabola)),
        }
    }

    pub fn to_bezier(&self) -> Result<NurbsCurve> {
        match &self.edge.curve {
            Some(Curve::Bezier(n)) => Ok(NurbsCurve::from_native(n.clone())),
            _ => Err(self.mismatch("Edge::to_bezier", CurveKind::Bezier)),
        }
    }

    /// The B-spline or Bezier curve of the edge.
    pub fn to_bspline(&self) -> Result<NurbsCurve> {
        match &self.edge.curve {
            Some(Curve::BSpline(n)) | Some(Curve::Bezier(n)) => Ok(NurbsCurve::from_native(n.clone())),
            _ => Err(self.mismatch("Edge::to_bspline", CurveKind::Bspline)),
        }
    }

    /// Any 3D curve of the edge as an exact NURBS over the edge's range.
    pub fn to_curve(&self) -> Result<NurbsCurve> {
        match &self.edge.curve {
            Some(c) => Ok(NurbsCurve::from_native(
                c.to_nurbs(self.edge.range.0, self.edge.range.1),
            )),
            None => Err(BrepError::domain("Edge::to_curve", "3D curve", self.kind())),
        }
    }

    pub fn point_at(&self, t: f64) -> Result<Point> {
        self.store
            .edge_point(self.shape.id, t)
            .map(|p| point_from_kernel(&p))
            .map_err(BrepError::kernel("Edge::point_at"))
    }

    /// `count + 1` points evenly spaced in parameter, in the direction of
    /// this occurrence.
    fn samples(&self, count: usize) -> Result<Vec<Point3d>> {
        let (t0, t1) = self.edge.range;
        let count = count.max(1);
        let mut points = (0..=count)
            .map(|i| {
                self.store
                    .edge_point(self.shape.id, t0 + (t1 - t0) * i as f64 / count as f64)
            })
            .collect::<std::result::Result<Vec<_>, KernelError>>()
            .map_err(BrepError::kernel("Edge::samples"))?;
        if self.is_reversed() {
            points.reverse();
        }
        Ok(points)
    }

    pub fn length(&self) -> Result<f64> {
        if self.edge.degenerated {
            return Ok(0.0);
        }
        if let Some(c) = &self.edge.curve {
            return Ok(c.length(self.edge.range));
        }
        let pts = self.samples(256)?;
        Ok(pts.windows(2).map(|w| w[0].distance_to(&w[1])).sum())
    }

    pub fn to_polyline(&self, count: usize) -> Result<Polyline> {
        Ok(Polyline::new(
            self.samples(count)?.iter().map(point_from_kernel).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brep_types::Frame;

    #[test]
    fn test_line_edge_vertices_follow_orientation() {
        let e = Edge::from_line(&Line::new(Point::origin(), Point::new(3.0, 0.0, 0.0))).unwrap();
        assert!(e.is_line());
        assert_relative_eq!(e.length().unwrap(), 3.0);
        let r = e.reversed();
        assert!(r.is_same(&e));
        assert!(!r.is_equal(&e));
        assert_relative_eq!(r.first_vertex().unwrap().x(), 3.0);
        assert!(r.first_vertex().unwrap().is_same(&e.last_vertex().unwrap()));
    }

    #[test]
    fn test_narrowing_mismatch_is_domain_error() {
        let e = Edge::from_point_point(&Point::origin(), &Point::new(0.0, 1.0, 0.0)).unwrap();
        let err = e.to_circle().unwrap_err();
        match err {
            BrepError::Domain {
                operation,
                expected,
                found,
            } => {
                assert_eq!(operation, "Edge::to_circle");
                assert_eq!(expected, "circle");
                assert_eq!(found, "line");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(e.to_line().is_ok());
    }

    #[test]
    fn test_full_circle_is_closed() {
        let e = Edge::from_circle(&Circle::new(Frame::worldxy(), 1.5)).unwrap();
        assert!(e.is_circle());
        assert!(e.is_closed());
        assert_relative_eq!(e.to_circle().unwrap().radius, 1.5);
        assert_relative_eq!(e.length().unwrap(), 3.0 * PI, epsilon = 1e-9);
        let n = e.to_curve().unwrap();
        assert!(n.is_rational());
    }

    #[test]
    fn test_curve_on_surface_edge() {
        let s = NurbsSurface::from_points(
            &[
                vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 2.0, 0.0)],
                vec![Point::new(2.0, 0.0, 0.0), Point::new(2.0, 2.0, 0.0)],
            ],
            1,
            1,
        )
        .unwrap();
        let c = NurbsCurve::from_line(&Line::new(Point::origin(), Point::new(1.0, 1.0, 0.0)));
        let e = Edge::from_curve2d_on_surface(&c, &s).unwrap();
        assert!(e.is_curve2d());
        assert!(e.curve().is_none());
        assert_relative_eq!(e.length().unwrap(), 8f64.sqrt(), epsilon = 1e-9);
        let p = e.last_vertex().unwrap().point();
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_between_vertices() {
        let a = Vertex::from_point(&Point::origin());
        let b = Vertex::from_point(&Point::new(0.0, 0.0, 2.0));
        let e = Edge::from_vertex_vertex(&a, &b).unwrap();
        assert!(e.is_line());
        assert!(e.is_valid().unwrap());
        assert_relative_eq!(e.length().unwrap(), 2.0);
        assert_relative_eq!(e.last_vertex().unwrap().z(), 2.0);
        assert!(Edge::from_vertex_vertex(&a, &a).is_err());
    }

    #[test]
    fn test_bezier_edge_narrows_to_bezier() {
        let pts = [
            Point::origin(),
            Point::new(1.0, 1.0, 0.0),
            Point::new(2.0, 1.0, 0.0),
            Point::new(3.0, 0.0, 0.0),
        ];
        let c = NurbsCurve::from_points(&pts, 3).unwrap();
        let e = Edge::from_kernel_curve("bezier", Curve::Bezier(c.native().clone()), c.domain())
            .unwrap();
        assert!(e.is_bezier());
        let b = e.to_bezier().unwrap();
        assert_eq!(b.degree(), 3);
        assert_relative_eq!(b.end().x, 3.0, epsilon = 1e-12);
        assert!(e.to_bspline().is_ok());

        let line = Edge::from_point_point(&Point::origin(), &Point::new(1.0, 0.0, 0.0)).unwrap();
        assert!(matches!(line.to_bezier(), Err(BrepError::Domain { .. })));
    }
}
