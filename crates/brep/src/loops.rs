use std::sync::Arc;

use brep_kernel::topology::{builders, check, heal, EntityStore, Orientation, Shape};
use tracing::debug;
use brep_kernel::{primitives, Tolerance};
use brep_types::{Circle, Polygon, Polyline};

use crate::conversions::point_to_kernel;
use crate::edge::Edge;
use crate::errors::{BrepError, Result};
use crate::importer::Importer;
use crate::vertex::Vertex;

/// A view of a wire: a chain of edge occurrences.
#[derive(Debug, Clone)]
pub struct Loop {
    store: Arc<EntityStore>,
    shape: Shape,
    edges: Vec<Shape>,
}

impl Loop {
    pub(crate) fn view(store: &Arc<EntityStore>, shape: Shape) -> Result<Self> {
        let edges = store
            .children(shape)
            .map_err(BrepError::kernel("Loop"))?;
        store.wire(shape.id).map_err(BrepError::kernel("Loop"))?;
        Ok(Self {
            store: Arc::clone(store),
            shape,
            edges,
        })
    }

    /// Chain edges, in the given order and orientations, into a wire.
    /// Consecutive edges must meet within the sewing tolerance.
    pub fn from_edges(edges: &[Edge]) -> Result<Self> {
        const OP: &str = "Loop::from_edges";
        let mut importer = Importer::new();
        let mut shapes = Vec::with_capacity(edges.len());
        for e in edges {
            shapes.push(importer.import(OP, e.store(), e.shape())?);
        }
        let mut store = importer.finish();
        let wire = builders::make_wire(&mut store, shapes).map_err(BrepError::kernel(OP))?;
        Self::view(&Arc::new(store), wire)
    }

    /// Open chain of straight edges; closed when the polyline is.
    pub fn from_polyline(polyline: &Polyline) -> Result<Self> {
        const OP: &str = "Loop::from_polyline";
        let pts = &polyline.points;
        if pts.len() < 2 {
            return Err(BrepError::construction(OP, "a polyline needs two points"));
        }
        if polyline.is_closed() {
            return Self::closed_polygon(OP, &pts[..pts.len() - 1]);
        }
        let mut store = EntityStore::new();
        let tol = Tolerance::default().confusion;
        let vertices: Vec<Shape> = pts
            .iter()
            .map(|p| store.add_vertex(point_to_kernel(p), tol))
            .collect();
        let edges = vertices
            .windows(2)
            .map(|w| builders::line_edge(&mut store, w[0], w[1]))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(BrepError::kernel(OP))?;
        let wire = store.add_wire(edges).map_err(BrepError::kernel(OP))?;
        Self::view(&Arc::new(store), wire)
    }

    pub fn from_polygon(polygon: &Polygon) -> Result<Self> {
        Self::closed_polygon("Loop::from_polygon", &polygon.points)
    }

    fn closed_polygon(operation: &str, points: &[brep_types::Point]) -> Result<Self> {
        let mut store = EntityStore::new();
        let pts: Vec<_> = points.iter().map(point_to_kernel).collect();
        let wire = primitives::polygon_wire(&mut store, &pts).map_err(BrepError::kernel(operation))?;
        Self::view(&Arc::new(store), wire)
    }

    pub fn from_circle(circle: &Circle) -> Result<Self> {
        Self::from_edges(&[Edge::from_circle(circle)?])
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub(crate) fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn is_same(&self, other: &Loop) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_same(&other.shape)
    }

    pub fn is_equal(&self, other: &Loop) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_equal(&other.shape)
    }

    pub fn orientation(&self) -> Orientation {
        self.shape.orientation
    }

    /// Edge occurrences in traversal order.
    pub fn edges(&self) -> Result<Vec<Edge>> {
        self.edges
            .iter()
            .map(|e| Edge::view(&self.store, *e))
            .collect()
    }

    /// Start vertex of every edge occurrence, in traversal order.
    pub fn vertices(&self) -> Result<Vec<Vertex>> {
        self.edges()?.iter().map(Edge::first_vertex).collect()
    }

    pub fn is_closed(&self) -> Result<bool> {
        builders::is_wire_closed(&self.store, self.shape).map_err(BrepError::kernel("Loop::is_closed"))
    }

    /// Whether the loop closes, its edges join end to start, and every edge
    /// meets its vertices.
    pub fn is_valid(&self) -> Result<bool> {
        Ok(check::check_wire(&self.store, self.shape)
            .map_err(BrepError::kernel("Loop::is_valid"))?
            .is_empty())
    }

    /// Reorder and reorient the edges into a chain and merge joints that
    /// lie within the sewing tolerance. Other views of the same shape keep
    /// the old layout.
    pub fn fix(&mut self) -> Result<()> {
        const OP: &str = "Loop::fix";
        let store = Arc::make_mut(&mut self.store);
        if heal::fix_wire(store, self.shape.id).map_err(BrepError::kernel(OP))? {
            debug!(edges = self.edges.len(), "loop fixed");
        }
        self.edges = self
            .store
            .children(self.shape)
            .map_err(BrepError::kernel(OP))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brep_types::{Frame, Line, Point};

    #[test]
    fn test_edges_are_chained() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(1.0, 1.0, 0.0);
        let edges = [
            Edge::from_line(&Line::new(a, b)).unwrap(),
            Edge::from_line(&Line::new(b, c)).unwrap(),
            Edge::from_line(&Line::new(a, c)).unwrap().reversed(),
        ];
        let l = Loop::from_edges(&edges).unwrap();
        assert!(l.is_closed().unwrap());
        let es = l.edges().unwrap();
        assert_eq!(es.len(), 3);
        assert!(es[2].is_reversed());
        for i in 0..3 {
            let end = es[i].last_vertex().unwrap();
            let start = es[(i + 1) % 3].first_vertex().unwrap();
            assert!(end.is_same(&start));
        }
    }

    #[test]
    fn test_gap_is_rejected() {
        let edges = [
            Edge::from_line(&Line::new(Point::origin(), Point::new(1.0, 0.0, 0.0))).unwrap(),
            Edge::from_line(&Line::new(Point::new(2.0, 0.0, 0.0), Point::new(2.0, 1.0, 0.0)))
                .unwrap(),
            Edge::from_line(&Line::new(Point::new(2.0, 1.0, 0.0), Point::origin())).unwrap(),
        ];
        assert!(matches!(
            Loop::from_edges(&edges),
            Err(BrepError::Kernel { .. })
        ));
    }

    #[test]
    fn test_polyline_open_and_closed() {
        let open = Polyline::new(vec![
            Point::origin(),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
        ]);
        let l = Loop::from_polyline(&open).unwrap();
        assert_eq!(l.edges().unwrap().len(), 2);
        assert!(!l.is_closed().unwrap());

        let mut pts = open.points.clone();
        pts.push(Point::origin());
        let closed = Loop::from_polyline(&Polyline::new(pts)).unwrap();
        assert_eq!(closed.edges().unwrap().len(), 3);
        assert!(closed.is_closed().unwrap());
    }

    #[test]
    fn test_circle_loop() {
        let l = Loop::from_circle(&Circle::new(Frame::worldxy(), 1.0)).unwrap();
        assert_eq!(l.vertices().unwrap().len(), 1);
        assert!(l.is_closed().unwrap());
    }

    #[test]
    fn test_fix_chains_shuffled_edges() {
        let mut store = EntityStore::new();
        let tol = Tolerance::default().confusion;
        let p = [
            Point::origin(),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 2.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ];
        let mut side = |a: &Point, b: &Point| {
            let va = store.add_vertex(point_to_kernel(a), tol);
            let vb = store.add_vertex(point_to_kernel(b), tol);
            builders::line_edge(&mut store, va, vb).unwrap()
        };
        let edges = vec![side(&p[0], &p[1]), side(&p[3], &p[2]), side(&p[1], &p[2]), side(&p[3], &p[0])];
        let wire = store.add_wire(edges).unwrap();
        let mut l = Loop::view(&Arc::new(store), wire).unwrap();
        assert!(!l.is_valid().unwrap());

        l.fix().unwrap();
        assert!(l.is_valid().unwrap());
        assert!(l.is_closed().unwrap());
        let corners: Vec<Point> = l.vertices().unwrap().iter().map(Vertex::point).collect();
        assert_eq!(corners, p.to_vec());
    }
}
