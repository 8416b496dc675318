//! Neighbourhood queries over the topology of a [`Brep`].
//!
//! Each query builds an ancestor map over the whole root shape and looks
//! the key up in it. Sub-shapes of another shape give empty results.

use std::sync::Arc;

use brep_kernel::topology::{AncestorMap, EntityStore, Shape, ShapeKind};

use crate::brep::Brep;
use crate::edge::Edge;
use crate::errors::{BrepError, Result};
use crate::face::Face;
use crate::loops::Loop;
use crate::vertex::Vertex;

impl Brep {
    fn ancestors(
        &self,
        operation: &str,
        store: &Arc<EntityStore>,
        key: Shape,
        kind: ShapeKind,
        ancestor_kind: ShapeKind,
    ) -> Result<Vec<Shape>> {
        if !Arc::ptr_eq(store, self.store()) {
            return Ok(Vec::new());
        }
        let map = AncestorMap::build(self.store(), self.root(), kind, ancestor_kind)
            .map_err(BrepError::kernel(operation))?;
        Ok(map.get(key.id).to_vec())
    }

    /// The other end of every edge incident to `vertex`.
    pub fn vertex_neighbors(&self, vertex: &Vertex) -> Result<Vec<Vertex>> {
        let mut out = Vec::new();
        for edge in self.vertex_edges(vertex)? {
            let first = edge.first_vertex()?;
            let last = edge.last_vertex()?;
            if first.is_same(vertex) && last.is_same(vertex) {
                // A closed edge loops back to the vertex itself.
                continue;
            }
            out.push(if first.is_same(vertex) { last } else { first });
        }
        Ok(out)
    }

    pub fn vertex_edges(&self, vertex: &Vertex) -> Result<Vec<Edge>> {
        const OP: &str = "Brep::vertex_edges";
        self.ancestors(OP, vertex.store(), vertex.shape(), ShapeKind::Vertex, ShapeKind::Edge)?
            .into_iter()
            .map(|e| Edge::view(self.store(), e))
            .collect()
    }

    pub fn vertex_faces(&self, vertex: &Vertex) -> Result<Vec<Face>> {
        const OP: &str = "Brep::vertex_faces";
        self.ancestors(OP, vertex.store(), vertex.shape(), ShapeKind::Vertex, ShapeKind::Face)?
            .into_iter()
            .map(|f| Face::view(self.store(), f))
            .collect()
    }

    pub fn edge_faces(&self, edge: &Edge) -> Result<Vec<Face>> {
        const OP: &str = "Brep::edge_faces";
        self.ancestors(OP, edge.store(), edge.shape(), ShapeKind::Edge, ShapeKind::Face)?
            .into_iter()
            .map(|f| Face::view(self.store(), f))
            .collect()
    }

    pub fn edge_loops(&self, edge: &Edge) -> Result<Vec<Loop>> {
        const OP: &str = "Brep::edge_loops";
        self.ancestors(OP, edge.store(), edge.shape(), ShapeKind::Edge, ShapeKind::Wire)?
            .into_iter()
            .map(|w| Loop::view(self.store(), w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brep_types::{Cuboid, Frame, Point};

    fn unit_box() -> Brep {
        Brep::from_box(&Cuboid::from_corners(
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 1.0),
        ))
        .unwrap()
    }

    #[test]
    fn test_box_corner_neighbourhood() {
        let b = unit_box();
        let points = b.points().unwrap();
        assert_eq!(points.len(), 8);
        for v in b.vertices().unwrap() {
            assert_eq!(b.vertex_edges(&v).unwrap().len(), 3);
            assert_eq!(b.vertex_faces(&v).unwrap().len(), 3);
            let neighbours = b.vertex_neighbors(&v).unwrap();
            assert_eq!(neighbours.len(), 3);
            for n in &neighbours {
                let d = (n.point() - v.point()).length();
                assert!((d - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_box_edge_neighbourhood() {
        let b = unit_box();
        for e in b.edges().unwrap() {
            assert_eq!(b.edge_faces(&e).unwrap().len(), 2);
            assert_eq!(b.edge_loops(&e).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_foreign_vertex_has_no_neighbours() {
        let b = unit_box();
        let free = Vertex::from_point(&Point::new(0.0, 0.0, 0.0));
        assert!(b.vertex_edges(&free).unwrap().is_empty());
        assert!(b.vertex_neighbors(&free).unwrap().is_empty());

        let other = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
        let v = other.vertices().unwrap().remove(0);
        assert!(b.vertex_faces(&v).unwrap().is_empty());
    }
}
