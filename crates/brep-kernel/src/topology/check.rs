//! Validity checks over a stored shape.

use std::collections::{HashMap, HashSet};

use super::builders::is_wire_closed;
use super::explorer::{explore, map_shapes};
use super::heal::{consistent_orientation, is_closed_set};
use super::shape::{ShapeId, ShapeKind, Shape};
use super::store::EntityStore;
use crate::mesh::discretize::EdgeDiscretizer;
use crate::mesh::uv::face_loops;
use crate::mesh::{triangulate, MeshParams};
use crate::types::KernelError;
use crate::Tolerance;

/// A problem found by [`check`].
#[derive(Debug, Clone, PartialEq)]
pub enum Defect {
    OpenWire { wire: ShapeId },
    FaceWithoutWires { face: ShapeId },
    /// The first wire of a face does not enclose the others counter-clockwise.
    BadOuterWire { face: ShapeId },
    /// A hole runs the same way as the outer wire.
    BadHole { face: ShapeId, wire: ShapeId },
    /// An edge of a closed shell is not shared by exactly two faces.
    FreeEdge { shell: ShapeId, edge: ShapeId },
    SolidWithOpenShell { solid: ShapeId, shell: ShapeId },
    /// A boundary edge strays from the face's surface by more than the
    /// face and edge tolerances allow.
    EdgeOffSurface { face: ShapeId, edge: ShapeId },
    /// An end of the edge curve misses its vertex.
    EdgeAwayFromVertex { edge: ShapeId, vertex: ShapeId },
    /// A non-degenerate edge whose parameter range is empty.
    EmptyEdgeRange { edge: ShapeId },
    /// Consecutive edges of a wire do not share a vertex.
    DisconnectedEdges { wire: ShapeId, index: usize },
}

/// Every defect of `shape` and its sub-shapes.
pub fn check(store: &EntityStore, shape: Shape) -> Result<Vec<Defect>, KernelError> {
    let mut defects = Vec::new();
    for w in map_shapes(store, shape, ShapeKind::Wire)? {
        if !is_wire_closed(store, w)? {
            defects.push(Defect::OpenWire { wire: w.id });
        }
    }
    for f in map_shapes(store, shape, ShapeKind::Face)? {
        defects.extend(check_face(store, f.id)?);
    }
    for s in map_shapes(store, shape, ShapeKind::Shell)? {
        if store.shell(s.id)?.closed {
            for (edge, uses) in edge_uses(store, s)? {
                if uses != 2 {
                    defects.push(Defect::FreeEdge { shell: s.id, edge });
                }
            }
        }
    }
    for solid in map_shapes(store, shape, ShapeKind::Solid)? {
        for s in store.children(solid)? {
            if !store.shell(s.id)?.closed {
                defects.push(Defect::SolidWithOpenShell {
                    solid: solid.id,
                    shell: s.id,
                });
            }
        }
    }
    Ok(defects)
}

pub fn is_valid(store: &EntityStore, shape: Shape) -> Result<bool, KernelError> {
    Ok(check(store, shape)?.is_empty())
}

/// Defects of the wire layout of one face.
pub fn check_face(store: &EntityStore, face: ShapeId) -> Result<Vec<Defect>, KernelError> {
    let f = store.face(face)?;
    if f.wires.is_empty() {
        return Ok(vec![Defect::FaceWithoutWires { face }]);
    }
    let mut disc = EdgeDiscretizer::new(MeshParams::default());
    let loops = face_loops(store, face, &mut disc)?;
    let areas: Vec<f64> = loops.iter().map(|l| l.signed_area()).collect();
    let mut defects = Vec::new();
    let outer = areas[0];
    if outer <= 0.0 || areas[1..].iter().any(|a| a.abs() > outer) {
        defects.push(Defect::BadOuterWire { face });
    }
    for (l, a) in loops.iter().zip(&areas).skip(1) {
        if *a > 0.0 {
            defects.push(Defect::BadHole {
                face,
                wire: l.wire.id,
            });
        }
    }
    for (edge, gap) in edge_deviations(store, face, &mut disc)? {
        let allowed = f
            .tolerance
            .max(store.edge(edge)?.tolerance)
            .max(Tolerance::default().sewing);
        if gap > allowed {
            defects.push(Defect::EdgeOffSurface { face, edge });
        }
    }
    Ok(defects)
}

/// Largest distance between a boundary edge of `face` and its surface.
pub fn max_edge_deviation(store: &EntityStore, face: ShapeId) -> Result<f64, KernelError> {
    let mut disc = EdgeDiscretizer::new(MeshParams::default());
    Ok(edge_deviations(store, face, &mut disc)?
        .into_iter()
        .map(|(_, gap)| gap)
        .fold(0.0, f64::max))
}

/// Distance from the surface of `face` of every non-degenerate boundary
/// edge, measured at its discretization nodes and halfway between them.
fn edge_deviations(
    store: &EntityStore,
    face: ShapeId,
    disc: &mut EdgeDiscretizer,
) -> Result<Vec<(ShapeId, f64)>, KernelError> {
    let surface = store.face_surface(face)?;
    let mut seen = HashSet::new();
    let mut gaps = Vec::new();
    for &w in &store.face(face)?.wires {
        for e in store.children(w)? {
            if store.edge(e.id)?.degenerated || !seen.insert(e.id) {
                continue;
            }
            let nodes = disc.discretize(store, e.id)?;
            let mut points = nodes.points.clone();
            for t in nodes.params.windows(2) {
                points.push(store.edge_point(e.id, 0.5 * (t[0] + t[1]))?);
            }
            let gap = points
                .iter()
                .map(|p| surface.closest_point(p).distance_to(p))
                .fold(0.0, f64::max);
            gaps.push((e.id, gap));
        }
    }
    Ok(gaps)
}

/// Defects of a single edge: curve ends that miss their vertices and
/// empty parameter ranges.
pub fn check_edge(store: &EntityStore, edge: ShapeId) -> Result<Vec<Defect>, KernelError> {
    let e = store.edge(edge)?;
    let mut defects = Vec::new();
    if e.degenerated {
        return Ok(defects);
    }
    if e.range.1 <= e.range.0 {
        defects.push(Defect::EmptyEdgeRange { edge });
        return Ok(defects);
    }
    let ends = [e.range.0, e.range.1];
    for (vertex, t) in e.vertices.into_iter().zip(ends) {
        let v = store.vertex(vertex)?;
        let allowed = v
            .tolerance
            .max(e.tolerance)
            .max(Tolerance::default().sewing);
        if store.edge_point(edge, t)?.distance_to(&v.point) > allowed {
            defects.push(Defect::EdgeAwayFromVertex { edge, vertex });
        }
    }
    Ok(defects)
}

/// Defects of a wire: its edges, the joints between consecutive edges, and
/// whether it closes.
pub fn check_wire(store: &EntityStore, wire: Shape) -> Result<Vec<Defect>, KernelError> {
    let edges = store.children(wire)?;
    let mut defects = Vec::new();
    for e in &edges {
        defects.extend(check_edge(store, e.id)?);
    }
    for (index, pair) in edges.windows(2).enumerate() {
        if !store
            .last_vertex(pair[0])?
            .is_same(&store.first_vertex(pair[1])?)
        {
            defects.push(Defect::DisconnectedEdges {
                wire: wire.id,
                index,
            });
        }
    }
    if !is_wire_closed(store, wire)? {
        defects.push(Defect::OpenWire { wire: wire.id });
    }
    Ok(defects)
}

fn edge_uses(store: &EntityStore, shape: Shape) -> Result<HashMap<ShapeId, usize>, KernelError> {
    let mut uses: HashMap<ShapeId, usize> = HashMap::new();
    for e in explore(store, shape, ShapeKind::Edge)? {
        if !store.edge(e.id)?.degenerated {
            *uses.entry(e.id).or_default() += 1;
        }
    }
    Ok(uses)
}

/// Closedness by shape kind: wires that end where they start, edges on a
/// single vertex, and face sets without free edges.
pub fn is_closed(store: &EntityStore, shape: Shape) -> Result<bool, KernelError> {
    match store.kind(shape)? {
        ShapeKind::Vertex => Ok(false),
        ShapeKind::Edge => Ok(store.edge(shape.id)?.is_closed()),
        ShapeKind::Wire => is_wire_closed(store, shape),
        _ => {
            let faces = map_shapes(store, shape, ShapeKind::Face)?;
            if faces.is_empty() {
                return Ok(false);
            }
            is_closed_set(store, &faces)
        }
    }
}

/// Whether the faces of `shape` can be oriented so that neighbours agree.
pub fn is_orientable(store: &EntityStore, shape: Shape) -> Result<bool, KernelError> {
    let faces = map_shapes(store, shape, ShapeKind::Face)?;
    Ok(!consistent_orientation(store, &faces)?.1)
}

/// Whether no edge of `shape` bounds more than two face occurrences.
pub fn is_manifold(store: &EntityStore, shape: Shape) -> Result<bool, KernelError> {
    Ok(edge_uses(store, shape)?.values().all(|&uses| uses <= 2))
}

/// Whether `shape` has a face without boundary, which extends as far as
/// its surface does.
pub fn is_infinite(store: &EntityStore, shape: Shape) -> Result<bool, KernelError> {
    for f in map_shapes(store, shape, ShapeKind::Face)? {
        if store.face(f.id)?.wires.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether every face of `shape` keeps the rest of the shape on its inner
/// side. Decided on a triangulation, so chords of curved faces are allowed
/// to cut in by a few linear deflections.
pub fn is_convex(store: &EntityStore, shape: Shape, params: MeshParams) -> Result<bool, KernelError> {
    if is_infinite(store, shape)? {
        return Ok(false);
    }
    let mesh = triangulate(store, shape, params)?;
    if mesh.triangles.is_empty() {
        return Ok(false);
    }
    let slack = 4.0 * params.linear_deflection + Tolerance::default().sewing;
    for t in &mesh.triangles {
        let [a, b, c] = t.map(|i| mesh.positions[i as usize]);
        let normal = (b - a).cross(&(c - a));
        let area2 = normal.length();
        if area2 < Tolerance::default().confusion {
            continue;
        }
        let n = normal * (1.0 / area2);
        if mesh.positions.iter().any(|p| (*p - a).dot(&n) > slack) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frame::Ax3;
    use crate::geometry::point::Point3d;
    use crate::geometry::surfaces::{PlaneSurface, Surface};
    use crate::geometry::vector::Vec3;
    use crate::primitives;

    #[test]
    fn test_primitives_are_valid() {
        let mut store = EntityStore::new();
        let frame = Ax3::world();
        let shapes = [
            primitives::make_box(&mut store, &frame, 1.0, 2.0, 3.0).unwrap(),
            primitives::make_cylinder(&mut store, &frame, 1.0, 2.0).unwrap(),
            primitives::make_sphere(&mut store, &frame, 1.0).unwrap(),
            primitives::make_torus(&mut store, &frame, 3.0, 1.0).unwrap(),
        ];
        for s in shapes {
            assert_eq!(check(&store, s).unwrap(), vec![]);
            assert!(is_closed(&store, s).unwrap());
            assert!(is_orientable(&store, s).unwrap());
        }
    }

    #[test]
    fn test_open_face_is_not_closed() {
        let mut store = EntityStore::new();
        let f = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0))
            .unwrap();
        assert!(is_valid(&store, f).unwrap());
        assert!(!is_closed(&store, f).unwrap());
    }

    #[test]
    fn test_edge_off_its_surface_is_reported() {
        let mut store = EntityStore::new();
        let f = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0))
            .unwrap();
        let lifted = Ax3::new(Point3d::new(0.0, 0.0, 0.1), Vec3::Z, Vec3::X);
        let sid = store.add_surface(Surface::Plane(PlaneSurface { position: lifted }));
        store.face_mut(f.id).unwrap().surface = sid;
        let defects = check(&store, f).unwrap();
        assert_eq!(defects.len(), 4);
        assert!(defects
            .iter()
            .all(|d| matches!(d, Defect::EdgeOffSurface { face, .. } if *face == f.id)));
        assert!((max_edge_deviation(&store, f.id).unwrap() - 0.1).abs() < 1e-9);

        // A face tolerance covering the gap accepts the face.
        store.face_mut(f.id).unwrap().tolerance = 0.2;
        assert!(is_valid(&store, f).unwrap());
    }

    #[test]
    fn test_reversed_outer_wire_is_reported() {
        let mut store = EntityStore::new();
        let f = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0))
            .unwrap();
        let w = store.face(f.id).unwrap().wires[0];
        store.face_mut(f.id).unwrap().wires[0] = w.reversed();
        assert_eq!(check(&store, f).unwrap(), vec![Defect::BadOuterWire { face: f.id }]);
    }

    #[test]
    fn test_edge_ends_are_checked_against_vertices() {
        let mut store = EntityStore::new();
        let f = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0))
            .unwrap();
        let wire = store.face(f.id).unwrap().wires[0];
        let edge = store.children(wire).unwrap()[0];
        assert!(check_edge(&store, edge.id).unwrap().is_empty());
        assert!(check_wire(&store, wire).unwrap().is_empty());

        let stray = store.add_vertex(Point3d::new(5.0, 5.0, 5.0), 1e-7);
        store.edge_mut(edge.id).unwrap().vertices[1] = stray.id;
        assert_eq!(
            check_edge(&store, edge.id).unwrap(),
            vec![Defect::EdgeAwayFromVertex {
                edge: edge.id,
                vertex: stray.id
            }]
        );
        // The stray vertex breaks the chain at one of the edge's joints.
        assert!(check_wire(&store, wire)
            .unwrap()
            .iter()
            .any(|d| matches!(d, Defect::DisconnectedEdges { .. } | Defect::OpenWire { .. })));

        let e = store.edge_mut(edge.id).unwrap();
        e.range = (e.range.1, e.range.1);
        assert_eq!(
            check_edge(&store, edge.id).unwrap(),
            vec![Defect::EmptyEdgeRange { edge: edge.id }]
        );
    }

    #[test]
    fn test_edge_shared_by_three_faces_is_not_manifold() {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Ax3::world(), 1.0, 1.0, 1.0).unwrap();
        assert!(is_manifold(&store, b).unwrap());
        let f = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0))
            .unwrap();
        let fan = store.add_compound(vec![f, f, f.reversed()]).unwrap();
        assert!(!is_manifold(&store, fan).unwrap());
    }

    #[test]
    fn test_convexity() {
        let mut store = EntityStore::new();
        let frame = Ax3::world();
        let params = MeshParams::default();
        let b = primitives::make_box(&mut store, &frame, 1.0, 2.0, 3.0).unwrap();
        let c = primitives::make_cylinder(&mut store, &frame, 1.0, 2.0).unwrap();
        assert!(is_convex(&store, b, params).unwrap());
        assert!(is_convex(&store, c, params).unwrap());

        let p = |x: f64, y: f64| Point3d::new(x, y, 0.0);
        let ell = [p(0.0, 0.0), p(2.0, 0.0), p(2.0, 1.0), p(1.0, 1.0), p(1.0, 2.0), p(0.0, 2.0)];
        let prism = primitives::make_prism(&mut store, &ell, Vec3::Z).unwrap();
        assert!(!is_convex(&store, prism, params).unwrap());
    }

    #[test]
    fn test_face_without_boundary_is_infinite() {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Ax3::world(), 1.0, 1.0, 1.0).unwrap();
        assert!(!is_infinite(&store, b).unwrap());
        let sid = store.add_surface(Surface::Plane(PlaneSurface {
            position: Ax3::world(),
        }));
        let plane = store.add_face(sid, vec![], 1e-7).unwrap();
        assert!(is_infinite(&store, plane).unwrap());
        assert!(!is_convex(&store, plane, MeshParams::default()).unwrap());
    }
}
