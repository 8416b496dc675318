//! Construction of edges, wires and faces from geometry.

use super::shape::*;
use super::store::EntityStore;
use crate::geometry::curves::{Curve, Line3d};
use crate::geometry::curves2d::Curve2d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{PlaneSurface, Surface};
use crate::geometry::frame::Ax3;
use crate::types::KernelError;
use crate::Tolerance;

/// Straight edge between two existing vertices.
pub fn line_edge(store: &mut EntityStore, v0: Shape, v1: Shape) -> Result<Shape, KernelError> {
    let a = store.point(v0.id)?;
    let b = store.point(v1.id)?;
    let len = a.distance_to(&b);
    if len < Tolerance::default().confusion {
        return Err(KernelError::geometry("zero-length line edge"));
    }
    store.add_edge(TEdge {
        vertices: [v0.id, v1.id],
        curve: Some(Curve::Line(Line3d::from_points(a, b))),
        range: (0.0, len),
        pcurves: Vec::new(),
        degenerated: false,
        tolerance: Tolerance::default().confusion,
    })
}

/// Edge along `curve` over `range`. Missing end vertices are created at the
/// curve ends; a curve whose ends meet gets a single vertex.
pub fn curve_edge(
    store: &mut EntityStore,
    curve: Curve,
    range: (f64, f64),
    v0: Option<Shape>,
    v1: Option<Shape>,
) -> Result<Shape, KernelError> {
    let tol = Tolerance::default();
    if (range.1 - range.0).abs() < tol.confusion {
        return Err(KernelError::geometry("empty edge range"));
    }
    let p0 = curve.evaluate(range.0);
    let p1 = curve.evaluate(range.1);
    let v0 = match v0 {
        Some(v) => v,
        None => store.add_vertex(p0, tol.confusion),
    };
    let v1 = match v1 {
        Some(v) => v,
        None if p0.distance_to(&p1) < tol.sewing => v0,
        None => store.add_vertex(p1, tol.confusion),
    };
    store.add_edge(TEdge {
        vertices: [v0.id, v1.id],
        curve: Some(curve),
        range,
        pcurves: Vec::new(),
        degenerated: false,
        tolerance: tol.confusion,
    })
}

/// Edge known only through a curve in the parameter plane of `surface`.
pub fn pcurve_edge(
    store: &mut EntityStore,
    surface: SurfaceId,
    curve: Curve2d,
    range: (f64, f64),
) -> Result<Shape, KernelError> {
    let tol = Tolerance::default();
    let s = store.surface(surface)?;
    let a = curve.evaluate(range.0);
    let b = curve.evaluate(range.1);
    let p0 = s.evaluate(a.x, a.y);
    let p1 = s.evaluate(b.x, b.y);
    let v0 = store.add_vertex(p0, tol.confusion);
    let v1 = if p0.distance_to(&p1) < tol.sewing {
        v0
    } else {
        store.add_vertex(p1, tol.confusion)
    };
    store.add_edge(TEdge {
        vertices: [v0.id, v1.id],
        curve: None,
        range,
        pcurves: vec![PCurve {
            surface,
            curve,
            seam: None,
        }],
        degenerated: false,
        tolerance: tol.confusion,
    })
}

/// Edge collapsed to `vertex` in 3D, running along `curve` on `surface`.
pub fn degenerated_edge(
    store: &mut EntityStore,
    vertex: Shape,
    surface: SurfaceId,
    curve: Curve2d,
    range: (f64, f64),
) -> Result<Shape, KernelError> {
    store.add_edge(TEdge {
        vertices: [vertex.id, vertex.id],
        curve: None,
        range,
        pcurves: vec![PCurve {
            surface,
            curve,
            seam: None,
        }],
        degenerated: true,
        tolerance: Tolerance::default().confusion,
    })
}

/// Attach parameter curves of `edge` on `surface`. `seam` is used by the
/// reversed occurrence when the edge bounds the surface on both sides.
pub fn add_pcurve(
    store: &mut EntityStore,
    edge: ShapeId,
    surface: SurfaceId,
    curve: Curve2d,
    seam: Option<Curve2d>,
) -> Result<(), KernelError> {
    let e = store.edge_mut(edge)?;
    e.pcurves.retain(|p| p.surface != surface);
    e.pcurves.push(PCurve {
        surface,
        curve,
        seam,
    });
    Ok(())
}

pub(crate) fn set_oriented_vertex(
    store: &mut EntityStore,
    edge: Shape,
    first: bool,
    vertex: ShapeId,
) -> Result<(), KernelError> {
    let slot = match (edge.orientation, first) {
        (Orientation::Forward, true) | (Orientation::Reversed, false) => 0,
        _ => 1,
    };
    store.edge_mut(edge.id)?.vertices[slot] = vertex;
    Ok(())
}

/// Chain oriented edges into a wire, merging coincident end vertices of
/// consecutive edges. Fails when consecutive edges are further apart than
/// the sewing tolerance.
pub fn make_wire(store: &mut EntityStore, edges: Vec<Shape>) -> Result<Shape, KernelError> {
    if edges.is_empty() {
        return Err(KernelError::shape("wire without edges"));
    }
    let tol = Tolerance::default().sewing;
    let n = edges.len();
    for i in 0..n {
        let cur = edges[i];
        let next = edges[(i + 1) % n];
        let end = store.last_vertex(cur)?;
        let start = store.first_vertex(next)?;
        if end.is_same(&start) {
            continue;
        }
        let gap = store.point(end.id)?.distance_to(&store.point(start.id)?);
        if gap > tol.max(store.vertex(end.id)?.tolerance) {
            // An open chain is allowed to have a gap between its last and
            // first edges.
            if i + 1 == n {
                break;
            }
            return Err(KernelError::shape(format!(
                "wire edges {i} and {} are {gap:e} apart",
                i + 1
            )));
        }
        set_oriented_vertex(store, next, true, end.id)?;
    }
    store.add_wire(edges)
}

/// Whether the wire's last edge ends where its first edge starts.
pub fn is_wire_closed(store: &EntityStore, wire: Shape) -> Result<bool, KernelError> {
    let edges = store.children(wire)?;
    match (edges.first(), edges.last()) {
        (Some(first), Some(last)) => Ok(store
            .first_vertex(*first)?
            .is_same(&store.last_vertex(*last)?)),
        _ => Ok(false),
    }
}

pub fn make_face(
    store: &mut EntityStore,
    surface: Surface,
    wires: Vec<Shape>,
) -> Result<Shape, KernelError> {
    let sid = store.add_surface(surface);
    store.add_face(sid, wires, Tolerance::default().confusion)
}

/// Planar face bounded by `wires`, the first of which is the outer one.
/// The plane is fitted through the outer wire and oriented by its winding.
pub fn make_planar_face(store: &mut EntityStore, wires: Vec<Shape>) -> Result<Shape, KernelError> {
    let outer = *wires
        .first()
        .ok_or_else(|| KernelError::shape("planar face without wires"))?;
    let points = wire_sample_points(store, outer)?;
    let frame = fit_plane(&points)?;
    make_face(
        store,
        Surface::Plane(PlaneSurface { position: frame }),
        wires,
    )
}

/// Points along a wire in traversal order, a few per curved edge.
pub fn wire_sample_points(store: &EntityStore, wire: Shape) -> Result<Vec<Point3d>, KernelError> {
    let mut points = Vec::new();
    for e in store.children(wire)? {
        let edge = store.edge(e.id)?;
        if edge.degenerated {
            continue;
        }
        let (t0, t1) = edge.range;
        let n = match &edge.curve {
            Some(Curve::Line(_)) => 1,
            _ => 16,
        };
        let mut ts: Vec<f64> = (0..n).map(|i| t0 + (t1 - t0) * i as f64 / n as f64).collect();
        if e.orientation == Orientation::Reversed {
            ts = (1..=n).map(|i| t0 + (t1 - t0) * i as f64 / n as f64).rev().collect();
        }
        for t in ts {
            points.push(store.edge_point(e.id, t)?);
        }
    }
    Ok(points)
}

/// Best-fit plane of a closed polygon, with its normal following the
/// polygon's winding (Newell's method) and its origin at the centroid.
pub fn fit_plane(points: &[Point3d]) -> Result<Ax3, KernelError> {
    let centroid =
        Point3d::centroid(points).ok_or_else(|| KernelError::geometry("no points to fit"))?;
    let n = points.len();
    let mut normal = crate::geometry::vector::Vec3::ZERO;
    for i in 0..n {
        let a = points[i] - centroid;
        let b = points[(i + 1) % n] - centroid;
        normal = normal + a.cross(&b);
    }
    let normal = normal
        .normalized()
        .ok_or_else(|| KernelError::geometry("degenerate polygon"))?;
    let x_ref = points
        .iter()
        .map(|p| *p - centroid)
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .unwrap_or(normal.any_perpendicular());
    Ok(Ax3::new(centroid, normal, x_ref))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curves::Circle3d;

    fn square(store: &mut EntityStore) -> Vec<Shape> {
        let pts = [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        let vs: Vec<Shape> = pts.iter().map(|p| store.add_vertex(*p, 1e-7)).collect();
        (0..4)
            .map(|i| line_edge(store, vs[i], vs[(i + 1) % 4]).unwrap())
            .collect()
    }

    #[test]
    fn test_make_wire_closes() {
        let mut store = EntityStore::new();
        let edges = square(&mut store);
        let w = make_wire(&mut store, edges).unwrap();
        assert!(is_wire_closed(&store, w).unwrap());
    }

    #[test]
    fn test_make_wire_merges_coincident_vertices() {
        let mut store = EntityStore::new();
        let a = store.add_vertex(Point3d::new(0.0, 0.0, 0.0), 1e-7);
        let b = store.add_vertex(Point3d::new(1.0, 0.0, 0.0), 1e-7);
        let b2 = store.add_vertex(Point3d::new(1.0, 0.0, 0.0), 1e-7);
        let c = store.add_vertex(Point3d::new(0.0, 1.0, 0.0), 1e-7);
        let a2 = store.add_vertex(Point3d::new(0.0, 0.0, 0.0), 1e-7);
        let e0 = line_edge(&mut store, a, b).unwrap();
        let e1 = line_edge(&mut store, b2, c).unwrap();
        let e2 = line_edge(&mut store, c, a2).unwrap();
        let w = make_wire(&mut store, vec![e0, e1, e2]).unwrap();
        assert!(is_wire_closed(&store, w).unwrap());
        assert!(store.first_vertex(e1).unwrap().is_same(&b));
    }

    #[test]
    fn test_make_wire_rejects_gap() {
        let mut store = EntityStore::new();
        let a = store.add_vertex(Point3d::new(0.0, 0.0, 0.0), 1e-7);
        let b = store.add_vertex(Point3d::new(1.0, 0.0, 0.0), 1e-7);
        let c = store.add_vertex(Point3d::new(2.0, 0.0, 0.0), 1e-7);
        let d = store.add_vertex(Point3d::new(2.0, 1.0, 0.0), 1e-7);
        let e0 = line_edge(&mut store, a, b).unwrap();
        let e1 = line_edge(&mut store, c, d).unwrap();
        let e2 = line_edge(&mut store, d, a).unwrap();
        assert!(make_wire(&mut store, vec![e0, e1, e2]).is_err());
    }

    #[test]
    fn test_closed_circle_edge_has_one_vertex() {
        let mut store = EntityStore::new();
        let c = Curve::Circle(Circle3d::new(Ax3::world(), 2.0));
        let e = curve_edge(&mut store, c, (0.0, std::f64::consts::TAU), None, None).unwrap();
        assert!(store.edge(e.id).unwrap().is_closed());
    }

    #[test]
    fn test_planar_face_normal_follows_winding() {
        let mut store = EntityStore::new();
        let edges = square(&mut store);
        let w = make_wire(&mut store, edges).unwrap();
        let f = make_planar_face(&mut store, vec![w]).unwrap();
        let n = store.face_surface(f.id).unwrap().normal(0.0, 0.0);
        assert!((n.z - 1.0).abs() < 1e-12);
    }
}
