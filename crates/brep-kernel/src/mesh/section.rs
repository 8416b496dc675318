//! Plane sections of triangulated shapes.

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::{triangulate, MeshParams};
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::primitives::polygon_wire;
use crate::topology::{builders, EntityStore, Shape};
use crate::types::{KernelError, MergedMesh};
use crate::Tolerance;

/// Polylines where `mesh` crosses the plane through `origin` with `normal`.
/// Closed polylines repeat their first point at the end.
pub fn section_polylines(mesh: &MergedMesh, origin: Point3d, normal: Vec3, tol: f64) -> Vec<Vec<Point3d>> {
    let dist = |p: &Point3d| (*p - origin).dot(&normal);
    let mut segments = Vec::new();
    for t in &mesh.triangles {
        let p = [
            mesh.positions[t[0] as usize],
            mesh.positions[t[1] as usize],
            mesh.positions[t[2] as usize],
        ];
        let d = [dist(&p[0]), dist(&p[1]), dist(&p[2])];
        let mut crossing = Vec::with_capacity(2);
        for k in 0..3 {
            let (a, b) = (k, (k + 1) % 3);
            if d[a].abs() <= tol {
                crossing.push(p[a]);
            } else if d[b].abs() > tol && (d[a] > 0.0) != (d[b] > 0.0) {
                let s = d[a] / (d[a] - d[b]);
                crossing.push(p[a].lerp(&p[b], s));
            }
        }
        if crossing.len() == 2 && crossing[0].distance_to(&crossing[1]) > tol {
            segments.push((crossing[0], crossing[1]));
        }
    }
    chain(segments, tol)
}

/// Join segments sharing end points into polylines.
fn chain(segments: Vec<(Point3d, Point3d)>, tol: f64) -> Vec<Vec<Point3d>> {
    let cell = |p: &Point3d| {
        (
            (p.x / tol).round() as i64,
            (p.y / tol).round() as i64,
            (p.z / tol).round() as i64,
        )
    };
    let mut points: Vec<Point3d> = Vec::new();
    let mut ids: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut node = |p: Point3d| -> usize {
        *ids.entry(cell(&p)).or_insert_with(|| {
            points.push(p);
            points.len() - 1
        })
    };
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();
    for (a, b) in segments {
        let (ia, ib) = (node(a), node(b));
        if ia == ib || edges.iter().any(|&(x, y)| (x, y) == (ia, ib) || (x, y) == (ib, ia)) {
            continue;
        }
        adjacency.entry(ia).or_default().push(edges.len());
        adjacency.entry(ib).or_default().push(edges.len());
        edges.push((ia, ib));
    }

    let mut used = vec![false; edges.len()];
    let mut lines = Vec::new();
    // Open chains start at nodes of odd degree.
    let mut starts: Vec<usize> = adjacency
        .iter()
        .filter(|(_, es)| es.len() % 2 == 1)
        .map(|(n, _)| *n)
        .collect();
    starts.sort_unstable();
    starts.extend(edges.iter().map(|e| e.0));
    for start in starts {
        loop {
            let Some(&first) = adjacency[&start].iter().find(|&&e| !used[e]) else {
                break;
            };
            let mut line = vec![points[start]];
            let mut current = start;
            let mut next_edge = Some(first);
            while let Some(e) = next_edge {
                used[e] = true;
                let (a, b) = edges[e];
                current = if a == current { b } else { a };
                line.push(points[current]);
                next_edge = adjacency[&current].iter().copied().find(|&x| !used[x]);
            }
            lines.push(line);
        }
    }
    lines
}

/// Section of `shape` by a plane as a compound of polygonal wires in a new
/// store, or `None` when the plane misses the shape.
#[instrument(skip(store))]
pub fn section(
    store: &EntityStore,
    shape: Shape,
    origin: Point3d,
    normal: Vec3,
    params: MeshParams,
) -> Result<Option<(EntityStore, Shape)>, KernelError> {
    let normal = normal
        .normalized()
        .ok_or_else(|| KernelError::geometry("section plane normal is zero"))?;
    let mesh = triangulate(store, shape, params)?;
    let tol = Tolerance::default().sewing;
    let lines = section_polylines(&mesh, origin, normal, tol);
    if lines.is_empty() {
        return Ok(None);
    }
    let mut out = EntityStore::new();
    let mut wires = Vec::with_capacity(lines.len());
    for line in lines {
        let closed = line.len() > 3 && line[0].distance_to(&line[line.len() - 1]) <= tol;
        if closed {
            let ring = simplify_ring(&line[..line.len() - 1], tol);
            if ring.len() >= 3 {
                wires.push(polygon_wire(&mut out, &ring)?);
            }
            continue;
        }
        let pts = simplify(&line, tol);
        if pts.len() >= 2 {
            let vs: Vec<Shape> = pts.iter().map(|p| out.add_vertex(*p, tol)).collect();
            let edges = vs
                .windows(2)
                .map(|w| builders::line_edge(&mut out, w[0], w[1]))
                .collect::<Result<Vec<_>, _>>()?;
            wires.push(out.add_wire(edges)?);
        }
    }
    debug!(wires = wires.len(), "section computed");
    let root = out.add_compound(wires)?;
    Ok(Some((out, root)))
}

fn is_between(a: Point3d, p: Point3d, b: Point3d, tol: f64) -> bool {
    let ab = b - a;
    let len = ab.length();
    len > 0.0 && ab.cross(&(p - a)).length() / len <= tol && (p - a).dot(&ab) > 0.0
}

/// Drop points of a closed ring lying between their neighbours.
fn simplify_ring(points: &[Point3d], tol: f64) -> Vec<Point3d> {
    let mut ring = points.to_vec();
    let mut i = 0;
    while ring.len() > 3 && i < ring.len() {
        let n = ring.len();
        if is_between(ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n], tol) {
            ring.remove(i);
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
    ring
}

/// Drop interior points lying on the segment between their neighbours.
fn simplify(points: &[Point3d], tol: f64) -> Vec<Point3d> {
    let mut out: Vec<Point3d> = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if let Some(&a) = out.last() {
            if i + 1 < points.len() && is_between(a, *p, points[i + 1], tol) {
                continue;
            }
        }
        out.push(*p);
    }
    out
}
