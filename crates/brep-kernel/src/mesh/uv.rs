//! Face boundaries in the parameter plane of the face's surface.
//!
//! Edges with parameter curves are mapped exactly. Other edges are inverted
//! onto the surface and unwrapped across the periods of closed surfaces, so
//! that every wire becomes a closed polygon in (u, v).

use super::discretize::EdgeDiscretizer;
use super::MeshParams;
use crate::geometry::curves::wrap_into;
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::Surface;
use crate::topology::{EntityStore, Orientation, Shape, ShapeId};
use crate::types::KernelError;

#[derive(Debug, Clone, Copy)]
pub struct UvNode {
    pub uv: Point2d,
    pub point: Point3d,
}

/// A wire as a closed polygon in the parameter plane. The last node is not
/// repeated.
#[derive(Debug, Clone)]
pub struct UvLoop {
    pub wire: Shape,
    pub nodes: Vec<UvNode>,
    /// Each edge occurrence with the index of its first node.
    pub edges: Vec<(Shape, usize)>,
}

impl UvLoop {
    /// Shoelace area; positive for counter-clockwise loops.
    pub fn signed_area(&self) -> f64 {
        polygon_area(self.nodes.iter().map(|n| n.uv))
    }
}

pub fn polygon_area(points: impl IntoIterator<Item = Point2d>) -> f64 {
    let pts: Vec<Point2d> = points.into_iter().collect();
    let n = pts.len();
    (0..n)
        .map(|i| {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Start and length of the period of each closed parameter direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Closure {
    pub u: Option<(f64, f64)>,
    pub v: Option<(f64, f64)>,
}

impl Closure {
    pub fn of(surface: &Surface) -> Self {
        let ((u0, _), (v0, _)) = surface.parameter_bounds();
        Self {
            u: surface
                .u_period()
                .map(|p| (u0, p))
                .or_else(|| closed_nurbs(surface, true)),
            v: surface
                .v_period()
                .map(|p| (v0, p))
                .or_else(|| closed_nurbs(surface, false)),
        }
    }

    fn unwrap_near(&self, uv: Point2d, reference: Point2d) -> Point2d {
        let mut out = uv;
        if let Some((_, p)) = self.u {
            out.x += ((reference.x - uv.x) / p).round() * p;
        }
        if let Some((_, p)) = self.v {
            out.y += ((reference.y - uv.y) / p).round() * p;
        }
        out
    }
}

/// NURBS surfaces whose opposite boundaries coincide behave as periodic
/// for unwrapping purposes.
fn closed_nurbs(surface: &Surface, along_u: bool) -> Option<(f64, f64)> {
    let n = match surface {
        Surface::Bezier(n) | Surface::BSpline(n) => n,
        _ => return None,
    };
    let ((a, b), (c, d)) = if along_u {
        (n.domain_u(), n.domain_v())
    } else {
        (n.domain_v(), n.domain_u())
    };
    let scale = n
        .control_points
        .iter()
        .map(|p| p.to_vec3().length())
        .fold(1.0, f64::max);
    for k in 0..=4 {
        let w = c + (d - c) * k as f64 / 4.0;
        let (p, q) = if along_u {
            (n.evaluate(a, w), n.evaluate(b, w))
        } else {
            (n.evaluate(w, a), n.evaluate(w, b))
        };
        if p.distance_to(&q) > 1e-7 * scale {
            return None;
        }
    }
    Some((a, b - a))
}

struct EdgeTrace {
    edge: Shape,
    points: Vec<Point3d>,
    uvs: Vec<Point2d>,
    resolved: bool,
    degenerate: bool,
    seam: bool,
}

/// Boundary polygons of a face, one per wire, in the frame of the forward
/// face.
pub fn face_loops(
    store: &EntityStore,
    face: ShapeId,
    disc: &mut EdgeDiscretizer,
) -> Result<Vec<UvLoop>, KernelError> {
    let f = store.face(face)?;
    let surface = store.surface(f.surface)?;
    let closure = Closure::of(surface);
    f.wires
        .iter()
        .map(|w| wire_loop(store, f.surface, surface, &closure, *w, disc))
        .collect()
}

fn wire_loop(
    store: &EntityStore,
    sid: crate::topology::SurfaceId,
    surface: &Surface,
    closure: &Closure,
    wire: Shape,
    disc: &mut EdgeDiscretizer,
) -> Result<UvLoop, KernelError> {
    let occurrences = store.children(wire)?;
    let mut traces = Vec::with_capacity(occurrences.len());
    for e in &occurrences {
        let d = disc.discretize(store, e.id)?;
        let edge = store.edge(e.id)?;
        let mut params = d.params.clone();
        let mut points = d.points.clone();
        if e.orientation == Orientation::Reversed {
            params.reverse();
            points.reverse();
        }
        let seam = occurrences.iter().filter(|o| o.is_same(e)).count() > 1;
        let (uvs, resolved) = match store.pcurve(*e, sid)? {
            Some(pc) => (params.iter().map(|t| pc.evaluate(*t)).collect(), true),
            None if edge.degenerated => (Vec::new(), false),
            None => (
                points.iter().map(|p| surface.parameters_of(p)).collect(),
                false,
            ),
        };
        traces.push(EdgeTrace {
            edge: *e,
            degenerate: uvs.is_empty(),
            points,
            uvs,
            resolved,
            seam,
        });
    }

    for tr in traces
        .iter_mut()
        .filter(|t| !t.resolved && !t.degenerate && t.seam)
    {
        place_seam(tr, closure);
    }

    // Continue the remaining edges from a resolved neighbour.
    let n = traces.len();
    let start = traces
        .iter()
        .position(|t| t.resolved)
        .map(|i| i + 1)
        .unwrap_or(0);
    let mut reference = if start > 0 {
        traces[start - 1].uvs.last().copied()
    } else {
        None
    };
    for k in 0..n {
        let tr = &mut traces[(start + k) % n];
        if tr.degenerate {
            continue;
        }
        if !tr.resolved {
            for uv in tr.uvs.iter_mut() {
                if let Some(r) = reference {
                    *uv = closure.unwrap_near(*uv, r);
                }
                reference = Some(*uv);
            }
            tr.resolved = true;
        }
        reference = tr.uvs.last().copied();
    }

    // Degenerated edges run straight between their neighbours.
    for i in 0..n {
        if !traces[i].degenerate {
            continue;
        }
        let from = (1..n)
            .map(|k| &traces[(i + n - k) % n])
            .find(|t| !t.degenerate)
            .and_then(|t| t.uvs.last().copied())
            .unwrap_or(Point2d::new(0.0, 0.0));
        let to = (1..n)
            .map(|k| &traces[(i + k) % n])
            .find(|t| !t.degenerate)
            .and_then(|t| t.uvs.first().copied())
            .unwrap_or(from);
        let count = traces[i].points.len();
        traces[i].uvs = (0..count)
            .map(|j| from.lerp(&to, j as f64 / (count - 1).max(1) as f64))
            .collect();
    }

    let mut nodes = Vec::new();
    let mut edges = Vec::with_capacity(n);
    for tr in &traces {
        edges.push((tr.edge, nodes.len()));
        let keep = tr.points.len().saturating_sub(1).max(if n == 1 { 1 } else { 0 });
        for j in 0..keep {
            nodes.push(UvNode {
                uv: tr.uvs[j],
                point: tr.points[j],
            });
        }
    }
    Ok(UvLoop { wire, nodes, edges })
}

/// A seam known only in 3D lies on one of the two boundaries of a closed
/// direction. Following the boundary counter-clockwise decides which.
fn place_seam(tr: &mut EdgeTrace, closure: &Closure) {
    if tr.uvs.is_empty() {
        return;
    }
    if let Some((u0, p)) = closure.u {
        if constant_on_boundary(tr.uvs.iter().map(|q| q.x), u0, p) {
            unwrap_sequence(tr.uvs.iter_mut().map(|q| &mut q.y), closure.v);
            let dv = tr.uvs[tr.uvs.len() - 1].y - tr.uvs[0].y;
            let u = if dv > 0.0 { u0 + p } else { u0 };
            tr.uvs.iter_mut().for_each(|q| q.x = u);
            tr.resolved = true;
            return;
        }
    }
    if let Some((v0, p)) = closure.v {
        if constant_on_boundary(tr.uvs.iter().map(|q| q.y), v0, p) {
            unwrap_sequence(tr.uvs.iter_mut().map(|q| &mut q.x), closure.u);
            let du = tr.uvs[tr.uvs.len() - 1].x - tr.uvs[0].x;
            let v = if du > 0.0 { v0 } else { v0 + p };
            tr.uvs.iter_mut().for_each(|q| q.y = v);
            tr.resolved = true;
        }
    }
}

fn constant_on_boundary(values: impl Iterator<Item = f64>, start: f64, period: f64) -> bool {
    let tol = 1e-6 * period;
    values.into_iter().all(|x| {
        let w = wrap_into(x, start, period) - start;
        w < tol || period - w < tol
    })
}

/// Make a coordinate sequence continuous across its period and shift it
/// into the base period.
fn unwrap_sequence<'a>(values: impl Iterator<Item = &'a mut f64>, closed: Option<(f64, f64)>) {
    let Some((start, p)) = closed else {
        return;
    };
    let mut values: Vec<&mut f64> = values.collect();
    for i in 1..values.len() {
        let prev = *values[i - 1];
        let x = &mut *values[i];
        *x += ((prev - *x) / p).round() * p;
    }
    let min = values.iter().map(|x| **x).fold(f64::INFINITY, f64::min);
    let shift = ((start - min) / p).round() * p;
    for x in values {
        *x += shift;
    }
}

/// Parameter rectangle covered by a face's boundary. Directions that wind
/// around a closed surface cover the whole period.
pub fn face_parameter_bounds(
    store: &EntityStore,
    face: ShapeId,
) -> Result<((f64, f64), (f64, f64)), KernelError> {
    let mut disc = EdgeDiscretizer::new(MeshParams {
        linear_deflection: 1e9,
        angular_deflection: 0.5,
    });
    let loops = face_loops(store, face, &mut disc)?;
    let surface = store.face_surface(face)?;
    let closure = Closure::of(surface);
    let mut u = (f64::INFINITY, f64::NEG_INFINITY);
    let mut v = (f64::INFINITY, f64::NEG_INFINITY);
    for l in &loops {
        for n in &l.nodes {
            u = (u.0.min(n.uv.x), u.1.max(n.uv.x));
            v = (v.0.min(n.uv.y), v.1.max(n.uv.y));
        }
    }
    let ((bu0, bu1), (bv0, bv1)) = surface.parameter_bounds();
    if !u.0.is_finite() {
        u = finite_or(bu0, bu1);
        v = finite_or(bv0, bv1);
    }
    if let Some((u0, p)) = closure.u {
        if u.1 - u.0 > 0.5 * p {
            u = (u0, u0 + p);
        }
    }
    if let Some((v0, p)) = closure.v {
        if v.1 - v.0 > 0.5 * p {
            v = (v0, v0 + p);
        }
    }
    Ok((u, v))
}

fn finite_or(a: f64, b: f64) -> (f64, f64) {
    if a.is_finite() && b.is_finite() {
        (a, b)
    } else {
        (0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frame::Ax3;
    use crate::primitives;
    use crate::topology::{explorer, ShapeKind};

    #[test]
    fn test_cylinder_lateral_loop_is_rectangle() {
        let mut store = EntityStore::new();
        let c = primitives::make_cylinder(&mut store, &Ax3::world(), 1.0, 2.0).unwrap();
        let mut disc = EdgeDiscretizer::new(MeshParams::default());
        for f in explorer::map_shapes(&store, c, ShapeKind::Face).unwrap() {
            if !matches!(store.face_surface(f.id).unwrap(), Surface::Cylinder(_)) {
                continue;
            }
            let loops = face_loops(&store, f.id, &mut disc).unwrap();
            assert_eq!(loops.len(), 1);
            let area = loops[0].signed_area();
            assert!((area - 2.0 * std::f64::consts::TAU).abs() < 1e-9);
        }
    }

    #[test]
    fn test_seam_placement_without_pcurves() {
        let mut store = EntityStore::new();
        let c = primitives::make_cylinder(&mut store, &Ax3::world(), 1.0, 2.0).unwrap();
        let edges = explorer::map_shapes(&store, c, ShapeKind::Edge).unwrap();
        for e in edges {
            store.edge_mut(e.id).unwrap().pcurves.clear();
        }
        let mut disc = EdgeDiscretizer::new(MeshParams::default());
        for f in explorer::map_shapes(&store, c, ShapeKind::Face).unwrap() {
            if !matches!(store.face_surface(f.id).unwrap(), Surface::Cylinder(_)) {
                continue;
            }
            let loops = face_loops(&store, f.id, &mut disc).unwrap();
            let area = loops[0].signed_area();
            assert!((area - 2.0 * std::f64::consts::TAU).abs() < 1e-6, "area {area}");
        }
    }

    #[test]
    fn test_bounds_of_full_sphere() {
        let mut store = EntityStore::new();
        let s = primitives::make_sphere(&mut store, &Ax3::world(), 1.0).unwrap();
        let f = explorer::map_shapes(&store, s, ShapeKind::Face).unwrap()[0];
        let (u, v) = face_parameter_bounds(&store, f.id).unwrap();
        assert!((u.1 - u.0 - std::f64::consts::TAU).abs() < 1e-9);
        assert!((v.0 + std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
