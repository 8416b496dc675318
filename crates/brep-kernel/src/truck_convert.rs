//! Conversion between stored shapes and truck topology.
//!
//! Planes stay planes; every other surface crosses over as a NURBS patch
//! covering the face. Truck has no closed or degenerated edges, so closed
//! edges are split in two and degenerated edges are dropped from wires.
//! Coming back, edge geometry other than lines and B-splines is sampled
//! into degree-1 B-splines.

use std::collections::HashMap;

use tracing::debug;
use truck_geometry::prelude::{BSplineCurve, BSplineSurface, KnotVec, Line, NurbsCurve, NurbsSurface, Plane};
use truck_modeling::geometry::{Curve as TCurve, Surface as TSurface};
use truck_modeling::topology::{Edge, Face, Shell, Solid, Vertex, Wire};
use truck_modeling::{builder, BoundedCurve, ParameterDivision1D, Point3, Vector4};

use crate::geometry::curves::{Curve, Line3d};
use crate::geometry::frame::Ax3;
use crate::geometry::nurbs::{NurbsCurve as NCurve, NurbsSurface as NSurface};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{PlaneSurface, Surface};
use crate::mesh::uv::face_parameter_bounds;
use crate::topology::{check, explorer, heal, EntityStore, Orientation, Shape, ShapeId, ShapeKind, TEdge};
use crate::types::KernelError;
use crate::Tolerance;

fn to_point3(p: Point3d) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

fn from_point3(p: Point3) -> Point3d {
    Point3d::new(p.x, p.y, p.z)
}

fn knot_vec(knots: &[f64]) -> KnotVec {
    KnotVec::from(knots.to_vec())
}

fn nurbs_curve_to_truck(c: &NCurve) -> TCurve {
    if !c.is_rational() {
        return TCurve::BSplineCurve(BSplineCurve::new(
            knot_vec(&c.knots),
            c.control_points.iter().map(|p| to_point3(*p)).collect(),
        ));
    }
    let cps = c
        .control_points
        .iter()
        .zip(&c.weights)
        .map(|(p, w)| Vector4::new(p.x * w, p.y * w, p.z * w, *w))
        .collect();
    TCurve::NurbsCurve(NurbsCurve::new(BSplineCurve::new(knot_vec(&c.knots), cps)))
}

fn nurbs_surface_to_truck(s: &NSurface) -> TSurface {
    let knots = (knot_vec(&s.knots_u), knot_vec(&s.knots_v));
    if !s.is_rational() {
        let cps = (0..s.num_u)
            .map(|i| (0..s.num_v).map(|j| to_point3(s.control_point(i, j))).collect())
            .collect();
        return TSurface::BSplineSurface(BSplineSurface::new(knots, cps));
    }
    let cps = (0..s.num_u)
        .map(|i| {
            (0..s.num_v)
                .map(|j| {
                    let p = s.control_point(i, j);
                    let w = s.weight(i, j);
                    Vector4::new(p.x * w, p.y * w, p.z * w, w)
                })
                .collect()
        })
        .collect();
    TSurface::NurbsSurface(NurbsSurface::new(BSplineSurface::new(knots, cps)))
}

// ─── Native to truck ─────────────────────────────────────────────────────────

#[derive(Default)]
struct ToTruck {
    vertices: HashMap<ShapeId, Vertex>,
    /// Forward-oriented truck edges making up each stored edge.
    edges: HashMap<ShapeId, Vec<Edge>>,
}

impl ToTruck {
    fn vertex(&mut self, store: &EntityStore, id: ShapeId) -> Result<Vertex, KernelError> {
        if let Some(v) = self.vertices.get(&id) {
            return Ok(v.clone());
        }
        let v = builder::vertex(to_point3(store.point(id)?));
        self.vertices.insert(id, v.clone());
        Ok(v)
    }

    fn edge_curve(store: &EntityStore, id: ShapeId, t0: f64, t1: f64) -> Result<TCurve, KernelError> {
        let e = store.edge(id)?;
        match &e.curve {
            Some(Curve::Line(_)) => Ok(TCurve::Line(Line(
                to_point3(store.edge_point(id, t0)?),
                to_point3(store.edge_point(id, t1)?),
            ))),
            Some(c) => Ok(nurbs_curve_to_truck(&c.to_nurbs(t0, t1))),
            None => {
                let n = 32;
                let points = (0..=n)
                    .map(|i| store.edge_point(id, t0 + (t1 - t0) * i as f64 / n as f64))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut knots = vec![0.0];
                knots.extend((0..=n).map(|i| i as f64 / n as f64));
                knots.push(1.0);
                Ok(TCurve::BSplineCurve(BSplineCurve::new(
                    KnotVec::from(knots),
                    points.into_iter().map(to_point3).collect(),
                )))
            }
        }
    }

    fn edges(&mut self, store: &EntityStore, id: ShapeId) -> Result<Vec<Edge>, KernelError> {
        if let Some(es) = self.edges.get(&id) {
            return Ok(es.clone());
        }
        let e = store.edge(id)?.clone();
        let (t0, t1) = e.range;
        let v0 = self.vertex(store, e.vertices[0])?;
        let v1 = self.vertex(store, e.vertices[1])?;
        let out = if e.is_closed() {
            let tm = 0.5 * (t0 + t1);
            let vm = builder::vertex(to_point3(store.edge_point(id, tm)?));
            vec![
                Edge::new(&v0, &vm, Self::edge_curve(store, id, t0, tm)?),
                Edge::new(&vm, &v1, Self::edge_curve(store, id, tm, t1)?),
            ]
        } else {
            vec![Edge::new(&v0, &v1, Self::edge_curve(store, id, t0, t1)?)]
        };
        self.edges.insert(id, out.clone());
        Ok(out)
    }

    fn wire(&mut self, store: &EntityStore, wire: Shape) -> Result<Wire, KernelError> {
        let mut out = Vec::new();
        for e in store.children(wire)? {
            if store.edge(e.id)?.degenerated {
                continue;
            }
            let pieces = self.edges(store, e.id)?;
            match e.orientation {
                Orientation::Forward => out.extend(pieces),
                Orientation::Reversed => out.extend(pieces.iter().rev().map(Edge::inverse)),
            }
        }
        Ok(Wire::from(out))
    }

    fn face(&mut self, store: &EntityStore, face: Shape) -> Result<Face, KernelError> {
        let f = store.face(face.id)?.clone();
        let surface = match store.surface(f.surface)? {
            Surface::Plane(p) => {
                let a = &p.position;
                TSurface::Plane(Plane::new(
                    to_point3(a.origin),
                    to_point3(a.origin + a.x_dir),
                    to_point3(a.origin + a.y_dir),
                ))
            }
            other => {
                let (ur, vr) = face_parameter_bounds(store, face.id)?;
                nurbs_surface_to_truck(&other.to_nurbs(ur, vr))
            }
        };
        let wires = f
            .wires
            .iter()
            .map(|w| self.wire(store, *w))
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = Face::try_new(wires, surface)
            .map_err(|e| KernelError::shape(format!("truck rejected face: {e}")))?;
        if face.orientation == Orientation::Reversed {
            out.invert();
        }
        Ok(out)
    }

    fn shell(&mut self, store: &EntityStore, shell: Shape) -> Result<Shell, KernelError> {
        let faces = store
            .children(shell)?
            .into_iter()
            .map(|f| self.face(store, f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Shell::from(faces))
    }
}

/// Truck shell of every face of `shape`.
pub fn to_truck_shell(store: &EntityStore, shape: Shape) -> Result<Shell, KernelError> {
    let mut conv = ToTruck::default();
    let faces = explorer::map_shapes(store, shape, ShapeKind::Face)?
        .into_iter()
        .map(|f| conv.face(store, f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Shell::from(faces))
}

/// Truck solid bounded by the shells of `shape`. A bare closed shell is
/// accepted as a solid.
pub fn to_truck_solid(store: &EntityStore, shape: Shape) -> Result<Solid, KernelError> {
    let mut conv = ToTruck::default();
    let shells = match store.kind(shape)? {
        ShapeKind::Solid => store.children(shape)?,
        ShapeKind::Shell => vec![shape],
        ShapeKind::Compound => {
            let solids = explorer::map_shapes(store, shape, ShapeKind::Solid)?;
            if solids.len() != 1 {
                return Err(KernelError::shape(format!(
                    "expected one solid, found {}",
                    solids.len()
                )));
            }
            store.children(solids[0])?
        }
        other => {
            return Err(KernelError::shape(format!("cannot make a solid from a {other:?}")));
        }
    };
    let shells = shells
        .into_iter()
        .map(|s| conv.shell(store, s))
        .collect::<Result<Vec<_>, _>>()?;
    Solid::try_new(shells).map_err(|e| KernelError::shape(format!("truck rejected solid: {e}")))
}

// ─── Truck to native ─────────────────────────────────────────────────────────

fn curve_from_truck(curve: &TCurve) -> (Curve, (f64, f64)) {
    match curve {
        TCurve::Line(Line(p, q)) => {
            let (a, b) = (from_point3(*p), from_point3(*q));
            (Curve::Line(Line3d::from_points(a, b)), (0.0, a.distance_to(&b)))
        }
        TCurve::BSplineCurve(bs) => {
            let c = NCurve {
                degree: bs.degree(),
                control_points: bs.control_points().iter().map(|p| from_point3(*p)).collect(),
                weights: vec![1.0; bs.control_points().len()],
                knots: bs.knot_vec().iter().copied().collect(),
                periodic: false,
            };
            let d = c.domain();
            (Curve::BSpline(c), d)
        }
        TCurve::NurbsCurve(nc) => {
            let bs = nc.non_rationalized();
            let c = NCurve {
                degree: bs.degree(),
                control_points: bs
                    .control_points()
                    .iter()
                    .map(|v| Point3d::new(v.x / v.w, v.y / v.w, v.z / v.w))
                    .collect(),
                weights: bs.control_points().iter().map(|v| v.w).collect(),
                knots: bs.knot_vec().iter().copied().collect(),
                periodic: false,
            };
            let d = c.domain();
            (Curve::BSpline(c), d)
        }
        other => {
            let range = other.range_tuple();
            let (_, points) = other.parameter_division(range, Tolerance::default().sewing * 10.0);
            let n = points.len().max(2);
            let mut knots = vec![0.0];
            knots.extend((0..n).map(|i| i as f64 / (n - 1) as f64));
            knots.push(1.0);
            let mut control_points: Vec<Point3d> = points.into_iter().map(from_point3).collect();
            if control_points.len() < 2 {
                control_points.push(control_points.first().copied().unwrap_or(Point3d::ORIGIN));
            }
            let c = NCurve {
                degree: 1,
                weights: vec![1.0; control_points.len()],
                control_points,
                knots,
                periodic: false,
            };
            (Curve::BSpline(c), (0.0, 1.0))
        }
    }
}

fn surface_from_truck(surface: &TSurface) -> Result<Surface, KernelError> {
    match surface {
        TSurface::Plane(p) => {
            let u = p.u_axis();
            let v = p.v_axis();
            let o = from_point3(p.origin());
            let x = crate::geometry::vector::Vec3::new(u.x, u.y, u.z);
            let y = crate::geometry::vector::Vec3::new(v.x, v.y, v.z);
            Ok(Surface::Plane(PlaneSurface {
                position: Ax3::new(o, x.cross(&y), x),
            }))
        }
        TSurface::BSplineSurface(bs) => {
            let cps = bs.control_points();
            let (ku, kv) = bs.knot_vecs();
            let num_u = cps.len();
            let num_v = cps.first().map_or(0, Vec::len);
            Ok(Surface::BSpline(NSurface::try_new(
                bs.udegree(),
                bs.vdegree(),
                cps.iter().flatten().map(|p| from_point3(*p)).collect(),
                vec![1.0; num_u * num_v],
                ku.iter().copied().collect(),
                kv.iter().copied().collect(),
                num_u,
                num_v,
            )?))
        }
        TSurface::NurbsSurface(ns) => {
            let bs = ns.non_rationalized();
            let cps = bs.control_points();
            let (ku, kv) = bs.knot_vecs();
            let num_u = cps.len();
            let num_v = cps.first().map_or(0, Vec::len);
            Ok(Surface::BSpline(NSurface::try_new(
                bs.udegree(),
                bs.vdegree(),
                cps.iter()
                    .flatten()
                    .map(|v| Point3d::new(v.x / v.w, v.y / v.w, v.z / v.w))
                    .collect(),
                cps.iter().flatten().map(|v| v.w).collect(),
                ku.iter().copied().collect(),
                kv.iter().copied().collect(),
                num_u,
                num_v,
            )?))
        }
        TSurface::RevolutedCurve(_) => Err(KernelError::NotSupported {
            operation: "import of truck revolved surfaces".to_string(),
        }),
    }
}

fn cached<K: std::hash::Hash + Eq>(
    map: &mut HashMap<K, ShapeId>,
    key: K,
    make: impl FnOnce() -> Result<ShapeId, KernelError>,
) -> Result<ShapeId, KernelError> {
    if let Some(id) = map.get(&key) {
        return Ok(*id);
    }
    let id = make()?;
    map.insert(key, id);
    Ok(id)
}

/// Stored copy of a truck solid. Several boundary shells that each enclose
/// material become a compound of solids; otherwise they bound one solid.
pub fn from_truck_solid(solid: &Solid) -> Result<(EntityStore, Shape), KernelError> {
    let mut out = EntityStore::new();
    let mut vertices = HashMap::new();
    let mut edges = HashMap::new();
    let tol = Tolerance::default().confusion;
    let mut shells = Vec::new();
    for shell in solid.boundaries() {
        let mut faces = Vec::new();
        for f in shell.face_iter() {
            let sid = out.add_surface(surface_from_truck(&f.surface())?);
            let mut wires = Vec::new();
            for w in f.absolute_boundaries() {
                let mut occurrences = Vec::new();
                for e in w.edge_iter() {
                    let front = e.absolute_front();
                    let back = e.absolute_back();
                    let v0 = cached(&mut vertices, front.id(), || {
                        Ok(out.add_vertex(from_point3(front.point()), tol).id)
                    })?;
                    let v1 = cached(&mut vertices, back.id(), || {
                        Ok(out.add_vertex(from_point3(back.point()), tol).id)
                    })?;
                    let id = cached(&mut edges, e.id(), || {
                        let (curve, range) = curve_from_truck(&e.curve());
                        Ok(out
                            .add_edge(TEdge {
                                vertices: [v0, v1],
                                curve: Some(curve),
                                range,
                                pcurves: Vec::new(),
                                degenerated: false,
                                tolerance: tol,
                            })?
                            .id)
                    })?;
                    let orientation = if e.orientation() {
                        Orientation::Forward
                    } else {
                        Orientation::Reversed
                    };
                    occurrences.push(Shape { id, orientation });
                }
                wires.push(out.add_wire(occurrences)?);
            }
            let face = out.add_face(sid, wires, tol)?;
            heal::fix_face(&mut out, face.id)?;
            // Intersection curves from truck's booleans are fitted within
            // the boolean tolerance; the face tolerance grows to cover them.
            if let Ok(gap) = check::max_edge_deviation(&out, face.id) {
                let f = out.face_mut(face.id)?;
                f.tolerance = f.tolerance.max(gap);
            }
            faces.push(if f.orientation() { face } else { face.reversed() });
        }
        let closed = heal::is_closed_set(&out, &faces)?;
        shells.push(out.add_shell(faces, closed)?);
    }
    debug!(shells = shells.len(), "converted truck solid");
    if shells.len() > 1 {
        let mut volumes = Vec::with_capacity(shells.len());
        for s in &shells {
            volumes.push(
                crate::mesh::mass::mass_properties(&out, *s, &Default::default())?.volume,
            );
        }
        if volumes.iter().all(|v| *v > 0.0) {
            let solids = shells
                .iter()
                .map(|s| out.add_solid(vec![*s]))
                .collect::<Result<Vec<_>, _>>()?;
            let root = out.add_compound(solids)?;
            return Ok((out, root));
        }
    }
    let root = out.add_solid(shells)?;
    Ok((out, root))
}
