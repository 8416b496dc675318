//! Flattening of a [`Brep`] into [`BrepData`] records.
//!
//! Planes, cylinders, spheres and NURBS surfaces keep their own
//! parameterization, so their trimming curves may be written in the
//! parameter plane. Cones and tori are written as B-spline surfaces; their
//! edges are then always written in 3D, because the B-spline
//! parameterization differs from the analytic one.

use brep_kernel::geometry::{Curve, Curve2d, Surface};
use brep_kernel::mesh::discretize::EdgeDiscretizer;
use brep_kernel::mesh::{uv, MeshParams};
use brep_kernel::topology::{explorer, EntityStore, Shape, ShapeKind, SurfaceId};
use brep_types::{Cylinder, Frame, Sphere};
use serde::Serialize;
use tracing::debug;

use crate::brep::Brep;
use crate::conversions::{
    circle2d_from_kernel, circle_from_kernel, ellipse2d_from_kernel, ellipse_from_kernel,
    frame_from_kernel, line2d_from_kernel, line_from_kernel, plane_from_kernel, point_from_kernel,
};
use crate::data::{BrepData, EdgeData, FaceData};
use crate::errors::{BrepError, Result};
use crate::kinds::{CurveKind, SurfaceKind};
use crate::nurbs_curve::NurbsCurve;
use crate::nurbs_surface::NurbsSurface;

const OP: &str = "Brep::to_data";

fn payload<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| BrepError::construction(OP, e.to_string()))
}

pub(crate) fn brep_data(brep: &Brep) -> Result<BrepData> {
    let store = brep.store();
    let root = brep.root();
    let vertices = brep.points()?;

    let mut edges = Vec::new();
    for e in explorer::map_shapes(store, root, ShapeKind::Edge).map_err(BrepError::kernel(OP))? {
        if let Some(record) = edge_record(store, Shape::forward(e.id), None)? {
            edges.push(record);
        }
    }

    let mut faces = Vec::new();
    for f in explorer::map_shapes(store, root, ShapeKind::Face).map_err(BrepError::kernel(OP))? {
        faces.push(face_record(store, f)?);
    }
    debug!(vertices = vertices.len(), edges = edges.len(), faces = faces.len(), "brep flattened");
    Ok(BrepData {
        vertices,
        edges,
        faces,
    })
}

fn face_record(store: &EntityStore, face: Shape) -> Result<FaceData> {
    let tface = store.face(face.id).map_err(BrepError::kernel(OP))?;
    let surface = store.surface(tface.surface).map_err(BrepError::kernel(OP))?;
    let (domain_u, domain_v) =
        uv::face_parameter_bounds(store, face.id).map_err(BrepError::kernel(OP))?;

    let mut domains = (domain_u, domain_v);
    let (kind, surface_payload, frame, native_uv) = match surface {
        Surface::Plane(p) => (
            SurfaceKind::Plane,
            payload(&plane_from_kernel(&p.position))?,
            frame_from_kernel(&p.position),
            true,
        ),
        Surface::Cylinder(c) => {
            let mut frame = frame_from_kernel(&c.position);
            frame.point =
                point_from_kernel(&c.position.to_global(0.0, 0.0, (domain_v.0 + domain_v.1) / 2.0));
            let cylinder = Cylinder::new(frame, c.radius, domain_v.1 - domain_v.0);
            (
                SurfaceKind::Cylinder,
                payload(&cylinder)?,
                frame_from_kernel(&c.position),
                true,
            )
        }
        Surface::Sphere(s) => (
            SurfaceKind::Sphere,
            payload(&Sphere {
                frame: frame_from_kernel(&s.position),
                radius: s.radius,
            })?,
            frame_from_kernel(&s.position),
            true,
        ),
        Surface::Bezier(n) => (
            SurfaceKind::BezierSurface,
            payload(&NurbsSurface::from_native(n.clone()).to_data())?,
            Frame::worldxy(),
            true,
        ),
        Surface::BSpline(n) => (
            SurfaceKind::BsplineSurface,
            payload(&NurbsSurface::from_native(n.clone()).to_data())?,
            Frame::worldxy(),
            true,
        ),
        Surface::Cone(_) | Surface::Torus(_) => {
            let n = surface.to_nurbs(domain_u, domain_v);
            domains = (n.domain_u(), n.domain_v());
            (
                SurfaceKind::BsplineSurface,
                payload(&NurbsSurface::from_native(n).to_data())?,
                Frame::worldxy(),
                false,
            )
        }
    };
    let (domain_u, domain_v) = domains;

    // Outer loop first.
    let mut disc = EdgeDiscretizer::new(MeshParams::default());
    let mut wires: Vec<(Shape, f64)> = uv::face_loops(store, face.id, &mut disc)
        .map_err(BrepError::kernel(OP))?
        .into_iter()
        .map(|l| (l.wire, l.signed_area().abs()))
        .collect();
    wires.sort_by(|a, b| b.1.total_cmp(&a.1));

    let embed = native_uv.then_some(tface.surface);
    let mut loops = Vec::with_capacity(wires.len());
    for (wire, _) in wires {
        let mut records = Vec::new();
        for e in store.children(wire).map_err(BrepError::kernel(OP))? {
            if let Some(record) = edge_record(store, e, embed)? {
                records.push(record);
            }
        }
        loops.push(records);
    }

    Ok(FaceData {
        kind,
        surface: surface_payload,
        domain_u: [domain_u.0, domain_u.1],
        domain_v: [domain_v.0, domain_v.1],
        frame,
        orientation: face.orientation,
        loops,
    })
}

/// Record of one edge occurrence. Edges without a 3D curve are written in
/// the parameter plane of `surface`; without a surface they are skipped.
fn edge_record(
    store: &EntityStore,
    occurrence: Shape,
    surface: Option<SurfaceId>,
) -> Result<Option<EdgeData>> {
    let edge = store.edge(occurrence.id).map_err(BrepError::kernel(OP))?;
    let start = point_from_kernel(&store.point(edge.vertices[0]).map_err(BrepError::kernel(OP))?);
    let end = point_from_kernel(&store.point(edge.vertices[1]).map_err(BrepError::kernel(OP))?);
    let range = edge.range;

    let (kind, curve, domain, dimension) = match (&edge.curve, edge.degenerated) {
        (Some(c), false) => {
            let (kind, curve, domain) = curve3d_payload(c, range)?;
            (kind, curve, domain, 3)
        }
        _ => {
            let pcurve = surface
                .and_then(|sid| edge.pcurve(sid))
                .or_else(|| surface.is_none().then(|| edge.pcurves.first()).flatten());
            let Some(pcurve) = pcurve else {
                return Ok(None);
            };
            let (kind, curve, domain) = curve2d_payload(&pcurve.curve, range)?;
            (kind, curve, domain, 2)
        }
    };
    Ok(Some(EdgeData {
        kind,
        curve,
        domain: [domain.0, domain.1],
        start,
        end,
        orientation: occurrence.orientation,
        dimension,
    }))
}

fn curve3d_payload(
    curve: &Curve,
    range: (f64, f64),
) -> Result<(CurveKind, serde_json::Value, (f64, f64))> {
    Ok(match curve {
        Curve::Line(l) => (CurveKind::Line, payload(&line_from_kernel(l, range))?, range),
        Curve::Circle(c) => (CurveKind::Circle, payload(&circle_from_kernel(c))?, range),
        Curve::Ellipse(e) => (CurveKind::Ellipse, payload(&ellipse_from_kernel(e))?, range),
        Curve::BSpline(n) => (
            CurveKind::Bspline,
            payload(&NurbsCurve::from_native(n.clone()).to_data())?,
            range,
        ),
        Curve::Hyperbola(_) | Curve::Parabola(_) | Curve::Bezier(_) => {
            let n = NurbsCurve::from_native(curve.to_nurbs(range.0, range.1));
            let domain = n.domain();
            (CurveKind::Bspline, payload(&n.to_data())?, domain)
        }
    })
}

fn curve2d_payload(
    curve: &Curve2d,
    range: (f64, f64),
) -> Result<(CurveKind, serde_json::Value, (f64, f64))> {
    Ok(match curve {
        Curve2d::Line(l) => (CurveKind::Line, payload(&line2d_from_kernel(l, range))?, range),
        Curve2d::Circle(c) => (CurveKind::Circle, payload(&circle2d_from_kernel(c))?, range),
        Curve2d::Ellipse(e) => (CurveKind::Ellipse, payload(&ellipse2d_from_kernel(e))?, range),
        Curve2d::BSpline(n) => (
            CurveKind::Bspline,
            payload(&NurbsCurve::from_native(n.clone()).to_data())?,
            range,
        ),
    })
}
