//! Primitive solids and faces built directly in an [`EntityStore`].
//!
//! Closed primitives follow one layout: curved faces carry a seam edge whose
//! forward occurrence lies on the high-u boundary of the parameter
//! rectangle, and every wire runs counter-clockwise in (u, v) so that
//! natural surface normals point out of the material.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::{info, instrument};

use crate::geometry::curves::{Circle3d, Curve};
use crate::geometry::curves2d::{Circle2d, Curve2d};
use crate::geometry::frame::Ax3;
use crate::geometry::nurbs::NurbsSurface;
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::{
    ConicalSurface, CylindricalSurface, PlaneSurface, SphericalSurface, Surface, ToroidalSurface,
};
use crate::geometry::vector::{Vec2, Vec3};
use crate::topology::builders::{self, add_pcurve};
use crate::topology::{EntityStore, Shape, SurfaceId};
use crate::types::KernelError;
use crate::Tolerance;

fn positive(name: &str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() && value > Tolerance::default().confusion {
        Ok(())
    } else {
        Err(KernelError::geometry(format!("{name} must be positive, got {value}")))
    }
}

fn closed_solid(store: &mut EntityStore, faces: Vec<Shape>) -> Result<Shape, KernelError> {
    let shell = store.add_shell(faces, true)?;
    store.add_solid(vec![shell])
}

fn uline(a: (f64, f64), b: (f64, f64), t0: f64, t1: f64) -> Curve2d {
    Curve2d::line(Point2d::new(a.0, a.1), Point2d::new(b.0, b.1), t0, t1)
}

// ─── Box ─────────────────────────────────────────────────────────────────────

/// Box with one corner at the frame origin, extending along its axes.
#[instrument(skip(store))]
pub fn make_box(
    store: &mut EntityStore,
    frame: &Ax3,
    dx: f64,
    dy: f64,
    dz: f64,
) -> Result<Shape, KernelError> {
    positive("dx", dx)?;
    positive("dy", dy)?;
    positive("dz", dz)?;
    let tol = Tolerance::default().confusion;
    let corners: Vec<Shape> = (0..8)
        .map(|i| {
            let (x, y, z) = ((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64);
            store.add_vertex(frame.to_global(x * dx, y * dy, z * dz), tol)
        })
        .collect();

    // Counter-clockwise seen from outside.
    const FACES: [[usize; 4]; 6] = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
    ];
    let mut edges: HashMap<(usize, usize), Shape> = HashMap::new();
    let mut faces = Vec::with_capacity(6);
    for quad in FACES {
        let mut wire_edges = Vec::with_capacity(4);
        for k in 0..4 {
            let (a, b) = (quad[k], quad[(k + 1) % 4]);
            let e = if let Some(e) = edges.get(&(b, a)) {
                e.reversed()
            } else {
                let e = builders::line_edge(store, corners[a], corners[b])?;
                edges.insert((a, b), e);
                e
            };
            wire_edges.push(e);
        }
        let p: Vec<Point3d> = quad
            .iter()
            .map(|&i| store.point(corners[i].id))
            .collect::<Result<_, _>>()?;
        let normal = (p[1] - p[0]).cross(&(p[2] - p[1]));
        let plane = Surface::Plane(PlaneSurface {
            position: Ax3::new(p[0], normal, p[1] - p[0]),
        });
        let wire = store.add_wire(wire_edges)?;
        faces.push(builders::make_face(store, plane, vec![wire])?);
    }
    let solid = closed_solid(store, faces)?;
    info!(dx, dy, dz, "box created");
    Ok(solid)
}

// ─── Bodies of revolution ────────────────────────────────────────────────────

/// Lateral face of a body of revolution over `u ∈ [0, 2π]`, `v ∈ [v0, v1]`.
/// `bottom` and `top` are the boundary circles (or degenerated edges at an
/// apex) running with increasing u.
fn lateral_face(
    store: &mut EntityStore,
    sid: SurfaceId,
    seam: Shape,
    bottom: Shape,
    top: Shape,
) -> Result<Shape, KernelError> {
    let wire = store.add_wire(vec![bottom, seam, top.reversed(), seam.reversed()])?;
    store.add_face(sid, vec![wire], Tolerance::default().confusion)
}

/// Circle edge of a cap at height `z` of `frame`, with its pcurve on the
/// lateral surface, or a degenerated edge when the radius vanishes.
fn rim(
    store: &mut EntityStore,
    frame: &Ax3,
    lateral: SurfaceId,
    vertex: Shape,
    radius: f64,
    z: f64,
    v: f64,
) -> Result<(Shape, bool), KernelError> {
    let pcurve = uline((0.0, v), (TAU, v), 0.0, TAU);
    if radius <= Tolerance::default().confusion {
        let e = builders::degenerated_edge(store, vertex, lateral, pcurve, (0.0, TAU))?;
        return Ok((e, true));
    }
    let position = Ax3 {
        origin: frame.to_global(0.0, 0.0, z),
        ..*frame
    };
    let e = builders::curve_edge(
        store,
        Curve::Circle(Circle3d::new(position, radius)),
        (0.0, TAU),
        Some(vertex),
        Some(vertex),
    )?;
    add_pcurve(store, e.id, lateral, pcurve, None)?;
    Ok((e, false))
}

/// Planar cap bounded by `circle`. Bottom caps face against the frame axis.
fn cap(
    store: &mut EntityStore,
    frame: &Ax3,
    circle: Shape,
    radius: f64,
    z: f64,
    bottom: bool,
) -> Result<Shape, KernelError> {
    let origin = frame.to_global(0.0, 0.0, z);
    let normal = if bottom { -frame.z_dir } else { frame.z_dir };
    let sid = store.add_surface(Surface::Plane(PlaneSurface {
        position: Ax3::new(origin, normal, frame.x_dir),
    }));
    add_pcurve(
        store,
        circle.id,
        sid,
        Curve2d::Circle(Circle2d {
            center: Point2d::new(0.0, 0.0),
            x_dir: Vec2::new(1.0, 0.0),
            radius,
            ccw: !bottom,
        }),
        None,
    )?;
    let occurrence = if bottom { circle.reversed() } else { circle };
    let wire = store.add_wire(vec![occurrence])?;
    store.add_face(sid, vec![wire], Tolerance::default().confusion)
}

/// Cylinder whose base circle is centred on the frame origin.
#[instrument(skip(store))]
pub fn make_cylinder(
    store: &mut EntityStore,
    frame: &Ax3,
    radius: f64,
    height: f64,
) -> Result<Shape, KernelError> {
    positive("radius", radius)?;
    positive("height", height)?;
    let solid = make_cone(store, frame, radius, radius, height)?;
    info!(radius, height, "cylinder created");
    Ok(solid)
}

/// Truncated cone from radius `r1` at the frame origin to `r2` at `height`
/// along the frame axis. Equal radii give a cylindrical surface; a zero
/// radius gives an apex.
#[instrument(skip(store))]
pub fn make_cone(
    store: &mut EntityStore,
    frame: &Ax3,
    r1: f64,
    r2: f64,
    height: f64,
) -> Result<Shape, KernelError> {
    positive("height", height)?;
    if r1 < 0.0 || r2 < 0.0 || (r1 <= 0.0 && r2 <= 0.0) {
        return Err(KernelError::geometry("cone needs one positive radius"));
    }
    let tol = Tolerance::default().confusion;
    let cylindrical = (r1 - r2).abs() < tol;
    let (surface, length) = if cylindrical {
        (
            Surface::Cylinder(CylindricalSurface {
                position: *frame,
                radius: r1,
            }),
            height,
        )
    } else {
        let semi_angle = ((r2 - r1) / height).atan();
        (
            Surface::Cone(ConicalSurface {
                position: *frame,
                radius: r1,
                semi_angle,
            }),
            (height * height + (r2 - r1) * (r2 - r1)).sqrt(),
        )
    };
    let lateral = store.add_surface(surface);

    let v0 = store.add_vertex(frame.to_global(r1, 0.0, 0.0), tol);
    let v1 = store.add_vertex(frame.to_global(r2, 0.0, height), tol);
    let seam = builders::line_edge(store, v0, v1)?;
    add_pcurve(
        store,
        seam.id,
        lateral,
        uline((TAU, 0.0), (TAU, length), 0.0, length),
        Some(uline((0.0, 0.0), (0.0, length), 0.0, length)),
    )?;
    let (bottom, bottom_apex) = rim(store, frame, lateral, v0, r1, 0.0, 0.0)?;
    let (top, top_apex) = rim(store, frame, lateral, v1, r2, height, length)?;

    let mut faces = vec![lateral_face(store, lateral, seam, bottom, top)?];
    if !bottom_apex {
        faces.push(cap(store, frame, bottom, r1, 0.0, true)?);
    }
    if !top_apex {
        faces.push(cap(store, frame, top, r2, height, false)?);
    }
    let solid = closed_solid(store, faces)?;
    info!(r1, r2, height, "cone created");
    Ok(solid)
}

/// Sphere centred on the frame origin.
#[instrument(skip(store))]
pub fn make_sphere(store: &mut EntityStore, frame: &Ax3, radius: f64) -> Result<Shape, KernelError> {
    positive("radius", radius)?;
    let tol = Tolerance::default().confusion;
    let sid = store.add_surface(Surface::Sphere(SphericalSurface {
        position: *frame,
        radius,
    }));
    let south = store.add_vertex(frame.to_global(0.0, 0.0, -radius), tol);
    let north = store.add_vertex(frame.to_global(0.0, 0.0, radius), tol);

    let meridian = Circle3d::new(Ax3::new(frame.origin, -frame.y_dir, frame.x_dir), radius);
    let seam = builders::curve_edge(
        store,
        Curve::Circle(meridian),
        (-FRAC_PI_2, FRAC_PI_2),
        Some(south),
        Some(north),
    )?;
    add_pcurve(
        store,
        seam.id,
        sid,
        uline((TAU, -FRAC_PI_2), (TAU, FRAC_PI_2), -FRAC_PI_2, FRAC_PI_2),
        Some(uline((0.0, -FRAC_PI_2), (0.0, FRAC_PI_2), -FRAC_PI_2, FRAC_PI_2)),
    )?;
    let bottom = builders::degenerated_edge(
        store,
        south,
        sid,
        uline((0.0, -FRAC_PI_2), (TAU, -FRAC_PI_2), 0.0, TAU),
        (0.0, TAU),
    )?;
    let top = builders::degenerated_edge(
        store,
        north,
        sid,
        uline((0.0, FRAC_PI_2), (TAU, FRAC_PI_2), 0.0, TAU),
        (0.0, TAU),
    )?;
    let face = lateral_face(store, sid, seam, bottom, top)?;
    let solid = closed_solid(store, vec![face])?;
    info!(radius, "sphere created");
    Ok(solid)
}

/// Torus around the frame axis.
#[instrument(skip(store))]
pub fn make_torus(
    store: &mut EntityStore,
    frame: &Ax3,
    major_radius: f64,
    minor_radius: f64,
) -> Result<Shape, KernelError> {
    positive("major radius", major_radius)?;
    positive("minor radius", minor_radius)?;
    if minor_radius >= major_radius {
        return Err(KernelError::geometry("self-intersecting torus"));
    }
    let tol = Tolerance::default().confusion;
    let sid = store.add_surface(Surface::Torus(ToroidalSurface {
        position: *frame,
        major_radius,
        minor_radius,
    }));
    let vertex = store.add_vertex(frame.to_global(major_radius + minor_radius, 0.0, 0.0), tol);

    let equator = builders::curve_edge(
        store,
        Curve::Circle(Circle3d::new(*frame, major_radius + minor_radius)),
        (0.0, TAU),
        Some(vertex),
        Some(vertex),
    )?;
    add_pcurve(
        store,
        equator.id,
        sid,
        uline((0.0, 0.0), (TAU, 0.0), 0.0, TAU),
        Some(uline((0.0, TAU), (TAU, TAU), 0.0, TAU)),
    )?;
    let meridian_frame = Ax3::new(
        frame.to_global(major_radius, 0.0, 0.0),
        -frame.y_dir,
        frame.x_dir,
    );
    let meridian = builders::curve_edge(
        store,
        Curve::Circle(Circle3d::new(meridian_frame, minor_radius)),
        (0.0, TAU),
        Some(vertex),
        Some(vertex),
    )?;
    add_pcurve(
        store,
        meridian.id,
        sid,
        uline((TAU, 0.0), (TAU, TAU), 0.0, TAU),
        Some(uline((0.0, 0.0), (0.0, TAU), 0.0, TAU)),
    )?;
    let face = lateral_face(store, sid, meridian, equator, equator)?;
    let solid = closed_solid(store, vec![face])?;
    info!(major_radius, minor_radius, "torus created");
    Ok(solid)
}

// ─── Faces ───────────────────────────────────────────────────────────────────

/// Rectangular patch `[u0, u1] x [v0, v1]` of the plane of `frame`.
#[instrument(skip(store))]
pub fn make_plane_face(
    store: &mut EntityStore,
    frame: &Ax3,
    u: (f64, f64),
    v: (f64, f64),
) -> Result<Shape, KernelError> {
    positive("u span", u.1 - u.0)?;
    positive("v span", v.1 - v.0)?;
    let corners = [
        frame.to_global(u.0, v.0, 0.0),
        frame.to_global(u.1, v.0, 0.0),
        frame.to_global(u.1, v.1, 0.0),
        frame.to_global(u.0, v.1, 0.0),
    ];
    let sid = store.add_surface(Surface::Plane(PlaneSurface { position: *frame }));
    let wire = polygon_wire(store, &corners)?;
    store.add_face(sid, vec![wire], Tolerance::default().confusion)
}

/// Closed wire of line edges through `points`. Repeated consecutive points
/// are skipped.
pub fn polygon_wire(store: &mut EntityStore, points: &[Point3d]) -> Result<Shape, KernelError> {
    let tol = Tolerance::default();
    let mut pts: Vec<Point3d> = Vec::with_capacity(points.len());
    for p in points {
        if pts.last().map_or(true, |q| q.distance_to(p) > tol.sewing) {
            pts.push(*p);
        }
    }
    while pts.len() > 1 && pts[0].distance_to(&pts[pts.len() - 1]) <= tol.sewing {
        pts.pop();
    }
    if pts.len() < 3 {
        return Err(KernelError::geometry("polygon needs three distinct points"));
    }
    let vertices: Vec<Shape> = pts
        .iter()
        .map(|p| store.add_vertex(*p, tol.confusion))
        .collect();
    let n = vertices.len();
    let edges = (0..n)
        .map(|i| builders::line_edge(store, vertices[i], vertices[(i + 1) % n]))
        .collect::<Result<Vec<_>, _>>()?;
    store.add_wire(edges)
}

/// Face bounded by a polygon. Planar polygons get a plane whose normal
/// follows the winding; any other polygon gets a Coons patch that holds
/// its sides exactly.
#[instrument(skip(store, points), fields(n = points.len()))]
pub fn make_polygon_face(store: &mut EntityStore, points: &[Point3d]) -> Result<Shape, KernelError> {
    let wire = polygon_wire(store, points)?;
    let pts = builders::wire_sample_points(store, wire)?;
    let frame = builders::fit_plane(&pts)?;
    let deviation = pts
        .iter()
        .map(|p| frame.to_local(p).2.abs())
        .fold(0.0, f64::max);
    if deviation <= Tolerance::default().sewing {
        return builders::make_face(store, Surface::Plane(PlaneSurface { position: frame }), vec![wire]);
    }
    let patch = polygon_patch(&pts)?;
    let surface = if patch.num_u == 2 && patch.num_v == 2 {
        Surface::Bezier(patch)
    } else {
        Surface::BSpline(patch)
    };
    builders::make_face(store, surface, vec![wire])
}

/// Bilinear Coons patch of a closed polygon. The corners are split into
/// four chains (bottom, right, top, left) with u running along the first
/// chain. Every chain is piecewise linear, so the patch is bilinear on each
/// cell between chain breakpoints and a degree (1, 1) net over those
/// breakpoints reproduces it exactly.
fn polygon_patch(pts: &[Point3d]) -> Result<NurbsSurface, KernelError> {
    let n = pts.len();
    if n < 4 {
        return Err(KernelError::geometry("a patch needs four polygon corners"));
    }
    let c: Vec<usize> = (0..4).map(|k| k * n / 4).collect();
    let chain = |from: usize, to: usize| -> Vec<Vec3> {
        let to = if to <= from { to + n } else { to };
        (from..=to).map(|i| pts[i % n].to_vec3()).collect()
    };
    let bottom = chain(c[0], c[1]);
    let right = chain(c[1], c[2]);
    let top: Vec<Vec3> = chain(c[2], c[3]).into_iter().rev().collect();
    let left: Vec<Vec3> = chain(c[3], c[0]).into_iter().rev().collect();
    let (p00, p10, p11, p01) = (bottom[0], right[0], right[right.len() - 1], top[0]);
    let us = breakpoints(&bottom, &top);
    let vs = breakpoints(&left, &right);
    let mut control_points = Vec::with_capacity(us.len() * vs.len());
    for &u in &us {
        for &v in &vs {
            let ruled_v = at(&bottom, u) * (1.0 - v) + at(&top, u) * v;
            let ruled_u = at(&left, v) * (1.0 - u) + at(&right, v) * u;
            let corners = p00 * ((1.0 - u) * (1.0 - v))
                + p10 * (u * (1.0 - v))
                + p01 * ((1.0 - u) * v)
                + p11 * (u * v);
            let p = ruled_v + ruled_u - corners;
            control_points.push(Point3d::new(p.x, p.y, p.z));
        }
    }
    let clamp = |ts: &[f64]| {
        let mut k = Vec::with_capacity(ts.len() + 2);
        k.push(0.0);
        k.extend_from_slice(ts);
        k.push(1.0);
        k
    };
    NurbsSurface::try_new(
        1,
        1,
        control_points,
        Vec::new(),
        clamp(&us),
        clamp(&vs),
        us.len(),
        vs.len(),
    )
}

/// Union of the uniform breakpoints of two polyline chains on `[0, 1]`.
fn breakpoints(a: &[Vec3], b: &[Vec3]) -> Vec<f64> {
    let mut ts: Vec<f64> = [a.len() - 1, b.len() - 1]
        .iter()
        .flat_map(|&m| (0..=m).map(move |k| k as f64 / m as f64))
        .collect();
    ts.sort_by(f64::total_cmp);
    ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
    ts
}

/// Point at `t` in `[0, 1]` on a polyline chain with uniformly spaced corners.
fn at(chain: &[Vec3], t: f64) -> Vec3 {
    let m = chain.len() - 1;
    let s = t * m as f64;
    let k = (s.floor() as usize).min(m - 1);
    let f = s - k as f64;
    chain[k] * (1.0 - f) + chain[k + 1] * f
}

/// Prism swept from a polygon along `direction`.
#[instrument(skip(store, points), fields(n = points.len()))]
pub fn make_prism(
    store: &mut EntityStore,
    points: &[Point3d],
    direction: Vec3,
) -> Result<Shape, KernelError> {
    positive("extrusion length", direction.length())?;
    let normal = builders::fit_plane(points)?.z_dir;
    let mut base: Vec<Point3d> = points.to_vec();
    if normal.dot(&direction) < 0.0 {
        base.reverse();
    }
    let tol = Tolerance::default().confusion;
    let n = base.len();
    let lower: Vec<Shape> = base.iter().map(|p| store.add_vertex(*p, tol)).collect();
    let upper: Vec<Shape> = base
        .iter()
        .map(|p| store.add_vertex(*p + direction, tol))
        .collect();
    let mut bottom = Vec::with_capacity(n);
    let mut top = Vec::with_capacity(n);
    let mut sides = Vec::with_capacity(n);
    for i in 0..n {
        let j = (i + 1) % n;
        bottom.push(builders::line_edge(store, lower[i], lower[j])?);
        top.push(builders::line_edge(store, upper[i], upper[j])?);
        sides.push(builders::line_edge(store, lower[i], upper[i])?);
    }

    let mut faces = Vec::with_capacity(n + 2);
    let w = store.add_wire(bottom.iter().rev().map(Shape::reversed).collect())?;
    faces.push(builders::make_planar_face(store, vec![w])?);
    let w = store.add_wire(top.clone())?;
    faces.push(builders::make_planar_face(store, vec![w])?);
    for i in 0..n {
        let j = (i + 1) % n;
        let w = store.add_wire(vec![
            bottom[i],
            sides[j],
            top[i].reversed(),
            sides[i].reversed(),
        ])?;
        faces.push(builders::make_planar_face(store, vec![w])?);
    }
    let solid = closed_solid(store, faces)?;
    info!(faces = n + 2, "prism created");
    Ok(solid)
}

// ─── Sweep ───────────────────────────────────────────────────────────────────

/// Copies of `profile` carried along a polyline `path`, one per path point.
/// The profile is taken where it lies and each copy is pushed along the
/// current segment onto the mitre plane halving the turn at the next path
/// point; the last copy lies in the plane normal to the last segment.
pub fn sweep_sections(
    profile: &[Point3d],
    path: &[Point3d],
) -> Result<Vec<Vec<Point3d>>, KernelError> {
    if path.len() < 2 {
        return Err(KernelError::geometry("sweep path needs two points"));
    }
    let dirs = path
        .windows(2)
        .map(|w| {
            (w[1] - w[0])
                .normalized()
                .ok_or_else(|| KernelError::geometry("sweep path has a zero-length segment"))
        })
        .collect::<Result<Vec<Vec3>, _>>()?;
    let mut sections = vec![profile.to_vec()];
    for (k, d) in dirs.iter().enumerate() {
        let mitre = match dirs.get(k + 1) {
            Some(next) => (*d + *next)
                .normalized()
                .ok_or_else(|| KernelError::geometry("sweep path turns back on itself"))?,
            None => *d,
        };
        let slope = d.dot(&mitre);
        if slope < Tolerance::default().confusion {
            return Err(KernelError::geometry("sweep path turns back on itself"));
        }
        let at = path[k + 1];
        let prev = &sections[k];
        let next = prev
            .iter()
            .map(|q| *q + *d * ((at - *q).dot(&mitre) / slope))
            .collect();
        sections.push(next);
    }
    Ok(sections)
}

/// Planar faces, as point lists, of a polyline profile swept along a
/// polyline path: one quadrilateral per profile segment and path segment,
/// plus both end caps when the profile is closed.
pub fn sweep_polygons(
    profile: &[Point3d],
    closed: bool,
    path: &[Point3d],
) -> Result<Vec<Vec<Point3d>>, KernelError> {
    let min = if closed { 3 } else { 2 };
    if profile.len() < min {
        return Err(KernelError::geometry(format!("sweep profile needs {min} points")));
    }
    let sections = sweep_sections(profile, path)?;
    let n = profile.len();
    let spans = if closed { n } else { n - 1 };
    let mut polygons = Vec::with_capacity(spans * (sections.len() - 1) + 2);
    for pair in sections.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        for i in 0..spans {
            let j = (i + 1) % n;
            polygons.push(vec![a[i], a[j], b[j], b[i]]);
        }
    }
    if closed {
        polygons.push(sections[0].clone());
        polygons.push(sections[sections.len() - 1].clone());
    }
    Ok(polygons)
}
