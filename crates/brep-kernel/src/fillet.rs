//! Constant-radius rolling-ball fillets on planar polyhedra.
//!
//! Every rounded edge becomes a cylindrical strip tangent to its two faces.
//! Where three rounded edges meet, a spherical patch closes the corner. Two
//! rounded edges sharing a face meet in an elliptic miter when the sharp edge
//! left between them is square to that face. A single rounded edge ending on
//! a face square to it cuts its end arc into that face. Faces shrink to the
//! tangent lines of the strips.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::geometry::curves::{Circle3d, Curve, Ellipse3d};
use crate::geometry::frame::Ax3;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{CylindricalSurface, PlaneSurface, SphericalSurface, Surface};
use crate::geometry::vector::Vec3;
use crate::topology::builders::{curve_edge, line_edge, make_face};
use crate::topology::explorer;
use crate::topology::shape::{Orientation, Shape, ShapeId, ShapeKind};
use crate::topology::store::EntityStore;
use crate::types::{KernelError, ShapeRef};
use crate::Tolerance;

/// One side of a face loop, running counter-clockwise about the outward
/// normal.
#[derive(Debug, Clone, Copy)]
struct Side {
    start: ShapeId,
    end: ShapeId,
    edge: ShapeId,
}

#[derive(Debug, Clone)]
struct FaceLoop {
    /// Points out of the material.
    normal: Vec3,
    sides: Vec<Side>,
}

/// A rounded edge running `a -> b` in the loop of face `fa` and `b -> a` in
/// the loop of face `fb`.
#[derive(Debug, Clone, Copy)]
struct Round {
    a: ShapeId,
    b: ShapeId,
    fa: usize,
    fb: usize,
    dir: Vec3,
    /// From a point of the edge to the axis of its strip.
    offset: Vec3,
}

/// Vertex of the filleted solid: an untouched original vertex, the tangent
/// point of the ball at an original vertex on one face, or the end of a
/// miter on the sharp edge it shortens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VKey {
    Orig(ShapeId),
    Corner(ShapeId, usize),
    Miter(ShapeId),
}

#[derive(Debug, Clone, Copy)]
enum Seg {
    Line,
    /// Circular arc about a ball centre.
    Arc(Point3d),
    /// Elliptic miter at a vertex where two strips meet.
    Miter(ShapeId),
}

fn unsupported(what: &str) -> KernelError {
    KernelError::NotSupported {
        operation: format!("fillet {what}"),
    }
}

fn failed(reason: impl Into<String>) -> KernelError {
    KernelError::FilletFailed {
        reason: reason.into(),
    }
}

fn newell(points: &[Point3d]) -> Vec3 {
    let Some(first) = points.first() else {
        return Vec3::ZERO;
    };
    let mut n = Vec3::ZERO;
    for i in 1..points.len().saturating_sub(1) {
        n = n + (points[i] - *first).cross(&(points[i + 1] - *first));
    }
    n
}

fn face_loop(store: &EntityStore, face: Shape) -> Result<FaceLoop, KernelError> {
    let surface = store.face_surface(face.id)?;
    if !matches!(surface, Surface::Plane(_)) {
        return Err(unsupported("on curved faces"));
    }
    let mut normal = surface.normal(0.0, 0.0);
    if face.orientation == Orientation::Reversed {
        normal = -normal;
    }
    let [wire] = store.face(face.id)?.wires.as_slice() else {
        return Err(unsupported("on faces with holes"));
    };
    let mut sides = Vec::new();
    for e in store.children(*wire)? {
        let edge = store.edge(e.id)?;
        if edge.degenerated || !matches!(edge.curve, Some(Curve::Line(_))) {
            return Err(unsupported("on curved edges"));
        }
        sides.push(Side {
            start: store.first_vertex(e)?.id,
            end: store.last_vertex(e)?.id,
            edge: e.id,
        });
    }
    let points = sides
        .iter()
        .map(|s| store.point(s.start))
        .collect::<Result<Vec<_>, _>>()?;
    if newell(&points).dot(&normal) < 0.0 {
        sides.reverse();
        for s in &mut sides {
            std::mem::swap(&mut s.start, &mut s.end);
        }
    }
    Ok(FaceLoop { normal, sides })
}

struct Fillet<'a> {
    src: &'a EntityStore,
    radius: f64,
    loops: Vec<FaceLoop>,
    /// Face indices using each edge, in loop order.
    uses: HashMap<ShapeId, Vec<usize>>,
    rounds: HashMap<ShapeId, Round>,
    /// Ball centre at every vertex touched by a rounded edge.
    centers: HashMap<ShapeId, Point3d>,
    /// Number of rounded edges at each vertex.
    rounded_at: HashMap<ShapeId, usize>,
    /// Face shared by the two strips meeting at a mitered vertex.
    miter_face: HashMap<ShapeId, usize>,
    out: EntityStore,
    vertices: HashMap<VKey, Shape>,
    edges: HashMap<(VKey, VKey), Shape>,
}

impl<'a> Fillet<'a> {
    fn point(&self, key: VKey) -> Result<Point3d, KernelError> {
        match key {
            VKey::Orig(v) => self.src.point(v),
            VKey::Corner(v, f) => {
                let c = self
                    .centers
                    .get(&v)
                    .ok_or_else(|| failed("corner without a ball centre"))?;
                Ok(*c + self.loops[f].normal * self.radius)
            }
            VKey::Miter(v) => {
                let f = self
                    .miter_face
                    .get(&v)
                    .ok_or_else(|| failed("miter without a shared face"))?;
                Ok(self.src.point(v)? - self.loops[*f].normal * self.radius)
            }
        }
    }

    fn center(&self, v: ShapeId) -> Result<Point3d, KernelError> {
        self.centers
            .get(&v)
            .copied()
            .ok_or_else(|| failed("rounded vertex without a ball centre"))
    }

    /// Where the strip tangent to face `f` ends at vertex `v`.
    fn end_key(&self, v: ShapeId, f: usize) -> VKey {
        match self.miter_face.get(&v) {
            Some(shared) if *shared != f => VKey::Miter(v),
            _ => VKey::Corner(v, f),
        }
    }

    fn end_seg(&self, v: ShapeId) -> Result<Seg, KernelError> {
        if self.miter_face.contains_key(&v) {
            Ok(Seg::Miter(v))
        } else {
            Ok(Seg::Arc(self.center(v)?))
        }
    }

    fn other_face(&self, edge: ShapeId, face: usize) -> Result<usize, KernelError> {
        self.uses
            .get(&edge)
            .and_then(|u| u.iter().copied().find(|f| *f != face))
            .ok_or_else(|| failed("solid shell is not closed"))
    }

    /// Vertices of face `f` replacing original vertex `v`, entered through
    /// side `inside` and left through side `outside`. Consecutive entries
    /// are joined by an arc about the ball centre at `v`.
    fn corner_keys(&self, f: usize, v: ShapeId, inside: Side, outside: Side) -> Result<Vec<VKey>, KernelError> {
        let k = self.rounded_at.get(&v).copied().unwrap_or(0);
        if k == 0 {
            return Ok(vec![VKey::Orig(v)]);
        }
        if k == 2 {
            return Ok(vec![self.end_key(v, f)]);
        }
        let touches_round = |s: &Side| self.rounds.contains_key(&s.edge);
        if k == 3 || touches_round(&inside) || touches_round(&outside) {
            return Ok(vec![VKey::Corner(v, f)]);
        }
        Ok(vec![
            VKey::Corner(v, self.other_face(inside.edge, f)?),
            VKey::Corner(v, self.other_face(outside.edge, f)?),
        ])
    }

    fn vertex(&mut self, key: VKey) -> Result<Shape, KernelError> {
        if let Some(v) = self.vertices.get(&key) {
            return Ok(*v);
        }
        let p = self.point(key)?;
        let v = self.out.add_vertex(p, Tolerance::default().confusion);
        self.vertices.insert(key, v);
        Ok(v)
    }

    /// Edge between two vertices, shared with the face that already
    /// traversed it the other way.
    fn edge(&mut self, from: VKey, to: VKey, seg: Seg) -> Result<Shape, KernelError> {
        if let Some(e) = self.edges.get(&(to, from)) {
            return Ok(e.reversed());
        }
        if let Some(e) = self.edges.get(&(from, to)) {
            return Ok(*e);
        }
        if let Seg::Miter(v) = seg {
            return self.miter(v, from);
        }
        let v0 = self.vertex(from)?;
        let v1 = self.vertex(to)?;
        let e = match seg {
            Seg::Line | Seg::Miter(_) => line_edge(&mut self.out, v0, v1)?,
            Seg::Arc(c) => {
                let x = self.point(from)? - c;
                let w = self.point(to)? - c;
                let circle = Circle3d::new(Ax3::new(c, x.cross(&w), x), self.radius);
                curve_edge(
                    &mut self.out,
                    Curve::Circle(circle),
                    (0.0, x.angle_to(&w)),
                    Some(v0),
                    Some(v1),
                )?
            }
        };
        self.edges.insert((from, to), e);
        Ok(e)
    }

    /// Quarter ellipse from the end of the shortened sharp edge at `v` to
    /// the tangent point on the shared face, oriented to start at `from`.
    fn miter(&mut self, v: ShapeId, from: VKey) -> Result<Shape, KernelError> {
        let shared = *self
            .miter_face
            .get(&v)
            .ok_or_else(|| failed("miter without a shared face"))?;
        let (m, t) = (VKey::Miter(v), VKey::Corner(v, shared));
        let e = match self.edges.get(&(m, t)) {
            Some(e) => *e,
            None => {
                let c = self.center(v)?;
                let major = self.point(m)? - c;
                let normal = self.loops[shared].normal;
                let ellipse = Ellipse3d {
                    position: Ax3::new(c, major.cross(&normal), major),
                    major_radius: major.length(),
                    minor_radius: self.radius,
                };
                let v0 = self.vertex(m)?;
                let v1 = self.vertex(t)?;
                let e = curve_edge(
                    &mut self.out,
                    Curve::Ellipse(ellipse),
                    (0.0, std::f64::consts::FRAC_PI_2),
                    Some(v0),
                    Some(v1),
                )?;
                self.edges.insert((m, t), e);
                e
            }
        };
        Ok(if from == m { e } else { e.reversed() })
    }

    fn planar_face(&mut self, f: usize) -> Result<Shape, KernelError> {
        let sides = self.loops[f].sides.clone();
        let normal = self.loops[f].normal;
        let n = sides.len();
        let mut seqs = Vec::with_capacity(n);
        for i in 0..n {
            let inside = sides[(i + n - 1) % n];
            seqs.push(self.corner_keys(f, sides[i].start, inside, sides[i])?);
        }
        let mut edges = Vec::new();
        for i in 0..n {
            let v = sides[i].start;
            for pair in seqs[i].windows(2) {
                let c = self.center(v)?;
                edges.push(self.edge(pair[0], pair[1], Seg::Arc(c))?);
            }
            let from = *seqs[i].last().ok_or_else(|| failed("empty corner"))?;
            let to = *seqs[(i + 1) % n]
                .first()
                .ok_or_else(|| failed("empty corner"))?;
            let was = self.src.point(sides[i].end)? - self.src.point(sides[i].start)?;
            let now = self.point(to)? - self.point(from)?;
            if now.dot(&was) <= Tolerance::default().sewing * was.length() {
                return Err(failed(format!("radius {} is too large for the face", self.radius)));
            }
            edges.push(self.edge(from, to, Seg::Line)?);
        }
        let origin = self.point(seqs[0][0])?;
        let x_ref = self.src.point(sides[0].end)? - self.src.point(sides[0].start)?;
        let wire = self.out.add_wire(edges)?;
        make_face(
            &mut self.out,
            Surface::Plane(PlaneSurface {
                position: Ax3::new(origin, normal, x_ref),
            }),
            vec![wire],
        )
    }

    fn strip(&mut self, round: Round) -> Result<Shape, KernelError> {
        let Round { a, b, fa, fb, dir, .. } = round;
        let ca = self.center(a)?;
        let (a_in_a, a_in_b) = (self.end_key(a, fa), self.end_key(a, fb));
        let (b_in_a, b_in_b) = (self.end_key(b, fa), self.end_key(b, fb));
        let (seg_a, seg_b) = (self.end_seg(a)?, self.end_seg(b)?);
        let edges = vec![
            self.edge(b_in_a, a_in_a, Seg::Line)?,
            self.edge(a_in_a, a_in_b, seg_a)?,
            self.edge(a_in_b, b_in_b, Seg::Line)?,
            self.edge(b_in_b, b_in_a, seg_b)?,
        ];
        let bisector = self.loops[fa].normal + self.loops[fb].normal;
        let wire = self.out.add_wire(edges)?;
        make_face(
            &mut self.out,
            Surface::Cylinder(CylindricalSurface {
                position: Ax3::new(ca, dir, -bisector),
                radius: self.radius,
            }),
            vec![wire],
        )
    }

    fn corner_patch(&mut self, v: ShapeId, faces: [usize; 3]) -> Result<Shape, KernelError> {
        let c = self.center(v)?;
        let [f0, mut f1, mut f2] = faces;
        let n = |f: usize| self.loops[f].normal;
        let mid = (n(f0) + n(f1) + n(f2)).normalized_or(n(f0));
        if (n(f1) - n(f0)).cross(&(n(f2) - n(f0))).dot(&mid) < 0.0 {
            std::mem::swap(&mut f1, &mut f2);
        }
        let keys = [VKey::Corner(v, f0), VKey::Corner(v, f1), VKey::Corner(v, f2)];
        let mut edges = Vec::with_capacity(3);
        for i in 0..3 {
            edges.push(self.edge(keys[i], keys[(i + 1) % 3], Seg::Arc(c))?);
        }
        let wire = self.out.add_wire(edges)?;
        make_face(
            &mut self.out,
            Surface::Sphere(SphericalSurface {
                position: Ax3::new(c, mid.any_perpendicular(), -mid),
                radius: self.radius,
            }),
            vec![wire],
        )
    }
}

/// Round `edges` of the planar solid `solid` with a ball of `radius`.
///
/// Supported configurations: convex edges between two planar faces, whose
/// ends either meet two other rounded edges at a three-valent vertex or end
/// on a face perpendicular to the edge. Anything else is `NotSupported`;
/// a radius that consumes a face side is `FilletFailed`.
#[instrument(skip_all, fields(edges = edges.len(), radius))]
pub fn fillet_edges(
    solid: ShapeRef<'_>,
    edges: &[ShapeId],
    radius: f64,
) -> Result<(EntityStore, Shape), KernelError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(failed(format!("radius must be positive, got {radius}")));
    }
    let src = solid.store;
    let owned: HashSet<ShapeId> = explorer::map_shapes(src, solid.shape, ShapeKind::Edge)?
        .into_iter()
        .map(|e| e.id)
        .collect();
    if let Some(missing) = edges.iter().find(|e| !owned.contains(e)) {
        return Err(failed(format!("edge {missing:?} does not belong to the solid")));
    }
    if edges.is_empty() {
        return src.extract(solid.shape);
    }
    let shells = explorer::map_shapes(src, solid.shape, ShapeKind::Shell)?;
    if shells.len() != 1 {
        return Err(unsupported("on solids with several shells"));
    }

    let loops = explorer::map_shapes(src, solid.shape, ShapeKind::Face)?
        .into_iter()
        .map(|f| face_loop(src, f))
        .collect::<Result<Vec<_>, _>>()?;
    let mut uses: HashMap<ShapeId, Vec<usize>> = HashMap::new();
    let mut vertex_edges: HashMap<ShapeId, HashSet<ShapeId>> = HashMap::new();
    let mut vertex_faces: HashMap<ShapeId, Vec<usize>> = HashMap::new();
    for (f, l) in loops.iter().enumerate() {
        for s in &l.sides {
            uses.entry(s.edge).or_default().push(f);
            vertex_edges.entry(s.start).or_default().insert(s.edge);
            vertex_edges.entry(s.end).or_default().insert(s.edge);
            vertex_faces.entry(s.start).or_default().push(f);
        }
    }
    if uses.values().any(|u| u.len() != 2) {
        return Err(failed("solid shell is not closed"));
    }

    let mut rounds = HashMap::new();
    let mut rounded_at: HashMap<ShapeId, usize> = HashMap::new();
    for &e in edges.iter().collect::<HashSet<_>>() {
        let &[fa, fb] = uses[&e].as_slice() else {
            return Err(failed("edge is not shared by two faces"));
        };
        let side = |f: usize| loops[f].sides.iter().find(|s| s.edge == e).copied();
        let (Some(sa), Some(sb)) = (side(fa), side(fb)) else {
            return Err(failed("edge missing from its face loop"));
        };
        if sa.start != sb.end || sa.end != sb.start {
            return Err(failed("faces around the edge are inconsistently oriented"));
        }
        let dir = (src.point(sa.end)? - src.point(sa.start)?)
            .normalized()
            .ok_or_else(|| failed("zero-length edge"))?;
        let (na, nb) = (loops[fa].normal, loops[fb].normal);
        let bend = na.cross(&nb).dot(&dir);
        if bend < -1e-9 {
            return Err(unsupported("on concave edges"));
        }
        if bend < 1e-9 {
            return Err(failed("edge joins tangent faces"));
        }
        let offset = (na + nb) * (-radius / (1.0 + na.dot(&nb)));
        for v in [sa.start, sa.end] {
            *rounded_at.entry(v).or_default() += 1;
        }
        rounds.insert(
            e,
            Round {
                a: sa.start,
                b: sa.end,
                fa,
                fb,
                dir,
                offset,
            },
        );
    }

    let mut centers = HashMap::new();
    let mut miter_face = HashMap::new();
    let mut spheres = Vec::new();
    for (&v, &k) in &rounded_at {
        let valence = vertex_edges.get(&v).map_or(0, HashSet::len);
        let faces = vertex_faces.get(&v).cloned().unwrap_or_default();
        if valence != 3 || faces.len() != 3 {
            return Err(unsupported("at vertices with more than three edges"));
        }
        let p = src.point(v)?;
        match k {
            1 => {
                let (_, r) = rounds
                    .iter()
                    .find(|(_, r)| r.a == v || r.b == v)
                    .ok_or_else(|| failed("rounded vertex without an edge"))?;
                let end_face = faces
                    .iter()
                    .copied()
                    .find(|f| *f != r.fa && *f != r.fb)
                    .ok_or_else(|| failed("edge end without a third face"))?;
                if loops[end_face].normal.dot(&r.dir).abs() < 1.0 - 1e-9 {
                    return Err(unsupported("ending on an oblique face"));
                }
                centers.insert(v, p + r.offset);
            }
            2 | 3 => {
                let [na, nb, nc] = [0, 1, 2].map(|i| loops[faces[i]].normal);
                let det = na.triple(&nb, &nc);
                if det.abs() < 1e-12 {
                    return Err(failed("corner faces are coplanar"));
                }
                let sum = nb.cross(&nc) + nc.cross(&na) + na.cross(&nb);
                centers.insert(v, p - sum * (radius / det));
                if k == 3 {
                    spheres.push((v, [faces[0], faces[1], faces[2]]));
                    continue;
                }
                let strips: Vec<&Round> = rounds.values().filter(|r| r.a == v || r.b == v).collect();
                let shared = faces
                    .iter()
                    .copied()
                    .find(|f| strips.iter().all(|r| r.fa == *f || r.fb == *f))
                    .ok_or_else(|| failed("rounded edges without a common face"))?;
                let square = faces
                    .iter()
                    .filter(|f| **f != shared)
                    .all(|f| loops[*f].normal.dot(&loops[shared].normal).abs() < 1e-9);
                if !square {
                    return Err(unsupported("where two rounded edges meet at an oblique corner"));
                }
                miter_face.insert(v, shared);
            }
            _ => return Err(unsupported("at vertices with more than three rounded edges")),
        }
    }
    spheres.sort_by_key(|(v, _)| *v);

    let mut job = Fillet {
        src,
        radius,
        loops,
        uses,
        rounds,
        centers,
        rounded_at,
        miter_face,
        out: EntityStore::new(),
        vertices: HashMap::new(),
        edges: HashMap::new(),
    };
    let mut faces = Vec::new();
    for f in 0..job.loops.len() {
        faces.push(job.planar_face(f)?);
    }
    let mut strips: Vec<Round> = job.rounds.values().copied().collect();
    strips.sort_by_key(|r| (r.fa, r.fb));
    for r in strips {
        faces.push(job.strip(r)?);
    }
    for (v, corner) in spheres {
        faces.push(job.corner_patch(v, corner)?);
    }
    debug!(faces = faces.len(), "fillet computed");
    let shell = job.out.add_shell(faces, true)?;
    let solid = job.out.add_solid(vec![shell])?;
    Ok((job.out, solid))
}
