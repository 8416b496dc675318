use std::collections::{HashMap, HashSet};

use super::discretize::{adaptive, angular_step, EdgeDiscretizer};
use super::uv::{face_loops, UvLoop};
use super::MeshParams;
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;
use crate::topology::{EntityStore, ShapeId};
use crate::types::KernelError;

/// Triangulation of one face in the frame of the forward face: triangles
/// run counter-clockwise in (u, v) and normals are natural surface normals.
#[derive(Debug, Clone, Default)]
pub struct FaceMesh {
    pub uvs: Vec<Point2d>,
    pub positions: Vec<Point3d>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

struct Builder<'a> {
    surface: &'a Surface,
    uvs: Vec<Point2d>,
    positions: Vec<Point3d>,
    triangles: Vec<[u32; 3]>,
}

impl<'a> Builder<'a> {
    fn node(&mut self, uv: Point2d, point: Point3d) -> u32 {
        self.uvs.push(uv);
        self.positions.push(point);
        (self.uvs.len() - 1) as u32
    }

    fn interior(&mut self, uv: Point2d) -> u32 {
        let p = self.surface.evaluate(uv.x, uv.y);
        self.node(uv, p)
    }

    /// Push a triangle, reordering it counter-clockwise in (u, v) and
    /// dropping it when it has no extent in 3D.
    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        let (pa, pb, pc) = (
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        );
        let span = (pb - pa).length().max((pc - pa).length());
        if (pb - pa).cross(&(pc - pa)).length() <= 1e-12 * span * span {
            return;
        }
        let (ua, ub, uc) = (self.uvs[a as usize], self.uvs[b as usize], self.uvs[c as usize]);
        let area = (ub - ua).cross(&(uc - ua));
        if area < 0.0 {
            self.triangles.push([a, c, b]);
        } else {
            self.triangles.push([a, b, c]);
        }
    }

    fn finish(self) -> FaceMesh {
        let normals = self
            .uvs
            .iter()
            .map(|uv| self.surface.normal(uv.x, uv.y))
            .collect();
        FaceMesh {
            uvs: self.uvs,
            positions: self.positions,
            normals,
            triangles: self.triangles,
        }
    }
}

/// Triangulate a face. Boundary nodes come from the shared edge
/// discretization, so neighbouring faces meet without cracks.
pub fn mesh_face(
    store: &EntityStore,
    face: ShapeId,
    disc: &mut EdgeDiscretizer,
) -> Result<FaceMesh, KernelError> {
    let params = *disc.params();
    let loops = face_loops(store, face, disc)?;
    let loops: Vec<UvLoop> = loops.into_iter().filter(|l| l.nodes.len() >= 2).collect();
    if loops.is_empty() {
        return Err(KernelError::TessellationFailed {
            reason: "face has no boundary".into(),
        });
    }
    let surface = store.face_surface(face)?;
    let mut b = Builder {
        surface,
        uvs: Vec::new(),
        positions: Vec::new(),
        triangles: Vec::new(),
    };

    let mut rings: Vec<Vec<u32>> = Vec::with_capacity(loops.len());
    for l in &loops {
        rings.push(l.nodes.iter().map(|n| b.node(n.uv, n.point)).collect());
    }

    let planar = matches!(surface, Surface::Plane(_));
    if !planar && loops.len() == 1 {
        if let Some(rect) = Rectangle::detect(&b.uvs) {
            zip_rows(&mut b, &rect, &params);
            return Ok(b.finish());
        }
    }

    let outer = loops
        .iter()
        .enumerate()
        .max_by(|x, y| x.1.signed_area().abs().total_cmp(&y.1.signed_area().abs()))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut order: Vec<usize> = vec![outer];
    order.extend((0..loops.len()).filter(|&i| i != outer));

    let mut flat = Vec::new();
    let mut holes = Vec::new();
    let mut index = Vec::new();
    for (k, &i) in order.iter().enumerate() {
        if rings[i].len() < 3 {
            continue;
        }
        if k > 0 {
            holes.push(index.len());
        }
        for &n in &rings[i] {
            let uv = b.uvs[n as usize];
            flat.push(uv.x);
            flat.push(uv.y);
            index.push(n);
        }
    }
    let tris = earcutr::earcut(&flat, &holes, 2).map_err(|e| KernelError::TessellationFailed {
        reason: format!("{e:?}"),
    })?;
    for t in tris.chunks_exact(3) {
        b.triangle(index[t[0]], index[t[1]], index[t[2]]);
    }

    if !planar {
        let mut boundary = HashSet::new();
        for ring in &rings {
            for i in 0..ring.len() {
                boundary.insert(key(ring[i], ring[(i + 1) % ring.len()]));
            }
        }
        refine(&mut b, &boundary, &params);
    }
    Ok(b.finish())
}

fn key(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

// ─── Rectangular domains ─────────────────────────────────────────────────────

struct Rectangle {
    u: (f64, f64),
    v: (f64, f64),
    bottom: Vec<u32>,
    top: Vec<u32>,
    left: Vec<u32>,
    right: Vec<u32>,
    eps_v: f64,
}

impl Rectangle {
    /// Recognize a boundary running along the four sides of its bounding
    /// rectangle.
    fn detect(uvs: &[Point2d]) -> Option<Self> {
        let mut u = (f64::INFINITY, f64::NEG_INFINITY);
        let mut v = (f64::INFINITY, f64::NEG_INFINITY);
        for p in uvs {
            u = (u.0.min(p.x), u.1.max(p.x));
            v = (v.0.min(p.y), v.1.max(p.y));
        }
        let (du, dv) = (u.1 - u.0, v.1 - v.0);
        if du <= 0.0 || dv <= 0.0 {
            return None;
        }
        let eps_u = 1e-9 * du.max(1.0);
        let eps_v = 1e-9 * dv.max(1.0);
        let area = super::uv::polygon_area(uvs.iter().copied());
        if (area.abs() - du * dv).abs() > 1e-6 * du * dv {
            return None;
        }
        let mut rect = Rectangle {
            u,
            v,
            bottom: Vec::new(),
            top: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
            eps_v,
        };
        for (i, p) in uvs.iter().enumerate() {
            let i = i as u32;
            let mut on_side = false;
            if (p.y - v.0).abs() < eps_v {
                rect.bottom.push(i);
                on_side = true;
            }
            if (p.y - v.1).abs() < eps_v {
                rect.top.push(i);
                on_side = true;
            }
            if (p.x - u.0).abs() < eps_u {
                rect.left.push(i);
                on_side = true;
            }
            if (p.x - u.1).abs() < eps_u {
                rect.right.push(i);
                on_side = true;
            }
            if !on_side {
                return None;
            }
        }
        let by_u = |a: &u32, b: &u32| uvs[*a as usize].x.total_cmp(&uvs[*b as usize].x);
        let by_v = |a: &u32, b: &u32| uvs[*a as usize].y.total_cmp(&uvs[*b as usize].y);
        rect.bottom.sort_by(by_u);
        rect.top.sort_by(by_u);
        rect.left.sort_by(by_v);
        rect.right.sort_by(by_v);
        Some(rect)
    }
}

/// Mesh a rectangular domain row by row. Rows follow the nodes of the side
/// edges; inner rows are sampled along u within the deflections.
fn zip_rows(b: &mut Builder, rect: &Rectangle, params: &MeshParams) {
    let mut levels: Vec<f64> = rect
        .left
        .iter()
        .chain(rect.right.iter())
        .map(|&i| uv_of(b, i).y)
        .filter(|&y| y > rect.v.0 + rect.eps_v && y < rect.v.1 - rect.eps_v)
        .collect();
    levels.sort_by(f64::total_cmp);
    levels.dedup_by(|x, y| (*x - *y).abs() < rect.eps_v);

    let mut rows: Vec<Vec<u32>> = vec![rect.bottom.clone()];
    for &level in &levels {
        let first = match side_node(b, &rect.left, level, rect.eps_v) {
            Some(i) => i,
            None => b.interior(Point2d::new(rect.u.0, level)),
        };
        let last = match side_node(b, &rect.right, level, rect.eps_v) {
            Some(i) => i,
            None => b.interior(Point2d::new(rect.u.1, level)),
        };
        let mut row = vec![first];
        for u in row_samples(b.surface, level, rect.u, params) {
            row.push(b.interior(Point2d::new(u, level)));
        }
        row.push(last);
        rows.push(row);
    }
    rows.push(rect.top.clone());

    for pair in rows.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        let (mut i, mut j) = (0, 0);
        while i + 1 < lo.len() || j + 1 < hi.len() {
            let advance_lo = if i + 1 >= lo.len() {
                false
            } else if j + 1 >= hi.len() {
                true
            } else {
                uv_of(b, lo[i + 1]).x <= uv_of(b, hi[j + 1]).x
            };
            if advance_lo {
                b.triangle(lo[i], lo[i + 1], hi[j]);
                i += 1;
            } else {
                b.triangle(lo[i], hi[j + 1], hi[j]);
                j += 1;
            }
        }
    }
}

fn uv_of(b: &Builder, i: u32) -> Point2d {
    b.uvs[i as usize]
}

fn side_node(b: &Builder, nodes: &[u32], level: f64, eps: f64) -> Option<u32> {
    nodes
        .iter()
        .copied()
        .find(|&i| (uv_of(b, i).y - level).abs() < eps)
}

/// Inner u samples of the iso-line at `v`, ends excluded.
fn row_samples(surface: &Surface, v: f64, u: (f64, f64), params: &MeshParams) -> Vec<f64> {
    let ts = match surface.u_iso_radius(v) {
        Some(r) => {
            let n = ((u.1 - u.0) / angular_step(r, params)).ceil().max(1.0) as usize;
            (0..=n).map(|i| u.0 + (u.1 - u.0) * i as f64 / n as f64).collect()
        }
        None => adaptive(|t| surface.evaluate(t, v), u.0, u.1, params),
    };
    let n = ts.len();
    ts.into_iter().skip(1).take(n.saturating_sub(2)).collect()
}

// ─── Refinement ──────────────────────────────────────────────────────────────

const MAX_NODES: usize = 200_000;

/// Split interior triangle edges that stray from the surface. Boundary
/// edges are never split.
fn refine(b: &mut Builder, boundary: &HashSet<(u32, u32)>, params: &MeshParams) {
    for _ in 0..8 {
        let mut mids: HashMap<(u32, u32), u32> = HashMap::new();
        let tris = b.triangles.clone();
        for t in &tris {
            for k in 0..3 {
                let (x, y) = (t[k], t[(k + 1) % 3]);
                let e = key(x, y);
                if boundary.contains(&e) || mids.contains_key(&e) {
                    continue;
                }
                let (ux, uy) = (b.uvs[x as usize], b.uvs[y as usize]);
                let um = ux.lerp(&uy, 0.5);
                let pm = b.surface.evaluate(um.x, um.y);
                let chord = b.positions[x as usize].midpoint(&b.positions[y as usize]);
                let nx = b.surface.normal(ux.x, ux.y);
                let ny = b.surface.normal(uy.x, uy.y);
                if pm.distance_to(&chord) > params.linear_deflection
                    || nx.angle_to(&ny) > params.angular_deflection
                {
                    let id = b.node(um, pm);
                    mids.insert(e, id);
                }
            }
        }
        if mids.is_empty() || b.uvs.len() > MAX_NODES {
            return;
        }
        b.triangles.clear();
        for t in tris {
            let m = [
                mids.get(&key(t[0], t[1])).copied(),
                mids.get(&key(t[1], t[2])).copied(),
                mids.get(&key(t[2], t[0])).copied(),
            ];
            split_triangle(b, t, m);
        }
    }
}

fn split_triangle(b: &mut Builder, t: [u32; 3], m: [Option<u32>; 3]) {
    match m.iter().filter(|x| x.is_some()).count() {
        0 => b.triangles.push(t),
        1 => {
            let k = m.iter().position(Option::is_some).unwrap_or(0);
            let (a, bb, c) = (t[k], t[(k + 1) % 3], t[(k + 2) % 3]);
            if let Some(mid) = m[k] {
                b.triangles.push([a, mid, c]);
                b.triangles.push([mid, bb, c]);
            }
        }
        2 => {
            let missing = m.iter().position(Option::is_none).unwrap_or(0);
            let s = (missing + 1) % 3;
            let (a, bb, c) = (t[s], t[(s + 1) % 3], t[(s + 2) % 3]);
            if let (Some(m1), Some(m2)) = (m[s], m[(s + 1) % 3]) {
                b.triangles.push([m1, bb, m2]);
                b.triangles.push([a, m1, m2]);
                b.triangles.push([a, m2, c]);
            }
        }
        _ => {
            if let [Some(ab), Some(bc), Some(ca)] = m {
                b.triangles.push([t[0], ab, ca]);
                b.triangles.push([ab, t[1], bc]);
                b.triangles.push([ca, bc, t[2]]);
                b.triangles.push([ab, bc, ca]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frame::Ax3;
    use crate::primitives;
    use crate::topology::{explorer, ShapeKind};

    fn faces_of(store: &EntityStore, shape: crate::topology::Shape) -> Vec<ShapeId> {
        explorer::map_shapes(store, shape, ShapeKind::Face)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect()
    }

    #[test]
    fn test_box_face_is_two_triangles() {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Ax3::world(), 1.0, 1.0, 1.0).unwrap();
        let mut disc = EdgeDiscretizer::new(MeshParams::default());
        for f in faces_of(&store, b) {
            let m = mesh_face(&store, f, &mut disc).unwrap();
            assert_eq!(m.triangles.len(), 2);
        }
    }

    #[test]
    fn test_sphere_nodes_lie_on_surface() {
        let mut store = EntityStore::new();
        let s = primitives::make_sphere(&mut store, &Ax3::world(), 2.0).unwrap();
        let mut disc = EdgeDiscretizer::new(MeshParams::default());
        for f in faces_of(&store, s) {
            let m = mesh_face(&store, f, &mut disc).unwrap();
            assert!(m.triangles.len() > 100);
            for p in &m.positions {
                assert!((p.to_vec3().length() - 2.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_triangles_are_counter_clockwise_in_uv() {
        let mut store = EntityStore::new();
        let c = primitives::make_cylinder(&mut store, &Ax3::world(), 1.0, 1.0).unwrap();
        let mut disc = EdgeDiscretizer::new(MeshParams::default());
        for f in faces_of(&store, c) {
            let m = mesh_face(&store, f, &mut disc).unwrap();
            for t in &m.triangles {
                let (a, b, c) = (m.uvs[t[0] as usize], m.uvs[t[1] as usize], m.uvs[t[2] as usize]);
                assert!((b - a).cross(&(c - a)) > 0.0);
            }
        }
    }
}
