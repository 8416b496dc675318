//! Face pairs of two shapes whose triangulations come within a distance.

use tracing::{debug, instrument};

use super::discretize::EdgeDiscretizer;
use super::face_mesher::FaceMesh;
use super::{mesh_faces, MeshParams};
use crate::geometry::point::Point3d;
use crate::geometry::transform::BoundingBox;
use crate::topology::{EntityStore, Shape};
use crate::types::KernelError;

struct MeshedFace {
    face: Shape,
    bounds: BoundingBox,
    triangles: Vec<[Point3d; 3]>,
}

impl MeshedFace {
    fn new(face: Shape, mesh: &FaceMesh) -> Self {
        let triangles = mesh
            .triangles
            .iter()
            .map(|t| {
                [
                    mesh.positions[t[0] as usize],
                    mesh.positions[t[1] as usize],
                    mesh.positions[t[2] as usize],
                ]
            })
            .collect();
        Self {
            face,
            bounds: BoundingBox::from_points(&mesh.positions),
            triangles,
        }
    }

    fn within(&self, other: &MeshedFace, tolerance: f64) -> bool {
        if !self.bounds.expanded(tolerance).intersects(&other.bounds) {
            return false;
        }
        self.triangles.iter().any(|a| {
            let ba = BoundingBox::from_points(a).expanded(tolerance);
            other.triangles.iter().any(|b| {
                ba.intersects(&BoundingBox::from_points(b))
                    && triangle_distance(a, b) <= tolerance
            })
        })
    }
}

/// Faces of `a` and `b` that lie within `tolerance` of each other, as two
/// parallel lists.
#[instrument(skip(store_a, store_b))]
pub fn overlapping_faces(
    store_a: &EntityStore,
    a: Shape,
    store_b: &EntityStore,
    b: Shape,
    params: MeshParams,
    tolerance: f64,
) -> Result<(Vec<Shape>, Vec<Shape>), KernelError> {
    let mesh = |store: &EntityStore, shape: Shape| -> Result<Vec<MeshedFace>, KernelError> {
        let mut disc = EdgeDiscretizer::new(params);
        Ok(mesh_faces(store, shape, &mut disc)?
            .iter()
            .map(|(f, m)| MeshedFace::new(*f, m))
            .collect())
    };
    let faces_a = mesh(store_a, a)?;
    let faces_b = mesh(store_b, b)?;
    let mut left = Vec::new();
    let mut right = Vec::new();
    for fa in &faces_a {
        for fb in &faces_b {
            if fa.within(fb, tolerance) {
                left.push(fa.face);
                right.push(fb.face);
            }
        }
    }
    debug!(pairs = left.len(), "proximity computed");
    Ok((left, right))
}

/// Smallest distance between two triangles. Intersecting triangles are
/// detected through their edges crossing the other triangle.
pub fn triangle_distance(a: &[Point3d; 3], b: &[Point3d; 3]) -> f64 {
    let mut best = f64::INFINITY;
    for p in a {
        best = best.min(point_triangle_distance(p, b));
    }
    for p in b {
        best = best.min(point_triangle_distance(p, a));
    }
    for i in 0..3 {
        for j in 0..3 {
            let d = segment_distance(a[i], a[(i + 1) % 3], b[j], b[(j + 1) % 3]);
            best = best.min(d);
        }
    }
    for i in 0..3 {
        if segment_crosses_triangle(a[i], a[(i + 1) % 3], b)
            || segment_crosses_triangle(b[i], b[(i + 1) % 3], a)
        {
            return 0.0;
        }
    }
    best
}

/// Distance from a point to a triangle (Ericson, Real-Time Collision
/// Detection, 5.1.5).
pub fn point_triangle_distance(p: &Point3d, t: &[Point3d; 3]) -> f64 {
    let [a, b, c] = *t;
    let ab = b - a;
    let ac = c - a;
    let ap = *p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return p.distance_to(&a);
    }
    let bp = *p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return p.distance_to(&b);
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return p.distance_to(&(a + ab * v));
    }
    let cp = *p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return p.distance_to(&c);
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return p.distance_to(&(a + ac * w));
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return p.distance_to(&(b + (c - b) * w));
    }
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    p.distance_to(&(a + ab * v + ac * w))
}

fn segment_distance(p1: Point3d, q1: Point3d, p2: Point3d, q2: Point3d) -> f64 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(&r);
    let (s, t) = if a <= f64::EPSILON && e <= f64::EPSILON {
        (0.0, 0.0)
    } else if a <= f64::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= f64::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s).distance_to(&(p2 + d2 * t))
}

fn segment_crosses_triangle(p: Point3d, q: Point3d, t: &[Point3d; 3]) -> bool {
    let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
    let dp = (p - t[0]).dot(&n);
    let dq = (q - t[0]).dot(&n);
    if dp == dq || (dp > 0.0) == (dq > 0.0) && dp != 0.0 && dq != 0.0 {
        return false;
    }
    let x = p + (q - p) * (dp / (dp - dq));
    (0..3).all(|i| {
        let a = t[i];
        let b = t[(i + 1) % 3];
        (b - a).cross(&(x - a)).dot(&n) >= 0.0
    })
}
