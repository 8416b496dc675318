//! Helper functions: error types, profile builders, mesh math.

use std::collections::HashMap;

use brep::BrepError;
use brep_types::{Mesh, Point, Polygon};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("body not found: {name}")]
    BodyNotFound { name: String },

    #[error("no solid for body: {name}")]
    NoSolid { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error("load error: {reason}")]
    Load { reason: String },

    #[error(transparent)]
    Brep(#[from] BrepError),

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("nothing to {action}")]
    EmptyHistory { action: String },
}

// ── Profile Builders ────────────────────────────────────────────────────────

/// Counter-clockwise rectangle in the plane `z`.
pub fn rect_profile(x: f64, y: f64, w: f64, h: f64, z: f64) -> Polygon {
    Polygon::new(vec![
        Point::new(x, y, z),
        Point::new(x + w, y, z),
        Point::new(x + w, y + h, z),
        Point::new(x, y + h, z),
    ])
}

/// Regular polygon approximating a circle in the plane `z`, counter-clockwise.
pub fn circle_profile(cx: f64, cy: f64, r: f64, z: f64, segments: u32) -> Polygon {
    let points = (0..segments)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * (i as f64) / (segments as f64);
            Point::new(cx + r * angle.cos(), cy + r * angle.sin(), z)
        })
        .collect();
    Polygon::new(points)
}

// ── Mesh Math Utilities ─────────────────────────────────────────────────────

/// Triangles of a polygon mesh, fanned from the first corner of each face.
/// Faces with an index outside the vertex list are skipped.
pub fn mesh_triangles(mesh: &Mesh) -> Vec<[usize; 3]> {
    let n = mesh.vertices.len();
    let mut out = Vec::new();
    for face in &mesh.faces {
        if face.iter().any(|&i| i >= n) {
            continue;
        }
        for k in 1..face.len().saturating_sub(1) {
            out.push([face[0], face[k], face[k + 1]]);
        }
    }
    out
}

/// Axis-aligned bounding box of a mesh as (min, max), `None` when empty.
pub fn mesh_bounding_box(mesh: &Mesh) -> Option<([f64; 3], [f64; 3])> {
    if mesh.vertices.is_empty() {
        return None;
    }
    let mut min = [f64::MAX; 3];
    let mut max = [f64::MIN; 3];
    for p in &mesh.vertices {
        for (i, c) in [p.x, p.y, p.z].into_iter().enumerate() {
            min[i] = min[i].min(c);
            max[i] = max[i].max(c);
        }
    }
    Some((min, max))
}

/// Signed volume enclosed by the mesh, by the divergence theorem.
///
/// Positive for a closed mesh with outward winding; meaningless for open
/// meshes.
pub fn mesh_volume(mesh: &Mesh) -> f64 {
    let v = &mesh.vertices;
    let mut volume = 0.0;
    for [a, b, c] in mesh_triangles(mesh) {
        let (p0, p1, p2) = (v[a], v[b], v[c]);
        // Signed volume of the tetrahedron with the origin
        volume += p0.x * (p1.y * p2.z - p2.y * p1.z)
            + p1.x * (p2.y * p0.z - p0.y * p2.z)
            + p2.x * (p0.y * p1.z - p1.y * p0.z);
    }
    volume / 6.0
}

pub fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(&(c - a)).length() / 2.0
}

/// Total surface area of the mesh triangles.
pub fn mesh_surface_area(mesh: &Mesh) -> f64 {
    let v = &mesh.vertices;
    mesh_triangles(mesh)
        .into_iter()
        .map(|[a, b, c]| triangle_area(v[a], v[b], v[c]))
        .sum()
}

/// Count mesh edges: returns (total_edges, boundary_edges).
///
/// A boundary edge is used by exactly one triangle. Vertices are matched by
/// index, so a mesh with duplicated nodes reports seams as boundary.
pub fn count_mesh_edges(mesh: &Mesh) -> (usize, usize) {
    let mut edge_counts: HashMap<(usize, usize), usize> = HashMap::new();
    for [a, b, c] in mesh_triangles(mesh) {
        for (p, q) in [(a, b), (b, c), (c, a)] {
            *edge_counts.entry((p.min(q), p.max(q))).or_insert(0) += 1;
        }
    }
    let total = edge_counts.len();
    let boundary = edge_counts.values().filter(|&&c| c == 1).count();
    (total, boundary)
}
