//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets a test collect all failures in one pass.

use std::collections::HashMap;

use brep::{Brep, Result};
use brep_types::Mesh;

use crate::helpers::{mesh_bounding_box, mesh_triangles, mesh_volume, triangle_area};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: Some(value),
        }
    }

    /// A verdict for a query that could not run at all.
    fn errored(name: &str, err: impl std::fmt::Display) -> Self {
        Self::fail(name, format!("query failed: {}", err))
    }
}

/// Run a fallible oracle body, turning a query error into a failed verdict.
fn guarded(name: &str, body: impl FnOnce() -> Result<OracleVerdict>) -> OracleVerdict {
    body().unwrap_or_else(|e| OracleVerdict::errored(name, e))
}

// ── Topology Oracles ────────────────────────────────────────────────────────

/// Vertex, edge and face counts of a shape. Degenerated edges at poles and
/// apexes are not counted.
pub fn topology_counts(brep: &Brep) -> Result<(usize, usize, usize)> {
    let edges = brep.edges()?.iter().filter(|e| !e.is_degenerated()).count();
    Ok((brep.vertices()?.len(), edges, brep.faces()?.len()))
}

/// Check Euler's formula: V - E + F = 2 (for genus-0 solids).
pub fn check_euler_formula(brep: &Brep) -> OracleVerdict {
    guarded("euler_formula", || {
        let (v, e, f) = topology_counts(brep)?;
        let euler = v as i64 - e as i64 + f as i64;
        Ok(if euler == 2 {
            OracleVerdict::pass_val(
                "euler_formula",
                format!("V({}) - E({}) + F({}) = 2", v, e, f),
                euler as f64,
            )
        } else {
            OracleVerdict::fail_val(
                "euler_formula",
                format!("V({}) - E({}) + F({}) = {} (expected 2)", v, e, f, euler),
                euler as f64,
            )
        })
    })
}

/// Check that every edge is used exactly twice by the faces around it.
///
/// A seam counts twice on its one face.
pub fn check_manifold_edges(brep: &Brep) -> OracleVerdict {
    guarded("manifold_edges", || {
        let edges = brep.edges()?;
        let mut non_manifold = Vec::new();

        for (i, edge) in edges.iter().enumerate() {
            if edge.is_degenerated() {
                continue;
            }
            let mut uses = 0;
            for face in brep.edge_faces(edge)? {
                for l in face.loops()? {
                    uses += l.edges()?.iter().filter(|e| e.is_same(edge)).count();
                }
            }
            if uses != 2 {
                non_manifold.push((i, uses));
            }
        }

        Ok(if non_manifold.is_empty() {
            OracleVerdict::pass(
                "manifold_edges",
                format!("all {} edges have exactly 2 uses", edges.len()),
            )
        } else {
            OracleVerdict::fail(
                "manifold_edges",
                format!(
                    "{} non-manifold edges (index, uses): {:?}",
                    non_manifold.len(),
                    &non_manifold[..non_manifold.len().min(5)]
                ),
            )
        })
    })
}

/// Check that every face has a closed outer loop and passes the kernel's
/// face check.
pub fn check_face_validity(brep: &Brep) -> OracleVerdict {
    guarded("face_validity", || {
        let faces = brep.faces()?;
        let mut invalid = Vec::new();

        for (i, face) in faces.iter().enumerate() {
            let closed = face.outerloop()?.is_closed()?;
            if !closed || !face.is_valid()? {
                invalid.push(i);
            }
        }

        Ok(if invalid.is_empty() {
            OracleVerdict::pass(
                "face_validity",
                format!("all {} faces are valid", faces.len()),
            )
        } else {
            OracleVerdict::fail(
                "face_validity",
                format!(
                    "{} invalid faces: {:?}",
                    invalid.len(),
                    &invalid[..invalid.len().min(5)]
                ),
            )
        })
    })
}

/// Check exact vertex/edge/face counts.
pub fn check_topology_counts(
    brep: &Brep,
    expected_v: usize,
    expected_e: usize,
    expected_f: usize,
) -> OracleVerdict {
    guarded("topology_counts", || {
        let (v, e, f) = topology_counts(brep)?;
        Ok(if v == expected_v && e == expected_e && f == expected_f {
            OracleVerdict::pass("topology_counts", format!("V={} E={} F={}", v, e, f))
        } else {
            OracleVerdict::fail(
                "topology_counts",
                format!(
                    "expected V={} E={} F={}, got V={} E={} F={}",
                    expected_v, expected_e, expected_f, v, e, f
                ),
            )
        })
    })
}

/// Check the enclosed volume against an expected value, relative tolerance.
pub fn check_volume(brep: &Brep, expected: f64, rel_tol: f64) -> OracleVerdict {
    guarded("volume", || {
        let volume = brep.volume()?;
        let err = (volume - expected).abs() / expected.abs().max(1e-12);
        Ok(if err <= rel_tol {
            OracleVerdict::pass_val(
                "volume",
                format!("{:.6} (expected {:.6})", volume, expected),
                volume,
            )
        } else {
            OracleVerdict::fail_val(
                "volume",
                format!(
                    "{:.6}, expected {:.6} (relative error {:.2e} > {:.2e})",
                    volume, expected, err, rel_tol
                ),
                volume,
            )
        })
    })
}

// ── Mesh Oracles ────────────────────────────────────────────────────────────

/// Check that the mesh is watertight: every triangle edge shared by exactly 2 triangles.
///
/// Uses position-based edge matching (quantized to 1e-4) so meshes with
/// duplicated nodes along face boundaries still pair up.
pub fn check_watertight_mesh(mesh: &Mesh) -> OracleVerdict {
    type Key = (i64, i64, i64);

    fn quantize(v: f64) -> i64 {
        (v * 10000.0).round() as i64
    }

    let keys: Vec<Key> = mesh
        .vertices
        .iter()
        .map(|p| (quantize(p.x), quantize(p.y), quantize(p.z)))
        .collect();

    let mut edge_counts: HashMap<(Key, Key), usize> = HashMap::new();
    for [a, b, c] in mesh_triangles(mesh) {
        for (p, q) in [(keys[a], keys[b]), (keys[b], keys[c]), (keys[c], keys[a])] {
            if p == q {
                continue;
            }
            let edge = if p <= q { (p, q) } else { (q, p) };
            *edge_counts.entry(edge).or_insert(0) += 1;
        }
    }

    let non_paired = edge_counts.values().filter(|&&c| c != 2).count();
    if edge_counts.is_empty() {
        OracleVerdict::fail("watertight_mesh", "mesh has no edges".to_string())
    } else if non_paired == 0 {
        OracleVerdict::pass(
            "watertight_mesh",
            format!("all {} edges paired", edge_counts.len()),
        )
    } else {
        OracleVerdict::fail(
            "watertight_mesh",
            format!(
                "{} unpaired edges out of {} total",
                non_paired,
                edge_counts.len()
            ),
        )
    }
}

/// Check that the triangles wind outward: the enclosed signed volume is
/// positive.
pub fn check_outward_winding(mesh: &Mesh) -> OracleVerdict {
    let volume = mesh_volume(mesh);
    if volume > 0.0 {
        OracleVerdict::pass_val(
            "outward_winding",
            format!("signed volume {:.6}", volume),
            volume,
        )
    } else {
        OracleVerdict::fail_val(
            "outward_winding",
            format!("signed volume {:.6} is not positive", volume),
            volume,
        )
    }
}

/// Check that no triangles have zero area (degenerate).
pub fn check_no_degenerate_triangles(mesh: &Mesh) -> OracleVerdict {
    let v = &mesh.vertices;
    let tris = mesh_triangles(mesh);
    let degenerate = tris
        .iter()
        .filter(|[a, b, c]| triangle_area(v[*a], v[*b], v[*c]) < 1e-12)
        .count();

    if degenerate == 0 {
        OracleVerdict::pass(
            "no_degenerate_triangles",
            format!("all {} triangles have non-zero area", tris.len()),
        )
    } else {
        OracleVerdict::fail(
            "no_degenerate_triangles",
            format!("{} of {} triangles are degenerate", degenerate, tris.len()),
        )
    }
}

/// Check that all index values are within bounds.
pub fn check_valid_indices(mesh: &Mesh) -> OracleVerdict {
    let vertex_count = mesh.vertices.len();
    let bad: Vec<(usize, usize)> = mesh
        .faces
        .iter()
        .enumerate()
        .flat_map(|(f, face)| face.iter().map(move |&i| (f, i)))
        .filter(|&(_, i)| i >= vertex_count)
        .collect();

    if bad.is_empty() {
        OracleVerdict::pass("valid_indices", format!("all indices < {}", vertex_count))
    } else {
        OracleVerdict::fail(
            "valid_indices",
            format!(
                "{} out-of-bounds indices (vertex_count={}): {:?}",
                bad.len(),
                vertex_count,
                &bad[..bad.len().min(5)]
            ),
        )
    }
}

/// Check that the mesh bounding box falls within expected bounds.
pub fn check_bounding_box(
    mesh: &Mesh,
    expected_min: [f64; 3],
    expected_max: [f64; 3],
    tolerance: f64,
) -> OracleVerdict {
    let Some((actual_min, actual_max)) = mesh_bounding_box(mesh) else {
        return OracleVerdict::fail("bounding_box", "mesh has no vertices".to_string());
    };

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tolerance {
            return OracleVerdict::fail(
                "bounding_box",
                format!(
                    "min[{}]: expected {:.3}, got {:.3} (tol={})",
                    i, expected_min[i], actual_min[i], tolerance
                ),
            );
        }
        if (actual_max[i] - expected_max[i]).abs() > tolerance {
            return OracleVerdict::fail(
                "bounding_box",
                format!(
                    "max[{}]: expected {:.3}, got {:.3} (tol={})",
                    i, expected_max[i], actual_max[i], tolerance
                ),
            );
        }
    }

    OracleVerdict::pass(
        "bounding_box",
        format!(
            "({:.1},{:.1},{:.1}) -> ({:.1},{:.1},{:.1})",
            actual_min[0],
            actual_min[1],
            actual_min[2],
            actual_max[0],
            actual_max[1],
            actual_max[2],
        ),
    )
}

// ── Composite ───────────────────────────────────────────────────────────────

/// Run all mesh checks that apply to the tessellation of a closed solid.
pub fn run_all_mesh_checks(mesh: &Mesh) -> Vec<OracleVerdict> {
    vec![
        check_valid_indices(mesh),
        check_watertight_mesh(mesh),
        check_outward_winding(mesh),
        check_no_degenerate_triangles(mesh),
    ]
}

/// Run topology checks on a solid.
pub fn run_topology_checks(brep: &Brep) -> Vec<OracleVerdict> {
    vec![
        check_euler_formula(brep),
        check_manifold_edges(brep),
        check_face_validity(brep),
    ]
}
