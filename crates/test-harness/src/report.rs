//! Structured text-based model reports.
//!
//! Reports are plain text rather than JSON so a failing test can print one
//! straight into its panic message.

use std::fmt;

use brep::Brep;

use crate::helpers::{mesh_bounding_box, HarnessError};
use crate::oracle::OracleVerdict;
use crate::workflow::ModelBuilder;

/// A complete model report with all sections.
pub struct ModelReport {
    pub body_entries: Vec<BodyEntry>,
    pub mesh_summaries: Vec<MeshSummary>,
    pub bounding_box: Option<([f64; 3], [f64; 3])>,
    pub oracle_results: Vec<OracleVerdict>,
    pub errors: Vec<(String, String)>,
}

/// A single body's report entry.
pub struct BodyEntry {
    pub index: usize,
    pub name: String,
    pub kind: String,
    pub detail: String,
    pub topology: Option<(usize, usize, usize)>,
    pub euler: Option<i64>,
    pub volume: Option<f64>,
}

/// Mesh summary for a body.
pub struct MeshSummary {
    pub name: String,
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub polyline_count: usize,
}

impl ModelReport {
    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Brep Model Report ===\n\n");

        out.push_str(&format!(
            "Bodies ({} bodies, {} errors):\n",
            self.body_entries.len(),
            self.errors.len(),
        ));

        for entry in &self.body_entries {
            out.push_str(&format!(
                "  [{}] {} \"{}\"\n",
                entry.index, entry.kind, entry.name,
            ));
            if !entry.detail.is_empty() {
                out.push_str(&format!("      {}\n", entry.detail));
            }
            if let Some((v, e, f)) = entry.topology {
                let euler = v as i64 - e as i64 + f as i64;
                let euler_status = if euler == 2 { "OK" } else { "WARN" };
                out.push_str(&format!(
                    "      Topology: V={} E={} F={} | Euler V-E+F={} ({})\n",
                    v, e, f, euler, euler_status,
                ));
            }
            if let Some(volume) = entry.volume {
                out.push_str(&format!("      Volume: {:.4}\n", volume));
            }
        }

        if !self.mesh_summaries.is_empty() {
            out.push_str("\nMesh Summary:\n");
            for ms in &self.mesh_summaries {
                out.push_str(&format!(
                    "  \"{}\": {} triangles, {} vertices, {} edge polylines\n",
                    ms.name, ms.triangle_count, ms.vertex_count, ms.polyline_count,
                ));
            }
        }

        if let Some((min, max)) = self.bounding_box {
            out.push_str(&format!(
                "\nBounding Box: ({:.1}, {:.1}, {:.1}) -> ({:.1}, {:.1}, {:.1})\n",
                min[0], min[1], min[2], max[0], max[1], max[2],
            ));
        }

        if !self.oracle_results.is_empty() {
            out.push_str(&format!(
                "\nOracle Results ({} checks):\n",
                self.oracle_results.len()
            ));
            for v in &self.oracle_results {
                let status = if v.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{}] {}: {}\n", status, v.oracle_name, v.detail));
            }
        }

        if self.errors.is_empty() {
            out.push_str("\nErrors: none\n");
        } else {
            out.push_str(&format!("\nErrors ({}):\n", self.errors.len()));
            for (body, msg) in &self.errors {
                out.push_str(&format!("  {}: {}\n", body, msg));
            }
        }

        out
    }

    /// Number of failed oracle checks.
    pub fn failed_checks(&self) -> usize {
        self.oracle_results.iter().filter(|v| !v.passed).count()
    }
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl ModelBuilder {
    /// Generate a complete model report.
    ///
    /// Topology and mesh oracles run on solid bodies only.
    pub fn report(&self) -> Result<ModelReport, HarnessError> {
        let mut body_entries = Vec::new();
        let mut mesh_summaries = Vec::new();
        let mut overall: Option<([f64; 3], [f64; 3])> = None;
        let mut oracle_results = Vec::new();

        for (index, (name, brep)) in self.bodies.iter().enumerate() {
            let solid = brep.is_solid()?;
            let topology = crate::oracle::topology_counts(brep)?;
            if solid {
                oracle_results.extend(crate::oracle::run_topology_checks(brep));
            }

            body_entries.push(BodyEntry {
                index,
                name: name.clone(),
                kind: format!("{:?}", brep.kind()?),
                detail: describe_faces(brep)?,
                topology: Some(topology),
                euler: Some(topology.0 as i64 - topology.1 as i64 + topology.2 as i64),
                volume: if solid { Some(brep.volume()?) } else { None },
            });

            let Ok((mesh, polylines)) = brep.to_tesselation(1e-3, 0.1) else {
                continue;
            };
            if let Some((bmin, bmax)) = mesh_bounding_box(&mesh) {
                let (min, max) = overall.get_or_insert((bmin, bmax));
                for i in 0..3 {
                    min[i] = min[i].min(bmin[i]);
                    max[i] = max[i].max(bmax[i]);
                }
            }
            if solid {
                oracle_results.extend(crate::oracle::run_all_mesh_checks(&mesh));
            }
            mesh_summaries.push(MeshSummary {
                name: name.clone(),
                triangle_count: crate::helpers::mesh_triangles(&mesh).len(),
                vertex_count: mesh.vertices.len(),
                polyline_count: polylines.len(),
            });
        }

        Ok(ModelReport {
            body_entries,
            mesh_summaries,
            bounding_box: overall,
            oracle_results,
            errors: self.errors().to_vec(),
        })
    }
}

/// Face count per surface kind, e.g. `Faces: 2 plane, 1 cylinder`.
fn describe_faces(brep: &Brep) -> Result<String, HarnessError> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for face in brep.faces()? {
        let kind = format!("{:?}", face.kind()).to_lowercase();
        match counts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((kind, 1)),
        }
    }
    if counts.is_empty() {
        return Ok(String::new());
    }
    let parts: Vec<String> = counts.iter().map(|(k, n)| format!("{} {}", n, k)).collect();
    Ok(format!("Faces: {}", parts.join(", ")))
}
