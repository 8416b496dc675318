//! STL export of tessellated shapes, binary and ASCII.

use std::path::Path;

use brep::Brep;
use brep_types::{Mesh, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::ExportError;

/// Tessellation and encoding of an STL file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StlOptions {
    pub linear_deflection: f64,
    pub angular_deflection: f64,
    pub binary: bool,
}

impl Default for StlOptions {
    fn default() -> Self {
        Self {
            linear_deflection: 1e-3,
            angular_deflection: 0.1,
            binary: true,
        }
    }
}

/// Triangles of `mesh` with polygon faces fanned out. Fails on an empty mesh
/// or an index outside the vertex list.
fn triangles(mesh: &Mesh) -> Result<Vec<[Point; 3]>, ExportError> {
    let n = mesh.vertices.len();
    let mut out = Vec::new();
    for face in &mesh.faces {
        if let Some(&idx) = face.iter().find(|&&i| i >= n) {
            return Err(ExportError::StlExportFailed(format!(
                "index {} out of range (vertex count = {})",
                idx, n
            )));
        }
        for k in 1..face.len().saturating_sub(1) {
            out.push([
                mesh.vertices[face[0]],
                mesh.vertices[face[k]],
                mesh.vertices[face[k + 1]],
            ]);
        }
    }
    if out.is_empty() {
        return Err(ExportError::StlExportFailed("mesh has no triangles".to_string()));
    }
    Ok(out)
}

fn facet_normal(t: &[Point; 3]) -> [f32; 3] {
    let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
    match n.unitized() {
        Some(n) => [n.x as f32, n.y as f32, n.z as f32],
        None => [0.0, 0.0, 1.0],
    }
}

/// Binary STL:
/// - 80-byte header (arbitrary text)
/// - u32 triangle count (little-endian)
/// - per triangle: 3×f32 normal, 3×(3×f32 vertex), u16 attribute = 50 bytes
pub fn export_binary_stl(mesh: &Mesh, name: &str) -> Result<Vec<u8>, ExportError> {
    let tris = triangles(mesh)?;
    let mut buf = Vec::with_capacity(84 + tris.len() * 50);

    let header = format!("binary STL: {}", name);
    let header = header.as_bytes();
    buf.extend_from_slice(&header[..header.len().min(80)]);
    buf.resize(80, 0u8);
    buf.extend_from_slice(&(tris.len() as u32).to_le_bytes());

    for t in &tris {
        for c in facet_normal(t) {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for p in t {
            for c in [p.x, p.y, p.z] {
                buf.extend_from_slice(&(c as f32).to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
    Ok(buf)
}

pub fn export_ascii_stl(mesh: &Mesh, name: &str) -> Result<String, ExportError> {
    let tris = triangles(mesh)?;
    let mut out = String::with_capacity(tris.len() * 300);
    out.push_str(&format!("solid {}\n", name));
    for t in &tris {
        let [nx, ny, nz] = facet_normal(t);
        out.push_str(&format!("  facet normal {} {} {}\n", nx, ny, nz));
        out.push_str("    outer loop\n");
        for p in t {
            out.push_str(&format!("      vertex {} {} {}\n", p.x, p.y, p.z));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    out.push_str(&format!("endsolid {}\n", name));
    Ok(out)
}

/// Tessellate `brep` and encode it.
#[instrument(skip(brep))]
pub fn export_stl(brep: &Brep, name: &str, options: &StlOptions) -> Result<Vec<u8>, ExportError> {
    let (mesh, _) = brep
        .to_tesselation(options.linear_deflection, options.angular_deflection)
        .map_err(|e| ExportError::StlExportFailed(e.to_string()))?;
    debug!(vertices = mesh.vertices.len(), faces = mesh.faces.len(), "mesh ready");
    if options.binary {
        export_binary_stl(&mesh, name)
    } else {
        export_ascii_stl(&mesh, name).map(String::into_bytes)
    }
}

pub fn write_stl(path: impl AsRef<Path>, brep: &Brep, options: &StlOptions) -> Result<(), ExportError> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "brep".to_string());
    std::fs::write(path, export_stl(brep, &name, options)?)?;
    Ok(())
}
