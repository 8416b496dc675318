//! Incremental meshing of shapes and the properties derived from it.

pub mod discretize;
pub mod face_mesher;
pub mod mass;
pub mod proximity;
pub mod section;
pub mod uv;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::topology::{explorer, EntityStore, Orientation, Shape, ShapeKind};
use crate::types::{EdgePolyline, FaceRange, KernelError, MergedMesh};
use discretize::EdgeDiscretizer;
use face_mesher::FaceMesh;

/// Deflection limits of a triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshParams {
    /// Largest distance between a chord and the exact geometry.
    pub linear_deflection: f64,
    /// Largest angle, in radians, between consecutive chords.
    pub angular_deflection: f64,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            linear_deflection: 1e-3,
            angular_deflection: 0.1,
        }
    }
}

impl MeshParams {
    pub fn new(linear_deflection: f64, angular_deflection: f64) -> Self {
        Self {
            linear_deflection,
            angular_deflection,
        }
    }
}

/// Triangulate every distinct face of `shape`, oriented as the face is seen
/// from `shape`.
pub fn mesh_faces(
    store: &EntityStore,
    shape: Shape,
    disc: &mut EdgeDiscretizer,
) -> Result<Vec<(Shape, FaceMesh)>, KernelError> {
    explorer::map_shapes(store, shape, ShapeKind::Face)?
        .into_iter()
        .map(|face| {
            let mut m = face_mesher::mesh_face(store, face.id, disc)?;
            if face.orientation == Orientation::Reversed {
                for t in &mut m.triangles {
                    t.swap(1, 2);
                }
                for n in &mut m.normals {
                    *n = -*n;
                }
            }
            Ok((face, m))
        })
        .collect()
}

/// Merged triangulation of a shape with one boundary polyline per edge,
/// taken from the nodes the face triangulations share.
#[instrument(skip(store))]
pub fn triangulate(
    store: &EntityStore,
    shape: Shape,
    params: MeshParams,
) -> Result<MergedMesh, KernelError> {
    let mut disc = EdgeDiscretizer::new(params);
    let mut out = MergedMesh::default();
    for (face, m) in mesh_faces(store, shape, &mut disc)? {
        let offset = out.positions.len() as u32;
        let start = out.triangles.len() as u32;
        out.positions.extend(m.positions);
        out.normals.extend(m.normals);
        out.triangles.extend(
            m.triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
        out.face_ranges.push(FaceRange {
            face: face.id,
            start,
            end: out.triangles.len() as u32,
        });
    }
    for edge in explorer::map_shapes(store, shape, ShapeKind::Edge)? {
        if store.edge(edge.id)?.degenerated {
            continue;
        }
        let d = disc.discretize(store, edge.id)?;
        out.edges.push(EdgePolyline {
            edge: edge.id,
            points: d.points.clone(),
        });
    }
    debug!(
        triangles = out.triangles.len(),
        edges = out.edges.len(),
        "shape triangulated"
    );
    Ok(out)
}
