use serde::{Deserialize, Serialize};

use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::topology::{EntityStore, Shape, ShapeId};

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("fillet failed: {reason}")]
    FilletFailed { reason: String },

    #[error("split failed: {reason}")]
    SplitFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: ShapeId },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

impl KernelError {
    pub(crate) fn geometry(reason: impl Into<String>) -> Self {
        KernelError::InvalidGeometry {
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        KernelError::InvalidShape {
            reason: reason.into(),
        }
    }
}

/// A shape together with the store holding it.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRef<'a> {
    pub store: &'a EntityStore,
    pub shape: Shape,
}

impl<'a> ShapeRef<'a> {
    pub fn new(store: &'a EntityStore, shape: Shape) -> Self {
        Self { store, shape }
    }
}

/// All face triangulations of a shape merged into one indexed mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedMesh {
    pub positions: Vec<Point3d>,
    /// Per-position normals, following the owning face's orientation.
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Mapping from triangle ranges to faces.
    pub face_ranges: Vec<FaceRange>,
    /// One polyline per distinct edge, taken from the face triangulations.
    pub edges: Vec<EdgePolyline>,
}

/// Maps a contiguous range of triangles to a face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRange {
    pub face: ShapeId,
    /// Start index in the triangle array (inclusive).
    pub start: u32,
    /// End index in the triangle array (exclusive).
    pub end: u32,
}

/// Boundary polyline of one edge, in the edge's own direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgePolyline {
    pub edge: ShapeId,
    pub points: Vec<Point3d>,
}

impl MergedMesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Signed volume by the divergence theorem. Meaningful for closed meshes.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let a = self.positions[t[0] as usize].to_vec3();
                let b = self.positions[t[1] as usize].to_vec3();
                let c = self.positions[t[2] as usize].to_vec3();
                a.triple(&b, &c)
            })
            .sum::<f64>()
            / 6.0
    }
}
