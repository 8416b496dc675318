//! Topological entities stored in an arena and the algorithms over them.

pub mod builders;
pub mod check;
pub mod explorer;
pub mod heal;
pub mod shape;
pub mod store;

pub use explorer::AncestorMap;
pub use shape::{
    Orientation, PCurve, Shape, ShapeId, ShapeKind, SurfaceId, TCompound, TEdge, TFace, TShape,
    TShell, TSolid, TVertex, TWire,
};
pub use store::{EntityStore, ImportMap};
