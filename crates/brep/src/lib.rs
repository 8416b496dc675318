//! Object model of boundary representations: vertices, edges, loops and
//! faces viewed out of a shared entity store, and the [`Brep`] composite
//! with its constructors, booleans, repair, cutting and data exchange.

mod adjacency;
pub mod brep;
pub mod builder;
pub mod conversions;
pub mod data;
pub mod edge;
pub mod errors;
pub mod face;
mod importer;
pub mod kinds;
pub mod loops;
pub mod nurbs_curve;
pub mod nurbs_surface;
mod serializer;
pub mod vertex;

pub use brep::{BooleanOptions, Brep, Operand};
pub use builder::BrepBuilder;
pub use data::{BrepData, EdgeData, FaceData, NurbsCurveData, NurbsSurfaceData};
pub use edge::Edge;
pub use errors::{BrepError, Result};
pub use face::Face;
pub use kinds::{CurveKind, SurfaceKind};
pub use loops::Loop;
pub use nurbs_curve::NurbsCurve;
pub use nurbs_surface::NurbsSurface;
pub use vertex::Vertex;

pub use brep_kernel::topology::{Orientation, ShapeKind};
