//! Domain geometry primitives shared by the BRep crates.
//!
//! These are plain serde data types. They carry no kernel state; the
//! `brep` crate converts them to and from the kernel's native geometry.

pub mod curves;
pub mod frame;
pub mod mesh;
pub mod point;
pub mod shapes;

pub use curves::*;
pub use frame::*;
pub use mesh::*;
pub use point::*;
pub use shapes::*;
