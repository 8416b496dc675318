use crate::topology::{EntityStore, Shape, ShapeId};
use crate::types::{KernelError, ShapeRef};

/// Operations delegated to a solid modelling backend. Results live in a
/// fresh store.
/// Implemented by TruckKernel (wraps real truck) and MockKernel (exact
/// booleans for axis-aligned solids).
pub trait Kernel {
    /// Boolean union of two solids. Geometry closer than `tolerance` is
    /// treated as coincident.
    fn boolean_union(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError>;

    /// Boolean intersection of two solids.
    fn boolean_intersect(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError>;

    /// Fillet (round) the specified edges with the given radius.
    fn fillet_edges(
        &mut self,
        solid: ShapeRef<'_>,
        edges: &[ShapeId],
        radius: f64,
    ) -> Result<(EntityStore, Shape), KernelError>;

    /// Split a solid by a tool solid into the pieces inside and outside the
    /// tool, each connected piece returned on its own.
    fn split(
        &mut self,
        solid: ShapeRef<'_>,
        tool: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<Vec<(EntityStore, Shape)>, KernelError>;
}
