//! TruckKernel: booleans backed by truck-shapeops.

use tracing::{debug, instrument};
use truck_modeling::topology::Solid;

use crate::fillet;
use crate::topology::{explorer, EntityStore, Shape, ShapeId, ShapeKind};
use crate::traits::Kernel;
use crate::truck_convert::{from_truck_solid, to_truck_solid};
use crate::types::{KernelError, ShapeRef};

/// Geometry kernel backed by the truck BREP library. Operands are
/// converted to truck solids for each call.
#[derive(Debug, Default)]
pub struct TruckKernel;

impl TruckKernel {
    pub fn new() -> Self {
        Self
    }
}

fn solid_of(operand: ShapeRef<'_>) -> Result<Solid, KernelError> {
    to_truck_solid(operand.store, operand.shape)
}

/// Each solid of a converted result as a separate piece.
fn pieces(store: EntityStore, root: Shape) -> Result<Vec<(EntityStore, Shape)>, KernelError> {
    let solids = explorer::map_shapes(&store, root, ShapeKind::Solid)?;
    if solids.len() <= 1 {
        return Ok(vec![(store, root)]);
    }
    solids.into_iter().map(|s| store.extract(s)).collect()
}

impl Kernel for TruckKernel {
    #[instrument(skip_all)]
    fn boolean_union(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        let solid_a = solid_of(a)?;
        let solid_b = solid_of(b)?;
        let result = truck_shapeops::or(&solid_a, &solid_b, tolerance).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck or() returned None".to_string(),
            }
        })?;
        from_truck_solid(&result)
    }

    #[instrument(skip_all)]
    fn boolean_subtract(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        let solid_a = solid_of(a)?;
        let mut solid_b = solid_of(b)?;

        // Subtraction = A ∩ ¬B. not() mutates in place.
        solid_b.not();
        let result = truck_shapeops::and(&solid_a, &solid_b, tolerance).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None for subtraction".to_string(),
            }
        })?;
        from_truck_solid(&result)
    }

    #[instrument(skip_all)]
    fn boolean_intersect(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        let solid_a = solid_of(a)?;
        let solid_b = solid_of(b)?;
        let result = truck_shapeops::and(&solid_a, &solid_b, tolerance).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None".to_string(),
            }
        })?;
        from_truck_solid(&result)
    }

    /// truck has no fillet operation; the native polyhedral fillet runs on
    /// the stored solid directly.
    fn fillet_edges(
        &mut self,
        solid: ShapeRef<'_>,
        edges: &[ShapeId],
        radius: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        fillet::fillet_edges(solid, edges, radius)
    }

    #[instrument(skip_all)]
    fn split(
        &mut self,
        solid: ShapeRef<'_>,
        tool: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<Vec<(EntityStore, Shape)>, KernelError> {
        let body = solid_of(solid)?;
        let cutter = solid_of(tool)?;
        let mut outside = cutter.clone();
        outside.not();

        let mut out = Vec::new();
        for side in [&cutter, &outside] {
            // An empty side is not an error: the tool may miss the solid.
            if let Some(part) = truck_shapeops::and(&body, side, tolerance) {
                if part.boundaries().is_empty() {
                    continue;
                }
                let (store, root) = from_truck_solid(&part)?;
                out.extend(pieces(store, root)?);
            }
        }
        if out.is_empty() {
            return Err(KernelError::SplitFailed {
                reason: "truck and() returned None on both sides of the tool".to_string(),
            });
        }
        debug!(pieces = out.len(), "split computed");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Ax3, Point3d, Vec3};
    use crate::mesh::{mass, MeshParams};
    use crate::primitives;

    fn boxes() -> (EntityStore, Shape, Shape) {
        let mut store = EntityStore::new();
        let a = primitives::make_box(&mut store, &Ax3::world(), 1.0, 1.0, 1.0).unwrap();
        let frame = Ax3::new(Point3d::new(0.5, 0.5, 0.5), Vec3::Z, Vec3::X);
        let b = primitives::make_box(&mut store, &frame, 1.0, 1.0, 1.0).unwrap();
        (store, a, b)
    }

    #[test]
    fn test_fillet_rounds_box_edges() {
        let (store, a, _) = boxes();
        let edges: Vec<ShapeId> = explorer::map_shapes(&store, a, ShapeKind::Edge)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        let (out, root) = TruckKernel::new()
            .fillet_edges(ShapeRef::new(&store, a), &edges, 0.1)
            .unwrap();
        assert_eq!(explorer::map_shapes(&out, root, ShapeKind::Face).unwrap().len(), 26);
        let m = mass::mass_properties(&out, root, &MeshParams::default()).unwrap();
        assert!(m.volume < 1.0 && m.volume > 0.97);
    }

    #[test]
    fn test_fillet_of_curved_solid_is_not_supported() {
        let mut store = EntityStore::new();
        let c = primitives::make_cylinder(&mut store, &Ax3::world(), 1.0, 1.0).unwrap();
        let edges: Vec<ShapeId> = explorer::map_shapes(&store, c, ShapeKind::Edge)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        let err = TruckKernel::new()
            .fillet_edges(ShapeRef::new(&store, c), &edges, 0.1)
            .unwrap_err();
        assert!(matches!(err, KernelError::NotSupported { .. }));
    }

    #[test]
    #[ignore = "truck-shapeops needs tuning of its tolerance on coplanar box faces"]
    fn test_truck_union_of_overlapping_boxes() {
        let (store, a, b) = boxes();
        let (out, root) = TruckKernel::new()
            .boolean_union(ShapeRef::new(&store, a), ShapeRef::new(&store, b), 0.05)
            .unwrap();
        let m = mass::mass_properties(&out, root, &MeshParams::default()).unwrap();
        assert!((m.volume - (2.0 - 0.125)).abs() < 1e-6);
    }

    #[test]
    #[ignore = "truck-shapeops needs tuning of its tolerance on coplanar box faces"]
    fn test_truck_subtract_overlapping_boxes() {
        let (store, a, b) = boxes();
        let (out, root) = TruckKernel::new()
            .boolean_subtract(ShapeRef::new(&store, a), ShapeRef::new(&store, b), 0.05)
            .unwrap();
        let m = mass::mass_properties(&out, root, &MeshParams::default()).unwrap();
        assert!((m.volume - 0.875).abs() < 1e-6);
    }
}
