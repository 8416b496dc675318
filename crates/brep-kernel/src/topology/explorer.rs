use std::collections::{HashMap, HashSet};

use super::shape::{Shape, ShapeId, ShapeKind};
use super::store::EntityStore;
use crate::types::KernelError;

/// Every occurrence of a `kind` sub-shape under `shape`, depth first,
/// oriented as seen from `shape`. Shared sub-shapes are repeated once per
/// parent that references them.
pub fn explore(
    store: &EntityStore,
    shape: Shape,
    kind: ShapeKind,
) -> Result<Vec<Shape>, KernelError> {
    let mut out = Vec::new();
    explore_into(store, shape, kind, &mut out)?;
    Ok(out)
}

fn explore_into(
    store: &EntityStore,
    shape: Shape,
    kind: ShapeKind,
    out: &mut Vec<Shape>,
) -> Result<(), KernelError> {
    let k = store.kind(shape)?;
    if k == kind {
        out.push(shape);
    } else if k < kind {
        for child in store.children(shape)? {
            explore_into(store, child, kind, out)?;
        }
    }
    Ok(())
}

/// Distinct `kind` sub-shapes of `shape` in first-occurrence order.
pub fn map_shapes(
    store: &EntityStore,
    shape: Shape,
    kind: ShapeKind,
) -> Result<Vec<Shape>, KernelError> {
    let mut seen = HashSet::new();
    Ok(explore(store, shape, kind)?
        .into_iter()
        .filter(|s| seen.insert(s.id))
        .collect())
}

/// For each `kind` sub-shape of a root, the distinct ancestors of
/// `ancestor_kind` that contain it.
#[derive(Debug, Default, Clone)]
pub struct AncestorMap {
    index: HashMap<ShapeId, Vec<Shape>>,
}

impl AncestorMap {
    pub fn build(
        store: &EntityStore,
        root: Shape,
        kind: ShapeKind,
        ancestor_kind: ShapeKind,
    ) -> Result<Self, KernelError> {
        let mut index: HashMap<ShapeId, Vec<Shape>> = HashMap::new();
        for sub in map_shapes(store, root, kind)? {
            index.entry(sub.id).or_default();
        }
        for ancestor in map_shapes(store, root, ancestor_kind)? {
            for sub in map_shapes(store, ancestor, kind)? {
                let bucket = index.entry(sub.id).or_default();
                if !bucket.iter().any(|a| a.is_same(&ancestor)) {
                    bucket.push(ancestor);
                }
            }
        }
        Ok(Self { index })
    }

    /// Ancestors of `id`; empty when `id` is not part of the root.
    pub fn get(&self, id: ShapeId) -> &[Shape] {
        self.index.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use crate::types::KernelError;

    #[test]
    fn test_box_counts() -> Result<(), KernelError> {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Default::default(), 1.0, 2.0, 3.0)?;
        assert_eq!(map_shapes(&store, b, ShapeKind::Face)?.len(), 6);
        assert_eq!(map_shapes(&store, b, ShapeKind::Edge)?.len(), 12);
        assert_eq!(map_shapes(&store, b, ShapeKind::Vertex)?.len(), 8);
        // Every edge is used by two wires and has two vertex occurrences.
        assert_eq!(explore(&store, b, ShapeKind::Edge)?.len(), 24);
        assert_eq!(explore(&store, b, ShapeKind::Vertex)?.len(), 48);
        Ok(())
    }

    #[test]
    fn test_box_edges_have_two_faces() -> Result<(), KernelError> {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Default::default(), 1.0, 1.0, 1.0)?;
        let map = AncestorMap::build(&store, b, ShapeKind::Edge, ShapeKind::Face)?;
        assert_eq!(map.len(), 12);
        for e in map_shapes(&store, b, ShapeKind::Edge)? {
            assert_eq!(map.get(e.id).len(), 2);
        }
        Ok(())
    }

    #[test]
    fn test_missing_key_is_empty() -> Result<(), KernelError> {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Default::default(), 1.0, 1.0, 1.0)?;
        let other = store.add_vertex(crate::geometry::Point3d::ORIGIN, 1e-7);
        let map = AncestorMap::build(&store, b, ShapeKind::Vertex, ShapeKind::Edge)?;
        assert!(map.get(other.id).is_empty());
        Ok(())
    }
}
