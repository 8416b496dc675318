use std::sync::Arc;

use brep_kernel::topology::{EntityStore, ImportMap, Shape};

use crate::errors::{BrepError, Result};

/// Copies entities from several source stores into one new store. Entities
/// shared inside a source stay shared in the destination.
#[derive(Default)]
pub(crate) struct Importer {
    pub(crate) store: EntityStore,
    maps: Vec<(*const EntityStore, ImportMap)>,
}

impl Importer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn import(
        &mut self,
        operation: &str,
        src: &Arc<EntityStore>,
        shape: Shape,
    ) -> Result<Shape> {
        let key = Arc::as_ptr(src);
        let idx = match self.maps.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                self.maps.push((key, ImportMap::default()));
                self.maps.len() - 1
            }
        };
        self.store
            .import(src, shape, &mut self.maps[idx].1)
            .map_err(BrepError::kernel(operation))
    }

    pub(crate) fn finish(self) -> EntityStore {
        self.store
    }
}
