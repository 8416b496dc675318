use std::sync::Arc;

use brep_kernel::geometry::Point3d;
use brep_kernel::topology::{EntityStore, Shape};
use brep_kernel::Tolerance;
use brep_types::Point;

use crate::conversions::{point_from_kernel, point_to_kernel};
use crate::errors::{BrepError, Result};

/// A view of a vertex of some shape.
#[derive(Debug, Clone)]
pub struct Vertex {
    store: Arc<EntityStore>,
    shape: Shape,
    point: Point3d,
}

impl Vertex {
    pub(crate) fn view(store: &Arc<EntityStore>, shape: Shape) -> Result<Self> {
        let point = store.point(shape.id).map_err(BrepError::kernel("Vertex"))?;
        Ok(Self {
            store: Arc::clone(store),
            shape,
            point,
        })
    }

    /// A free-standing vertex.
    pub fn from_point(point: &Point) -> Self {
        let mut store = EntityStore::new();
        let point = point_to_kernel(point);
        let shape = store.add_vertex(point, Tolerance::default().confusion);
        Self {
            store: Arc::new(store),
            shape,
            point,
        }
    }

    pub fn point(&self) -> Point {
        point_from_kernel(&self.point)
    }

    /// Replace this view by a free-standing vertex at `point`. Shapes that
    /// used the old vertex are left untouched.
    pub fn set_point(&mut self, point: &Point) {
        *self = Self::from_point(point);
    }

    pub fn x(&self) -> f64 {
        self.point.x
    }

    pub fn y(&self) -> f64 {
        self.point.y
    }

    pub fn z(&self) -> f64 {
        self.point.z
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub(crate) fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// Same underlying vertex, whatever the orientation.
    pub fn is_same(&self, other: &Vertex) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_same(&other.shape)
    }

    pub fn is_equal(&self, other: &Vertex) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.shape.is_equal(&other.shape)
    }
}
