use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::geometry::curves::Curve;
use crate::geometry::curves2d::Curve2d;
use crate::geometry::point::Point3d;

// ─── Entity Keys ─────────────────────────────────────────────────────────────

new_key_type! {
    /// Identity of a topological entity in an [`EntityStore`](super::EntityStore).
    pub struct ShapeId;
    /// Identity of a surface shared by a face and the parameter curves of its edges.
    pub struct SurfaceId;
}

// ─── Oriented References ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Forward,
    Reversed,
}

impl Orientation {
    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
        }
    }

    /// Orientation of a child seen through a parent with orientation `parent`.
    pub fn compose(self, parent: Orientation) -> Self {
        match parent {
            Orientation::Forward => self,
            Orientation::Reversed => self.reversed(),
        }
    }
}

/// Topological entity kinds, from the most to the least complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Compound,
    Solid,
    Shell,
    Face,
    Wire,
    Edge,
    Vertex,
}

/// An oriented reference to a stored entity.
///
/// Two references with the same `id` are the *same* entity; they are
/// *equal* when their orientations also match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub orientation: Orientation,
}

impl Shape {
    pub fn forward(id: ShapeId) -> Self {
        Self {
            id,
            orientation: Orientation::Forward,
        }
    }

    pub fn is_same(&self, other: &Shape) -> bool {
        self.id == other.id
    }

    pub fn is_equal(&self, other: &Shape) -> bool {
        self == other
    }

    pub fn reversed(&self) -> Self {
        Self {
            id: self.id,
            orientation: self.orientation.reversed(),
        }
    }

    pub fn oriented(&self, orientation: Orientation) -> Self {
        Self {
            id: self.id,
            orientation,
        }
    }

    /// This reference seen through a parent oriented `parent`.
    pub fn composed(&self, parent: Orientation) -> Self {
        self.oriented(self.orientation.compose(parent))
    }
}

// ─── Stored Entities ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TVertex {
    pub point: Point3d,
    pub tolerance: f64,
}

/// Representation of an edge in the parameter space of one surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PCurve {
    pub surface: SurfaceId,
    /// Used by forward occurrences of the edge.
    pub curve: Curve2d,
    /// Used by reversed occurrences when the edge is a seam of the surface.
    pub seam: Option<Curve2d>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TEdge {
    /// Vertices at the start and end of `range`, in curve direction.
    pub vertices: [ShapeId; 2],
    /// 3D geometry. Absent for degenerated edges and for edges only known
    /// through their parameter curves.
    pub curve: Option<Curve>,
    pub range: (f64, f64),
    pub pcurves: Vec<PCurve>,
    pub degenerated: bool,
    pub tolerance: f64,
}

impl TEdge {
    pub fn pcurve(&self, surface: SurfaceId) -> Option<&PCurve> {
        self.pcurves.iter().find(|p| p.surface == surface)
    }

    pub fn is_closed(&self) -> bool {
        self.vertices[0] == self.vertices[1]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TWire {
    pub edges: Vec<Shape>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TFace {
    pub surface: SurfaceId,
    /// Boundary wires. The outer wire is normally first but this is not
    /// guaranteed; see `heal::outer_wire`.
    pub wires: Vec<Shape>,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TShell {
    pub faces: Vec<Shape>,
    pub closed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TSolid {
    pub shells: Vec<Shape>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TCompound {
    pub children: Vec<Shape>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TShape {
    Vertex(TVertex),
    Edge(TEdge),
    Wire(TWire),
    Face(TFace),
    Shell(TShell),
    Solid(TSolid),
    Compound(TCompound),
}

impl TShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            TShape::Vertex(_) => ShapeKind::Vertex,
            TShape::Edge(_) => ShapeKind::Edge,
            TShape::Wire(_) => ShapeKind::Wire,
            TShape::Face(_) => ShapeKind::Face,
            TShape::Shell(_) => ShapeKind::Shell,
            TShape::Solid(_) => ShapeKind::Solid,
            TShape::Compound(_) => ShapeKind::Compound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_compose_orientation() {
        use Orientation::*;
        assert_eq!(Forward.compose(Reversed), Reversed);
        assert_eq!(Reversed.compose(Reversed), Forward);
        assert_eq!(Reversed.compose(Forward), Reversed);
    }

    #[test]
    fn test_same_versus_equal() {
        let mut ids: SlotMap<ShapeId, ()> = SlotMap::with_key();
        let a = Shape::forward(ids.insert(()));
        let b = a.reversed();
        assert!(a.is_same(&b));
        assert!(!a.is_equal(&b));
        assert!(a.is_equal(&b.reversed()));
    }

    #[test]
    fn test_kind_ordering() {
        assert!(ShapeKind::Solid < ShapeKind::Face);
        assert!(ShapeKind::Edge < ShapeKind::Vertex);
    }
}
