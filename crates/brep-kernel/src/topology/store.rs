use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::shape::*;
use crate::geometry::curves::Curve;
use crate::geometry::curves2d::Curve2d;
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::Surface;
use crate::geometry::transform::Transform;
use crate::mesh::uv::face_parameter_bounds;
use crate::types::KernelError;

/// Arena-based storage for topological entities and their surfaces.
///
/// Entities never point back to their parents. Parent and adjacency
/// relations are recomputed on demand by the explorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    shapes: SlotMap<ShapeId, TShape>,
    surfaces: SlotMap<SurfaceId, Surface>,
}

/// Correspondence between ids of a source store and a destination store,
/// so that shared sub-shapes stay shared across several imports.
#[derive(Debug, Default)]
pub struct ImportMap {
    shapes: HashMap<ShapeId, ShapeId>,
    surfaces: HashMap<SurfaceId, SurfaceId>,
}

impl ImportMap {
    pub fn get(&self, id: ShapeId) -> Option<ShapeId> {
        self.shapes.get(&id).copied()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of stored shapes of `kind`, reachable or not.
    pub fn count(&self, kind: ShapeKind) -> usize {
        self.shapes.values().filter(|s| s.kind() == kind).count()
    }

    /// Drop every stored shape of `kind` that `root` does not reach and
    /// return how many went. Unreached parents of dropped shapes are left
    /// with dangling references, so cull from faces down to vertices.
    pub fn cull_unused(&mut self, root: Shape, kind: ShapeKind) -> Result<usize, KernelError> {
        let used: HashSet<ShapeId> = super::explorer::map_shapes(self, root, kind)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let before = self.shapes.len();
        self.shapes
            .retain(|id, s| s.kind() != kind || used.contains(&id) || id == root.id);
        let culled = before - self.shapes.len();
        if culled > 0 {
            debug!(?kind, culled, "unused shapes removed");
        }
        Ok(culled)
    }

    // ─── Insertion ──────────────────────────────────────────────────────────

    pub fn add_vertex(&mut self, point: Point3d, tolerance: f64) -> Shape {
        Shape::forward(
            self.shapes
                .insert(TShape::Vertex(TVertex { point, tolerance })),
        )
    }

    pub fn add_edge(&mut self, edge: TEdge) -> Result<Shape, KernelError> {
        for v in edge.vertices {
            self.vertex(v)?;
        }
        if edge.curve.is_none() && edge.pcurves.is_empty() && !edge.degenerated {
            return Err(KernelError::shape("edge without curve or parameter curve"));
        }
        Ok(Shape::forward(self.shapes.insert(TShape::Edge(edge))))
    }

    pub fn add_wire(&mut self, edges: Vec<Shape>) -> Result<Shape, KernelError> {
        for e in &edges {
            self.edge(e.id)?;
        }
        Ok(Shape::forward(
            self.shapes.insert(TShape::Wire(TWire { edges })),
        ))
    }

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceId {
        self.surfaces.insert(surface)
    }

    pub fn add_face(
        &mut self,
        surface: SurfaceId,
        wires: Vec<Shape>,
        tolerance: f64,
    ) -> Result<Shape, KernelError> {
        self.surface(surface)?;
        for w in &wires {
            self.wire(w.id)?;
        }
        Ok(Shape::forward(self.shapes.insert(TShape::Face(TFace {
            surface,
            wires,
            tolerance,
        }))))
    }

    pub fn add_shell(&mut self, faces: Vec<Shape>, closed: bool) -> Result<Shape, KernelError> {
        for f in &faces {
            self.face(f.id)?;
        }
        Ok(Shape::forward(
            self.shapes
                .insert(TShape::Shell(TShell { faces, closed })),
        ))
    }

    pub fn add_solid(&mut self, shells: Vec<Shape>) -> Result<Shape, KernelError> {
        for s in &shells {
            self.shell(s.id)?;
        }
        Ok(Shape::forward(
            self.shapes.insert(TShape::Solid(TSolid { shells })),
        ))
    }

    pub fn add_compound(&mut self, children: Vec<Shape>) -> Result<Shape, KernelError> {
        for c in &children {
            self.get(c.id)?;
        }
        Ok(Shape::forward(
            self.shapes
                .insert(TShape::Compound(TCompound { children })),
        ))
    }

    // ─── Access ─────────────────────────────────────────────────────────────

    pub fn get(&self, id: ShapeId) -> Result<&TShape, KernelError> {
        self.shapes
            .get(id)
            .ok_or(KernelError::EntityNotFound { id })
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Result<&mut TShape, KernelError> {
        self.shapes
            .get_mut(id)
            .ok_or(KernelError::EntityNotFound { id })
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(id)
    }

    pub fn kind(&self, shape: Shape) -> Result<ShapeKind, KernelError> {
        Ok(self.get(shape.id)?.kind())
    }

    pub fn vertex(&self, id: ShapeId) -> Result<&TVertex, KernelError> {
        match self.get(id)? {
            TShape::Vertex(v) => Ok(v),
            other => Err(wrong_kind(ShapeKind::Vertex, other)),
        }
    }

    pub fn edge(&self, id: ShapeId) -> Result<&TEdge, KernelError> {
        match self.get(id)? {
            TShape::Edge(e) => Ok(e),
            other => Err(wrong_kind(ShapeKind::Edge, other)),
        }
    }

    pub fn edge_mut(&mut self, id: ShapeId) -> Result<&mut TEdge, KernelError> {
        match self.get_mut(id)? {
            TShape::Edge(e) => Ok(e),
            other => Err(wrong_kind(ShapeKind::Edge, other)),
        }
    }

    pub fn wire(&self, id: ShapeId) -> Result<&TWire, KernelError> {
        match self.get(id)? {
            TShape::Wire(w) => Ok(w),
            other => Err(wrong_kind(ShapeKind::Wire, other)),
        }
    }

    pub fn wire_mut(&mut self, id: ShapeId) -> Result<&mut TWire, KernelError> {
        match self.get_mut(id)? {
            TShape::Wire(w) => Ok(w),
            other => Err(wrong_kind(ShapeKind::Wire, other)),
        }
    }

    pub fn face(&self, id: ShapeId) -> Result<&TFace, KernelError> {
        match self.get(id)? {
            TShape::Face(f) => Ok(f),
            other => Err(wrong_kind(ShapeKind::Face, other)),
        }
    }

    pub fn face_mut(&mut self, id: ShapeId) -> Result<&mut TFace, KernelError> {
        match self.get_mut(id)? {
            TShape::Face(f) => Ok(f),
            other => Err(wrong_kind(ShapeKind::Face, other)),
        }
    }

    pub fn shell(&self, id: ShapeId) -> Result<&TShell, KernelError> {
        match self.get(id)? {
            TShape::Shell(s) => Ok(s),
            other => Err(wrong_kind(ShapeKind::Shell, other)),
        }
    }

    pub fn shell_mut(&mut self, id: ShapeId) -> Result<&mut TShell, KernelError> {
        match self.get_mut(id)? {
            TShape::Shell(s) => Ok(s),
            other => Err(wrong_kind(ShapeKind::Shell, other)),
        }
    }

    pub fn surface(&self, id: SurfaceId) -> Result<&Surface, KernelError> {
        self.surfaces
            .get(id)
            .ok_or_else(|| KernelError::shape("surface not found"))
    }

    pub fn face_surface(&self, face: ShapeId) -> Result<&Surface, KernelError> {
        self.surface(self.face(face)?.surface)
    }

    pub fn point(&self, vertex: ShapeId) -> Result<Point3d, KernelError> {
        Ok(self.vertex(vertex)?.point)
    }

    /// Children of `shape`, oriented as seen through it.
    ///
    /// The start vertex of an edge is reported forward and the end vertex
    /// reversed.
    pub fn children(&self, shape: Shape) -> Result<Vec<Shape>, KernelError> {
        let o = shape.orientation;
        let list = match self.get(shape.id)? {
            TShape::Vertex(_) => Vec::new(),
            TShape::Edge(e) => vec![
                Shape::forward(e.vertices[0]).composed(o),
                Shape::forward(e.vertices[1]).reversed().composed(o),
            ],
            TShape::Wire(w) => w.edges.iter().map(|c| c.composed(o)).collect(),
            TShape::Face(f) => f.wires.iter().map(|c| c.composed(o)).collect(),
            TShape::Shell(s) => s.faces.iter().map(|c| c.composed(o)).collect(),
            TShape::Solid(s) => s.shells.iter().map(|c| c.composed(o)).collect(),
            TShape::Compound(c) => c.children.iter().map(|c| c.composed(o)).collect(),
        };
        Ok(list)
    }

    /// Start vertex of an oriented edge.
    pub fn first_vertex(&self, edge: Shape) -> Result<Shape, KernelError> {
        let e = self.edge(edge.id)?;
        Ok(match edge.orientation {
            Orientation::Forward => Shape::forward(e.vertices[0]),
            Orientation::Reversed => Shape::forward(e.vertices[1]),
        })
    }

    /// End vertex of an oriented edge.
    pub fn last_vertex(&self, edge: Shape) -> Result<Shape, KernelError> {
        let e = self.edge(edge.id)?;
        Ok(match edge.orientation {
            Orientation::Forward => Shape::forward(e.vertices[1]),
            Orientation::Reversed => Shape::forward(e.vertices[0]),
        })
    }

    /// Parameter curve of an edge on `surface`. `edge` is oriented relative
    /// to the forward face: reversed occurrences of seams use the second
    /// curve.
    pub fn pcurve(&self, edge: Shape, surface: SurfaceId) -> Result<Option<&Curve2d>, KernelError> {
        let e = self.edge(edge.id)?;
        Ok(e.pcurve(surface).map(|p| match (edge.orientation, &p.seam) {
            (Orientation::Reversed, Some(seam)) => seam,
            _ => &p.curve,
        }))
    }

    /// Evaluate an edge's geometry at `t`, falling back to the surface of a
    /// parameter curve when the edge has no 3D curve.
    pub fn edge_point(&self, edge: ShapeId, t: f64) -> Result<Point3d, KernelError> {
        let e = self.edge(edge)?;
        if let Some(c) = &e.curve {
            return Ok(c.evaluate(t));
        }
        if e.degenerated {
            return self.point(e.vertices[0]);
        }
        let pc = e
            .pcurves
            .first()
            .ok_or_else(|| KernelError::shape("edge without geometry"))?;
        let uv: Point2d = pc.curve.evaluate(t);
        Ok(self.surface(pc.surface)?.evaluate(uv.x, uv.y))
    }

    // ─── Copy and transform ─────────────────────────────────────────────────

    /// Deep-copy `shape` from `src` into this store.
    pub fn import(
        &mut self,
        src: &EntityStore,
        shape: Shape,
        map: &mut ImportMap,
    ) -> Result<Shape, KernelError> {
        let id = self.import_id(src, shape.id, map)?;
        Ok(Shape {
            id,
            orientation: shape.orientation,
        })
    }

    fn import_surface(
        &mut self,
        src: &EntityStore,
        id: SurfaceId,
        map: &mut ImportMap,
    ) -> Result<SurfaceId, KernelError> {
        if let Some(&n) = map.surfaces.get(&id) {
            return Ok(n);
        }
        let n = self.surfaces.insert(src.surface(id)?.clone());
        map.surfaces.insert(id, n);
        Ok(n)
    }

    fn import_children(
        &mut self,
        src: &EntityStore,
        children: &mut [Shape],
        map: &mut ImportMap,
    ) -> Result<(), KernelError> {
        for c in children.iter_mut() {
            c.id = self.import_id(src, c.id, map)?;
        }
        Ok(())
    }

    fn import_id(
        &mut self,
        src: &EntityStore,
        id: ShapeId,
        map: &mut ImportMap,
    ) -> Result<ShapeId, KernelError> {
        if let Some(n) = map.get(id) {
            return Ok(n);
        }
        let copied = match src.get(id)?.clone() {
            TShape::Vertex(v) => TShape::Vertex(v),
            TShape::Edge(mut e) => {
                e.vertices = [
                    self.import_id(src, e.vertices[0], map)?,
                    self.import_id(src, e.vertices[1], map)?,
                ];
                for pc in &mut e.pcurves {
                    pc.surface = self.import_surface(src, pc.surface, map)?;
                }
                TShape::Edge(e)
            }
            TShape::Wire(mut w) => {
                self.import_children(src, &mut w.edges, map)?;
                TShape::Wire(w)
            }
            TShape::Face(mut f) => {
                f.surface = self.import_surface(src, f.surface, map)?;
                self.import_children(src, &mut f.wires, map)?;
                TShape::Face(f)
            }
            TShape::Shell(mut s) => {
                self.import_children(src, &mut s.faces, map)?;
                TShape::Shell(s)
            }
            TShape::Solid(mut s) => {
                self.import_children(src, &mut s.shells, map)?;
                TShape::Solid(s)
            }
            TShape::Compound(mut c) => {
                self.import_children(src, &mut c.children, map)?;
                TShape::Compound(c)
            }
        };
        let n = self.shapes.insert(copied);
        map.shapes.insert(id, n);
        Ok(n)
    }

    /// Independent copy of everything reachable from `shape`.
    pub fn extract(&self, shape: Shape) -> Result<(EntityStore, Shape), KernelError> {
        let mut out = EntityStore::new();
        let root = out.import(self, shape, &mut ImportMap::default())?;
        Ok((out, root))
    }

    /// Independent copy of `shape` moved by `t`.
    ///
    /// Mirroring transforms flip the natural normals of analytic surfaces,
    /// so the returned root is reversed to keep material on the same side.
    pub fn transformed_copy(
        &self,
        shape: Shape,
        t: &Transform,
    ) -> Result<(EntityStore, Shape), KernelError> {
        let (mut out, root) = self.extract(shape)?;
        if t.is_identity() {
            return Ok((out, root));
        }
        out.transform_in_place(t)?;
        let root = if t.determinant() < 0.0 {
            root.reversed()
        } else {
            root
        };
        Ok((out, root))
    }

    fn transform_in_place(&mut self, t: &Transform) -> Result<(), KernelError> {
        let scale = t.similarity_scale();
        debug!(similarity = ?scale, "transforming entity store");

        // Parameter bounds are needed before geometry moves when analytic
        // surfaces must be converted.
        let mut bounds: HashMap<SurfaceId, ((f64, f64), (f64, f64))> = HashMap::new();
        if scale.is_none() {
            let faces: Vec<(ShapeId, SurfaceId)> = self
                .shapes
                .iter()
                .filter_map(|(id, s)| match s {
                    TShape::Face(f) => Some((id, f.surface)),
                    _ => None,
                })
                .collect();
            for (face, sid) in faces {
                let b = face_parameter_bounds(self, face)?;
                bounds
                    .entry(sid)
                    .and_modify(|acc| {
                        acc.0 .0 = acc.0 .0.min(b.0 .0);
                        acc.0 .1 = acc.0 .1.max(b.0 .1);
                        acc.1 .0 = acc.1 .0.min(b.1 .0);
                        acc.1 .1 = acc.1 .1.max(b.1 .1);
                    })
                    .or_insert(b);
            }
            self.materialize_edge_curves()?;
        }

        let old_surfaces = self.surfaces.clone();
        for (sid, surface) in self.surfaces.iter_mut() {
            let b = bounds.get(&sid).copied().unwrap_or(((0.0, 1.0), (0.0, 1.0)));
            *surface = surface.transformed(t, b);
        }

        for (_, shape) in self.shapes.iter_mut() {
            match shape {
                TShape::Vertex(v) => {
                    v.point = t.transform_point(&v.point);
                    v.tolerance *= scale.unwrap_or(1.0);
                }
                TShape::Edge(e) => transform_edge(e, t, scale, &old_surfaces),
                _ => {}
            }
        }
        Ok(())
    }

    /// Give every non-degenerated edge known only through a parameter curve
    /// a 3D polyline curve, so it survives surface conversion.
    fn materialize_edge_curves(&mut self) -> Result<(), KernelError> {
        let pending: Vec<ShapeId> = self
            .shapes
            .iter()
            .filter_map(|(id, s)| match s {
                TShape::Edge(e) if e.curve.is_none() && !e.degenerated => Some(id),
                _ => None,
            })
            .collect();
        for id in pending {
            let (t0, t1) = self.edge(id)?.range;
            let n = 64;
            let points = (0..=n)
                .map(|i| self.edge_point(id, t0 + (t1 - t0) * i as f64 / n as f64))
                .collect::<Result<Vec<_>, _>>()?;
            let mut knots = vec![t0];
            knots.extend((0..=n).map(|i| t0 + (t1 - t0) * i as f64 / n as f64));
            knots.push(t1);
            let curve = crate::geometry::nurbs::NurbsCurve {
                degree: 1,
                weights: vec![1.0; points.len()],
                control_points: points,
                knots,
                periodic: false,
            };
            self.edge_mut(id)?.curve = Some(Curve::BSpline(curve));
        }
        Ok(())
    }
}

fn transform_edge(
    e: &mut TEdge,
    t: &Transform,
    scale: Option<f64>,
    old_surfaces: &SlotMap<SurfaceId, Surface>,
) {
    let mut ks = 1.0;
    if let Some(curve) = e.curve.take() {
        let (moved, range) = curve.transformed(t, e.range);
        ks = scale.map(|s| curve.parameter_scale(s)).unwrap_or(1.0);
        e.curve = Some(moved);
        e.range = range;
    }
    e.tolerance *= scale.unwrap_or(1.0);
    match scale {
        Some(s) => {
            e.pcurves.retain_mut(|pc| {
                let Some(surface) = old_surfaces.get(pc.surface) else {
                    return false;
                };
                let (su, sv) = surface.parameter_scale(s);
                let Some(curve) = pc.curve.scaled(su, sv, ks) else {
                    return false;
                };
                let seam = match &pc.seam {
                    Some(c) => match c.scaled(su, sv, ks) {
                        Some(c) => Some(c),
                        None => return false,
                    },
                    None => None,
                };
                pc.curve = curve;
                pc.seam = seam;
                true
            });
        }
        None => {
            // Converted surfaces no longer share the old parameterization,
            // except at the parameter bounds where degenerated edges live.
            if !e.degenerated {
                e.pcurves.clear();
            }
        }
    }
}

fn wrong_kind(expected: ShapeKind, found: &TShape) -> KernelError {
    KernelError::shape(format!("expected {expected:?}, found {:?}", found.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curves::Line3d;
    use crate::geometry::vector::Vec3;

    fn segment(store: &mut EntityStore, a: Point3d, b: Point3d) -> Shape {
        let va = store.add_vertex(a, 1e-7);
        let vb = store.add_vertex(b, 1e-7);
        store
            .add_edge(TEdge {
                vertices: [va.id, vb.id],
                curve: Some(Curve::Line(Line3d::from_points(a, b))),
                range: (0.0, a.distance_to(&b)),
                pcurves: vec![],
                degenerated: false,
                tolerance: 1e-7,
            })
            .unwrap()
    }

    #[test]
    fn test_reversed_edge_swaps_vertices() {
        let mut store = EntityStore::new();
        let e = segment(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let f = store.first_vertex(e).unwrap();
        let l = store.last_vertex(e.reversed()).unwrap();
        assert!(f.is_same(&l));
    }

    #[test]
    fn test_children_compose_orientation() {
        let mut store = EntityStore::new();
        let e = segment(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let w = store.add_wire(vec![e]).unwrap();
        let kids = store.children(w.reversed()).unwrap();
        assert_eq!(kids[0].orientation, Orientation::Reversed);
    }

    #[test]
    fn test_extract_preserves_sharing() {
        let mut store = EntityStore::new();
        let e = segment(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let w = store.add_wire(vec![e, e.reversed()]).unwrap();
        let (copy, root) = store.extract(w).unwrap();
        let edges = &copy.wire(root.id).unwrap().edges;
        assert!(edges[0].is_same(&edges[1]));
        assert!(!edges[0].is_same(&e) || !store.contains(edges[0].id) || edges[0].id != e.id);
        assert_eq!(copy.shape_count(), 4);
    }

    #[test]
    fn test_transformed_copy_moves_points() {
        let mut store = EntityStore::new();
        let e = segment(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let (copy, root) = store
            .transformed_copy(e, &Transform::translation(Vec3::new(0.0, 0.0, 2.0)))
            .unwrap();
        let v = copy.first_vertex(root).unwrap();
        assert!((copy.point(v.id).unwrap().z - 2.0).abs() < 1e-12);
        // Original untouched.
        let v0 = store.first_vertex(e).unwrap();
        assert!(store.point(v0.id).unwrap().z.abs() < 1e-12);
    }

    #[test]
    fn test_cull_unused_keeps_what_the_root_reaches() {
        let mut store = EntityStore::new();
        let kept = segment(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        segment(&mut store, Point3d::ORIGIN, Point3d::new(0.0, 1.0, 0.0));
        let w = store.add_wire(vec![kept]).unwrap();
        assert_eq!(store.count(ShapeKind::Edge), 2);

        assert_eq!(store.cull_unused(w, ShapeKind::Edge).unwrap(), 1);
        assert_eq!(store.cull_unused(w, ShapeKind::Vertex).unwrap(), 2);
        assert_eq!(store.cull_unused(w, ShapeKind::Wire).unwrap(), 0);
        assert_eq!(store.count(ShapeKind::Edge), 1);
        assert_eq!(store.count(ShapeKind::Vertex), 2);
        assert!(store.contains(kept.id));
    }

    #[test]
    fn test_missing_entity_is_reported() {
        let mut other = EntityStore::new();
        let v = other.add_vertex(Point3d::ORIGIN, 1e-7);
        let store = EntityStore::new();
        assert!(matches!(
            store.get(v.id),
            Err(KernelError::EntityNotFound { .. })
        ));
    }
}
