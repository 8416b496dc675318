//! The composite shape: one root shape in a shared entity store, with lazily
//! built views of its sub-shapes.

use std::cell::OnceCell;
use std::sync::Arc;

use brep_kernel::geometry::{Ax3, Point3d};
use brep_kernel::mesh::{mass, proximity, section, triangulate, MeshParams};
use brep_kernel::topology::{
    builders, check, explorer, heal, EntityStore, Orientation, Shape, ShapeKind,
};
use brep_kernel::{primitives, Kernel, KernelError, ShapeRef, Tolerance};
use brep_types::{
    Cone, Cuboid, Cylinder, Mesh, Plane, Point, Polygon, Polyline, Sphere, Torus, Transformation,
    Vector,
};
use tracing::{debug, info, instrument, warn};

use crate::conversions::{
    box_corner_frame, cone_base_frame, cylinder_base_frame, frame_to_kernel, point_from_kernel,
    point_to_kernel, transformation_to_kernel, vector_to_kernel,
};
use crate::data::BrepData;
use crate::edge::Edge;
use crate::errors::{BrepError, Result};
use crate::face::Face;
use crate::importer::Importer;
use crate::loops::Loop;
use crate::nurbs_curve::{bounding_cuboid, NurbsCurve};
use crate::nurbs_surface::NurbsSurface;
use crate::vertex::Vertex;

/// Fuzzy tolerance used by kernel operations that do not take one
/// explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BooleanOptions {
    pub fuzzy_tolerance: f64,
}

impl Default for BooleanOptions {
    fn default() -> Self {
        Self {
            fuzzy_tolerance: Tolerance::default().sewing,
        }
    }
}

/// One side of a boolean: a single shape, or several shapes that are
/// united before the operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Single(&'a Brep),
    Many(&'a [Brep]),
}

impl<'a> From<&'a Brep> for Operand<'a> {
    fn from(b: &'a Brep) -> Self {
        Operand::Single(b)
    }
}

impl<'a> From<&'a [Brep]> for Operand<'a> {
    fn from(b: &'a [Brep]) -> Self {
        Operand::Many(b)
    }
}

impl<'a> From<&'a Vec<Brep>> for Operand<'a> {
    fn from(b: &'a Vec<Brep>) -> Self {
        Operand::Many(b.as_slice())
    }
}

impl Operand<'_> {
    fn resolve(self, kernel: &mut dyn Kernel, tolerance: f64, operation: &str) -> Result<Brep> {
        match self {
            Operand::Single(b) => Ok(b.clone()),
            Operand::Many(list) => {
                let (first, rest) = list.split_first().ok_or_else(|| BrepError::Boolean {
                    operation: operation.to_string(),
                    reason: "operand list is empty".to_string(),
                })?;
                let mut acc = first.clone();
                for b in rest {
                    let (store, root) = kernel
                        .boolean_union(acc.shape_ref(), b.shape_ref(), tolerance)
                        .map_err(boolean_error(operation))?;
                    acc = Brep::from_parts(store, root);
                }
                Ok(acc)
            }
        }
    }
}

fn boolean_error(operation: &str) -> impl FnOnce(KernelError) -> BrepError + '_ {
    move |e| BrepError::Boolean {
        operation: operation.to_string(),
        reason: e.to_string(),
    }
}

/// Corner points of a loop made only of straight edges, and whether the
/// loop closes. The end point of a closed loop is not repeated.
fn straight_chain(operation: &str, l: &Loop) -> Result<(Vec<Point3d>, bool)> {
    let edges = l.edges()?;
    if let Some(e) = edges.iter().find(|e| !e.is_line()) {
        return Err(BrepError::domain(operation, "line", e.kind()));
    }
    let mut points = edges
        .iter()
        .map(|e| Ok(point_to_kernel(&e.first_vertex()?.point())))
        .collect::<Result<Vec<_>>>()?;
    let closed = l.is_closed()?;
    if let (Some(last), false) = (edges.last(), closed) {
        points.push(point_to_kernel(&last.last_vertex()?.point()));
    }
    Ok((points, closed))
}

#[derive(Debug, Clone, Copy)]
enum BooleanKind {
    Union,
    Intersection,
    Difference,
}

#[derive(Debug, Clone, Default)]
struct Cache {
    vertices: OnceCell<Vec<Vertex>>,
    edges: OnceCell<Vec<Edge>>,
    loops: OnceCell<Vec<Loop>>,
    faces: OnceCell<Vec<Face>>,
    shells: OnceCell<Vec<Brep>>,
    solids: OnceCell<Vec<Brep>>,
}

fn cached<T: Clone>(cell: &OnceCell<Vec<T>>, build: impl FnOnce() -> Result<Vec<T>>) -> Result<Vec<T>> {
    if let Some(v) = cell.get() {
        return Ok(v.clone());
    }
    let v = build()?;
    Ok(cell.get_or_init(|| v).clone())
}

/// A boundary representation: a root shape and the store holding it.
///
/// Sub-shape views share the store. Operations that change the shape write
/// to a private copy of the store when views are still alive, so existing
/// views keep describing the shape they were taken from.
#[derive(Debug, Clone)]
pub struct Brep {
    store: Arc<EntityStore>,
    root: Shape,
    cache: Cache,
}

impl Brep {
    /// Wrap a shape the caller built directly in a store.
    pub fn from_parts(store: EntityStore, root: Shape) -> Self {
        Self::from_shared(Arc::new(store), root)
    }

    pub(crate) fn from_shared(store: Arc<EntityStore>, root: Shape) -> Self {
        Self {
            store,
            root,
            cache: Cache::default(),
        }
    }

    fn build(
        operation: &str,
        make: impl FnOnce(&mut EntityStore) -> std::result::Result<Shape, KernelError>,
    ) -> Result<Self> {
        let mut store = EntityStore::new();
        let root = make(&mut store).map_err(BrepError::kernel(operation))?;
        Ok(Self::from_parts(store, root))
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn root(&self) -> Shape {
        self.root
    }

    pub fn shape_ref(&self) -> ShapeRef<'_> {
        ShapeRef::new(&self.store, self.root)
    }

    /// Replace the root shape. Every cached view is dropped.
    fn set_root(&mut self, root: Shape) {
        self.root = root;
        self.cache = Cache::default();
    }

    fn replace(&mut self, store: EntityStore, root: Shape) {
        self.store = Arc::new(store);
        self.set_root(root);
    }

    /// Run an in-place store edit and install the root it returns.
    fn edit(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut EntityStore, Shape) -> std::result::Result<Shape, KernelError>,
    ) -> Result<()> {
        let root = self.root;
        let store = Arc::make_mut(&mut self.store);
        let root = f(store, root).map_err(BrepError::kernel(operation))?;
        self.set_root(root);
        Ok(())
    }

    // ─── Primitives ─────────────────────────────────────────────────────────

    pub fn from_box(b: &Cuboid) -> Result<Self> {
        let frame = box_corner_frame(b);
        Self::build("Brep::from_box", |store| {
            primitives::make_box(store, &frame, b.xsize, b.ysize, b.zsize)
        })
    }

    pub fn from_cylinder(c: &Cylinder) -> Result<Self> {
        let frame = cylinder_base_frame(c);
        Self::build("Brep::from_cylinder", |store| {
            primitives::make_cylinder(store, &frame, c.radius, c.height)
        })
    }

    pub fn from_cone(c: &Cone) -> Result<Self> {
        let frame = cone_base_frame(c);
        Self::build("Brep::from_cone", |store| {
            primitives::make_cone(store, &frame, c.radius, 0.0, c.height)
        })
    }

    pub fn from_sphere(s: &Sphere) -> Result<Self> {
        let frame = frame_to_kernel(&s.frame);
        Self::build("Brep::from_sphere", |store| {
            primitives::make_sphere(store, &frame, s.radius)
        })
    }

    pub fn from_torus(t: &Torus) -> Result<Self> {
        let frame = frame_to_kernel(&t.frame);
        Self::build("Brep::from_torus", |store| {
            primitives::make_torus(store, &frame, t.radius_axis, t.radius_pipe)
        })
    }

    /// A single rectangular face of `plane`.
    pub fn from_plane(plane: &Plane, domain_u: (f64, f64), domain_v: (f64, f64)) -> Result<Self> {
        Self::from_faces(&[Face::from_plane(plane, domain_u, domain_v)?])
    }

    /// One rectangular face per plane, sewn where they meet.
    pub fn from_planes(planes: &[Plane], domain_u: (f64, f64), domain_v: (f64, f64)) -> Result<Self> {
        let faces = planes
            .iter()
            .map(|p| Face::from_plane(p, domain_u, domain_v))
            .collect::<Result<Vec<_>>>()?;
        Self::from_faces(&faces)
    }

    /// Prism swept from a polygon along `vector`.
    pub fn from_extrusion(profile: &Polygon, vector: &Vector) -> Result<Self> {
        let points: Vec<Point3d> = profile.points.iter().map(point_to_kernel).collect();
        let direction = vector_to_kernel(vector);
        Self::build("Brep::from_extrusion", |store| {
            primitives::make_prism(store, &points, direction)
        })
    }

    // ─── Assembly ───────────────────────────────────────────────────────────

    /// Shell of the given faces, healed.
    #[instrument(skip_all, fields(faces = faces.len()))]
    pub fn from_faces(faces: &[Face]) -> Result<Self> {
        const OP: &str = "Brep::from_faces";
        let mut importer = Importer::new();
        let mut shapes = Vec::with_capacity(faces.len());
        for f in faces {
            shapes.push(importer.import(OP, f.store(), f.shape())?);
        }
        let mut store = importer.finish();
        let shell = store.add_shell(shapes, false).map_err(BrepError::kernel(OP))?;
        let mut brep = Self::from_parts(store, shell);
        brep.heal()?;
        Ok(brep)
    }

    fn from_point_lists(operation: &str, polygons: &[Vec<Point3d>], solid: bool) -> Result<Self> {
        let mut store = EntityStore::new();
        let faces = polygons
            .iter()
            .map(|pts| primitives::make_polygon_face(&mut store, pts))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(BrepError::kernel(operation))?;
        let shell = store.add_shell(faces, false).map_err(BrepError::kernel(operation))?;
        let mut brep = Self::from_parts(store, shell);
        brep.heal()?;
        if solid {
            brep.make_solid()?;
        }
        info!(faces = polygons.len(), kind = ?brep.kind(), "polygon shape built");
        Ok(brep)
    }

    /// One face per polygon: planar faces, or Coons patches through the
    /// sides of non-planar polygons.
    pub fn from_polygons(polygons: &[Polygon]) -> Result<Self> {
        let lists: Vec<Vec<Point3d>> = polygons
            .iter()
            .map(|p| p.points.iter().map(point_to_kernel).collect())
            .collect();
        Self::from_point_lists("Brep::from_polygons", &lists, false)
    }

    /// One face per mesh face, made solid when `solid` is set and the
    /// faces close up.
    pub fn from_mesh(mesh: &Mesh, solid: bool) -> Result<Self> {
        const OP: &str = "Brep::from_mesh";
        let lists = mesh
            .faces
            .iter()
            .map(|f| {
                f.iter()
                    .map(|&i| {
                        mesh.vertices.get(i).map(point_to_kernel).ok_or_else(|| {
                            BrepError::construction(OP, format!("vertex index {i} out of range"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_point_lists(OP, &lists, solid)
    }

    /// Planar face bounded by curves that chain, in any order and
    /// direction, into one closed loop.
    #[instrument(skip_all, fields(curves = curves.len()))]
    pub fn from_curves(curves: &[NurbsCurve]) -> Result<Self> {
        const OP: &str = "Brep::from_curves";
        if curves.is_empty() {
            return Err(BrepError::construction(OP, "no curves"));
        }
        let mut store = EntityStore::new();
        let edges = curves
            .iter()
            .map(|c| builders::curve_edge(&mut store, c.to_curve(), c.domain(), None, None))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(BrepError::kernel(OP))?;
        let wire = store.add_wire(edges).map_err(BrepError::kernel(OP))?;
        heal::fix_wire(&mut store, wire.id).map_err(BrepError::kernel(OP))?;
        if !builders::is_wire_closed(&store, wire).map_err(BrepError::kernel(OP))? {
            return Err(BrepError::construction(OP, "curves do not close into a loop"));
        }
        let points = builders::wire_sample_points(&store, wire).map_err(BrepError::kernel(OP))?;
        let plane = builders::fit_plane(&points).map_err(BrepError::kernel(OP))?;
        let off = points
            .iter()
            .map(|p| (*p - plane.origin).dot(&plane.z_dir).abs())
            .fold(0.0, f64::max);
        if off > Tolerance::default().sewing {
            return Err(BrepError::construction(
                OP,
                format!("curves stray {off:e} from their best-fit plane"),
            ));
        }
        let face = builders::make_planar_face(&mut store, vec![wire]).map_err(BrepError::kernel(OP))?;
        Ok(Self::from_parts(store, face))
    }

    /// Solid swept by a polygonal face along an open polyline loop, with
    /// mitred joints at the path corners.
    pub fn from_sweep(profile: &Face, path: &Loop) -> Result<Self> {
        const OP: &str = "Brep::from_sweep";
        let (points, closed) = straight_chain(OP, &profile.outerloop()?)?;
        if !closed {
            return Err(BrepError::construction(OP, "profile boundary is open"));
        }
        Self::sweep(OP, &points, true, path)
    }

    /// Shell swept by a straight edge along an open polyline loop.
    pub fn from_sweep_edge(profile: &Edge, path: &Loop) -> Result<Self> {
        const OP: &str = "Brep::from_sweep_edge";
        if !profile.is_line() {
            return Err(BrepError::domain(OP, "line", profile.kind()));
        }
        let points = vec![
            point_to_kernel(&profile.first_vertex()?.point()),
            point_to_kernel(&profile.last_vertex()?.point()),
        ];
        Self::sweep(OP, &points, false, path)
    }

    fn sweep(operation: &str, profile: &[Point3d], closed: bool, path: &Loop) -> Result<Self> {
        let (rail, rail_closed) = straight_chain(operation, path)?;
        if rail_closed {
            return Err(BrepError::construction(operation, "closed sweep paths are not supported"));
        }
        let polygons = primitives::sweep_polygons(profile, closed, &rail)
            .map_err(BrepError::kernel(operation))?;
        debug!(segments = rail.len() - 1, faces = polygons.len(), "sweep laid out");
        Self::from_point_lists(operation, &polygons, closed)
    }

    /// Compound of independent copies of `breps`.
    pub fn from_breps(breps: &[Brep]) -> Result<Self> {
        const OP: &str = "Brep::from_breps";
        let mut importer = Importer::new();
        let mut children = Vec::with_capacity(breps.len());
        for b in breps {
            children.push(importer.import(OP, &b.store, b.root)?);
        }
        let mut store = importer.finish();
        let root = store.add_compound(children).map_err(BrepError::kernel(OP))?;
        Ok(Self::from_parts(store, root))
    }

    // ─── Booleans ───────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(kind = ?kind, tolerance = tolerance))]
    fn boolean(
        kind: BooleanKind,
        operation: &str,
        kernel: &mut dyn Kernel,
        a: Operand<'_>,
        b: Operand<'_>,
        tolerance: f64,
    ) -> Result<Self> {
        let a = a.resolve(kernel, tolerance, operation)?;
        let b = b.resolve(kernel, tolerance, operation)?;
        let (store, root) = match kind {
            BooleanKind::Union => kernel.boolean_union(a.shape_ref(), b.shape_ref(), tolerance),
            BooleanKind::Intersection => kernel.boolean_intersect(a.shape_ref(), b.shape_ref(), tolerance),
            BooleanKind::Difference => kernel.boolean_subtract(a.shape_ref(), b.shape_ref(), tolerance),
        }
        .map_err(boolean_error(operation))?;
        let mut brep = Self::from_parts(store, root);
        brep.heal()?;
        brep.make_solid()?;
        info!(kind = ?brep.kind(), "boolean completed");
        Ok(brep)
    }

    pub fn from_boolean_union<'a, 'b>(
        kernel: &mut dyn Kernel,
        a: impl Into<Operand<'a>>,
        b: impl Into<Operand<'b>>,
        tolerance: f64,
    ) -> Result<Self> {
        Self::boolean(
            BooleanKind::Union,
            "Brep::from_boolean_union",
            kernel,
            a.into(),
            b.into(),
            tolerance,
        )
    }

    pub fn from_boolean_intersection<'a, 'b>(
        kernel: &mut dyn Kernel,
        a: impl Into<Operand<'a>>,
        b: impl Into<Operand<'b>>,
        tolerance: f64,
    ) -> Result<Self> {
        Self::boolean(
            BooleanKind::Intersection,
            "Brep::from_boolean_intersection",
            kernel,
            a.into(),
            b.into(),
            tolerance,
        )
    }

    /// `a` minus `b`.
    pub fn from_boolean_difference<'a, 'b>(
        kernel: &mut dyn Kernel,
        a: impl Into<Operand<'a>>,
        b: impl Into<Operand<'b>>,
        tolerance: f64,
    ) -> Result<Self> {
        Self::boolean(
            BooleanKind::Difference,
            "Brep::from_boolean_difference",
            kernel,
            a.into(),
            b.into(),
            tolerance,
        )
    }

    // ─── Fillet ─────────────────────────────────────────────────────────────

    /// Round every edge except those in `exclude` with `radius`.
    #[instrument(skip(self, kernel, exclude), fields(excluded = exclude.len()))]
    pub fn fillet(&mut self, kernel: &mut dyn Kernel, radius: f64, exclude: &[Edge]) -> Result<()> {
        const OP: &str = "Brep::fillet";
        let edges: Vec<_> = explorer::map_shapes(&self.store, self.root, ShapeKind::Edge)
            .map_err(BrepError::kernel(OP))?
            .into_iter()
            .filter(|e| {
                !exclude
                    .iter()
                    .any(|x| Arc::ptr_eq(x.store(), &self.store) && x.shape().is_same(e))
            })
            .map(|e| e.id)
            .collect();
        let (store, root) = kernel
            .fillet_edges(self.shape_ref(), &edges, radius)
            .map_err(|e| BrepError::Fillet {
                operation: OP.to_string(),
                reason: e.to_string(),
            })?;
        info!(edges = edges.len(), "edges filleted");
        self.replace(store, root);
        Ok(())
    }

    pub fn filleted(&self, kernel: &mut dyn Kernel, radius: f64, exclude: &[Edge]) -> Result<Self> {
        let mut out = self.clone();
        out.fillet(kernel, radius, exclude)?;
        Ok(out)
    }

    // ─── Repair ─────────────────────────────────────────────────────────────

    /// Merge coincident boundaries of the faces. Shapes with a single face
    /// are left alone.
    pub fn sew(&mut self) -> Result<()> {
        self.edit("Brep::sew", |store, root| {
            heal::sew(store, root, Tolerance::default().sewing)
        })
    }

    /// Repair orientation and closure of a shell. Other shapes are left
    /// alone.
    pub fn fix(&mut self) -> Result<()> {
        let kind = self.kind()?;
        if kind != ShapeKind::Shell {
            debug!(?kind, "fix skipped");
            return Ok(());
        }
        self.edit("Brep::fix", heal::fix_shell)
    }

    pub fn heal(&mut self) -> Result<()> {
        self.sew()?;
        self.fix()
    }

    /// Turn a closed shell into a solid.
    pub fn make_solid(&mut self) -> Result<()> {
        self.edit("Brep::make_solid", heal::make_solid)
    }

    /// Flip a closed shape whose enclosed volume is negative.
    pub fn make_positive(&mut self) -> Result<()> {
        if self.is_closed()? && self.volume()? < 0.0 {
            warn!("shape turned inside out");
            let root = self.root.reversed();
            self.set_root(root);
        }
        Ok(())
    }

    /// Drop stored shapes of `kind` that the root does not reach. Returns
    /// how many were dropped.
    fn cull(&mut self, operation: &str, kind: ShapeKind) -> Result<usize> {
        let root = self.root;
        let store = Arc::make_mut(&mut self.store);
        let culled = store
            .cull_unused(root, kind)
            .map_err(BrepError::kernel(operation))?;
        self.cache = Cache::default();
        Ok(culled)
    }

    pub fn cull_unused_vertices(&mut self) -> Result<usize> {
        self.cull("Brep::cull_unused_vertices", ShapeKind::Vertex)
    }

    pub fn cull_unused_edges(&mut self) -> Result<usize> {
        self.cull("Brep::cull_unused_edges", ShapeKind::Edge)
    }

    pub fn cull_unused_loops(&mut self) -> Result<usize> {
        self.cull("Brep::cull_unused_loops", ShapeKind::Wire)
    }

    pub fn cull_unused_faces(&mut self) -> Result<usize> {
        self.cull("Brep::cull_unused_faces", ShapeKind::Face)
    }

    // ─── Cutting ────────────────────────────────────────────────────────────

    /// Faces of `self` and of `other` whose triangulations come within
    /// `tolerance` of each other.
    pub fn overlap(
        &self,
        other: &Brep,
        linear_deflection: f64,
        angular_deflection: f64,
        tolerance: f64,
    ) -> Result<(Vec<Face>, Vec<Face>)> {
        const OP: &str = "Brep::overlap";
        let (a, b) = proximity::overlapping_faces(
            &self.store,
            self.root,
            &other.store,
            other.root,
            MeshParams::new(linear_deflection, angular_deflection),
            tolerance,
        )
        .map_err(BrepError::kernel(OP))?;
        let a = a
            .into_iter()
            .map(|f| Face::view(&self.store, f))
            .collect::<Result<Vec<_>>>()?;
        let b = b
            .into_iter()
            .map(|f| Face::view(&other.store, f))
            .collect::<Result<Vec<_>>>()?;
        Ok((a, b))
    }

    /// Section by the plane as polygonal wires, or `None` when the plane
    /// misses the shape.
    pub fn slice(&self, plane: &Plane) -> Result<Option<Self>> {
        let section = section::section(
            &self.store,
            self.root,
            point_to_kernel(&plane.point),
            vector_to_kernel(&plane.normal),
            MeshParams::default(),
        )
        .map_err(BrepError::kernel("Brep::slice"))?;
        Ok(section.map(|(store, root)| Self::from_parts(store, root)))
    }

    /// Pieces of `self` cut by `other`, each as its own shape.
    #[instrument(skip_all)]
    pub fn split(&self, kernel: &mut dyn Kernel, other: &Brep) -> Result<Vec<Self>> {
        let pieces = kernel
            .split(self.shape_ref(), other.shape_ref(), BooleanOptions::default().fuzzy_tolerance)
            .map_err(BrepError::kernel("Brep::split"))?;
        info!(pieces = pieces.len(), "shape split");
        Ok(pieces
            .into_iter()
            .map(|(store, root)| Self::from_parts(store, root))
            .collect())
    }

    /// Keep the part of the shape behind `plane`: every fragment whose
    /// centroid lies on the negative side of the normal survives. Several
    /// surviving fragments are grouped in a compound.
    #[instrument(skip(self, kernel))]
    pub fn trim(&mut self, kernel: &mut dyn Kernel, plane: &Plane) -> Result<()> {
        const OP: &str = "Brep::trim";
        let tool = self.half_space(OP, plane)?;
        let pieces = self.split(kernel, &tool)?;
        let mut kept = Vec::new();
        for piece in pieces {
            if plane.signed_distance(&piece.centroid()?) < 0.0 {
                kept.push(piece);
            }
        }
        debug!(kept = kept.len(), "fragments behind the plane");
        let result = match kept.len() {
            0 => {
                return Err(BrepError::kernel(OP)(KernelError::SplitFailed {
                    reason: "no fragment lies behind the plane".to_string(),
                }))
            }
            1 => kept.remove(0),
            _ => Self::from_breps(&kept)?,
        };
        self.store = result.store;
        self.set_root(result.root);
        Ok(())
    }

    pub fn trimmed(&self, kernel: &mut dyn Kernel, plane: &Plane) -> Result<Self> {
        let mut out = self.copy()?;
        out.trim(kernel, plane)?;
        Ok(out)
    }

    /// A box covering everything behind `plane` within reach of the shape.
    fn half_space(&self, operation: &str, plane: &Plane) -> Result<Self> {
        let bounds = self.aabb()?;
        let half = Vector::new(bounds.xsize, bounds.ysize, bounds.zsize).length() / 2.0;
        let reach = bounds.frame.point.distance_to(&plane.point) + half + 1.0;
        let normal = vector_to_kernel(&plane.normal);
        let x = normal.any_perpendicular();
        let origin = point_to_kernel(&plane.point);
        let local = Ax3::new(origin, normal, x);
        let corner = local.to_global(-reach, -reach, -reach);
        let frame = Ax3::new(corner, normal, x);
        Self::build(operation, |store| {
            primitives::make_box(store, &frame, 2.0 * reach, 2.0 * reach, reach)
        })
    }

    // ─── Conversion ─────────────────────────────────────────────────────────

    /// Merged triangle mesh of every face, plus one polyline per distinct
    /// edge. Edges bounding faces reuse the mesh nodes; free edges are
    /// sampled.
    #[instrument(skip(self))]
    pub fn to_tesselation(
        &self,
        linear_deflection: f64,
        angular_deflection: f64,
    ) -> Result<(Mesh, Vec<Polyline>)> {
        const OP: &str = "Brep::to_tesselation";
        let merged = triangulate(
            &self.store,
            self.root,
            MeshParams::new(linear_deflection, angular_deflection),
        )
        .map_err(BrepError::kernel(OP))?;
        let mesh = Mesh::from_vertices_and_faces(
            merged.positions.iter().map(point_from_kernel).collect(),
            merged
                .triangles
                .iter()
                .map(|t| t.iter().map(|&i| i as usize).collect())
                .collect(),
        );
        let mut polylines: Vec<Polyline> = merged
            .edges
            .iter()
            .map(|e| Polyline::new(e.points.iter().map(point_from_kernel).collect()))
            .collect();
        let meshed: Vec<_> = merged.edges.iter().map(|e| e.edge).collect();
        for shape in explorer::map_shapes(&self.store, self.root, ShapeKind::Edge)
            .map_err(BrepError::kernel(OP))?
        {
            if meshed.contains(&shape.id) {
                continue;
            }
            let edge = Edge::view(&self.store, shape)?;
            if edge.is_degenerated() || edge.curve().is_none() {
                continue;
            }
            polylines.push(edge.to_polyline(16)?);
        }
        debug!(triangles = merged.triangles.len(), polylines = polylines.len(), "tessellated");
        Ok((mesh, polylines))
    }

    /// One triangle mesh per face, in face order.
    pub fn to_meshes(&self, linear_deflection: f64, angular_deflection: f64) -> Result<Vec<Mesh>> {
        let params = MeshParams::new(linear_deflection, angular_deflection);
        self.faces()?
            .iter()
            .map(|f| {
                let merged = triangulate(&self.store, f.shape(), params)
                    .map_err(BrepError::kernel("Brep::to_meshes"))?;
                Ok(Mesh::from_vertices_and_faces(
                    merged.positions.iter().map(point_from_kernel).collect(),
                    merged
                        .triangles
                        .iter()
                        .map(|t| t.iter().map(|&i| i as usize).collect())
                        .collect(),
                ))
            })
            .collect()
    }

    /// The outer loop corners of every face, without the face geometry.
    pub fn to_polygons(&self) -> Result<Vec<Polygon>> {
        self.faces()?
            .iter()
            .map(|f| {
                let points = f.outerloop()?.vertices()?.iter().map(Vertex::point).collect();
                Ok(Polygon::new(points))
            })
            .collect()
    }

    /// Section polylines for each plane, in the order given.
    pub fn contours(&self, planes: &[Plane]) -> Result<Vec<Vec<Polyline>>> {
        let merged = triangulate(&self.store, self.root, MeshParams::default())
            .map_err(BrepError::kernel("Brep::contours"))?;
        Ok(planes
            .iter()
            .map(|plane| {
                section::section_polylines(
                    &merged,
                    point_to_kernel(&plane.point),
                    vector_to_kernel(&plane.normal),
                    Tolerance::default().confusion,
                )
                .into_iter()
                .map(|line| Polyline::new(line.iter().map(point_from_kernel).collect()))
                .collect()
            })
            .collect())
    }

    pub fn to_data(&self) -> Result<BrepData> {
        crate::serializer::brep_data(self)
    }

    pub fn from_data(data: &BrepData) -> Result<Self> {
        crate::builder::build_brep(data)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_data()?)
            .map_err(|e| BrepError::construction("Brep::to_json", e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: BrepData = serde_json::from_str(json)
            .map_err(|e| BrepError::construction("Brep::from_json", e.to_string()))?;
        Self::from_data(&data)
    }

    // ─── Copy and transform ─────────────────────────────────────────────────

    /// Independent deep copy.
    pub fn copy(&self) -> Result<Self> {
        let (store, root) = self
            .store
            .extract(self.root)
            .map_err(BrepError::kernel("Brep::copy"))?;
        Ok(Self::from_parts(store, root))
    }

    pub fn transform(&mut self, t: &Transformation) -> Result<()> {
        let (store, root) = self
            .store
            .transformed_copy(self.root, &transformation_to_kernel(t))
            .map_err(BrepError::kernel("Brep::transform"))?;
        self.replace(store, root);
        Ok(())
    }

    pub fn transformed(&self, t: &Transformation) -> Result<Self> {
        let mut out = self.clone();
        out.transform(t)?;
        Ok(out)
    }

    // ─── Topology ───────────────────────────────────────────────────────────

    fn explore(&self, operation: &str, kind: ShapeKind) -> Result<Vec<Shape>> {
        explorer::explore(&self.store, self.root, kind).map_err(BrepError::kernel(operation))
    }

    /// Vertex occurrences; shared vertices appear once per edge using them.
    pub fn vertices(&self) -> Result<Vec<Vertex>> {
        cached(&self.cache.vertices, || {
            self.explore("Brep::vertices", ShapeKind::Vertex)?
                .into_iter()
                .map(|v| Vertex::view(&self.store, v))
                .collect()
        })
    }

    pub fn edges(&self) -> Result<Vec<Edge>> {
        cached(&self.cache.edges, || {
            self.explore("Brep::edges", ShapeKind::Edge)?
                .into_iter()
                .map(|e| Edge::view(&self.store, e))
                .collect()
        })
    }

    pub fn loops(&self) -> Result<Vec<Loop>> {
        cached(&self.cache.loops, || {
            self.explore("Brep::loops", ShapeKind::Wire)?
                .into_iter()
                .map(|w| Loop::view(&self.store, w))
                .collect()
        })
    }

    pub fn faces(&self) -> Result<Vec<Face>> {
        cached(&self.cache.faces, || {
            self.explore("Brep::faces", ShapeKind::Face)?
                .into_iter()
                .map(|f| Face::view(&self.store, f))
                .collect()
        })
    }

    /// Each shell as a shape of its own, sharing this store.
    pub fn shells(&self) -> Result<Vec<Self>> {
        cached(&self.cache.shells, || {
            Ok(self
                .explore("Brep::shells", ShapeKind::Shell)?
                .into_iter()
                .map(|s| Self::from_shared(Arc::clone(&self.store), s))
                .collect())
        })
    }

    pub fn solids(&self) -> Result<Vec<Self>> {
        cached(&self.cache.solids, || {
            Ok(self
                .explore("Brep::solids", ShapeKind::Solid)?
                .into_iter()
                .map(|s| Self::from_shared(Arc::clone(&self.store), s))
                .collect())
        })
    }

    /// Distinct vertex positions.
    pub fn points(&self) -> Result<Vec<Point>> {
        explorer::map_shapes(&self.store, self.root, ShapeKind::Vertex)
            .map_err(BrepError::kernel("Brep::points"))?
            .into_iter()
            .map(|v| {
                self.store
                    .point(v.id)
                    .map(|p| point_from_kernel(&p))
                    .map_err(BrepError::kernel("Brep::points"))
            })
            .collect()
    }

    /// NURBS form of every distinct edge carrying a 3D curve.
    pub fn curves(&self) -> Result<Vec<NurbsCurve>> {
        let mut out = Vec::new();
        for e in explorer::map_shapes(&self.store, self.root, ShapeKind::Edge)
            .map_err(BrepError::kernel("Brep::curves"))?
        {
            let edge = Edge::view(&self.store, e)?;
            if edge.curve().is_some() && !edge.is_degenerated() {
                out.push(edge.to_curve()?);
            }
        }
        Ok(out)
    }

    /// NURBS form of the surface of every distinct face, over the face's
    /// parameter range.
    pub fn surfaces(&self) -> Result<Vec<NurbsSurface>> {
        explorer::map_shapes(&self.store, self.root, ShapeKind::Face)
            .map_err(BrepError::kernel("Brep::surfaces"))?
            .into_iter()
            .map(|f| {
                let face = Face::view(&self.store, f)?;
                let (u, v) = face.domain()?;
                Ok(NurbsSurface::from_native(face.surface().to_nurbs(u, v)))
            })
            .collect()
    }

    // ─── Properties ─────────────────────────────────────────────────────────

    pub fn kind(&self) -> Result<ShapeKind> {
        self.store
            .kind(self.root)
            .map_err(BrepError::kernel("Brep::kind"))
    }

    pub fn orientation(&self) -> Orientation {
        self.root.orientation
    }

    pub fn is_solid(&self) -> Result<bool> {
        Ok(self.kind()? == ShapeKind::Solid)
    }

    pub fn is_shell(&self) -> Result<bool> {
        Ok(self.kind()? == ShapeKind::Shell)
    }

    pub fn is_compound(&self) -> Result<bool> {
        Ok(self.kind()? == ShapeKind::Compound)
    }

    pub fn is_closed(&self) -> Result<bool> {
        check::is_closed(&self.store, self.root).map_err(BrepError::kernel("Brep::is_closed"))
    }

    pub fn is_orientable(&self) -> Result<bool> {
        check::is_orientable(&self.store, self.root)
            .map_err(BrepError::kernel("Brep::is_orientable"))
    }

    pub fn is_valid(&self) -> Result<bool> {
        check::is_valid(&self.store, self.root).map_err(BrepError::kernel("Brep::is_valid"))
    }

    /// No edge bounds more than two faces.
    pub fn is_manifold(&self) -> Result<bool> {
        check::is_manifold(&self.store, self.root).map_err(BrepError::kernel("Brep::is_manifold"))
    }

    pub fn is_convex(&self) -> Result<bool> {
        check::is_convex(&self.store, self.root, MeshParams::default())
            .map_err(BrepError::kernel("Brep::is_convex"))
    }

    /// Some face has no boundary.
    pub fn is_infinite(&self) -> Result<bool> {
        check::is_infinite(&self.store, self.root).map_err(BrepError::kernel("Brep::is_infinite"))
    }

    fn mass(&self, operation: &str) -> Result<mass::MassProperties> {
        mass::mass_properties(&self.store, self.root, &MeshParams::default())
            .map_err(BrepError::kernel(operation))
    }

    pub fn area(&self) -> Result<f64> {
        Ok(self.mass("Brep::area")?.area)
    }

    /// Signed enclosed volume. Negative for inside-out closed shapes.
    pub fn volume(&self) -> Result<f64> {
        Ok(self.mass("Brep::volume")?.volume)
    }

    /// Volume centroid of closed shapes, area centroid otherwise.
    pub fn centroid(&self) -> Result<Point> {
        Ok(point_from_kernel(&self.mass("Brep::centroid")?.centroid()))
    }

    /// World-aligned bounding box of the triangulated shape.
    pub fn aabb(&self) -> Result<Cuboid> {
        let merged = triangulate(&self.store, self.root, MeshParams::default())
            .map_err(BrepError::kernel("Brep::aabb"))?;
        let points: Vec<Point> = merged.positions.iter().map(point_from_kernel).collect();
        Ok(bounding_cuboid(&points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brep_kernel::MockKernel;
    use brep_types::{Frame, Point};

    fn cube(x: f64, y: f64, z: f64) -> Brep {
        Brep::from_box(&Cuboid::from_corners(
            Point::new(x, y, z),
            Point::new(x + 1.0, y + 1.0, z + 1.0),
        ))
        .unwrap()
    }

    #[test]
    fn test_box_topology_counts() {
        let b = cube(0.0, 0.0, 0.0);
        assert!(b.is_solid().unwrap());
        assert!(b.is_closed().unwrap());
        assert_eq!(b.faces().unwrap().len(), 6);
        assert_eq!(b.loops().unwrap().len(), 6);
        assert_eq!(b.edges().unwrap().len(), 24);
        assert_eq!(b.points().unwrap().len(), 8);
    }

    #[test]
    fn test_cache_cleared_on_transform() {
        let mut b = cube(0.0, 0.0, 0.0);
        let before = b.faces().unwrap();
        b.transform(&Transformation::translation(Vector::new(0.0, 0.0, 5.0)))
            .unwrap();
        let after = b.faces().unwrap();
        assert!(!before[0].is_same(&after[0]));
        assert_relative_eq!(b.centroid().unwrap().z, 5.5, epsilon = 1e-9);
        // Views taken before the transform still describe the old shape.
        assert!(before[0].centroid().unwrap().z <= 1.0 + 1e-9);
    }

    #[test]
    fn test_shells_and_solids_are_cached() {
        let mut b = cube(0.0, 0.0, 0.0);
        let shells = b.shells().unwrap();
        let solids = b.solids().unwrap();
        assert_eq!((shells.len(), solids.len()), (1, 1));
        assert!(shells[0].root().is_same(&b.shells().unwrap()[0].root()));
        assert_eq!(b.cache.shells.get().map(Vec::len), Some(1));
        assert_eq!(b.cache.solids.get().map(Vec::len), Some(1));

        b.transform(&Transformation::translation(Vector::new(1.0, 0.0, 0.0)))
            .unwrap();
        assert!(b.cache.shells.get().is_none());
        assert!(b.cache.solids.get().is_none());
        assert_eq!(b.solids().unwrap().len(), 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let b = cube(0.0, 0.0, 0.0);
        let c = b.copy().unwrap();
        assert!(!Arc::ptr_eq(b.store(), c.store()));
        assert!(!b.faces().unwrap()[0].is_same(&c.faces().unwrap()[0]));
        assert_relative_eq!(c.volume().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_make_positive_flips_inside_out_shape() {
        let b = cube(0.0, 0.0, 0.0);
        let mut inverted = Brep::from_shared(Arc::clone(b.store()), b.root().reversed());
        assert!(inverted.volume().unwrap() < 0.0);
        inverted.make_positive().unwrap();
        assert_relative_eq!(inverted.volume().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_of_list_operand() {
        let mut kernel = MockKernel::new();
        let parts = vec![cube(0.0, 0.0, 0.0), cube(1.0, 0.0, 0.0)];
        let u = Brep::from_boolean_union(&mut kernel, &parts, &cube(2.0, 0.0, 0.0), 1e-6).unwrap();
        assert!(u.is_solid().unwrap());
        assert_relative_eq!(u.volume().unwrap(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_list_operand_is_boolean_error() {
        let mut kernel = MockKernel::new();
        let empty: Vec<Brep> = Vec::new();
        let err = Brep::from_boolean_union(&mut kernel, &empty, &cube(0.0, 0.0, 0.0), 1e-6)
            .unwrap_err();
        assert!(matches!(err, BrepError::Boolean { .. }));
        assert_eq!(err.operation(), "Brep::from_boolean_union");
    }

    #[test]
    fn test_fillet_excludes_edges() {
        let mut kernel = MockKernel::new();
        let mut b = cube(0.0, 0.0, 0.0);
        let exclude: Vec<Edge> = b.edges().unwrap().into_iter().take(4).collect();
        let excluded_ids: Vec<_> = exclude.iter().map(|e| e.shape().id).collect();
        b.fillet(&mut kernel, 0.1, &exclude).unwrap();
        let request = kernel.last_fillet().unwrap();
        assert_relative_eq!(request.radius, 0.1);
        assert!(request.edges.iter().all(|e| !excluded_ids.contains(e)));
        assert_eq!(request.edges.len(), 8);
    }

    #[test]
    fn test_fillet_changes_faces_and_volume() {
        let mut kernel = MockKernel::new();
        let b = cube(0.0, 0.0, 0.0);
        let rounded = b.filleted(&mut kernel, 0.2, &[]).unwrap();
        assert_eq!(rounded.faces().unwrap().len(), 26);
        assert_relative_eq!(rounded.volume().unwrap(), 0.907705, max_relative = 5e-3);
        assert_eq!(b.faces().unwrap().len(), 6);
        assert_eq!(kernel.last_fillet().unwrap().edges.len(), 12);
    }

    #[test]
    fn test_fillet_failure_is_fillet_error() {
        let mut kernel = MockKernel::new();
        let b = cube(0.0, 0.0, 0.0);
        let err = b.filleted(&mut kernel, -1.0, &[]).unwrap_err();
        assert!(matches!(err, BrepError::Fillet { .. }));
    }

    #[test]
    fn test_trim_keeps_lower_half() {
        let mut kernel = MockKernel::new();
        let mut b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 2.0, 2.0, 2.0)).unwrap();
        b.trim(&mut kernel, &Plane::worldxy()).unwrap();
        assert_relative_eq!(b.volume().unwrap(), 4.0, epsilon = 1e-9);
        assert!(b.centroid().unwrap().z < 0.0);
    }

    #[test]
    fn test_trim_above_shape_fails_and_keeps_shape() {
        let mut kernel = MockKernel::new();
        let mut b = cube(0.0, 0.0, 0.0);
        let plane = Plane::new(Point::new(0.0, 0.0, -1.0), Vector::zaxis());
        assert!(b.trim(&mut kernel, &plane).is_err());
        assert_relative_eq!(b.volume().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slice_misses_and_hits() {
        let b = cube(0.0, 0.0, 0.0);
        let miss = Plane::new(Point::new(0.0, 0.0, 3.0), Vector::zaxis());
        assert!(b.slice(&miss).unwrap().is_none());
        let hit = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::zaxis());
        let s = b.slice(&hit).unwrap().unwrap();
        assert!(!s.edges().unwrap().is_empty());
    }

    #[test]
    fn test_tesselation_polylines_match_edges() {
        let b = cube(0.0, 0.0, 0.0);
        let (mesh, lines) = b.to_tesselation(1e-3, 0.1).unwrap();
        assert!(mesh.faces.len() >= 12);
        assert_eq!(lines.len(), 12);
        assert!(mesh.faces.iter().all(|f| f.len() == 3));
    }

    #[test]
    fn test_overlap_of_touching_boxes() {
        let a = cube(0.0, 0.0, 0.0);
        let b = cube(1.0, 0.0, 0.0);
        let (fa, fb) = a.overlap(&b, 1e-3, 0.1, 1e-6).unwrap();
        assert!(!fa.is_empty());
        assert!(!fb.is_empty());
        let far = cube(5.0, 0.0, 0.0);
        let (fa, fb) = a.overlap(&far, 1e-3, 0.1, 1e-6).unwrap();
        assert!(fa.is_empty() && fb.is_empty());
    }

    #[test]
    fn test_contours_of_box() {
        let b = cube(0.0, 0.0, 0.0);
        let planes = [
            Plane::new(Point::new(0.0, 0.0, 0.5), Vector::zaxis()),
            Plane::new(Point::new(0.0, 0.0, 9.0), Vector::zaxis()),
        ];
        let c = b.contours(&planes).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].len(), 1);
        assert!(c[0][0].is_closed());
        assert!(c[1].is_empty());
    }

    fn unit_square(z: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(-0.5, -0.5, z),
            Point::new(0.5, -0.5, z),
            Point::new(0.5, 0.5, z),
            Point::new(-0.5, 0.5, z),
        ])
    }

    fn rail(points: &[Point]) -> Loop {
        Loop::from_polyline(&Polyline::new(points.to_vec())).unwrap()
    }

    #[test]
    fn test_meshes_and_polygons_per_face() {
        let b = cube(0.0, 0.0, 0.0);
        let meshes = b.to_meshes(1e-3, 0.1).unwrap();
        assert_eq!(meshes.len(), 6);
        assert!(meshes.iter().all(|m| m.faces.len() >= 2));
        let polygons = b.to_polygons().unwrap();
        assert_eq!(polygons.len(), 6);
        assert!(polygons.iter().all(|p| p.points.len() == 4));
        let area: f64 = polygons.iter().map(|p| 0.5 * p.area_vector().length()).sum();
        assert_relative_eq!(area, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_face_from_shuffled_curves() {
        let p = [
            Point::new(0.0, 0.0, 1.0),
            Point::new(2.0, 0.0, 1.0),
            Point::new(2.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ];
        let line = |a: usize, b: usize| NurbsCurve::from_line(&brep_types::Line::new(p[a], p[b]));
        let curves = [line(0, 1), line(3, 2), line(1, 2), line(0, 3)];
        let b = Brep::from_curves(&curves).unwrap();
        assert_eq!(b.faces().unwrap().len(), 1);
        assert!(b.faces().unwrap()[0].is_plane());
        assert_relative_eq!(b.area().unwrap(), 2.0, epsilon = 1e-9);
        assert!(b.is_valid().unwrap());

        assert!(matches!(
            Brep::from_curves(&curves[..3]),
            Err(BrepError::Construction { .. })
        ));
        let lifted = Point::new(0.0, 1.0, 2.0);
        let skew = [
            line(0, 1),
            line(1, 2),
            NurbsCurve::from_line(&brep_types::Line::new(p[2], lifted)),
            NurbsCurve::from_line(&brep_types::Line::new(lifted, p[0])),
        ];
        assert!(matches!(
            Brep::from_curves(&skew),
            Err(BrepError::Construction { .. })
        ));
    }

    #[test]
    fn test_sweep_along_straight_and_bent_paths() {
        let profile = Face::from_polygon(&unit_square(0.0)).unwrap();
        let straight = Brep::from_sweep(
            &profile,
            &rail(&[Point::origin(), Point::new(0.0, 0.0, 2.0)]),
        )
        .unwrap();
        assert!(straight.is_solid().unwrap());
        assert_eq!(straight.faces().unwrap().len(), 6);
        assert_relative_eq!(straight.volume().unwrap(), 2.0, epsilon = 1e-9);

        let bent = Brep::from_sweep(
            &profile,
            &rail(&[Point::origin(), Point::new(0.0, 0.0, 2.0), Point::new(2.0, 0.0, 2.0)]),
        )
        .unwrap();
        assert!(bent.is_solid().unwrap());
        assert_eq!(bent.faces().unwrap().len(), 10);
        assert_relative_eq!(bent.volume().unwrap(), 4.0, epsilon = 1e-9);
        assert!(bent.is_valid().unwrap());
    }

    #[test]
    fn test_edge_sweep_is_an_open_shell() {
        let profile =
            Edge::from_point_point(&Point::new(-0.5, 0.0, 0.0), &Point::new(0.5, 0.0, 0.0)).unwrap();
        let path = rail(&[Point::origin(), Point::new(0.0, 0.0, 2.0), Point::new(2.0, 0.0, 2.0)]);
        let strip = Brep::from_sweep_edge(&profile, &path).unwrap();
        assert!(!strip.is_closed().unwrap());
        assert_eq!(strip.faces().unwrap().len(), 2);
        assert_relative_eq!(strip.area().unwrap(), 4.0, epsilon = 1e-9);

        let closed = Loop::from_polygon(&unit_square(0.0)).unwrap();
        let face = Face::from_polygon(&unit_square(0.0)).unwrap();
        assert!(matches!(
            Brep::from_sweep(&face, &closed),
            Err(BrepError::Construction { .. })
        ));
        let arc = Edge::from_circle(&brep_types::Circle::new(Frame::worldxy(), 1.0)).unwrap();
        assert!(matches!(
            Brep::from_sweep_edge(&arc, &path),
            Err(BrepError::Domain { .. })
        ));
    }

    #[test]
    fn test_cull_unused_drops_what_the_root_does_not_reach() {
        let mut store = EntityStore::new();
        let root = primitives::make_box(&mut store, &Ax3::world(), 1.0, 1.0, 1.0).unwrap();
        primitives::make_plane_face(&mut store, &Ax3::world(), (2.0, 3.0), (0.0, 1.0)).unwrap();
        let mut b = Brep::from_parts(store, root);
        let edges = b.edges().unwrap().len();

        assert_eq!(b.cull_unused_faces().unwrap(), 1);
        assert_eq!(b.cull_unused_loops().unwrap(), 1);
        assert_eq!(b.cull_unused_edges().unwrap(), 4);
        assert_eq!(b.cull_unused_vertices().unwrap(), 4);
        assert_eq!(b.cull_unused_vertices().unwrap(), 0);
        assert!(b.cache.edges.get().is_none());
        assert_eq!(b.edges().unwrap().len(), edges);
        assert!(b.is_valid().unwrap());
        assert_relative_eq!(b.volume().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_manifold_convex_and_infinite() {
        let b = cube(0.0, 0.0, 0.0);
        assert!(b.is_manifold().unwrap());
        assert!(b.is_convex().unwrap());
        assert!(!b.is_infinite().unwrap());

        let ell = Polygon::new(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 1.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(1.0, 2.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ]);
        let prism = Brep::from_extrusion(&ell, &Vector::new(0.0, 0.0, 1.0)).unwrap();
        assert!(prism.is_manifold().unwrap());
        assert!(!prism.is_convex().unwrap());

        let mut store = EntityStore::new();
        let sid = store.add_surface(brep_kernel::geometry::Surface::Plane(
            brep_kernel::geometry::PlaneSurface {
                position: Ax3::world(),
            },
        ));
        let plane = store.add_face(sid, vec![], 1e-7).unwrap();
        assert!(Brep::from_parts(store, plane).is_infinite().unwrap());
    }
}
