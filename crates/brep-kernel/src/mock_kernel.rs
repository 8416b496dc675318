//! MockKernel: deterministic kernel for solids bounded by axis-aligned
//! planes.
//!
//! Both operands are cut by a grid through every distinct vertex
//! coordinate. Each cell is classified against each operand by ray casting
//! its centre, and the result is rebuilt from the boundary quads between
//! selected and unselected cells. For this class of solids the result is
//! exact, which makes volumes and face counts predictable in tests.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::fillet;
use crate::geometry::{Ax3, Curve, PlaneSurface, Point3d, Surface, Vec3};
use crate::mesh::{triangulate, MeshParams};
use crate::topology::{builders, explorer, EntityStore, Shape, ShapeId, ShapeKind};
use crate::traits::Kernel;
use crate::types::{KernelError, MergedMesh, ShapeRef};
use crate::Tolerance;

type Cell = [usize; 3];

/// One recorded call to [`Kernel::fillet_edges`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilletRequest {
    /// Edge ids in the store of the filleted solid.
    pub edges: Vec<ShapeId>,
    pub radius: f64,
}

/// Deterministic test double for the geometry kernel.
#[derive(Debug, Default)]
pub struct MockKernel {
    /// Successful fillet calls in the order they were made. The rounding
    /// itself is the native polyhedral fillet.
    pub fillets: Vec<FilletRequest>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fillet(&self) -> Option<&FilletRequest> {
        self.fillets.last()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Op {
    Union,
    Subtract,
    Intersect,
}

impl Op {
    fn keep(self, in_a: bool, in_b: bool) -> bool {
        match self {
            Op::Union => in_a || in_b,
            Op::Subtract => in_a && !in_b,
            Op::Intersect => in_a && in_b,
        }
    }
}

// ─── Operand classification ──────────────────────────────────────────────────

fn is_axis(v: &Vec3, tol: f64) -> bool {
    let a = [v.x.abs(), v.y.abs(), v.z.abs()];
    a.iter().any(|c| (c - 1.0).abs() <= tol)
}

/// Whether every face of `shape` lies on an axis-aligned plane and every
/// edge is a straight line.
fn is_rectilinear(store: &EntityStore, shape: Shape) -> Result<bool, KernelError> {
    let angular = 1e-9;
    for f in explorer::map_shapes(store, shape, ShapeKind::Face)? {
        match store.face_surface(f.id)? {
            Surface::Plane(p) if is_axis(&p.position.z_dir, angular) => {}
            _ => return Ok(false),
        }
    }
    for e in explorer::map_shapes(store, shape, ShapeKind::Edge)? {
        match &store.edge(e.id)?.curve {
            Some(Curve::Line(l)) if is_axis(&l.direction, angular) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Closed triangulation of an operand, used for point classification.
struct Classifier {
    mesh: MergedMesh,
}

impl Classifier {
    fn new(operand: ShapeRef<'_>) -> Result<Self, KernelError> {
        if !is_rectilinear(operand.store, operand.shape)? {
            return Err(KernelError::NotSupported {
                operation: "boolean on non axis-aligned solids".to_string(),
            });
        }
        let mesh = triangulate(operand.store, operand.shape, MeshParams::default())?;
        if mesh.triangles.is_empty() {
            return Err(KernelError::shape("boolean operand has no faces"));
        }
        Ok(Self { mesh })
    }

    /// Odd number of crossings along a ray in a direction no grid plane or
    /// face edge can be parallel to.
    fn contains(&self, p: &Point3d) -> bool {
        let dir = Vec3::new(1.0, 0.754_877_666_246_692_7, 0.569_840_290_998_053_2);
        let hits = self
            .mesh
            .triangles
            .iter()
            .filter(|t| {
                let a = self.mesh.positions[t[0] as usize];
                let b = self.mesh.positions[t[1] as usize];
                let c = self.mesh.positions[t[2] as usize];
                ray_hits_triangle(p, &dir, &a, &b, &c)
            })
            .count();
        hits % 2 == 1
    }
}

/// Möller–Trumbore intersection for t > 0.
fn ray_hits_triangle(o: &Point3d, d: &Vec3, a: &Point3d, b: &Point3d, c: &Point3d) -> bool {
    let e1 = *b - *a;
    let e2 = *c - *a;
    let p = d.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < 1e-14 {
        return false;
    }
    let inv = 1.0 / det;
    let s = *o - *a;
    let u = s.dot(&p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(&e1);
    let v = d.dot(&q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    e2.dot(&q) * inv > 0.0
}

// ─── Grid ────────────────────────────────────────────────────────────────────

/// Distinct coordinates along each axis.
struct Grid {
    axes: [Vec<f64>; 3],
}

impl Grid {
    fn new(operands: &[ShapeRef<'_>], tolerance: f64) -> Result<Self, KernelError> {
        let mut axes: [Vec<f64>; 3] = Default::default();
        for op in operands {
            for v in explorer::map_shapes(op.store, op.shape, ShapeKind::Vertex)? {
                let p = op.store.point(v.id)?;
                axes[0].push(p.x);
                axes[1].push(p.y);
                axes[2].push(p.z);
            }
        }
        for axis in &mut axes {
            axis.sort_by(f64::total_cmp);
            axis.dedup_by(|b, a| (*b - *a).abs() <= tolerance);
        }
        Ok(Self { axes })
    }

    fn dims(&self) -> [usize; 3] {
        [
            self.axes[0].len().saturating_sub(1),
            self.axes[1].len().saturating_sub(1),
            self.axes[2].len().saturating_sub(1),
        ]
    }

    fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let [nx, ny, nz] = self.dims();
        (0..nx).flat_map(move |i| (0..ny).flat_map(move |j| (0..nz).map(move |k| [i, j, k])))
    }

    fn center(&self, c: Cell) -> Point3d {
        let mid = |a: usize| (self.axes[a][c[a]] + self.axes[a][c[a] + 1]) / 2.0;
        Point3d::new(mid(0), mid(1), mid(2))
    }

    fn node(&self, n: Cell) -> Point3d {
        Point3d::new(self.axes[0][n[0]], self.axes[1][n[1]], self.axes[2][n[2]])
    }

    fn neighbour(&self, c: Cell, axis: usize, up: bool) -> Option<Cell> {
        let mut n = c;
        if up {
            n[axis] += 1;
            (n[axis] < self.dims()[axis]).then_some(n)
        } else {
            n[axis] = c[axis].checked_sub(1)?;
            Some(n)
        }
    }
}

/// Cells grouped into face-connected components.
fn components(grid: &Grid, cells: &HashSet<Cell>) -> Vec<HashSet<Cell>> {
    let mut seen: HashSet<Cell> = HashSet::new();
    let mut ordered: Vec<Cell> = cells.iter().copied().collect();
    ordered.sort();
    let mut out = Vec::new();
    for start in ordered {
        if !seen.insert(start) {
            continue;
        }
        let mut part = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(c) = queue.pop_front() {
            for axis in 0..3 {
                for up in [false, true] {
                    if let Some(n) = grid.neighbour(c, axis, up) {
                        if cells.contains(&n) && seen.insert(n) {
                            part.insert(n);
                            queue.push_back(n);
                        }
                    }
                }
            }
        }
        out.push(part);
    }
    out
}

// ─── Rebuilding ──────────────────────────────────────────────────────────────

struct Rebuild<'g> {
    grid: &'g Grid,
    store: EntityStore,
    vertices: HashMap<Cell, Shape>,
    edges: HashMap<(Cell, Cell), Shape>,
}

impl<'g> Rebuild<'g> {
    fn new(grid: &'g Grid) -> Self {
        Self {
            grid,
            store: EntityStore::new(),
            vertices: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    fn vertex(&mut self, n: Cell) -> Shape {
        if let Some(v) = self.vertices.get(&n) {
            return *v;
        }
        let v = self
            .store
            .add_vertex(self.grid.node(n), Tolerance::default().confusion);
        self.vertices.insert(n, v);
        v
    }

    fn edge(&mut self, a: Cell, b: Cell) -> Result<Shape, KernelError> {
        if let Some(e) = self.edges.get(&(b, a)) {
            return Ok(e.reversed());
        }
        if let Some(e) = self.edges.get(&(a, b)) {
            return Ok(*e);
        }
        let (va, vb) = (self.vertex(a), self.vertex(b));
        let e = builders::line_edge(&mut self.store, va, vb)?;
        self.edges.insert((a, b), e);
        Ok(e)
    }

    /// Boundary quad of `cell` on its `axis` side, counter-clockwise seen
    /// from outside.
    fn quad(&mut self, cell: Cell, axis: usize, up: bool) -> Result<Shape, KernelError> {
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        let mut base = cell;
        if up {
            base[axis] += 1;
        }
        let corner = |db: usize, dc: usize| {
            let mut n = base;
            n[b] += db;
            n[c] += dc;
            n
        };
        let mut ring = [corner(0, 0), corner(1, 0), corner(1, 1), corner(0, 1)];
        if !up {
            ring.reverse();
        }
        let mut wire_edges = Vec::with_capacity(4);
        for k in 0..4 {
            wire_edges.push(self.edge(ring[k], ring[(k + 1) % 4])?);
        }
        let p0 = self.grid.node(ring[0]);
        let p1 = self.grid.node(ring[1]);
        let mut normal = Vec3::ZERO;
        match axis {
            0 => normal.x = 1.0,
            1 => normal.y = 1.0,
            _ => normal.z = 1.0,
        }
        if !up {
            normal = -normal;
        }
        let plane = Surface::Plane(PlaneSurface {
            position: Ax3::new(p0, normal, p1 - p0),
        });
        let wire = self.store.add_wire(wire_edges)?;
        builders::make_face(&mut self.store, plane, vec![wire])
    }

    fn solid(&mut self, cells: &HashSet<Cell>) -> Result<Shape, KernelError> {
        let mut ordered: Vec<Cell> = cells.iter().copied().collect();
        ordered.sort();
        let mut faces = Vec::new();
        for cell in ordered {
            for axis in 0..3 {
                for up in [false, true] {
                    let outside = match self.grid.neighbour(cell, axis, up) {
                        Some(n) => !cells.contains(&n),
                        None => true,
                    };
                    if outside {
                        faces.push(self.quad(cell, axis, up)?);
                    }
                }
            }
        }
        let shell = self.store.add_shell(faces, true)?;
        self.store.add_solid(vec![shell])
    }

    /// A solid per component, or a compound of them.
    fn finish(mut self, parts: &[HashSet<Cell>]) -> Result<(EntityStore, Shape), KernelError> {
        let mut solids = Vec::with_capacity(parts.len());
        for part in parts {
            solids.push(self.solid(part)?);
        }
        let root = match solids.as_slice() {
            [one] => *one,
            _ => self.store.add_compound(solids)?,
        };
        Ok((self.store, root))
    }
}

fn classify(
    a: ShapeRef<'_>,
    b: ShapeRef<'_>,
    tolerance: f64,
) -> Result<(Grid, Vec<(Cell, bool, bool)>), KernelError> {
    let ca = Classifier::new(a)?;
    let cb = Classifier::new(b)?;
    let grid = Grid::new(&[a, b], tolerance.max(Tolerance::default().confusion))?;
    let cells = grid
        .cells()
        .map(|c| {
            let p = grid.center(c);
            (c, ca.contains(&p), cb.contains(&p))
        })
        .collect();
    Ok((grid, cells))
}

fn boolean(
    op: Op,
    a: ShapeRef<'_>,
    b: ShapeRef<'_>,
    tolerance: f64,
) -> Result<(EntityStore, Shape), KernelError> {
    let (grid, cells) = classify(a, b, tolerance)?;
    let kept: HashSet<Cell> = cells
        .into_iter()
        .filter(|(_, in_a, in_b)| op.keep(*in_a, *in_b))
        .map(|(c, _, _)| c)
        .collect();
    if kept.is_empty() {
        return Err(KernelError::BooleanFailed {
            reason: "result is empty".to_string(),
        });
    }
    let parts = components(&grid, &kept);
    debug!(cells = kept.len(), solids = parts.len(), "grid boolean computed");
    Rebuild::new(&grid).finish(&parts)
}

impl Kernel for MockKernel {
    fn boolean_union(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        boolean(Op::Union, a, b, tolerance)
    }

    fn boolean_subtract(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        boolean(Op::Subtract, a, b, tolerance)
    }

    fn boolean_intersect(
        &mut self,
        a: ShapeRef<'_>,
        b: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        boolean(Op::Intersect, a, b, tolerance)
    }

    fn fillet_edges(
        &mut self,
        solid: ShapeRef<'_>,
        edges: &[ShapeId],
        radius: f64,
    ) -> Result<(EntityStore, Shape), KernelError> {
        let result = fillet::fillet_edges(solid, edges, radius)?;
        self.fillets.push(FilletRequest {
            edges: edges.to_vec(),
            radius,
        });
        Ok(result)
    }

    fn split(
        &mut self,
        solid: ShapeRef<'_>,
        tool: ShapeRef<'_>,
        tolerance: f64,
    ) -> Result<Vec<(EntityStore, Shape)>, KernelError> {
        let (grid, cells) = classify(solid, tool, tolerance)?;
        let mut out = Vec::new();
        for inside_tool in [true, false] {
            let side: HashSet<Cell> = cells
                .iter()
                .filter(|(_, in_a, in_b)| *in_a && *in_b == inside_tool)
                .map(|(c, _, _)| *c)
                .collect();
            for part in components(&grid, &side) {
                out.push(Rebuild::new(&grid).finish(std::slice::from_ref(&part))?);
            }
        }
        if out.is_empty() {
            return Err(KernelError::SplitFailed {
                reason: "solid has no volume".to_string(),
            });
        }
        debug!(pieces = out.len(), "grid split computed");
        Ok(out)
    }
}
