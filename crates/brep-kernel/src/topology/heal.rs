//! Sewing faces into shells and repairing wire, face and shell layout.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info, instrument, warn};

use super::builders::set_oriented_vertex;
use super::explorer::{explore, map_shapes};
use super::shape::{Orientation, Shape, ShapeId, ShapeKind};
use super::store::EntityStore;
use crate::geometry::point::Point3d;
use crate::mesh::discretize::EdgeDiscretizer;
use crate::mesh::uv::{face_loops, Closure};
use crate::mesh::{mass, MeshParams};
use crate::types::KernelError;
use crate::Tolerance;

// ─── Sewing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SewReport {
    pub merged_vertices: usize,
    pub merged_edges: usize,
    pub shells: usize,
}

/// Merge vertices and edges of the faces of `shape` that coincide within
/// `tolerance`, and group the faces into shells of connected faces.
///
/// Shapes with fewer than two faces are returned unchanged. A solid whose
/// faces all sew into closed shells stays a solid.
#[instrument(skip(store))]
pub fn sew(store: &mut EntityStore, shape: Shape, tolerance: f64) -> Result<Shape, KernelError> {
    let faces = map_shapes(store, shape, ShapeKind::Face)?;
    if faces.len() < 2 {
        return Ok(shape);
    }
    let tolerance = tolerance.max(f64::EPSILON);
    let mut report = SewReport {
        merged_vertices: merge_vertices(store, shape, tolerance)?,
        merged_edges: merge_edges(store, shape, tolerance)?,
        shells: 0,
    };

    let mut shells = Vec::new();
    for component in connected_faces(store, &faces)? {
        let closed = is_closed_set(store, &component)?;
        shells.push(store.add_shell(component, closed)?);
    }
    report.shells = shells.len();
    if report.merged_vertices == 0 && report.merged_edges == 0 {
        warn!(faces = faces.len(), "sewing found nothing to merge");
    }
    info!(?report, "faces sewn");

    let all_closed = shells
        .iter()
        .map(|s| store.shell(s.id).map(|s| s.closed))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .all(|c| c);
    if store.kind(shape)? == ShapeKind::Solid && all_closed {
        return store.add_solid(shells);
    }
    if shells.len() == 1 {
        return Ok(shells[0]);
    }
    store.add_compound(shells)
}

fn cell(p: &Point3d, size: f64) -> (i64, i64, i64) {
    (
        (p.x / size).floor() as i64,
        (p.y / size).floor() as i64,
        (p.z / size).floor() as i64,
    )
}

/// Replace every vertex by the first vertex within `tolerance` of it.
fn merge_vertices(
    store: &mut EntityStore,
    shape: Shape,
    tolerance: f64,
) -> Result<usize, KernelError> {
    let mut grid: HashMap<(i64, i64, i64), Vec<(ShapeId, Point3d)>> = HashMap::new();
    let mut remap: HashMap<ShapeId, ShapeId> = HashMap::new();
    for v in map_shapes(store, shape, ShapeKind::Vertex)? {
        let p = store.point(v.id)?;
        let (cx, cy, cz) = cell(&p, tolerance);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        if let Some((id, _)) =
                            bucket.iter().find(|(_, q)| q.distance_to(&p) <= tolerance)
                        {
                            found = Some(*id);
                            break 'search;
                        }
                    }
                }
            }
        }
        match found {
            Some(rep) => {
                remap.insert(v.id, rep);
            }
            None => grid.entry((cx, cy, cz)).or_default().push((v.id, p)),
        }
    }
    if remap.is_empty() {
        return Ok(0);
    }
    for e in map_shapes(store, shape, ShapeKind::Edge)? {
        let edge = store.edge_mut(e.id)?;
        for slot in edge.vertices.iter_mut() {
            if let Some(rep) = remap.get(slot) {
                *slot = *rep;
            }
        }
    }
    debug!(count = remap.len(), "vertices merged");
    Ok(remap.len())
}

/// Distance from `p` to the geometry of an edge.
fn distance_to_edge(store: &EntityStore, edge: ShapeId, p: &Point3d) -> Result<f64, KernelError> {
    let e = store.edge(edge)?;
    if let Some(curve) = &e.curve {
        let t = curve.parameter_of(p, e.range);
        return Ok(curve.evaluate(t).distance_to(p));
    }
    let (t0, t1) = e.range;
    let n = 64;
    let mut best = f64::INFINITY;
    for i in 0..=n {
        let q = store.edge_point(edge, t0 + (t1 - t0) * i as f64 / n as f64)?;
        best = best.min(q.distance_to(p));
    }
    Ok(best)
}

fn edge_sample(store: &EntityStore, edge: ShapeId, s: f64) -> Result<Point3d, KernelError> {
    let (t0, t1) = store.edge(edge)?.range;
    store.edge_point(edge, t0 + (t1 - t0) * s)
}

/// Whether `b` runs along `a`, and if so in which direction.
fn coincident(
    store: &EntityStore,
    a: ShapeId,
    b: ShapeId,
    tolerance: f64,
) -> Result<Option<Orientation>, KernelError> {
    let (ea, eb) = (store.edge(a)?, store.edge(b)?);
    let slack = tolerance.max(ea.tolerance).max(eb.tolerance);
    for s in [0.25, 0.5, 0.75] {
        if distance_to_edge(store, a, &edge_sample(store, b, s)?)? > slack
            || distance_to_edge(store, b, &edge_sample(store, a, s)?)? > slack
        {
            return Ok(None);
        }
    }
    let same = if ea.is_closed() {
        let q = edge_sample(store, b, 0.25)?;
        q.distance_to(&edge_sample(store, a, 0.25)?) <= q.distance_to(&edge_sample(store, a, 0.75)?)
    } else {
        ea.vertices[0] == eb.vertices[0]
    };
    Ok(Some(if same {
        Orientation::Forward
    } else {
        Orientation::Reversed
    }))
}

/// Replace every edge by an earlier edge with the same end vertices and
/// coincident geometry.
fn merge_edges(store: &mut EntityStore, shape: Shape, tolerance: f64) -> Result<usize, KernelError> {
    let mut groups: HashMap<(ShapeId, ShapeId), Vec<ShapeId>> = HashMap::new();
    let mut remap: HashMap<ShapeId, (ShapeId, Orientation)> = HashMap::new();
    for e in map_shapes(store, shape, ShapeKind::Edge)? {
        let edge = store.edge(e.id)?;
        if edge.degenerated {
            continue;
        }
        let [v0, v1] = edge.vertices;
        let key = if v0 <= v1 { (v0, v1) } else { (v1, v0) };
        let candidates = groups.entry(key).or_default();
        let mut found = None;
        for rep in candidates.iter() {
            if let Some(o) = coincident(store, *rep, e.id, tolerance)? {
                found = Some((*rep, o));
                break;
            }
        }
        match found {
            Some(target) => {
                remap.insert(e.id, target);
            }
            None => candidates.push(e.id),
        }
    }
    if remap.is_empty() {
        return Ok(0);
    }

    for (&from, &(to, orientation)) in &remap {
        let moved = store.edge(from)?.clone();
        let target = store.edge(to)?.clone();
        let same_range = (moved.range.0 - target.range.0).abs() < 1e-9
            && (moved.range.1 - target.range.1).abs() < 1e-9;
        // Parameter curves carry over only when both edges share one
        // parameterization; other faces fall back to inversion.
        if orientation == Orientation::Forward && same_range {
            let edge = store.edge_mut(to)?;
            for pc in moved.pcurves {
                if edge.pcurve(pc.surface).is_none() {
                    edge.pcurves.push(pc);
                }
            }
            edge.tolerance = edge.tolerance.max(moved.tolerance);
        }
    }

    for w in map_shapes(store, shape, ShapeKind::Wire)? {
        let wire = store.wire_mut(w.id)?;
        for e in wire.edges.iter_mut() {
            if let Some(&(to, o)) = remap.get(&e.id) {
                *e = Shape {
                    id: to,
                    orientation: e.orientation.compose(o),
                };
            }
        }
    }
    debug!(count = remap.len(), "edges merged");
    Ok(remap.len())
}

/// Faces grouped by connectivity through shared edges, in input order.
fn connected_faces(store: &EntityStore, faces: &[Shape]) -> Result<Vec<Vec<Shape>>, KernelError> {
    let mut by_edge: HashMap<ShapeId, Vec<usize>> = HashMap::new();
    for (i, f) in faces.iter().enumerate() {
        for e in map_shapes(store, *f, ShapeKind::Edge)? {
            if !store.edge(e.id)?.degenerated {
                by_edge.entry(e.id).or_default().push(i);
            }
        }
    }
    let mut component = vec![usize::MAX; faces.len()];
    let mut count = 0;
    for start in 0..faces.len() {
        if component[start] != usize::MAX {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        component[start] = count;
        while let Some(i) = queue.pop_front() {
            for e in map_shapes(store, faces[i], ShapeKind::Edge)? {
                for &j in by_edge.get(&e.id).map(Vec::as_slice).unwrap_or(&[]) {
                    if component[j] == usize::MAX {
                        component[j] = count;
                        queue.push_back(j);
                    }
                }
            }
        }
        count += 1;
    }
    let mut out = vec![Vec::new(); count];
    for (i, f) in faces.iter().enumerate() {
        out[component[i]].push(*f);
    }
    Ok(out)
}

/// Whether every non-degenerated edge of `faces` is used exactly twice.
pub fn is_closed_set(store: &EntityStore, faces: &[Shape]) -> Result<bool, KernelError> {
    let mut uses: HashMap<ShapeId, usize> = HashMap::new();
    for f in faces {
        for e in explore(store, *f, ShapeKind::Edge)? {
            if !store.edge(e.id)?.degenerated {
                *uses.entry(e.id).or_default() += 1;
            }
        }
    }
    Ok(!uses.is_empty() && uses.values().all(|&n| n == 2))
}

// ─── Orientation ─────────────────────────────────────────────────────────────

/// Per-face flips making neighbouring faces traverse their shared edges in
/// opposite directions, and whether some pair could not be reconciled.
pub fn consistent_orientation(
    store: &EntityStore,
    faces: &[Shape],
) -> Result<(Vec<bool>, bool), KernelError> {
    // Occurrences of each edge, skipping seams used twice by one face.
    let mut uses: HashMap<ShapeId, Vec<(usize, Orientation)>> = HashMap::new();
    for (i, f) in faces.iter().enumerate() {
        let edges = explore(store, *f, ShapeKind::Edge)?;
        for e in &edges {
            if store.edge(e.id)?.degenerated || edges.iter().filter(|o| o.is_same(e)).count() > 1 {
                continue;
            }
            uses.entry(e.id).or_default().push((i, e.orientation));
        }
    }
    let mut adjacency: Vec<Vec<(usize, Orientation, Orientation)>> = vec![Vec::new(); faces.len()];
    for list in uses.values() {
        for (a, &(i, oi)) in list.iter().enumerate() {
            for &(j, oj) in &list[a + 1..] {
                adjacency[i].push((j, oi, oj));
                adjacency[j].push((i, oj, oi));
            }
        }
    }

    let mut flip: Vec<Option<bool>> = vec![None; faces.len()];
    let mut conflict = false;
    for start in 0..faces.len() {
        if flip[start].is_some() {
            continue;
        }
        flip[start] = Some(false);
        let mut queue = VecDeque::from([start]);
        while let Some(i) = queue.pop_front() {
            let fi = flip[i].unwrap_or(false);
            for &(j, oi, oj) in &adjacency[i] {
                let oi = if fi { oi.reversed() } else { oi };
                let needed = oi == oj;
                match flip[j] {
                    None => {
                        flip[j] = Some(needed);
                        queue.push_back(j);
                    }
                    Some(f) if f != needed => conflict = true,
                    Some(_) => {}
                }
            }
        }
    }
    Ok((flip.into_iter().map(|f| f.unwrap_or(false)).collect(), conflict))
}

/// Reorder and reorient the wires of a face: the loop enclosing the largest
/// parameter area comes first and runs counter-clockwise, holes run
/// clockwise. Returns whether anything changed.
pub fn fix_face(store: &mut EntityStore, face: ShapeId) -> Result<bool, KernelError> {
    let mut disc = EdgeDiscretizer::new(MeshParams::default());
    let loops = face_loops(store, face, &mut disc)?;
    if loops.is_empty() {
        return Ok(false);
    }
    let closure = Closure::of(store.face_surface(face)?);
    // Loops winding around a closed direction have no meaningful area.
    let winds = |nodes: &[crate::mesh::uv::UvNode]| -> bool {
        let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
            return true;
        };
        let du = (last.uv.x - first.uv.x).abs();
        let dv = (last.uv.y - first.uv.y).abs();
        closure.u.map_or(false, |(_, p)| du > 0.5 * p)
            || closure.v.map_or(false, |(_, p)| dv > 0.5 * p)
    };
    if loops.iter().any(|l| winds(&l.nodes)) {
        return Ok(false);
    }

    let areas: Vec<f64> = loops.iter().map(|l| l.signed_area()).collect();
    let outer = (0..areas.len())
        .max_by(|&a, &b| areas[a].abs().total_cmp(&areas[b].abs()))
        .unwrap_or(0);
    let mut wires = Vec::with_capacity(loops.len());
    let mut changed = outer != 0;
    for (i, l) in loops.iter().enumerate() {
        let wants_ccw = i == outer;
        let w = if (areas[i] > 0.0) != wants_ccw && areas[i] != 0.0 {
            changed = true;
            l.wire.reversed()
        } else {
            l.wire
        };
        if i == outer {
            wires.insert(0, w);
        } else {
            wires.push(w);
        }
    }
    if changed {
        debug!(?face, "face wires reoriented");
        store.face_mut(face)?.wires = wires;
    }
    Ok(changed)
}

/// Repair a shell: fix its faces, orient them consistently, recompute the
/// closed flag and, when closed, turn its normals outward.
#[instrument(skip(store))]
pub fn fix_shell(store: &mut EntityStore, shell: Shape) -> Result<Shape, KernelError> {
    if store.kind(shell)? != ShapeKind::Shell {
        return Err(KernelError::shape("only shells can be fixed"));
    }
    let faces = store.shell(shell.id)?.faces.clone();
    for f in &faces {
        fix_face(store, f.id)?;
    }
    let (flips, conflict) = consistent_orientation(store, &faces)?;
    if conflict {
        warn!("shell is not orientable");
    }
    let flipped = flips.iter().filter(|f| **f).count();
    let mut faces: Vec<Shape> = faces
        .iter()
        .zip(&flips)
        .map(|(f, flip)| if *flip { f.reversed() } else { *f })
        .collect();
    let closed = is_closed_set(store, &faces)?;
    {
        let s = store.shell_mut(shell.id)?;
        s.faces = faces.clone();
        s.closed = closed;
    }
    if closed {
        let volume = mass::mass_properties(store, shell, &MeshParams::default())?.volume;
        if volume < 0.0 {
            faces = faces.iter().map(Shape::reversed).collect();
            store.shell_mut(shell.id)?.faces = faces;
            warn!(volume, "shell turned inside out");
        }
    }
    if flipped > 0 {
        warn!(flipped, "faces reoriented");
    }
    info!(closed, "shell fixed");
    Ok(shell)
}

/// Solid bounded by a closed shell. Other shapes are returned unchanged.
pub fn make_solid(store: &mut EntityStore, shape: Shape) -> Result<Shape, KernelError> {
    if store.kind(shape)? == ShapeKind::Shell && store.shell(shape.id)?.closed {
        return store.add_solid(vec![shape]);
    }
    Ok(shape)
}

// ─── Wires ───────────────────────────────────────────────────────────────────

/// Reorder and reorient the edges of a wire into a chain, each edge
/// starting nearest to where the previous one ends, and merge joint
/// vertices that lie within the sewing tolerance. Returns whether anything
/// changed.
pub fn fix_wire(store: &mut EntityStore, wire: ShapeId) -> Result<bool, KernelError> {
    let original = store.wire(wire)?.edges.clone();
    let Some((&first, rest)) = original.split_first() else {
        return Ok(false);
    };
    let mut remaining = rest.to_vec();
    let mut ordered = vec![first];
    while !remaining.is_empty() {
        let end = store.point(store.last_vertex(ordered[ordered.len() - 1])?.id)?;
        let mut best = (f64::INFINITY, 0, false);
        for (i, e) in remaining.iter().enumerate() {
            let head = end.distance_to(&store.point(store.first_vertex(*e)?.id)?);
            let tail = end.distance_to(&store.point(store.last_vertex(*e)?.id)?);
            if head < best.0 {
                best = (head, i, false);
            }
            if tail < best.0 {
                best = (tail, i, true);
            }
        }
        let e = remaining.remove(best.1);
        ordered.push(if best.2 { e.reversed() } else { e });
    }

    let mut changed = ordered != original;
    let sewing = Tolerance::default().sewing;
    let n = ordered.len();
    for i in 0..n {
        let next = ordered[(i + 1) % n];
        let end = store.last_vertex(ordered[i])?;
        let start = store.first_vertex(next)?;
        if end.is_same(&start) {
            continue;
        }
        let gap = store.point(end.id)?.distance_to(&store.point(start.id)?);
        if gap <= sewing.max(store.vertex(end.id)?.tolerance) {
            set_oriented_vertex(store, next, true, end.id)?;
            changed = true;
        }
    }
    if changed {
        debug!(?wire, edges = n, "wire reordered");
        store.wire_mut(wire)?.edges = ordered;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frame::Ax3;
    use crate::geometry::vector::Vec3;
    use crate::primitives;
    use approx::assert_relative_eq;

    /// Six independent square faces forming a unit cube, with some faces
    /// deliberately pointing inward.
    fn loose_cube(store: &mut EntityStore) -> Vec<Shape> {
        let p = |x: f64, y: f64, z: f64| Point3d::new(x, y, z);
        let quads = [
            [p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)],
            [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
            [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
            // inward
            [p(0., 1., 0.), p(1., 1., 0.), p(1., 1., 1.), p(0., 1., 1.)],
            [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
            [p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)],
        ];
        quads
            .iter()
            .map(|q| primitives::make_polygon_face(store, q).unwrap())
            .collect()
    }

    #[test]
    fn test_sew_loose_faces_into_closed_shell() {
        let mut store = EntityStore::new();
        let faces = loose_cube(&mut store);
        let compound = store.add_compound(faces).unwrap();
        let sewn = sew(&mut store, compound, 1e-6).unwrap();
        assert_eq!(store.kind(sewn).unwrap(), ShapeKind::Shell);
        assert!(store.shell(sewn.id).unwrap().closed);
        assert_eq!(map_shapes(&store, sewn, ShapeKind::Edge).unwrap().len(), 12);
        assert_eq!(map_shapes(&store, sewn, ShapeKind::Vertex).unwrap().len(), 8);
    }

    #[test]
    fn test_fix_shell_turns_faces_outward() {
        let mut store = EntityStore::new();
        let faces = loose_cube(&mut store);
        let compound = store.add_compound(faces).unwrap();
        let shell = sew(&mut store, compound, 1e-6).unwrap();
        let (_, conflict) =
            consistent_orientation(&store, &store.shell(shell.id).unwrap().faces).unwrap();
        assert!(!conflict);
        let fixed = fix_shell(&mut store, shell).unwrap();
        let m = mass::mass_properties(&store, fixed, &MeshParams::default()).unwrap();
        assert_relative_eq!(m.volume, 1.0, epsilon = 1e-9);
        let solid = make_solid(&mut store, fixed).unwrap();
        assert_eq!(store.kind(solid).unwrap(), ShapeKind::Solid);
    }

    #[test]
    fn test_separate_faces_become_compound_of_shells() {
        let mut store = EntityStore::new();
        let a = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0)).unwrap();
        let frame = Ax3::from_normal(Point3d::new(5.0, 0.0, 0.0), Vec3::Z);
        let b = primitives::make_plane_face(&mut store, &frame, (0.0, 1.0), (0.0, 1.0)).unwrap();
        let c = store.add_compound(vec![a, b]).unwrap();
        let sewn = sew(&mut store, c, 1e-6).unwrap();
        assert_eq!(store.kind(sewn).unwrap(), ShapeKind::Compound);
        assert_eq!(map_shapes(&store, sewn, ShapeKind::Shell).unwrap().len(), 2);
    }

    #[test]
    fn test_single_face_is_not_sewn() {
        let mut store = EntityStore::new();
        let a = primitives::make_plane_face(&mut store, &Ax3::world(), (0.0, 1.0), (0.0, 1.0)).unwrap();
        assert_eq!(sew(&mut store, a, 1e-6).unwrap(), a);
    }

    #[test]
    fn test_sewn_solid_stays_solid() {
        let mut store = EntityStore::new();
        let b = primitives::make_box(&mut store, &Ax3::world(), 1.0, 1.0, 1.0).unwrap();
        let sewn = sew(&mut store, b, 1e-6).unwrap();
        assert_eq!(store.kind(sewn).unwrap(), ShapeKind::Solid);
    }

    #[test]
    fn test_fix_face_moves_outer_wire_first() {
        let mut store = EntityStore::new();
        let outer = primitives::polygon_wire(
            &mut store,
            &[
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(4.0, 0.0, 0.0),
                Point3d::new(4.0, 4.0, 0.0),
                Point3d::new(0.0, 4.0, 0.0),
            ],
        )
        .unwrap();
        // Counter-clockwise hole: must be reversed.
        let hole = primitives::polygon_wire(
            &mut store,
            &[
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(2.0, 1.0, 0.0),
                Point3d::new(2.0, 2.0, 0.0),
                Point3d::new(1.0, 2.0, 0.0),
            ],
        )
        .unwrap();
        let sid = store.add_surface(crate::geometry::surfaces::Surface::Plane(
            crate::geometry::surfaces::PlaneSurface {
                position: Ax3::world(),
            },
        ));
        let face = store.add_face(sid, vec![hole, outer], 1e-7).unwrap();
        assert!(fix_face(&mut store, face.id).unwrap());
        let wires = &store.face(face.id).unwrap().wires;
        assert!(wires[0].is_same(&outer));
        assert_eq!(wires[1].orientation, Orientation::Reversed);
        assert!(!fix_face(&mut store, face.id).unwrap());
    }

    #[test]
    fn test_fix_wire_chains_shuffled_edges() {
        let mut store = EntityStore::new();
        let p = [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        // Every side gets its own vertices, slightly off at one joint.
        let mut side = |a: Point3d, b: Point3d| {
            let va = store.add_vertex(a, 1e-7);
            let vb = store.add_vertex(b, 1e-7);
            crate::topology::builders::line_edge(&mut store, va, vb).unwrap()
        };
        let e0 = side(p[0], p[1]);
        let e1 = side(p[1], p[2]);
        let e2 = side(p[3], Point3d::new(1.0, 1.0 + 1e-8, 0.0));
        let e3 = side(p[3], p[0]);
        let wire = store.add_wire(vec![e0, e2, e3, e1]).unwrap();
        assert!(!crate::topology::builders::is_wire_closed(&store, wire).unwrap());

        assert!(fix_wire(&mut store, wire.id).unwrap());
        let edges = store.wire(wire.id).unwrap().edges.clone();
        assert_eq!(edges, vec![e0, e1, e2.reversed(), e3]);
        assert!(crate::topology::builders::is_wire_closed(&store, wire).unwrap());
        assert!(crate::topology::check::check_wire(&store, wire).unwrap().is_empty());
        assert!(!fix_wire(&mut store, wire.id).unwrap());
    }
}
