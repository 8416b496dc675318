use std::collections::HashMap;
use std::rc::Rc;

use super::MeshParams;
use crate::geometry::curves::Curve;
use crate::geometry::point::Point3d;
use crate::topology::{EntityStore, ShapeId};
use crate::types::KernelError;

/// Polyline of an edge in curve direction, with the curve parameter of
/// every node. End nodes sit exactly on the edge's vertices.
#[derive(Debug, Clone)]
pub struct Discretization {
    pub params: Vec<f64>,
    pub points: Vec<Point3d>,
}

/// Discretizes each edge once so that every face sharing it sees the same
/// nodes.
#[derive(Debug)]
pub struct EdgeDiscretizer {
    params: MeshParams,
    cache: HashMap<ShapeId, Rc<Discretization>>,
}

impl EdgeDiscretizer {
    pub fn new(params: MeshParams) -> Self {
        Self {
            params,
            cache: HashMap::new(),
        }
    }

    pub fn params(&self) -> &MeshParams {
        &self.params
    }

    pub fn get(&self, edge: ShapeId) -> Option<Rc<Discretization>> {
        self.cache.get(&edge).cloned()
    }

    pub fn discretize(
        &mut self,
        store: &EntityStore,
        edge: ShapeId,
    ) -> Result<Rc<Discretization>, KernelError> {
        if let Some(d) = self.cache.get(&edge) {
            return Ok(d.clone());
        }
        let d = Rc::new(discretize_edge(store, edge, &self.params)?);
        self.cache.insert(edge, d.clone());
        Ok(d)
    }
}

fn discretize_edge(
    store: &EntityStore,
    edge: ShapeId,
    params: &MeshParams,
) -> Result<Discretization, KernelError> {
    let e = store.edge(edge)?;
    let (t0, t1) = e.range;
    let start = store.point(e.vertices[0])?;
    let end = store.point(e.vertices[1])?;

    let ts = if e.degenerated {
        vec![t0, t1]
    } else {
        match &e.curve {
            Some(Curve::Line(_)) => vec![t0, t1],
            Some(Curve::Circle(c)) => uniform(t0, t1, arc_segments(c.radius, t1 - t0, params, e.is_closed())),
            Some(Curve::Ellipse(el)) => {
                uniform(t0, t1, arc_segments(el.major_radius, t1 - t0, params, e.is_closed()))
            }
            Some(curve) => adaptive(|t| curve.evaluate(t), t0, t1, params),
            None => {
                let mut failure = None;
                let ts = adaptive(
                    |t| match store.edge_point(edge, t) {
                        Ok(p) => p,
                        Err(err) => {
                            failure.get_or_insert(err);
                            Point3d::ORIGIN
                        }
                    },
                    t0,
                    t1,
                    params,
                );
                if let Some(err) = failure {
                    return Err(err);
                }
                ts
            }
        }
    };

    let last = ts.len() - 1;
    let points = ts
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            if i == 0 {
                Ok(start)
            } else if i == last {
                Ok(end)
            } else {
                store.edge_point(edge, t)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Discretization { params: ts, points })
}

/// Number of segments keeping a circular arc of `radius` within both
/// deflections.
pub(crate) fn arc_segments(radius: f64, span: f64, params: &MeshParams, closed: bool) -> usize {
    let step = angular_step(radius, params);
    let n = (span.abs() / step).ceil() as usize;
    n.max(if closed { 4 } else { 1 })
}

/// Largest angle step of a circle of `radius` within both deflections.
pub(crate) fn angular_step(radius: f64, params: &MeshParams) -> f64 {
    let mut step = params.angular_deflection;
    if radius > params.linear_deflection {
        step = step.min(2.0 * (1.0 - params.linear_deflection / radius).acos());
    }
    step.max(1e-3)
}

fn uniform(t0: f64, t1: f64, n: usize) -> Vec<f64> {
    (0..=n).map(|i| t0 + (t1 - t0) * i as f64 / n as f64).collect()
}

/// Recursive bisection until each chord is within the linear deflection of
/// the curve midpoint and consecutive chords turn less than the angular
/// deflection.
pub(crate) fn adaptive(f: impl FnMut(f64) -> Point3d, t0: f64, t1: f64, params: &MeshParams) -> Vec<f64> {
    let mut f = f;
    let seed = 8;
    let mut out = vec![t0];
    for i in 0..seed {
        let a = t0 + (t1 - t0) * i as f64 / seed as f64;
        let b = t0 + (t1 - t0) * (i + 1) as f64 / seed as f64;
        let (pa, pb) = (f(a), f(b));
        bisect(&mut f, a, b, pa, pb, params, 0, &mut out);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn bisect(
    f: &mut impl FnMut(f64) -> Point3d,
    a: f64,
    b: f64,
    pa: Point3d,
    pb: Point3d,
    params: &MeshParams,
    depth: usize,
    out: &mut Vec<f64>,
) {
    let m = 0.5 * (a + b);
    let pm = f(m);
    let chord_mid = pa.midpoint(&pb);
    let sag = pm.distance_to(&chord_mid);
    let turn = (pm - pa).angle_to(&(pb - pm));
    if depth < 12 && (sag > params.linear_deflection || turn > params.angular_deflection) {
        bisect(f, a, m, pa, pm, params, depth + 1, out);
        bisect(f, m, b, pm, pb, params, depth + 1, out);
    } else {
        out.push(b);
    }
}
