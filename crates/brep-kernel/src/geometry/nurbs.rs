use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::point::Point3d;
use super::transform::Transform;
use super::vector::Vec3;
use crate::types::KernelError;

/// Find the knot span index for parameter `t` using binary search.
fn find_span(knots: &[f64], degree: usize, n_ctrl: usize, t: f64) -> usize {
    let n = n_ctrl - 1;
    let p = degree;
    if t >= knots[n + 1] {
        // Last non-empty span.
        let mut span = n;
        while span > p && knots[span] >= knots[n + 1] {
            span -= 1;
        }
        return span;
    }
    if t <= knots[p] {
        let mut span = p;
        while span < n && knots[span + 1] <= knots[p] {
            span += 1;
        }
        return span;
    }
    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-zero B-spline basis functions at `t` on `span`.
fn basis_functions(knots: &[f64], span: usize, t: f64, degree: usize) -> Vec<f64> {
    let p = degree;
    let mut n_vals = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    n_vals[0] = 1.0;
    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom.abs() < 1e-300 {
                0.0
            } else {
                n_vals[r] / denom
            };
            n_vals[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n_vals[j] = saved;
    }
    n_vals
}

/// Collapse a flat knot sequence into distinct knots and multiplicities.
///
/// Values are grouped by exact equality so that expanding the result
/// reproduces the input bit for bit.
pub fn knots_and_multiplicities(flat: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut knots: Vec<f64> = Vec::new();
    let mut mults: Vec<usize> = Vec::new();
    for &k in flat {
        match knots.last() {
            Some(&last) if last == k => {
                if let Some(m) = mults.last_mut() {
                    *m += 1;
                }
            }
            _ => {
                knots.push(k);
                mults.push(1);
            }
        }
    }
    (knots, mults)
}

/// Expand distinct knots and multiplicities into a flat knot sequence.
pub fn expand_knots(knots: &[f64], mults: &[usize]) -> Vec<f64> {
    knots
        .iter()
        .zip(mults)
        .flat_map(|(&k, &m)| std::iter::repeat(k).take(m))
        .collect()
}

/// Flat knots of a periodic B-spline given in closed form: `n` poles and
/// distinct knots whose multiplicities, the last one excluded, add up to
/// `n`. The sequence is extended by `degree` knots past both ends of the
/// period so that `n + degree` wrapped poles cover it.
pub fn unroll_periodic_knots(
    knots: &[f64],
    mults: &[usize],
    n: usize,
    degree: usize,
) -> Result<Vec<f64>, KernelError> {
    let (Some(&first), Some(&last), Some(&m_first), Some(&m_last)) =
        (knots.first(), knots.last(), mults.first(), mults.last())
    else {
        return Err(KernelError::geometry("periodic: no knots"));
    };
    if knots.len() < 2 || knots.len() != mults.len() {
        return Err(KernelError::geometry("periodic: knots and multiplicities must pair up"));
    }
    if degree == 0 || n < 2 {
        return Err(KernelError::geometry(format!(
            "periodic: {n} poles cannot carry degree {degree}"
        )));
    }
    let closed: usize = mults[..mults.len() - 1].iter().sum();
    if closed != n {
        return Err(KernelError::geometry(format!(
            "periodic: multiplicities without the last add up to {closed}, expected {n}"
        )));
    }
    if m_first != m_last {
        return Err(KernelError::geometry("periodic: first and last multiplicities differ"));
    }
    let period = last - first;
    if period <= 0.0 {
        return Err(KernelError::geometry("periodic: empty period"));
    }
    let base = expand_knots(&knots[..knots.len() - 1], &mults[..mults.len() - 1]);
    let (n, p) = (n as isize, degree as isize);
    Ok((-p..=n + p)
        .map(|i| {
            let (q, r) = (i.div_euclid(n), i.rem_euclid(n) as usize);
            if q == 1 && base[r] == first {
                last
            } else {
                base[r] + period * q as f64
            }
        })
        .collect())
}

/// Closed form of a sequence built by [`unroll_periodic_knots`], or `None`
/// when `flat` does not repeat with a fixed period.
pub fn fold_periodic_knots(flat: &[f64], degree: usize) -> Option<(Vec<f64>, Vec<usize>)> {
    let n = flat.len().checked_sub(2 * degree + 1)?;
    if n == 0 {
        return None;
    }
    let period = flat[degree + n] - flat[degree];
    if period <= 0.0 {
        return None;
    }
    let eps = 1e-9 * period.max(1.0);
    if (0..flat.len() - n).any(|i| (flat[i + n] - flat[i] - period).abs() > eps) {
        return None;
    }
    let (mut knots, mut mults) = knots_and_multiplicities(&flat[degree..degree + n]);
    let m_first = *mults.first()?;
    knots.push(flat[degree + n]);
    mults.push(m_first);
    Some((knots, mults))
}

/// Whether the items past the first `n` repeat the list from its start.
fn wraps_around<T>(items: &[T], n: usize, same: impl Fn(&T, &T) -> bool) -> bool {
    n > 0 && (n..items.len()).all(|j| same(&items[j], &items[j - n]))
}

fn check_knots(knots: &[f64], n_ctrl: usize, degree: usize, what: &str) -> Result<(), KernelError> {
    if n_ctrl < degree + 1 {
        return Err(KernelError::geometry(format!(
            "{what}: {n_ctrl} control points cannot carry degree {degree}"
        )));
    }
    if knots.len() != n_ctrl + degree + 1 {
        return Err(KernelError::geometry(format!(
            "{what}: knot vector length {} must be {}",
            knots.len(),
            n_ctrl + degree + 1
        )));
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(KernelError::geometry(format!("{what}: knots must be non-decreasing")));
    }
    if knots[degree] >= knots[n_ctrl] {
        return Err(KernelError::geometry(format!("{what}: empty parameter domain")));
    }
    Ok(())
}

/// A NURBS (Non-Uniform Rational B-Spline) curve in 3D.
///
/// Two-dimensional curves (parameter-space trims) are stored with `z = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    pub degree: usize,
    pub control_points: Vec<Point3d>,
    /// One weight per control point.
    pub weights: Vec<f64>,
    /// Flat knot sequence, `len = control_points.len() + degree + 1`.
    pub knots: Vec<f64>,
    /// Set for curves built by [`NurbsCurve::periodic`], whose knots and
    /// poles are stored unrolled over one period.
    pub periodic: bool,
}

impl NurbsCurve {
    pub fn try_new(
        degree: usize,
        control_points: Vec<Point3d>,
        weights: Vec<f64>,
        knots: Vec<f64>,
        periodic: bool,
    ) -> Result<Self, KernelError> {
        let weights = if weights.is_empty() {
            vec![1.0; control_points.len()]
        } else {
            weights
        };
        if weights.len() != control_points.len() {
            return Err(KernelError::geometry(
                "curve: weights must match control points",
            ));
        }
        if weights.iter().any(|w| *w <= 0.0) {
            return Err(KernelError::geometry("curve: weights must be positive"));
        }
        check_knots(&knots, control_points.len(), degree, "curve")?;
        Ok(Self {
            degree,
            control_points,
            weights,
            knots,
            periodic,
        })
    }

    /// Periodic curve from its closed form, see [`unroll_periodic_knots`].
    /// Stored unrolled, with the first `degree` poles repeated after the
    /// last.
    pub fn periodic(
        degree: usize,
        control_points: Vec<Point3d>,
        weights: Vec<f64>,
        knots: &[f64],
        mults: &[usize],
    ) -> Result<Self, KernelError> {
        let n = control_points.len();
        let weights = if weights.is_empty() { vec![1.0; n] } else { weights };
        if weights.len() != n {
            return Err(KernelError::geometry("curve: weights must match control points"));
        }
        let flat = unroll_periodic_knots(knots, mults, n, degree)?;
        let poles = control_points.iter().cycle().take(n + degree).copied().collect();
        let weights = weights.iter().cycle().take(n + degree).copied().collect();
        Self::try_new(degree, poles, weights, flat, true)
    }

    /// Pole count, knots and multiplicities of the closed form of a
    /// periodic curve. `None` when the curve is not stored as an unrolled
    /// periodic curve.
    pub fn periodic_form(&self) -> Option<(usize, Vec<f64>, Vec<usize>)> {
        if !self.periodic {
            return None;
        }
        let (knots, mults) = fold_periodic_knots(&self.knots, self.degree)?;
        let n = self.control_points.len().checked_sub(self.degree)?;
        let poles = wraps_around(&self.control_points, n, |a, b| a.distance_to(b) < 1e-9);
        let weights = wraps_around(&self.weights, n, |a, b| (a - b).abs() < 1e-12);
        (poles && weights).then_some((n, knots, mults))
    }

    /// Single-span curve with clamped knots on `[0, 1]`.
    pub fn bezier(control_points: Vec<Point3d>, weights: Vec<f64>) -> Result<Self, KernelError> {
        let n = control_points.len();
        if n < 2 {
            return Err(KernelError::geometry("bezier: needs at least two poles"));
        }
        let mut knots = vec![0.0; n];
        knots.extend(std::iter::repeat(1.0).take(n));
        Self::try_new(n - 1, control_points, weights, knots, false)
    }

    /// Straight segment as a degree-1 curve on `[t0, t1]`.
    pub fn segment(a: Point3d, b: Point3d, t0: f64, t1: f64) -> Self {
        Self {
            degree: 1,
            control_points: vec![a, b],
            weights: vec![1.0, 1.0],
            knots: vec![t0, t0, t1, t1],
            periodic: false,
        }
    }

    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    pub fn is_rational(&self) -> bool {
        self.weights.iter().any(|w| (w - 1.0).abs() > 1e-12)
    }

    /// Parameter domain [t_min, t_max].
    pub fn domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.num_control_points()],
        )
    }

    pub fn knots_and_multiplicities(&self) -> (Vec<f64>, Vec<usize>) {
        knots_and_multiplicities(&self.knots)
    }

    /// Evaluate the curve at parameter t using de Boor's algorithm.
    pub fn evaluate(&self, t: f64) -> Point3d {
        let p = self.degree;
        let span = find_span(&self.knots, p, self.num_control_points(), t);
        let basis = basis_functions(&self.knots, span, t, p);
        let mut acc = Vec3::ZERO;
        let mut w_sum = 0.0;
        for (i, b) in basis.iter().enumerate() {
            let idx = span - p + i;
            let bw = b * self.weights[idx];
            acc = acc + self.control_points[idx].to_vec3() * bw;
            w_sum += bw;
        }
        if w_sum.abs() < 1e-300 {
            return self.control_points[span - p];
        }
        let c = acc / w_sum;
        Point3d::new(c.x, c.y, c.z)
    }

    /// First derivative by central differences.
    pub fn derivative(&self, t: f64) -> Vec3 {
        let (tmin, tmax) = self.domain();
        let h = 1e-6 * (tmax - tmin).max(1e-9);
        let t0 = (t - h).max(tmin);
        let t1 = (t + h).min(tmax);
        if (t1 - t0).abs() < 1e-300 {
            return Vec3::ZERO;
        }
        (self.evaluate(t1) - self.evaluate(t0)) / (t1 - t0)
    }

    /// Second derivative by central differences.
    pub fn second_derivative(&self, t: f64) -> Vec3 {
        let (tmin, tmax) = self.domain();
        let h = 1e-4 * (tmax - tmin).max(1e-9);
        let tc = t.clamp(tmin + h, tmax - h);
        let a = self.evaluate(tc - h).to_vec3();
        let b = self.evaluate(tc).to_vec3();
        let c = self.evaluate(tc + h).to_vec3();
        (a - b * 2.0 + c) / (h * h)
    }

    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            control_points: self
                .control_points
                .iter()
                .map(|p| t.transform_point(p))
                .collect(),
            ..self.clone()
        }
    }

    /// Same curve traversed backwards on the same domain.
    pub fn reversed(&self) -> Self {
        let (a, b) = self.domain();
        let knots = self.knots.iter().rev().map(|k| a + b - k).collect();
        let mut control_points = self.control_points.clone();
        control_points.reverse();
        let mut weights = self.weights.clone();
        weights.reverse();
        Self {
            degree: self.degree,
            control_points,
            weights,
            knots,
            periodic: self.periodic,
        }
    }

    /// Reparameterize linearly onto `[t0, t1]`.
    pub fn reparameterized(&self, t0: f64, t1: f64) -> Self {
        let (a, b) = self.domain();
        let s = (t1 - t0) / (b - a);
        Self {
            knots: self.knots.iter().map(|k| t0 + (k - a) * s).collect(),
            ..self.clone()
        }
    }

    /// Polyline length with `samples` segments.
    pub fn approximate_length(&self, samples: usize) -> f64 {
        let (t0, t1) = self.domain();
        let samples = samples.max(1);
        let mut length = 0.0;
        let mut prev = self.evaluate(t0);
        for i in 1..=samples {
            let curr = self.evaluate(t0 + (t1 - t0) * (i as f64 / samples as f64));
            length += prev.distance_to(&curr);
            prev = curr;
        }
        length
    }

    /// Exact rational form of an elliptic arc
    /// `origin + rx cos(t) x + ry sin(t) y` for `t` in `[t0, t1]`.
    ///
    /// The arc is split into spans of at most a quarter turn; the resulting
    /// parameterization spans `[t0, t1]` but is not angular.
    pub fn elliptic_arc(origin: Point3d, x: Vec3, y: Vec3, rx: f64, ry: f64, t0: f64, t1: f64) -> Self {
        let sweep = t1 - t0;
        let spans = ((sweep.abs() / (PI / 2.0)) - 1e-9).ceil().max(1.0) as usize;
        let delta = sweep / spans as f64;
        let w = (delta / 2.0).cos();
        let at = |t: f64, scale: f64| origin + x * (rx * t.cos() * scale) + y * (ry * t.sin() * scale);

        let mut control_points = Vec::with_capacity(2 * spans + 1);
        let mut weights = Vec::with_capacity(2 * spans + 1);
        control_points.push(at(t0, 1.0));
        weights.push(1.0);
        for i in 0..spans {
            let a = t0 + delta * i as f64;
            control_points.push(at(a + delta / 2.0, 1.0 / w));
            weights.push(w);
            control_points.push(at(a + delta, 1.0));
            weights.push(1.0);
        }
        let mut knots = vec![t0; 3];
        for i in 1..spans {
            let k = t0 + delta * i as f64;
            knots.push(k);
            knots.push(k);
        }
        knots.extend([t1; 3]);
        Self {
            degree: 2,
            control_points,
            weights,
            knots,
            periodic: false,
        }
    }
}

/// A tensor-product NURBS surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    /// Control point grid: `[u_index * num_v + v_index]`.
    pub control_points: Vec<Point3d>,
    pub weights: Vec<f64>,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub num_u: usize,
    pub num_v: usize,
    pub periodic_u: bool,
    pub periodic_v: bool,
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        degree_u: usize,
        degree_v: usize,
        control_points: Vec<Point3d>,
        weights: Vec<f64>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        num_u: usize,
        num_v: usize,
    ) -> Result<Self, KernelError> {
        if control_points.len() != num_u * num_v {
            return Err(KernelError::geometry(
                "surface: control grid size mismatch",
            ));
        }
        let weights = if weights.is_empty() {
            vec![1.0; control_points.len()]
        } else {
            weights
        };
        if weights.len() != control_points.len() || weights.iter().any(|w| *w <= 0.0) {
            return Err(KernelError::geometry(
                "surface: one positive weight per control point required",
            ));
        }
        check_knots(&knots_u, num_u, degree_u, "surface u")?;
        check_knots(&knots_v, num_v, degree_v, "surface v")?;
        Ok(Self {
            degree_u,
            degree_v,
            control_points,
            weights,
            knots_u,
            knots_v,
            num_u,
            num_v,
            periodic_u: false,
            periodic_v: false,
        })
    }

    pub fn control_point(&self, i: usize, j: usize) -> Point3d {
        self.control_points[i * self.num_v + j]
    }

    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.num_v + j]
    }

    pub fn is_rational(&self) -> bool {
        self.weights.iter().any(|w| (w - 1.0).abs() > 1e-12)
    }

    /// Row count, knots and multiplicities of the closed form along u of a
    /// surface unrolled periodically in u.
    pub fn periodic_form_u(&self) -> Option<(usize, Vec<f64>, Vec<usize>)> {
        if !self.periodic_u {
            return None;
        }
        let (knots, mults) = fold_periodic_knots(&self.knots_u, self.degree_u)?;
        let n = self.num_u.checked_sub(self.degree_u)?;
        let wraps = (n..self.num_u)
            .all(|i| (0..self.num_v).all(|j| self.same_pole((i, j), (i - n, j))));
        (n > 0 && wraps).then_some((n, knots, mults))
    }

    /// Column count, knots and multiplicities of the closed form along v.
    pub fn periodic_form_v(&self) -> Option<(usize, Vec<f64>, Vec<usize>)> {
        if !self.periodic_v {
            return None;
        }
        let (knots, mults) = fold_periodic_knots(&self.knots_v, self.degree_v)?;
        let n = self.num_v.checked_sub(self.degree_v)?;
        let wraps = (0..self.num_u)
            .all(|i| (n..self.num_v).all(|j| self.same_pole((i, j), (i, j - n))));
        (n > 0 && wraps).then_some((n, knots, mults))
    }

    fn same_pole(&self, (i, j): (usize, usize), (k, l): (usize, usize)) -> bool {
        self.control_point(i, j).distance_to(&self.control_point(k, l)) < 1e-9
            && (self.weight(i, j) - self.weight(k, l)).abs() < 1e-12
    }

    pub fn domain_u(&self) -> (f64, f64) {
        (self.knots_u[self.degree_u], self.knots_u[self.num_u])
    }

    pub fn domain_v(&self) -> (f64, f64) {
        (self.knots_v[self.degree_v], self.knots_v[self.num_v])
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let (pu, pv) = (self.degree_u, self.degree_v);
        let su = find_span(&self.knots_u, pu, self.num_u, u);
        let sv = find_span(&self.knots_v, pv, self.num_v, v);
        let bu = basis_functions(&self.knots_u, su, u, pu);
        let bv = basis_functions(&self.knots_v, sv, v, pv);

        let mut acc = Vec3::ZERO;
        let mut w_sum = 0.0;
        for (i, nu) in bu.iter().enumerate() {
            for (j, nv) in bv.iter().enumerate() {
                let (ui, vj) = (su - pu + i, sv - pv + j);
                let bw = nu * nv * self.weight(ui, vj);
                acc = acc + self.control_point(ui, vj).to_vec3() * bw;
                w_sum += bw;
            }
        }
        if w_sum.abs() < 1e-300 {
            return self.control_point(su - pu, sv - pv);
        }
        let c = acc / w_sum;
        Point3d::new(c.x, c.y, c.z)
    }

    /// Partial derivatives by central differences.
    pub fn derivatives(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let hu = 1e-6 * (u1 - u0).max(1e-9);
        let hv = 1e-6 * (v1 - v0).max(1e-9);
        let (ua, ub) = ((u - hu).max(u0), (u + hu).min(u1));
        let (va, vb) = ((v - hv).max(v0), (v + hv).min(v1));
        let du = (self.evaluate(ub, v) - self.evaluate(ua, v)) / (ub - ua);
        let dv = (self.evaluate(u, vb) - self.evaluate(u, va)) / (vb - va);
        (du, dv)
    }

    /// Iso-parametric curve at fixed `u`, running along v.
    pub fn isocurve_u(&self, u: f64) -> NurbsCurve {
        let pu = self.degree_u;
        let su = find_span(&self.knots_u, pu, self.num_u, u);
        let bu = basis_functions(&self.knots_u, su, u, pu);
        let mut control_points = Vec::with_capacity(self.num_v);
        let mut weights = Vec::with_capacity(self.num_v);
        for j in 0..self.num_v {
            let mut acc = Vec3::ZERO;
            let mut w = 0.0;
            for (i, b) in bu.iter().enumerate() {
                let ui = su - pu + i;
                let bw = b * self.weight(ui, j);
                acc = acc + self.control_point(ui, j).to_vec3() * bw;
                w += bw;
            }
            let c = acc / w;
            control_points.push(Point3d::new(c.x, c.y, c.z));
            weights.push(w);
        }
        NurbsCurve {
            degree: self.degree_v,
            control_points,
            weights,
            knots: self.knots_v.clone(),
            periodic: self.periodic_v,
        }
    }

    /// Iso-parametric curve at fixed `v`, running along u.
    pub fn isocurve_v(&self, v: f64) -> NurbsCurve {
        let pv = self.degree_v;
        let sv = find_span(&self.knots_v, pv, self.num_v, v);
        let bv = basis_functions(&self.knots_v, sv, v, pv);
        let mut control_points = Vec::with_capacity(self.num_u);
        let mut weights = Vec::with_capacity(self.num_u);
        for i in 0..self.num_u {
            let mut acc = Vec3::ZERO;
            let mut w = 0.0;
            for (j, b) in bv.iter().enumerate() {
                let vj = sv - pv + j;
                let bw = b * self.weight(i, vj);
                acc = acc + self.control_point(i, vj).to_vec3() * bw;
                w += bw;
            }
            let c = acc / w;
            control_points.push(Point3d::new(c.x, c.y, c.z));
            weights.push(w);
        }
        NurbsCurve {
            degree: self.degree_u,
            control_points,
            weights,
            knots: self.knots_u.clone(),
            periodic: self.periodic_u,
        }
    }

    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            control_points: self
                .control_points
                .iter()
                .map(|p| t.transform_point(p))
                .collect(),
            ..self.clone()
        }
    }

    /// Swap the u and v directions. Flips the natural normal.
    pub fn transposed(&self) -> Self {
        let mut control_points = Vec::with_capacity(self.control_points.len());
        let mut weights = Vec::with_capacity(self.weights.len());
        for j in 0..self.num_v {
            for i in 0..self.num_u {
                control_points.push(self.control_point(i, j));
                weights.push(self.weight(i, j));
            }
        }
        Self {
            degree_u: self.degree_v,
            degree_v: self.degree_u,
            control_points,
            weights,
            knots_u: self.knots_v.clone(),
            knots_v: self.knots_u.clone(),
            num_u: self.num_v,
            num_v: self.num_u,
            periodic_u: self.periodic_v,
            periodic_v: self.periodic_u,
        }
    }

    /// Tensor product of a u-profile and a v-profile combined by `combine`,
    /// which maps a pair of control points to a surface control point.
    pub fn tensor(
        u: &NurbsCurve,
        v: &NurbsCurve,
        combine: impl Fn(&Point3d, &Point3d) -> Point3d,
    ) -> Self {
        let mut control_points = Vec::with_capacity(u.num_control_points() * v.num_control_points());
        let mut weights = Vec::with_capacity(control_points.capacity());
        for (pu, wu) in u.control_points.iter().zip(&u.weights) {
            for (pv, wv) in v.control_points.iter().zip(&v.weights) {
                control_points.push(combine(pu, pv));
                weights.push(wu * wv);
            }
        }
        Self {
            degree_u: u.degree,
            degree_v: v.degree,
            control_points,
            weights,
            knots_u: u.knots.clone(),
            knots_v: v.knots.clone(),
            num_u: u.num_control_points(),
            num_v: v.num_control_points(),
            periodic_u: false,
            periodic_v: false,
        }
    }
}
