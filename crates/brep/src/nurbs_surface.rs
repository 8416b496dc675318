use brep_kernel::geometry::{
    nurbs, NurbsCurve as NativeCurve, NurbsSurface as NativeSurface, Point3d, Surface, Vec3,
};
use brep_types::{Cuboid, Frame, Point, Transformation, Vector};

use crate::conversions::{point_from_kernel, point_to_kernel, transformation_to_kernel, vector_from_kernel, vector_to_kernel};
use crate::data::NurbsSurfaceData;
use crate::errors::{BrepError, Result};
use crate::nurbs_curve::{bounding_cuboid, check_knot_vector, NurbsCurve};

/// Grid resolution of sampled fills.
const FILL_SAMPLES: usize = 16;

/// A tensor-product NURBS surface.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsSurface {
    native: NativeSurface,
}

impl NurbsSurface {
    pub fn from_native(native: NativeSurface) -> Self {
        Self { native }
    }

    pub fn native(&self) -> &NativeSurface {
        &self.native
    }

    pub fn to_surface(&self) -> Surface {
        Surface::BSpline(self.native.clone())
    }

    // ─── Constructors ───────────────────────────────────────────────────────

    /// Surface from its full parameter set. `points` and `weights` are rows
    /// along u, each row running along v.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parameters(
        points: &[Vec<Point>],
        weights: &[Vec<f64>],
        knots_u: &[f64],
        knots_v: &[f64],
        mults_u: &[usize],
        mults_v: &[usize],
        degree_u: usize,
        degree_v: usize,
        is_periodic_u: bool,
        is_periodic_v: bool,
    ) -> Result<Self> {
        const OP: &str = "NurbsSurface::from_parameters";
        check_knot_vector(OP, knots_u, mults_u)?;
        check_knot_vector(OP, knots_v, mults_v)?;
        let num_u = points.len();
        let num_v = points.first().map_or(0, Vec::len);
        if points.iter().any(|row| row.len() != num_v) {
            return Err(BrepError::construction(OP, "control point rows differ in length"));
        }
        if !weights.is_empty()
            && (weights.len() != num_u || weights.iter().any(|row| row.len() != num_v))
        {
            return Err(BrepError::construction(OP, "weights must match the control net"));
        }
        if num_u == 0 || num_v == 0 {
            return Err(BrepError::construction(OP, "control net is empty"));
        }
        let to_op = |e: brep_kernel::KernelError| BrepError::construction(OP, e.to_string());
        // Periodic directions carry each pole once; the stored net repeats
        // the first `degree` rows (or columns) after the last.
        let (flat_u, rows_u) = if is_periodic_u {
            let flat = nurbs::unroll_periodic_knots(knots_u, mults_u, num_u, degree_u)
                .map_err(to_op)?;
            (flat, num_u + degree_u)
        } else {
            (nurbs::expand_knots(knots_u, mults_u), num_u)
        };
        let (flat_v, cols_v) = if is_periodic_v {
            let flat = nurbs::unroll_periodic_knots(knots_v, mults_v, num_v, degree_v)
                .map_err(to_op)?;
            (flat, num_v + degree_v)
        } else {
            (nurbs::expand_knots(knots_v, mults_v), num_v)
        };
        let mut poles = Vec::with_capacity(rows_u * cols_v);
        let mut wts = Vec::new();
        for i in 0..rows_u {
            for j in 0..cols_v {
                let (a, b) = (i % num_u, j % num_v);
                poles.push(point_to_kernel(&points[a][b]));
                if !weights.is_empty() {
                    wts.push(weights[a][b]);
                }
            }
        }
        let mut native =
            NativeSurface::try_new(degree_u, degree_v, poles, wts, flat_u, flat_v, rows_u, cols_v)
                .map_err(to_op)?;
        native.periodic_u = is_periodic_u;
        native.periodic_v = is_periodic_v;
        Ok(Self { native })
    }

    /// Non-rational surface with `points` as control net and clamped
    /// uniform knots on `[0, 1]` in both directions.
    pub fn from_points(points: &[Vec<Point>], degree_u: usize, degree_v: usize) -> Result<Self> {
        const OP: &str = "NurbsSurface::from_points";
        let num_u = points.len();
        let num_v = points.first().map_or(0, Vec::len);
        if num_u < 2 || num_v < 2 {
            return Err(BrepError::construction(OP, "a 2 x 2 control net is needed at least"));
        }
        let (ku, mu, du) = clamped_uniform(num_u, degree_u);
        let (kv, mv, dv) = clamped_uniform(num_v, degree_v);
        Self::from_parameters(points, &[], &ku, &kv, &mu, &mv, du, dv, false, false)
    }

    /// Surface swept by moving `curve` along `vector`. The curve runs along
    /// u; v spans `[0, 1]`.
    pub fn from_extrusion(curve: &NurbsCurve, vector: &Vector) -> Result<Self> {
        let v = vector_to_kernel(vector);
        if v.length() < brep_kernel::Tolerance::default().confusion {
            return Err(BrepError::construction(
                "NurbsSurface::from_extrusion",
                "extrusion vector is zero",
            ));
        }
        let path = NativeCurve::segment(Point3d::ORIGIN, Point3d::ORIGIN + v, 0.0, 1.0);
        Ok(Self {
            native: NativeSurface::tensor(curve.native(), &path, |a, b| *a + b.to_vec3()),
        })
    }

    /// Surface bounded by two opposite curves (a ruled surface) or by four
    /// curves forming a closed loop (a bilinear Coons patch).
    ///
    /// Two curves sharing degree and knots produce an exact ruled surface;
    /// every other fill is sampled into a degree-1 net.
    pub fn from_fill(curves: &[NurbsCurve]) -> Result<Self> {
        const OP: &str = "NurbsSurface::from_fill";
        match curves {
            [a, b] if compatible(a.native(), b.native()) => Ok(Self {
                native: ruled(a.native(), b.native()),
            }),
            [a, b] => {
                let (a, b) = (a.native(), b.native());
                Self::sampled(OP, |u, v| {
                    let p = eval_normalized(a, u).to_vec3() * (1.0 - v)
                        + eval_normalized(b, u).to_vec3() * v;
                    Point3d::new(p.x, p.y, p.z)
                })
            }
            [c1, c2, c3, c4] => {
                let bottom = |u: f64| eval_normalized(c1.native(), u).to_vec3();
                let right = |v: f64| eval_normalized(c2.native(), v).to_vec3();
                let top = |u: f64| eval_normalized(c3.native(), 1.0 - u).to_vec3();
                let left = |v: f64| eval_normalized(c4.native(), 1.0 - v).to_vec3();
                let (p00, p10, p01, p11) = (bottom(0.0), bottom(1.0), top(0.0), top(1.0));
                Self::sampled(OP, |u, v| {
                    let ruled_v = bottom(u) * (1.0 - v) + top(u) * v;
                    let ruled_u = left(v) * (1.0 - u) + right(v) * u;
                    let corners = p00 * ((1.0 - u) * (1.0 - v))
                        + p10 * (u * (1.0 - v))
                        + p01 * ((1.0 - u) * v)
                        + p11 * (u * v);
                    let p = ruled_v + ruled_u - corners;
                    Point3d::new(p.x, p.y, p.z)
                })
            }
            _ => Err(BrepError::construction(
                OP,
                format!("fill needs 2 or 4 curves, got {}", curves.len()),
            )),
        }
    }

    fn sampled(op: &str, at: impl Fn(f64, f64) -> Point3d) -> Result<Self> {
        let n = FILL_SAMPLES;
        let rows: Vec<Vec<Point>> = (0..=n)
            .map(|i| {
                (0..=n)
                    .map(|j| point_from_kernel(&at(i as f64 / n as f64, j as f64 / n as f64)))
                    .collect()
            })
            .collect();
        Self::from_points(&rows, 1, 1).map_err(|e| BrepError::construction(op, e.to_string()))
    }

    pub fn from_data(data: &NurbsSurfaceData) -> Result<Self> {
        Self::from_parameters(
            &data.points,
            &data.weights,
            &data.knots_u,
            &data.knots_v,
            &data.mults_u,
            &data.mults_v,
            data.degree_u,
            data.degree_v,
            data.is_periodic_u,
            data.is_periodic_v,
        )
    }

    pub fn to_data(&self) -> NurbsSurfaceData {
        let (_, knots_u, mults_u) = self.closed_form_u();
        let (_, knots_v, mults_v) = self.closed_form_v();
        NurbsSurfaceData {
            points: self.points(),
            weights: self.weights(),
            knots_u,
            knots_v,
            mults_u,
            mults_v,
            degree_u: self.native.degree_u,
            degree_v: self.native.degree_v,
            is_periodic_u: self.native.periodic_form_u().is_some(),
            is_periodic_v: self.native.periodic_form_v().is_some(),
        }
    }

    fn closed_form_u(&self) -> (usize, Vec<f64>, Vec<usize>) {
        self.native.periodic_form_u().unwrap_or_else(|| {
            let (knots, mults) = nurbs::knots_and_multiplicities(&self.native.knots_u);
            (self.native.num_u, knots, mults)
        })
    }

    fn closed_form_v(&self) -> (usize, Vec<f64>, Vec<usize>) {
        self.native.periodic_form_v().unwrap_or_else(|| {
            let (knots, mults) = nurbs::knots_and_multiplicities(&self.native.knots_v);
            (self.native.num_v, knots, mults)
        })
    }

    // ─── Properties ─────────────────────────────────────────────────────────

    /// Control net, each pole of a periodic direction once.
    pub fn points(&self) -> Vec<Vec<Point>> {
        let (nu, nv) = (self.closed_form_u().0, self.closed_form_v().0);
        (0..nu)
            .map(|i| {
                (0..nv)
                    .map(|j| point_from_kernel(&self.native.control_point(i, j)))
                    .collect()
            })
            .collect()
    }

    pub fn weights(&self) -> Vec<Vec<f64>> {
        let (nu, nv) = (self.closed_form_u().0, self.closed_form_v().0);
        (0..nu)
            .map(|i| (0..nv).map(|j| self.native.weight(i, j)).collect())
            .collect()
    }

    pub fn degree_u(&self) -> usize {
        self.native.degree_u
    }

    pub fn degree_v(&self) -> usize {
        self.native.degree_v
    }

    pub fn is_rational(&self) -> bool {
        self.native.is_rational()
    }

    pub fn is_periodic_u(&self) -> bool {
        self.native.periodic_u
    }

    pub fn is_periodic_v(&self) -> bool {
        self.native.periodic_v
    }

    pub fn domain_u(&self) -> (f64, f64) {
        self.native.domain_u()
    }

    pub fn domain_v(&self) -> (f64, f64) {
        self.native.domain_v()
    }

    // ─── Evaluation ─────────────────────────────────────────────────────────

    pub fn point_at(&self, u: f64, v: f64) -> Point {
        point_from_kernel(&self.native.evaluate(u, v))
    }

    pub fn normal_at(&self, u: f64, v: f64) -> Vector {
        let (du, dv) = self.native.derivatives(u, v);
        vector_from_kernel(&du.cross(&dv).normalized_or(Vec3::ZERO))
    }

    /// Frame with its x axis along u and its z axis along the normal.
    pub fn frame_at(&self, u: f64, v: f64) -> Frame {
        let (du, dv) = self.native.derivatives(u, v);
        let x = du.normalized_or(Vec3::X);
        let n = du.cross(&dv).normalized_or(x.any_perpendicular());
        let y = n.cross(&x);
        Frame::new(self.point_at(u, v), vector_from_kernel(&x), vector_from_kernel(&y))
    }

    pub fn isocurve_u(&self, u: f64) -> NurbsCurve {
        NurbsCurve::from_native(self.native.isocurve_u(u))
    }

    pub fn isocurve_v(&self, v: f64) -> NurbsCurve {
        NurbsCurve::from_native(self.native.isocurve_v(v))
    }

    /// Closest point on the surface with its parameters.
    pub fn closest_point(&self, point: &Point) -> (Point, (f64, f64)) {
        const SAMPLES: usize = 24;
        let target = point_to_kernel(point);
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let dist = |u: f64, v: f64| self.native.evaluate(u, v).distance_squared_to(&target);
        let mut best = (u0, v0, f64::INFINITY);
        for i in 0..=SAMPLES {
            for j in 0..=SAMPLES {
                let u = u0 + (u1 - u0) * i as f64 / SAMPLES as f64;
                let v = v0 + (v1 - v0) * j as f64 / SAMPLES as f64;
                let d = dist(u, v);
                if d < best.2 {
                    best = (u, v, d);
                }
            }
        }
        // Alternate one-dimensional searches in shrinking windows.
        let (mut u, mut v) = (best.0, best.1);
        let (mut hu, mut hv) = ((u1 - u0) / SAMPLES as f64, (v1 - v0) / SAMPLES as f64);
        for _ in 0..12 {
            u = golden(|x| dist(x, v), (u - hu).max(u0), (u + hu).min(u1));
            v = golden(|y| dist(u, y), (v - hv).max(v0), (v + hv).min(v1));
            hu *= 0.5;
            hv *= 0.5;
        }
        (self.point_at(u, v), (u, v))
    }

    pub fn aabb(&self) -> Cuboid {
        const SAMPLES: usize = 32;
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let mut points = Vec::with_capacity((SAMPLES + 1) * (SAMPLES + 1));
        for i in 0..=SAMPLES {
            for j in 0..=SAMPLES {
                points.push(self.point_at(
                    u0 + (u1 - u0) * i as f64 / SAMPLES as f64,
                    v0 + (v1 - v0) * j as f64 / SAMPLES as f64,
                ));
            }
        }
        bounding_cuboid(&points)
    }

    // ─── Modification ───────────────────────────────────────────────────────

    pub fn transform(&mut self, t: &Transformation) {
        self.native = self.native.transformed(&transformation_to_kernel(t));
    }

    pub fn transformed(&self, t: &Transformation) -> Self {
        let mut out = self.clone();
        out.transform(t);
        out
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }
}

/// Distinct clamped uniform knots for `n` control points, with the degree
/// lowered to what `n` can carry.
fn clamped_uniform(n: usize, degree: usize) -> (Vec<f64>, Vec<usize>, usize) {
    let degree = degree.clamp(1, n - 1);
    let spans = n - degree;
    let knots = (0..=spans).map(|i| i as f64 / spans as f64).collect();
    let mut mults = vec![1; spans + 1];
    mults[0] = degree + 1;
    mults[spans] = degree + 1;
    (knots, mults, degree)
}

fn compatible(a: &NativeCurve, b: &NativeCurve) -> bool {
    a.degree == b.degree && a.knots == b.knots
}

fn ruled(a: &NativeCurve, b: &NativeCurve) -> NativeSurface {
    let mut control_points = Vec::with_capacity(2 * a.control_points.len());
    let mut weights = Vec::with_capacity(control_points.capacity());
    for i in 0..a.control_points.len() {
        control_points.push(a.control_points[i]);
        control_points.push(b.control_points[i]);
        weights.push(a.weights[i]);
        weights.push(b.weights[i]);
    }
    NativeSurface {
        degree_u: a.degree,
        degree_v: 1,
        control_points,
        weights,
        knots_u: a.knots.clone(),
        knots_v: vec![0.0, 0.0, 1.0, 1.0],
        num_u: a.control_points.len(),
        num_v: 2,
        periodic_u: a.periodic,
        periodic_v: false,
    }
}

/// Evaluate at `s` in `[0, 1]` mapped onto the curve's domain.
fn eval_normalized(c: &NativeCurve, s: f64) -> Point3d {
    let (t0, t1) = c.domain();
    c.evaluate(t0 + (t1 - t0) * s)
}

fn golden(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let g = (5f64.sqrt() - 1.0) / 2.0;
    for _ in 0..40 {
        let a = hi - g * (hi - lo);
        let b = lo + g * (hi - lo);
        if f(a) < f(b) {
            hi = b;
        } else {
            lo = a;
        }
    }
    (lo + hi) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brep_types::Line;
    use std::f64::consts::PI;

    fn saddle() -> NurbsSurface {
        let rows: Vec<Vec<Point>> = (0..4)
            .map(|i| {
                (0..3)
                    .map(|j| {
                        let (x, y) = (i as f64, j as f64);
                        Point::new(x, y, (x - 1.5) * (y - 1.0) * 0.3)
                    })
                    .collect()
            })
            .collect();
        NurbsSurface::from_points(&rows, 3, 2).unwrap()
    }

    #[test]
    fn test_data_round_trip_is_exact() {
        let s = saddle();
        let data = s.to_data();
        assert_eq!(data.mults_u, vec![4, 4]);
        assert_eq!(data.mults_v, vec![3, 3]);
        assert_eq!(data.points.len(), 4);
        assert_eq!(data.points[0].len(), 3);
        let back = NurbsSurface::from_data(&data).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_periodic_tube_closed_form_round_trips() {
        // Hexagonal rings stacked along z, periodic around the ring.
        let rows: Vec<Vec<Point>> = (0..3)
            .map(|i| {
                (0..6)
                    .map(|j| {
                        let a = j as f64 * PI / 3.0;
                        Point::new(a.cos(), a.sin(), i as f64)
                    })
                    .collect()
            })
            .collect();
        let knots_v: Vec<f64> = (0..7).map(f64::from).collect();
        let s = NurbsSurface::from_parameters(
            &rows,
            &[],
            &[0.0, 1.0],
            &knots_v,
            &[3, 3],
            &[1; 7],
            2,
            3,
            false,
            true,
        )
        .unwrap();
        assert_eq!(s.domain_v(), (0.0, 6.0));
        for u in [0.0, 0.5, 1.0] {
            assert!(s.point_at(u, 0.0).distance_to(&s.point_at(u, 6.0)) < 1e-9);
        }
        let data = s.to_data();
        assert!(data.is_periodic_v);
        assert!(!data.is_periodic_u);
        assert_eq!(data.points, rows);
        assert_eq!(data.knots_v, knots_v);
        assert_eq!(NurbsSurface::from_data(&data).unwrap(), s);
    }

    #[test]
    fn test_ragged_net_is_rejected() {
        let rows = vec![
            vec![Point::origin(), Point::new(0.0, 1.0, 0.0)],
            vec![Point::new(1.0, 0.0, 0.0)],
        ];
        assert!(matches!(
            NurbsSurface::from_points(&rows, 1, 1),
            Err(BrepError::Construction { .. })
        ));
    }

    #[test]
    fn test_extrusion_of_line_is_planar() {
        let c = NurbsCurve::from_line(&Line::new(Point::origin(), Point::new(2.0, 0.0, 0.0)));
        let s = NurbsSurface::from_extrusion(&c, &Vector::new(0.0, 0.0, 3.0)).unwrap();
        let p = s.point_at(0.5, 0.5);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 1.5, epsilon = 1e-12);
        let n = s.normal_at(0.3, 0.7);
        assert_relative_eq!(n.y.abs(), 1.0, epsilon = 1e-6);
        let bb = s.aabb();
        assert_relative_eq!(bb.zsize, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fill_of_two_lines_is_ruled() {
        let a = NurbsCurve::from_line(&Line::new(Point::origin(), Point::new(1.0, 0.0, 0.0)));
        let b = NurbsCurve::from_line(&Line::new(
            Point::new(0.0, 1.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
        ));
        let s = NurbsSurface::from_fill(&[a, b]).unwrap();
        assert_eq!(s.degree_v(), 1);
        let p = s.point_at(0.5, 0.5);
        assert_relative_eq!(p.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_coons_fill_interpolates_boundary() {
        let l = |a: Point, b: Point| NurbsCurve::from_line(&Line::new(a, b));
        let (p0, p1, p2, p3) = (
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 0.0),
        );
        let s = NurbsSurface::from_fill(&[l(p0, p1), l(p1, p2), l(p2, p3), l(p3, p0)]).unwrap();
        let c = s.point_at(1.0, 1.0);
        assert_relative_eq!(c.z, 1.0, epsilon = 1e-12);
        assert!(NurbsSurface::from_fill(&[l(p0, p1)]).is_err());
    }

    #[test]
    fn test_closest_point_on_saddle() {
        let s = saddle();
        let (u, v) = (0.4, 0.6);
        let on = s.point_at(u, v);
        let n = s.normal_at(u, v);
        let off = Point::new(on.x + n.x * 0.1, on.y + n.y * 0.1, on.z + n.z * 0.1);
        let (p, _) = s.closest_point(&off);
        assert_relative_eq!(p.distance_to(&on), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_isocurve_matches_surface() {
        let s = saddle();
        let c = s.isocurve_u(0.3);
        let a = c.point_at(0.8);
        let b = s.point_at(0.3, 0.8);
        assert_relative_eq!(a.distance_to(&b), 0.0, epsilon = 1e-12);
    }
}
