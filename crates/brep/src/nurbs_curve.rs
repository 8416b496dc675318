use std::f64::consts::PI;

use brep_kernel::geometry::{nurbs, Curve, NurbsCurve as NativeCurve, Point3d, Vec3};
use brep_types::{Circle, Cuboid, Ellipse, Frame, Line, Point, Polyline, Transformation, Vector};

use crate::conversions::{
    circle_to_kernel, ellipse_to_kernel, point_from_kernel, point_to_kernel,
    transformation_to_kernel, vector_from_kernel,
};
use crate::data::NurbsCurveData;
use crate::errors::{BrepError, Result};

/// A NURBS curve described by distinct knots and their multiplicities.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsCurve {
    native: NativeCurve,
}

impl NurbsCurve {
    pub fn from_native(native: NativeCurve) -> Self {
        Self { native }
    }

    pub fn native(&self) -> &NativeCurve {
        &self.native
    }

    pub fn into_native(self) -> NativeCurve {
        self.native
    }

    /// The curve as kernel geometry.
    pub fn to_curve(&self) -> Curve {
        Curve::BSpline(self.native.clone())
    }

    // ─── Constructors ───────────────────────────────────────────────────────

    /// Curve from its full parameter set. `knots` must be strictly
    /// increasing; repeated values are expressed through `multiplicities`.
    ///
    /// A periodic curve is given in closed form: `points` holds each pole
    /// once and the multiplicities, the last one excluded, add up to the
    /// number of poles.
    pub fn from_parameters(
        points: &[Point],
        weights: &[f64],
        knots: &[f64],
        multiplicities: &[usize],
        degree: usize,
        is_periodic: bool,
    ) -> Result<Self> {
        const OP: &str = "NurbsCurve::from_parameters";
        check_knot_vector(OP, knots, multiplicities)?;
        let poles = points.iter().map(point_to_kernel).collect();
        let native = if is_periodic {
            NativeCurve::periodic(degree, poles, weights.to_vec(), knots, multiplicities)
        } else {
            let flat = nurbs::expand_knots(knots, multiplicities);
            NativeCurve::try_new(degree, poles, weights.to_vec(), flat, false)
        }
        .map_err(|e| BrepError::construction(OP, e.to_string()))?;
        Ok(Self { native })
    }

    /// Non-rational curve using `points` as control points, with clamped
    /// uniform knots on `[0, 1]`. The degree is lowered when there are too
    /// few points to carry it.
    pub fn from_points(points: &[Point], degree: usize) -> Result<Self> {
        const OP: &str = "NurbsCurve::from_points";
        if points.len() < 2 {
            return Err(BrepError::construction(OP, "at least two points are needed"));
        }
        let degree = degree.clamp(1, points.len() - 1);
        let spans = points.len() - degree;
        let knots: Vec<f64> = (0..=spans).map(|i| i as f64 / spans as f64).collect();
        let mut multiplicities = vec![1; knots.len()];
        multiplicities[0] = degree + 1;
        multiplicities[spans] = degree + 1;
        Self::from_parameters(
            points,
            &vec![1.0; points.len()],
            &knots,
            &multiplicities,
            degree,
            false,
        )
        .map_err(|e| BrepError::construction(OP, e.to_string()))
    }

    /// Degree-1 curve over `[0, 1]`.
    pub fn from_line(line: &Line) -> Self {
        Self {
            native: NativeCurve::segment(
                point_to_kernel(&line.start),
                point_to_kernel(&line.end),
                0.0,
                1.0,
            ),
        }
    }

    /// Exact rational circle over `[0, 2π]`.
    pub fn from_circle(circle: &Circle) -> Self {
        Self {
            native: Curve::Circle(circle_to_kernel(circle)).to_nurbs(0.0, 2.0 * PI),
        }
    }

    pub fn from_ellipse(ellipse: &Ellipse) -> Self {
        Self {
            native: Curve::Ellipse(ellipse_to_kernel(ellipse)).to_nurbs(0.0, 2.0 * PI),
        }
    }

    pub fn from_data(data: &NurbsCurveData) -> Result<Self> {
        Self::from_parameters(
            &data.points,
            &data.weights,
            &data.knots,
            &data.multiplicities,
            data.degree,
            data.is_periodic,
        )
    }

    /// Periodic curves are written in closed form, everything else with
    /// its full knot vector.
    pub fn to_data(&self) -> NurbsCurveData {
        let (_, knots, multiplicities) = self.closed_form();
        NurbsCurveData {
            points: self.points(),
            weights: self.weights().to_vec(),
            knots,
            multiplicities,
            degree: self.native.degree,
            is_periodic: self.native.periodic_form().is_some(),
        }
    }

    fn closed_form(&self) -> (usize, Vec<f64>, Vec<usize>) {
        self.native.periodic_form().unwrap_or_else(|| {
            let (knots, mults) = self.native.knots_and_multiplicities();
            (self.native.num_control_points(), knots, mults)
        })
    }

    // ─── Properties ─────────────────────────────────────────────────────────

    /// Control points, each pole of a periodic curve once.
    pub fn points(&self) -> Vec<Point> {
        let (n, _, _) = self.closed_form();
        self.native.control_points[..n]
            .iter()
            .map(point_from_kernel)
            .collect()
    }

    pub fn weights(&self) -> &[f64] {
        let (n, _, _) = self.closed_form();
        &self.native.weights[..n]
    }

    pub fn knots(&self) -> Vec<f64> {
        self.closed_form().1
    }

    pub fn multiplicities(&self) -> Vec<usize> {
        self.closed_form().2
    }

    pub fn degree(&self) -> usize {
        self.native.degree
    }

    pub fn order(&self) -> usize {
        self.native.degree + 1
    }

    pub fn is_periodic(&self) -> bool {
        self.native.periodic
    }

    pub fn is_rational(&self) -> bool {
        self.native.is_rational()
    }

    pub fn domain(&self) -> (f64, f64) {
        self.native.domain()
    }

    pub fn start(&self) -> Point {
        point_from_kernel(&self.native.evaluate(self.domain().0))
    }

    pub fn end(&self) -> Point {
        point_from_kernel(&self.native.evaluate(self.domain().1))
    }

    pub fn is_closed(&self) -> bool {
        self.start().distance_to(&self.end()) <= brep_kernel::Tolerance::default().sewing
    }

    pub fn length(&self) -> f64 {
        self.native.approximate_length(1024)
    }

    // ─── Evaluation ─────────────────────────────────────────────────────────

    pub fn point_at(&self, t: f64) -> Point {
        point_from_kernel(&self.native.evaluate(t))
    }

    /// Unit tangent, or the zero vector where the curve stalls.
    pub fn tangent_at(&self, t: f64) -> Vector {
        vector_from_kernel(&self.native.derivative(t).normalized_or(Vec3::ZERO))
    }

    /// Curvature vector: pointing to the centre of curvature, with the
    /// curvature as its length.
    pub fn curvature_at(&self, t: f64) -> Vector {
        vector_from_kernel(&curvature_vector(
            self.native.derivative(t),
            self.native.second_derivative(t),
        ))
    }

    /// Frame with its x axis along the tangent and its y axis towards the
    /// centre of curvature.
    pub fn frame_at(&self, t: f64) -> Frame {
        let tangent = self.native.derivative(t).normalized_or(Vec3::X);
        let k = curvature_vector(self.native.derivative(t), self.native.second_derivative(t));
        let normal = k
            .normalized()
            .unwrap_or_else(|| tangent.any_perpendicular());
        Frame::new(
            self.point_at(t),
            vector_from_kernel(&tangent),
            vector_from_kernel(&normal),
        )
    }

    /// Closest point on the curve and its parameter.
    pub fn closest_point(&self, point: &Point) -> (Point, f64) {
        let target = point_to_kernel(point);
        let t = closest_parameter(|t| self.native.evaluate(t), self.domain(), &target);
        (self.point_at(t), t)
    }

    /// Parameters splitting the domain into `count` equal intervals,
    /// both ends included.
    pub fn divide_by_count(&self, count: usize) -> Vec<f64> {
        let (t0, t1) = self.domain();
        let count = count.max(1);
        (0..=count)
            .map(|i| t0 + (t1 - t0) * i as f64 / count as f64)
            .collect()
    }

    pub fn to_polyline(&self, count: usize) -> Polyline {
        Polyline::new(
            self.divide_by_count(count)
                .into_iter()
                .map(|t| self.point_at(t))
                .collect(),
        )
    }

    /// Axis-aligned box around a dense sampling of the curve.
    pub fn aabb(&self) -> Cuboid {
        bounding_cuboid(&self.to_polyline(256).points)
    }

    // ─── Modification ───────────────────────────────────────────────────────

    pub fn reverse(&mut self) {
        self.native = self.native.reversed();
    }

    pub fn reversed(&self) -> Self {
        Self {
            native: self.native.reversed(),
        }
    }

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

pub(crate) fn check_knot_vector(op: &str, knots: &[f64], multiplicities: &[usize]) -> Result<()> {
    if knots.len() != multiplicities.len() {
        return Err(BrepError::construction(
            op,
            format!(
                "{} knots but {} multiplicities",
                knots.len(),
                multiplicities.len()
            ),
        ));
    }
    if knots.windows(2).any(|w| w[1] <= w[0]) {
        return Err(BrepError::construction(op, "knots must be strictly increasing"));
    }
    if multiplicities.iter().any(|m| *m == 0) {
        return Err(BrepError::construction(op, "multiplicities must be positive"));
    }
    Ok(())
}

pub(crate) fn curvature_vector(d1: Vec3, d2: Vec3) -> Vec3 {
    let speed2 = d1.length_squared();
    if speed2 < 1e-24 {
        return Vec3::ZERO;
    }
    d1.cross(&d2).cross(&d1) / (speed2 * speed2)
}

/// Parameter in `range` minimising the distance to `target`: coarse
/// sampling, then golden-section search around the best sample.
pub(crate) fn closest_parameter(
    eval: impl Fn(f64) -> Point3d,
    range: (f64, f64),
    target: &Point3d,
) -> f64 {
    const SAMPLES: usize = 64;
    let (t0, t1) = range;
    let at = |i: usize| t0 + (t1 - t0) * i as f64 / SAMPLES as f64;
    let dist = |t: f64| eval(t).distance_squared_to(target);
    let best = (0..=SAMPLES)
        .min_by(|&a, &b| dist(at(a)).total_cmp(&dist(at(b))))
        .unwrap_or(0);
    let mut lo = at(best.saturating_sub(1));
    let mut hi = at((best + 1).min(SAMPLES));
    let g = (5f64.sqrt() - 1.0) / 2.0;
    for _ in 0..80 {
        let a = hi - g * (hi - lo);
        let b = lo + g * (hi - lo);
        if dist(a) < dist(b) {
            hi = b;
        } else {
            lo = a;
        }
    }
    (lo + hi) / 2.0
}

pub(crate) fn bounding_cuboid(points: &[Point]) -> Cuboid {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min = Point::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
        max = Point::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
    }
    if points.is_empty() {
        min = Point::origin();
        max = Point::origin();
    }
    Cuboid::from_corners(min, max)
}
