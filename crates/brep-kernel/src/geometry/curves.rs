use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::frame::Ax3;
use super::nurbs::NurbsCurve;
use super::point::Point3d;
use super::transform::Transform;
use super::vector::Vec3;

/// Analytic and parametric 3D curve representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    Line(Line3d),
    Circle(Circle3d),
    Ellipse(Ellipse3d),
    Hyperbola(Hyperbola3d),
    Parabola(Parabola3d),
    /// A single-span NURBS curve.
    Bezier(NurbsCurve),
    BSpline(NurbsCurve),
}

/// An infinite line, parameterized by arc length from `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3d {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Line3d {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized_or(Vec3::X),
        }
    }

    pub fn from_points(a: Point3d, b: Point3d) -> Self {
        Self::new(a, b - a)
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    pub fn parameter_of(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.direction)
    }
}

/// A circle in the XY plane of `position`, parameterized by angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle3d {
    pub position: Ax3,
    pub radius: f64,
}

impl Circle3d {
    pub fn new(position: Ax3, radius: f64) -> Self {
        Self { position, radius }
    }

    pub fn center(&self) -> Point3d {
        self.position.origin
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.position
            .to_global(self.radius * t.cos(), self.radius * t.sin(), 0.0)
    }
}

/// An ellipse in the XY plane of `position`, major axis along x.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse3d {
    pub position: Ax3,
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Ellipse3d {
    pub fn evaluate(&self, t: f64) -> Point3d {
        self.position
            .to_global(self.major_radius * t.cos(), self.minor_radius * t.sin(), 0.0)
    }
}

/// The main branch of a hyperbola, opening along the x direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperbola3d {
    pub position: Ax3,
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Hyperbola3d {
    pub fn evaluate(&self, t: f64) -> Point3d {
        self.position
            .to_global(self.major_radius * t.cosh(), self.minor_radius * t.sinh(), 0.0)
    }
}

/// A parabola with apex at the origin and axis along x:
/// `origin + t²/(4f) x + t y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parabola3d {
    pub position: Ax3,
    pub focal: f64,
}

impl Parabola3d {
    pub fn evaluate(&self, t: f64) -> Point3d {
        self.position.to_global(t * t / (4.0 * self.focal), t, 0.0)
    }
}

impl Curve {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Curve::Line(_) => "line",
            Curve::Circle(_) => "circle",
            Curve::Ellipse(_) => "ellipse",
            Curve::Hyperbola(_) => "hyperbola",
            Curve::Parabola(_) => "parabola",
            Curve::Bezier(_) => "bezier",
            Curve::BSpline(_) => "bspline",
        }
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        match self {
            Curve::Line(l) => l.evaluate(t),
            Curve::Circle(c) => c.evaluate(t),
            Curve::Ellipse(e) => e.evaluate(t),
            Curve::Hyperbola(h) => h.evaluate(t),
            Curve::Parabola(p) => p.evaluate(t),
            Curve::Bezier(n) | Curve::BSpline(n) => n.evaluate(t),
        }
    }

    pub fn derivative(&self, t: f64) -> Vec3 {
        match self {
            Curve::Line(l) => l.direction,
            Curve::Circle(c) => {
                let a = &c.position;
                a.x_dir * (-c.radius * t.sin()) + a.y_dir * (c.radius * t.cos())
            }
            Curve::Ellipse(e) => {
                let a = &e.position;
                a.x_dir * (-e.major_radius * t.sin()) + a.y_dir * (e.minor_radius * t.cos())
            }
            Curve::Hyperbola(h) => {
                let a = &h.position;
                a.x_dir * (h.major_radius * t.sinh()) + a.y_dir * (h.minor_radius * t.cosh())
            }
            Curve::Parabola(p) => p.position.x_dir * (t / (2.0 * p.focal)) + p.position.y_dir,
            Curve::Bezier(n) | Curve::BSpline(n) => n.derivative(t),
        }
    }

    pub fn second_derivative(&self, t: f64) -> Vec3 {
        match self {
            Curve::Line(_) => Vec3::ZERO,
            Curve::Circle(c) => {
                let a = &c.position;
                (a.x_dir * t.cos() + a.y_dir * t.sin()) * -c.radius
            }
            Curve::Ellipse(e) => {
                let a = &e.position;
                (a.x_dir * (e.major_radius * t.cos()) + a.y_dir * (e.minor_radius * t.sin())) * -1.0
            }
            Curve::Hyperbola(h) => {
                let a = &h.position;
                a.x_dir * (h.major_radius * t.cosh()) + a.y_dir * (h.minor_radius * t.sinh())
            }
            Curve::Parabola(p) => p.position.x_dir * (1.0 / (2.0 * p.focal)),
            Curve::Bezier(n) | Curve::BSpline(n) => n.second_derivative(t),
        }
    }

    /// Curvature vector (pointing at the center of curvature, length 1/R).
    pub fn curvature(&self, t: f64) -> Vec3 {
        let d1 = self.derivative(t);
        let d2 = self.second_derivative(t);
        let len2 = d1.length_squared();
        if len2 < 1e-300 {
            return Vec3::ZERO;
        }
        (d2 - d1 * (d1.dot(&d2) / len2)) / len2
    }

    /// The curve's own bounded domain, if it has one.
    pub fn natural_domain(&self) -> Option<(f64, f64)> {
        match self {
            Curve::Circle(_) | Curve::Ellipse(_) => Some((0.0, 2.0 * PI)),
            Curve::Bezier(n) | Curve::BSpline(n) => Some(n.domain()),
            _ => None,
        }
    }

    pub fn period(&self) -> Option<f64> {
        match self {
            Curve::Circle(_) | Curve::Ellipse(_) => Some(2.0 * PI),
            _ => None,
        }
    }

    /// Parameter of the point closest to `p`, searched within `range`.
    pub fn parameter_of(&self, p: &Point3d, range: (f64, f64)) -> f64 {
        let seed = match self {
            Curve::Line(l) => return l.parameter_of(p),
            Curve::Circle(c) => {
                let (x, y, _) = c.position.to_local(p);
                Some(y.atan2(x))
            }
            Curve::Ellipse(e) => {
                let (x, y, _) = e.position.to_local(p);
                Some((y / e.minor_radius).atan2(x / e.major_radius))
            }
            Curve::Hyperbola(h) => {
                let (_, y, _) = h.position.to_local(p);
                Some((y / h.minor_radius).asinh())
            }
            Curve::Parabola(pa) => {
                let (_, y, _) = pa.position.to_local(p);
                Some(y)
            }
            Curve::Bezier(_) | Curve::BSpline(_) => None,
        };
        let seed = match (seed, self.period()) {
            (Some(t), Some(period)) => wrap_into(t, range.0, period),
            (Some(t), None) => t,
            (None, _) => self.sampled_seed(p, range),
        };
        self.refine_parameter(p, seed, range)
    }

    fn sampled_seed(&self, p: &Point3d, range: (f64, f64)) -> f64 {
        let n = 64;
        (0..=n)
            .map(|i| range.0 + (range.1 - range.0) * i as f64 / n as f64)
            .min_by(|a, b| {
                let da = self.evaluate(*a).distance_squared_to(p);
                let db = self.evaluate(*b).distance_squared_to(p);
                da.total_cmp(&db)
            })
            .unwrap_or(range.0)
    }

    fn refine_parameter(&self, p: &Point3d, seed: f64, range: (f64, f64)) -> f64 {
        let mut t = seed;
        let bounded = self.period().is_none();
        for _ in 0..20 {
            let d = self.evaluate(t) - *p;
            let d1 = self.derivative(t);
            let d2 = self.second_derivative(t);
            let f = d.dot(&d1);
            let df = d1.dot(&d1) + d.dot(&d2);
            if df.abs() < 1e-300 {
                break;
            }
            let step = f / df;
            t -= step;
            if bounded {
                t = t.clamp(range.0.min(range.1), range.0.max(range.1));
            }
            if step.abs() < 1e-14 {
                break;
            }
        }
        t
    }

    /// Exact NURBS form over `[t0, t1]`. The result spans the same parameter
    /// interval; only lines, parabolas and B-splines keep the parameterization.
    pub fn to_nurbs(&self, t0: f64, t1: f64) -> NurbsCurve {
        match self {
            Curve::Line(l) => NurbsCurve::segment(l.evaluate(t0), l.evaluate(t1), t0, t1),
            Curve::Circle(c) => {
                let a = &c.position;
                NurbsCurve::elliptic_arc(a.origin, a.x_dir, a.y_dir, c.radius, c.radius, t0, t1)
            }
            Curve::Ellipse(e) => {
                let a = &e.position;
                NurbsCurve::elliptic_arc(
                    a.origin,
                    a.x_dir,
                    a.y_dir,
                    e.major_radius,
                    e.minor_radius,
                    t0,
                    t1,
                )
            }
            Curve::Hyperbola(h) => {
                let d = (t1 - t0) / 2.0;
                let tm = t0 + d;
                let a = &h.position;
                let mid = a.to_global(
                    h.major_radius * tm.cosh() / d.cosh(),
                    h.minor_radius * tm.sinh() / d.cosh(),
                    0.0,
                );
                NurbsCurve {
                    degree: 2,
                    control_points: vec![h.evaluate(t0), mid, h.evaluate(t1)],
                    weights: vec![1.0, d.cosh(), 1.0],
                    knots: vec![t0, t0, t0, t1, t1, t1],
                    periodic: false,
                }
            }
            Curve::Parabola(p) => {
                // Quadratic Bezier through the tangent intersection.
                let mid_t = (t0 + t1) / 2.0;
                let p0 = p.evaluate(t0);
                let tangent = self.derivative(t0);
                let mid = p0 + tangent * (mid_t - t0);
                NurbsCurve {
                    degree: 2,
                    control_points: vec![p0, mid, p.evaluate(t1)],
                    weights: vec![1.0; 3],
                    knots: vec![t0, t0, t0, t1, t1, t1],
                    periodic: false,
                }
            }
            Curve::Bezier(n) | Curve::BSpline(n) => n.clone(),
        }
    }

    /// Apply `t` to the curve restricted to `range`.
    ///
    /// Similarities keep the analytic form; any other affine map converts
    /// the curve to NURBS. Returns the moved curve with its new range.
    pub fn transformed(&self, t: &Transform, range: (f64, f64)) -> (Curve, (f64, f64)) {
        let Some(s) = t.similarity_scale() else {
            let nurbs = self.to_nurbs(range.0, range.1).transformed(t);
            let domain = nurbs.domain();
            return (Curve::BSpline(nurbs), domain);
        };
        match self {
            Curve::Line(l) => (
                Curve::Line(Line3d {
                    origin: t.transform_point(&l.origin),
                    direction: t.transform_vector(&l.direction).normalized_or(Vec3::X),
                }),
                (range.0 * s, range.1 * s),
            ),
            Curve::Circle(c) => (
                Curve::Circle(Circle3d {
                    position: c.position.transformed(t),
                    radius: c.radius * s,
                }),
                range,
            ),
            Curve::Ellipse(e) => (
                Curve::Ellipse(Ellipse3d {
                    position: e.position.transformed(t),
                    major_radius: e.major_radius * s,
                    minor_radius: e.minor_radius * s,
                }),
                range,
            ),
            Curve::Hyperbola(h) => (
                Curve::Hyperbola(Hyperbola3d {
                    position: h.position.transformed(t),
                    major_radius: h.major_radius * s,
                    minor_radius: h.minor_radius * s,
                }),
                range,
            ),
            Curve::Parabola(p) => (
                Curve::Parabola(Parabola3d {
                    position: p.position.transformed(t),
                    focal: p.focal * s,
                }),
                (range.0 * s, range.1 * s),
            ),
            Curve::Bezier(n) => (Curve::Bezier(n.transformed(t)), range),
            Curve::BSpline(n) => (Curve::BSpline(n.transformed(t)), range),
        }
    }

    /// Factor by which a similarity with scale `s` stretches the parameter.
    pub fn parameter_scale(&self, s: f64) -> f64 {
        match self {
            Curve::Line(_) | Curve::Parabola(_) => s,
            _ => 1.0,
        }
    }

    /// Polyline length over `range`.
    pub fn length(&self, range: (f64, f64)) -> f64 {
        if let Curve::Line(_) = self {
            return (range.1 - range.0).abs();
        }
        let n = 256;
        let mut prev = self.evaluate(range.0);
        let mut total = 0.0;
        for i in 1..=n {
            let p = self.evaluate(range.0 + (range.1 - range.0) * i as f64 / n as f64);
            total += prev.distance_to(&p);
            prev = p;
        }
        total
    }
}

/// Shift `t` by whole periods into `[start, start + period)`.
pub fn wrap_into(t: f64, start: f64, period: f64) -> f64 {
    let k = ((t - start) / period).floor();
    let w = t - k * period;
    if w >= start + period - 1e-12 {
        w - period
    } else {
        w
    }
}
