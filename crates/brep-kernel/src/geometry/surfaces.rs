use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use super::curves::wrap_into;
use super::frame::Ax3;
use super::nurbs::{NurbsCurve, NurbsSurface};
use super::point::{Point2d, Point3d};
use super::transform::Transform;
use super::vector::Vec3;

const TAU: f64 = 2.0 * PI;

/// Analytic and parametric surface representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    Plane(PlaneSurface),
    Cylinder(CylindricalSurface),
    Cone(ConicalSurface),
    Sphere(SphericalSurface),
    Torus(ToroidalSurface),
    /// A single-patch NURBS surface.
    Bezier(NurbsSurface),
    BSpline(NurbsSurface),
}

/// `origin + u x + v y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSurface {
    pub position: Ax3,
}

/// `origin + r (cos u x + sin u y) + v z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CylindricalSurface {
    pub position: Ax3,
    pub radius: f64,
}

/// `origin + (r + v sin a)(cos u x + sin u y) + v cos a z`, with `v`
/// measured along the generatrix and `r` the radius at `v = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicalSurface {
    pub position: Ax3,
    pub radius: f64,
    pub semi_angle: f64,
}

/// `origin + r cos v (cos u x + sin u y) + r sin v z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalSurface {
    pub position: Ax3,
    pub radius: f64,
}

/// `origin + (R + r cos v)(cos u x + sin u y) + r sin v z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToroidalSurface {
    pub position: Ax3,
    pub major_radius: f64,
    pub minor_radius: f64,
}

fn radial(a: &Ax3, u: f64) -> Vec3 {
    a.x_dir * u.cos() + a.y_dir * u.sin()
}

fn radial_du(a: &Ax3, u: f64) -> Vec3 {
    a.x_dir * -u.sin() + a.y_dir * u.cos()
}

/// Polar angle of local `(x, y)` in `[0, 2π)`.
fn angle(x: f64, y: f64) -> f64 {
    wrap_into(y.atan2(x), 0.0, TAU)
}

impl Surface {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Surface::Plane(_) => "plane",
            Surface::Cylinder(_) => "cylinder",
            Surface::Cone(_) => "cone",
            Surface::Sphere(_) => "sphere",
            Surface::Torus(_) => "torus",
            Surface::Bezier(_) => "bezier",
            Surface::BSpline(_) => "bspline",
        }
    }

    pub fn position(&self) -> Option<&Ax3> {
        match self {
            Surface::Plane(s) => Some(&s.position),
            Surface::Cylinder(s) => Some(&s.position),
            Surface::Cone(s) => Some(&s.position),
            Surface::Sphere(s) => Some(&s.position),
            Surface::Torus(s) => Some(&s.position),
            Surface::Bezier(_) | Surface::BSpline(_) => None,
        }
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        match self {
            Surface::Plane(s) => s.position.to_global(u, v, 0.0),
            Surface::Cylinder(s) => {
                s.position.origin + radial(&s.position, u) * s.radius + s.position.z_dir * v
            }
            Surface::Cone(s) => {
                let r = s.radius + v * s.semi_angle.sin();
                s.position.origin
                    + radial(&s.position, u) * r
                    + s.position.z_dir * (v * s.semi_angle.cos())
            }
            Surface::Sphere(s) => {
                s.position.origin
                    + radial(&s.position, u) * (s.radius * v.cos())
                    + s.position.z_dir * (s.radius * v.sin())
            }
            Surface::Torus(s) => {
                s.position.origin
                    + radial(&s.position, u) * (s.major_radius + s.minor_radius * v.cos())
                    + s.position.z_dir * (s.minor_radius * v.sin())
            }
            Surface::Bezier(n) | Surface::BSpline(n) => n.evaluate(u, v),
        }
    }

    /// First partial derivatives `(dS/du, dS/dv)`.
    pub fn derivatives(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        match self {
            Surface::Plane(s) => (s.position.x_dir, s.position.y_dir),
            Surface::Cylinder(s) => (radial_du(&s.position, u) * s.radius, s.position.z_dir),
            Surface::Cone(s) => {
                let (sa, ca) = s.semi_angle.sin_cos();
                let r = s.radius + v * sa;
                (
                    radial_du(&s.position, u) * r,
                    radial(&s.position, u) * sa + s.position.z_dir * ca,
                )
            }
            Surface::Sphere(s) => (
                radial_du(&s.position, u) * (s.radius * v.cos()),
                radial(&s.position, u) * (-s.radius * v.sin()) + s.position.z_dir * (s.radius * v.cos()),
            ),
            Surface::Torus(s) => (
                radial_du(&s.position, u) * (s.major_radius + s.minor_radius * v.cos()),
                radial(&s.position, u) * (-s.minor_radius * v.sin())
                    + s.position.z_dir * (s.minor_radius * v.cos()),
            ),
            Surface::Bezier(n) | Surface::BSpline(n) => n.derivatives(u, v),
        }
    }

    /// Unit natural normal `dS/du x dS/dv`. At singular points (sphere
    /// poles, cone apex) the normal of a nearby regular point is used.
    pub fn normal(&self, u: f64, v: f64) -> Vec3 {
        let (du, dv) = self.derivatives(u, v);
        if let Some(n) = du.cross(&dv).normalized() {
            return n;
        }
        let ((_, _), (v0, v1)) = self.parameter_bounds();
        let mid = if v0.is_finite() && v1.is_finite() {
            (v0 + v1) / 2.0
        } else {
            0.0
        };
        let nudged = v + (mid - v).signum() * 1e-6;
        let (du, dv) = self.derivatives(u, nudged);
        du.cross(&dv).normalized_or(Vec3::Z)
    }

    /// Natural parameter bounds; infinite where the surface is unbounded.
    pub fn parameter_bounds(&self) -> ((f64, f64), (f64, f64)) {
        let inf = (f64::NEG_INFINITY, f64::INFINITY);
        match self {
            Surface::Plane(_) => (inf, inf),
            Surface::Cylinder(_) | Surface::Cone(_) => ((0.0, TAU), inf),
            Surface::Sphere(_) => ((0.0, TAU), (-FRAC_PI_2, FRAC_PI_2)),
            Surface::Torus(_) => ((0.0, TAU), (0.0, TAU)),
            Surface::Bezier(n) | Surface::BSpline(n) => (n.domain_u(), n.domain_v()),
        }
    }

    pub fn u_period(&self) -> Option<f64> {
        match self {
            Surface::Plane(_) => None,
            Surface::Cylinder(_) | Surface::Cone(_) | Surface::Sphere(_) | Surface::Torus(_) => {
                Some(TAU)
            }
            Surface::Bezier(n) | Surface::BSpline(n) => n.periodic_u.then(|| {
                let (a, b) = n.domain_u();
                b - a
            }),
        }
    }

    pub fn v_period(&self) -> Option<f64> {
        match self {
            Surface::Torus(_) => Some(TAU),
            Surface::Bezier(n) | Surface::BSpline(n) => n.periodic_v.then(|| {
                let (a, b) = n.domain_v();
                b - a
            }),
            _ => None,
        }
    }

    /// Parameters of the surface point closest to `p`. Periodic parameters
    /// are returned in their base period.
    pub fn parameters_of(&self, p: &Point3d) -> Point2d {
        match self {
            Surface::Plane(s) => {
                let (x, y, _) = s.position.to_local(p);
                Point2d::new(x, y)
            }
            Surface::Cylinder(s) => {
                let (x, y, z) = s.position.to_local(p);
                Point2d::new(angle(x, y), z)
            }
            Surface::Cone(s) => {
                let (x, y, z) = s.position.to_local(p);
                let rho = (x * x + y * y).sqrt();
                let (sa, ca) = s.semi_angle.sin_cos();
                Point2d::new(angle(x, y), (rho - s.radius) * sa + z * ca)
            }
            Surface::Sphere(s) => {
                let (x, y, z) = s.position.to_local(p);
                let rho = (x * x + y * y).sqrt();
                Point2d::new(angle(x, y), z.atan2(rho))
            }
            Surface::Torus(s) => {
                let (x, y, z) = s.position.to_local(p);
                let rho = (x * x + y * y).sqrt();
                Point2d::new(angle(x, y), angle(rho - s.major_radius, z))
            }
            Surface::Bezier(n) | Surface::BSpline(n) => invert_nurbs(n, p),
        }
    }

    pub fn closest_point(&self, p: &Point3d) -> Point3d {
        let uv = self.parameters_of(p);
        self.evaluate(uv.x, uv.y)
    }

    /// Radius of the circle traced by the u iso-line at `v`, when that
    /// iso-line is a circle.
    pub fn u_iso_radius(&self, v: f64) -> Option<f64> {
        match self {
            Surface::Cylinder(s) => Some(s.radius),
            Surface::Cone(s) => Some((s.radius + v * s.semi_angle.sin()).abs()),
            Surface::Sphere(s) => Some((s.radius * v.cos()).abs()),
            Surface::Torus(s) => Some(s.major_radius + s.minor_radius * v.cos()),
            _ => None,
        }
    }

    /// Radius of the circle traced by a v iso-line, when it is a circle.
    pub fn v_iso_radius(&self) -> Option<f64> {
        match self {
            Surface::Sphere(s) => Some(s.radius),
            Surface::Torus(s) => Some(s.minor_radius),
            _ => None,
        }
    }

    /// Exact NURBS form over the given parameter rectangle.
    pub fn to_nurbs(&self, ur: (f64, f64), vr: (f64, f64)) -> NurbsSurface {
        let arc = |t0: f64, t1: f64| {
            NurbsCurve::elliptic_arc(Point3d::ORIGIN, Vec3::X, Vec3::Y, 1.0, 1.0, t0, t1)
        };
        match self {
            Surface::Plane(s) => {
                let us = NurbsCurve::segment(
                    Point3d::new(ur.0, 0.0, 0.0),
                    Point3d::new(ur.1, 0.0, 0.0),
                    ur.0,
                    ur.1,
                );
                let vs = NurbsCurve::segment(
                    Point3d::new(0.0, vr.0, 0.0),
                    Point3d::new(0.0, vr.1, 0.0),
                    vr.0,
                    vr.1,
                );
                NurbsSurface::tensor(&us, &vs, |a, b| s.position.to_global(a.x, b.y, 0.0))
            }
            Surface::Cylinder(s) => {
                let profile = NurbsCurve::segment(
                    Point3d::new(s.radius, 0.0, vr.0),
                    Point3d::new(s.radius, 0.0, vr.1),
                    vr.0,
                    vr.1,
                );
                revolve(&s.position, &arc(ur.0, ur.1), &profile)
            }
            Surface::Cone(s) => {
                let (sa, ca) = s.semi_angle.sin_cos();
                let profile = NurbsCurve::segment(
                    Point3d::new(s.radius + vr.0 * sa, 0.0, vr.0 * ca),
                    Point3d::new(s.radius + vr.1 * sa, 0.0, vr.1 * ca),
                    vr.0,
                    vr.1,
                );
                revolve(&s.position, &arc(ur.0, ur.1), &profile)
            }
            Surface::Sphere(s) => {
                let profile = NurbsCurve::elliptic_arc(
                    Point3d::ORIGIN,
                    Vec3::X,
                    Vec3::Z,
                    s.radius,
                    s.radius,
                    vr.0,
                    vr.1,
                );
                revolve(&s.position, &arc(ur.0, ur.1), &profile)
            }
            Surface::Torus(s) => {
                let profile = NurbsCurve::elliptic_arc(
                    Point3d::new(s.major_radius, 0.0, 0.0),
                    Vec3::X,
                    Vec3::Z,
                    s.minor_radius,
                    s.minor_radius,
                    vr.0,
                    vr.1,
                );
                revolve(&s.position, &arc(ur.0, ur.1), &profile)
            }
            Surface::Bezier(n) | Surface::BSpline(n) => n.clone(),
        }
    }

    /// Apply `t`. Similarities keep the analytic form; other affine maps
    /// convert to NURBS over `bounds`.
    pub fn transformed(&self, t: &Transform, bounds: ((f64, f64), (f64, f64))) -> Surface {
        let Some(s) = t.similarity_scale() else {
            return Surface::BSpline(self.to_nurbs(bounds.0, bounds.1).transformed(t));
        };
        match self {
            Surface::Plane(p) => Surface::Plane(PlaneSurface {
                position: p.position.transformed(t),
            }),
            Surface::Cylinder(c) => Surface::Cylinder(CylindricalSurface {
                position: c.position.transformed(t),
                radius: c.radius * s,
            }),
            Surface::Cone(c) => Surface::Cone(ConicalSurface {
                position: c.position.transformed(t),
                radius: c.radius * s,
                semi_angle: c.semi_angle,
            }),
            Surface::Sphere(c) => Surface::Sphere(SphericalSurface {
                position: c.position.transformed(t),
                radius: c.radius * s,
            }),
            Surface::Torus(c) => Surface::Torus(ToroidalSurface {
                position: c.position.transformed(t),
                major_radius: c.major_radius * s,
                minor_radius: c.minor_radius * s,
            }),
            Surface::Bezier(n) => Surface::Bezier(n.transformed(t)),
            Surface::BSpline(n) => Surface::BSpline(n.transformed(t)),
        }
    }

    /// How a similarity with scale `s` stretches `(u, v)`.
    pub fn parameter_scale(&self, s: f64) -> (f64, f64) {
        match self {
            Surface::Plane(_) => (s, s),
            Surface::Cylinder(_) | Surface::Cone(_) => (1.0, s),
            _ => (1.0, 1.0),
        }
    }
}

/// Surface of revolution of a `(rho, 0, z)` profile about the z axis of
/// `position`, swept along the unit-circle arc `around`.
fn revolve(position: &Ax3, around: &NurbsCurve, profile: &NurbsCurve) -> NurbsSurface {
    NurbsSurface::tensor(around, profile, |c, m| {
        position.to_global(c.x * m.x, c.y * m.x, m.z)
    })
}

/// Closest-point inversion by a grid seed and Gauss-Newton steps.
fn invert_nurbs(n: &NurbsSurface, p: &Point3d) -> Point2d {
    let (u0, u1) = n.domain_u();
    let (v0, v1) = n.domain_v();
    let grid = 16;
    let mut best = (u0, v0, f64::INFINITY);
    for i in 0..=grid {
        for j in 0..=grid {
            let u = u0 + (u1 - u0) * i as f64 / grid as f64;
            let v = v0 + (v1 - v0) * j as f64 / grid as f64;
            let d = n.evaluate(u, v).distance_squared_to(p);
            if d < best.2 {
                best = (u, v, d);
            }
        }
    }
    let (mut u, mut v) = (best.0, best.1);
    for _ in 0..30 {
        let r = n.evaluate(u, v) - *p;
        let (su, sv) = n.derivatives(u, v);
        let (a, b, c) = (su.dot(&su), su.dot(&sv), sv.dot(&sv));
        let (f, g) = (r.dot(&su), r.dot(&sv));
        let det = a * c - b * b;
        if det.abs() < 1e-300 {
            break;
        }
        let du = (c * f - b * g) / det;
        let dv = (a * g - b * f) / det;
        u = (u - du).clamp(u0, u1);
        v = (v - dv).clamp(v0, v1);
        if du.abs() < 1e-14 && dv.abs() < 1e-14 {
            break;
        }
    }
    Point2d::new(u, v)
}
