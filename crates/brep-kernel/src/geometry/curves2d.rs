use serde::{Deserialize, Serialize};

use super::nurbs::NurbsCurve;
use super::point::{Point2d, Point3d};
use super::vector::Vec2;

/// A curve in a surface's (u, v) parameter plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve2d {
    /// `origin + t * direction`. The direction is not normalized so that the
    /// parameter can follow the 3D edge it trims.
    Line(Line2d),
    Circle(Circle2d),
    Ellipse(Ellipse2d),
    /// Control points carry `z = 0`.
    BSpline(NurbsCurve),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2d {
    pub origin: Point2d,
    pub direction: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle2d {
    pub center: Point2d,
    /// Unit direction of parameter 0.
    pub x_dir: Vec2,
    pub radius: f64,
    /// Counter-clockwise when true.
    pub ccw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse2d {
    pub center: Point2d,
    pub x_dir: Vec2,
    pub major_radius: f64,
    pub minor_radius: f64,
    pub ccw: bool,
}

fn y_dir(x: Vec2, ccw: bool) -> Vec2 {
    if ccw {
        Vec2::new(-x.y, x.x)
    } else {
        Vec2::new(x.y, -x.x)
    }
}

impl Curve2d {
    pub fn line(a: Point2d, b: Point2d, t0: f64, t1: f64) -> Self {
        let span = t1 - t0;
        let dir = (b - a) * (1.0 / span);
        Curve2d::Line(Line2d {
            origin: Point2d::new(a.x - dir.x * t0, a.y - dir.y * t0),
            direction: dir,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Curve2d::Line(_) => "line",
            Curve2d::Circle(_) => "circle",
            Curve2d::Ellipse(_) => "ellipse",
            Curve2d::BSpline(_) => "bspline",
        }
    }

    pub fn evaluate(&self, t: f64) -> Point2d {
        match self {
            Curve2d::Line(l) => l.origin + l.direction * t,
            Curve2d::Circle(c) => {
                let y = y_dir(c.x_dir, c.ccw);
                c.center + c.x_dir * (c.radius * t.cos()) + y * (c.radius * t.sin())
            }
            Curve2d::Ellipse(e) => {
                let y = y_dir(e.x_dir, e.ccw);
                e.center + e.x_dir * (e.major_radius * t.cos()) + y * (e.minor_radius * t.sin())
            }
            Curve2d::BSpline(n) => n.evaluate(t).to_2d(),
        }
    }

    /// The same curve after scaling the parameter plane by `(su, sv)` and
    /// the curve parameter by `ks`. `None` when the result has no exact
    /// representation of the same kind.
    pub fn scaled(&self, su: f64, sv: f64, ks: f64) -> Option<Curve2d> {
        match self {
            Curve2d::Line(l) => Some(Curve2d::Line(Line2d {
                origin: Point2d::new(l.origin.x * su, l.origin.y * sv),
                direction: Vec2::new(l.direction.x * su / ks, l.direction.y * sv / ks),
            })),
            Curve2d::Circle(c) if (su - sv).abs() < 1e-12 && (ks - 1.0).abs() < 1e-12 => {
                Some(Curve2d::Circle(Circle2d {
                    center: Point2d::new(c.center.x * su, c.center.y * sv),
                    radius: c.radius * su.abs(),
                    ..*c
                }))
            }
            Curve2d::Ellipse(e) if (su - sv).abs() < 1e-12 && (ks - 1.0).abs() < 1e-12 => {
                Some(Curve2d::Ellipse(Ellipse2d {
                    center: Point2d::new(e.center.x * su, e.center.y * sv),
                    major_radius: e.major_radius * su.abs(),
                    minor_radius: e.minor_radius * su.abs(),
                    ..*e
                }))
            }
            Curve2d::BSpline(n) => {
                let mut n = n.clone();
                for p in &mut n.control_points {
                    *p = Point3d::new(p.x * su, p.y * sv, 0.0);
                }
                for k in &mut n.knots {
                    *k *= ks;
                }
                Some(Curve2d::BSpline(n))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_follows_parameter() {
        let l = Curve2d::line(Point2d::new(0.0, 1.0), Point2d::new(4.0, 1.0), 2.0, 4.0);
        let p = l.evaluate(3.0);
        assert!((p.x - 2.0).abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clockwise_circle() {
        let c = Curve2d::Circle(Circle2d {
            center: Point2d::new(0.0, 0.0),
            x_dir: Vec2::new(1.0, 0.0),
            radius: 1.0,
            ccw: false,
        });
        let p = c.evaluate(std::f64::consts::FRAC_PI_2);
        assert!((p.y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_line() {
        let l = Curve2d::line(Point2d::new(0.0, 0.0), Point2d::new(0.0, 1.0), 0.0, 1.0);
        let s = l.scaled(1.0, 2.0, 2.0).unwrap();
        let p = s.evaluate(2.0);
        assert!((p.y - 2.0).abs() < 1e-12);
    }
}
