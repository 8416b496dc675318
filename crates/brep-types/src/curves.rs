use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::frame::{Frame, Transformation};
use crate::point::{Point, Vector};

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> Vector {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.direction().length()
    }

    pub fn point_at(&self, t: f64) -> Point {
        self.start + self.direction() * t
    }

    pub fn transformed(&self, t: &Transformation) -> Line {
        Line::new(t.apply_point(&self.start), t.apply_point(&self.end))
    }
}

/// A circle in the XY plane of `frame`, centered at its origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub frame: Frame,
    pub radius: f64,
}

impl Circle {
    pub fn new(frame: Frame, radius: f64) -> Self {
        Self { frame, radius }
    }

    pub fn center(&self) -> Point {
        self.frame.point
    }

    pub fn normal(&self) -> Vector {
        self.frame.zaxis()
    }

    pub fn circumference(&self) -> f64 {
        2.0 * PI * self.radius
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    pub fn point_at(&self, angle: f64) -> Point {
        self.frame
            .to_world(self.radius * angle.cos(), self.radius * angle.sin(), 0.0)
    }
}

/// An ellipse in the XY plane of `frame`, major axis along the frame's x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub frame: Frame,
    pub major: f64,
    pub minor: f64,
}

impl Ellipse {
    pub fn new(frame: Frame, major: f64, minor: f64) -> Self {
        Self {
            frame,
            major,
            minor,
        }
    }

    pub fn point_at(&self, angle: f64) -> Point {
        self.frame
            .to_world(self.major * angle.cos(), self.minor * angle.sin(), 0.0)
    }
}

/// One branch of a hyperbola, opening along the frame's x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperbola {
    pub frame: Frame,
    pub major: f64,
    pub minor: f64,
}

impl Hyperbola {
    pub fn new(frame: Frame, major: f64, minor: f64) -> Self {
        Self {
            frame,
            major,
            minor,
        }
    }

    pub fn point_at(&self, t: f64) -> Point {
        self.frame
            .to_world(self.major * t.cosh(), self.minor * t.sinh(), 0.0)
    }
}

/// A parabola with its apex at the frame origin, symmetric about the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parabola {
    pub frame: Frame,
    pub focal: f64,
}

impl Parabola {
    pub fn new(frame: Frame, focal: f64) -> Self {
        Self { frame, focal }
    }

    pub fn point_at(&self, t: f64) -> Point {
        self.frame.to_world(t * t / (4.0 * self.focal), t, 0.0)
    }
}

/// An open or closed chain of points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) if self.points.len() > 2 => a.distance_to(b) < 1e-9,
            _ => false,
        }
    }

    pub fn lines(&self) -> Vec<Line> {
        self.points.windows(2).map(|w| Line::new(w[0], w[1])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circle_point_at_quarter() {
        let c = Circle::new(Frame::worldxy(), 2.0);
        let p = c.point_at(PI / 2.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polyline_closed() {
        let p = Polyline::new(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 0.0),
        ]);
        assert!(p.is_closed());
        assert_eq!(p.lines().len(), 3);
    }
}
