use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::frame::Frame;
use crate::point::{Point, Vector};

/// An infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: Point,
    pub normal: Vector,
}

impl Plane {
    pub fn new(point: Point, normal: Vector) -> Self {
        Self {
            point,
            normal: normal.unitized().unwrap_or_else(Vector::zaxis),
        }
    }

    pub fn worldxy() -> Self {
        Self::new(Point::origin(), Vector::zaxis())
    }

    pub fn from_frame(frame: &Frame) -> Self {
        Self::new(frame.point, frame.zaxis())
    }

    /// Signed distance of `p` along the normal.
    pub fn signed_distance(&self, p: &Point) -> f64 {
        (*p - self.point).dot(&self.normal)
    }
}

/// An axis-aligned box in the local coordinates of `frame`, centered on its origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub frame: Frame,
    pub xsize: f64,
    pub ysize: f64,
    pub zsize: f64,
}

impl Cuboid {
    pub fn new(frame: Frame, xsize: f64, ysize: f64, zsize: f64) -> Self {
        Self {
            frame,
            xsize,
            ysize,
            zsize,
        }
    }

    /// Box spanning `min` to `max` along the world axes.
    pub fn from_corners(min: Point, max: Point) -> Self {
        let size = max - min;
        Self::new(
            Frame {
                point: min.midpoint(&max),
                ..Frame::worldxy()
            },
            size.x.abs(),
            size.y.abs(),
            size.z.abs(),
        )
    }

    pub fn volume(&self) -> f64 {
        self.xsize * self.ysize * self.zsize
    }

    pub fn area(&self) -> f64 {
        2.0 * (self.xsize * self.ysize + self.ysize * self.zsize + self.xsize * self.zsize)
    }
}

/// A solid cylinder whose axis is the z axis of `frame`, centered on its origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub frame: Frame,
    pub radius: f64,
    pub height: f64,
}

impl Cylinder {
    pub fn new(frame: Frame, radius: f64, height: f64) -> Self {
        Self {
            frame,
            radius,
            height,
        }
    }

    pub fn volume(&self) -> f64 {
        PI * self.radius * self.radius * self.height
    }

    pub fn area(&self) -> f64 {
        2.0 * PI * self.radius * (self.radius + self.height)
    }
}

/// A solid cone with its base circle in the XY plane of `frame` and its apex
/// at `height` along the z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    pub frame: Frame,
    pub radius: f64,
    pub height: f64,
}

impl Cone {
    pub fn new(frame: Frame, radius: f64, height: f64) -> Self {
        Self {
            frame,
            radius,
            height,
        }
    }

    pub fn volume(&self) -> f64 {
        PI * self.radius * self.radius * self.height / 3.0
    }
}

/// A sphere centered on the origin of `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub frame: Frame,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            frame: Frame {
                point: center,
                ..Frame::worldxy()
            },
            radius,
        }
    }

    pub fn center(&self) -> Point {
        self.frame.point
    }

    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius.powi(3)
    }

    pub fn area(&self) -> f64 {
        4.0 * PI * self.radius * self.radius
    }
}

/// A torus around the z axis of `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Torus {
    pub frame: Frame,
    pub radius_axis: f64,
    pub radius_pipe: f64,
}

impl Torus {
    pub fn new(frame: Frame, radius_axis: f64, radius_pipe: f64) -> Self {
        Self {
            frame,
            radius_axis,
            radius_pipe,
        }
    }

    pub fn volume(&self) -> f64 {
        2.0 * PI * PI * self.radius_axis * self.radius_pipe * self.radius_pipe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_signed_distance() {
        let p = Plane::new(Point::new(0.0, 0.0, 1.0), Vector::new(0.0, 0.0, 2.0));
        assert_relative_eq!(p.signed_distance(&Point::new(5.0, 5.0, 3.0)), 2.0);
    }

    #[test]
    fn test_box_from_corners() {
        let b = Cuboid::from_corners(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 2.0, 3.0));
        assert_relative_eq!(b.volume(), 6.0);
        assert_relative_eq!(b.frame.point.y, 1.0);
    }

    #[test]
    fn test_shape_serde_shape() {
        let s = Sphere::new(Point::new(1.0, 0.0, 0.0), 2.0);
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["radius"], 2.0);
        assert_eq!(json["frame"]["point"]["x"], 1.0);
    }
}
