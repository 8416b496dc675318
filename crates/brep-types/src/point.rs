use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

use crate::frame::Transformation;

/// A location in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (*other - *self).length()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new(
            (self.x + other.x) * 0.5,
            (self.y + other.y) * 0.5,
            (self.z + other.z) * 0.5,
        )
    }

    /// Average of a set of points. Returns the origin for an empty set.
    pub fn centroid(points: &[Point]) -> Point {
        if points.is_empty() {
            return Point::origin();
        }
        let n = points.len() as f64;
        let (x, y, z) = points
            .iter()
            .fold((0.0, 0.0, 0.0), |acc, p| (acc.0 + p.x, acc.1 + p.y, acc.2 + p.z));
        Point::new(x / n, y / n, z / n)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn to_vector(&self) -> Vector {
        Vector::new(self.x, self.y, self.z)
    }

    pub fn transformed(&self, t: &Transformation) -> Point {
        t.apply_point(self)
    }
}

impl From<[f64; 3]> for Point {
    fn from(a: [f64; 3]) -> Self {
        Point::new(a[0], a[1], a[2])
    }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, rhs: Vector) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Vector> for Point {
    type Output = Point;
    fn sub(self, rhs: Vector) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, rhs: Point) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A direction with magnitude in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xaxis() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn yaxis() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn zaxis() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector) -> Vector {
        Vector::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Unit vector in the same direction, or `None` for a zero vector.
    pub fn unitized(&self) -> Option<Vector> {
        let len = self.length();
        if len < 1e-15 {
            None
        } else {
            Some(*self * (1.0 / len))
        }
    }

    pub fn scaled(&self, factor: f64) -> Vector {
        *self * factor
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn transformed(&self, t: &Transformation) -> Vector {
        t.apply_vector(self)
    }
}

impl From<[f64; 3]> for Vector {
    fn from(a: [f64; 3]) -> Self {
        Vector::new(a[0], a[1], a[2])
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centroid_of_square() {
        let pts = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 2.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ];
        let c = Point::centroid(&pts);
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
    }

    #[test]
    fn test_cross_is_right_handed() {
        let z = Vector::xaxis().cross(&Vector::yaxis());
        assert_relative_eq!(z.z, 1.0);
    }

    #[test]
    fn test_zero_vector_has_no_unit() {
        assert!(Vector::default().unitized().is_none());
    }
}
