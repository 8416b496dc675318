use nalgebra::{Matrix4, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::point::{Point, Vector};

/// A right-handed local coordinate system.
///
/// `xaxis` and `yaxis` are kept orthonormal; `zaxis` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub point: Point,
    pub xaxis: Vector,
    pub yaxis: Vector,
}

impl Frame {
    /// Build a frame, orthonormalizing the axes. Degenerate input falls back
    /// to the world axes.
    pub fn new(point: Point, xaxis: Vector, yaxis: Vector) -> Self {
        let x = xaxis.unitized().unwrap_or_else(Vector::xaxis);
        let z = x.cross(&yaxis).unitized();
        match z {
            Some(z) => Self {
                point,
                xaxis: x,
                yaxis: z.cross(&x),
            },
            None => Self {
                point,
                xaxis: x,
                yaxis: Self::from_normal(point, x).xaxis,
            },
        }
    }

    pub fn worldxy() -> Self {
        Self {
            point: Point::origin(),
            xaxis: Vector::xaxis(),
            yaxis: Vector::yaxis(),
        }
    }

    /// Frame at `point` whose z axis is `normal`, with an arbitrary but
    /// deterministic x axis.
    pub fn from_normal(point: Point, normal: Vector) -> Self {
        let z = normal.unitized().unwrap_or_else(Vector::zaxis);
        let helper = if z.x.abs() < 0.9 {
            Vector::xaxis()
        } else {
            Vector::yaxis()
        };
        let y = z.cross(&helper).unitized().unwrap_or_else(Vector::yaxis);
        let x = y.cross(&z);
        Self {
            point,
            xaxis: x,
            yaxis: y,
        }
    }

    pub fn zaxis(&self) -> Vector {
        self.xaxis.cross(&self.yaxis)
    }

    /// Map local coordinates to world coordinates.
    pub fn to_world(&self, x: f64, y: f64, z: f64) -> Point {
        self.point + self.xaxis * x + self.yaxis * y + self.zaxis() * z
    }

    /// Map a world point to local coordinates.
    pub fn to_local(&self, p: &Point) -> Point {
        let d = *p - self.point;
        Point::new(d.dot(&self.xaxis), d.dot(&self.yaxis), d.dot(&self.zaxis()))
    }

    pub fn transformed(&self, t: &Transformation) -> Frame {
        Frame::new(
            t.apply_point(&self.point),
            t.apply_vector(&self.xaxis),
            t.apply_vector(&self.yaxis),
        )
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::worldxy()
    }
}

/// A 4x4 homogeneous transformation, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub matrix: [[f64; 4]; 4],
}

impl Transformation {
    pub fn identity() -> Self {
        Self::from_matrix(Matrix4::identity())
    }

    pub fn from_matrix(m: Matrix4<f64>) -> Self {
        let mut matrix = [[0.0; 4]; 4];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = m[(r, c)];
            }
        }
        Self { matrix }
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|r, c| self.matrix[r][c])
    }

    pub fn translation(v: Vector) -> Self {
        Self::from_matrix(Matrix4::new_translation(&Vector3::new(v.x, v.y, v.z)))
    }

    /// Rotation by `angle` radians about the axis through `point`.
    pub fn rotation(angle: f64, axis: Vector, point: Point) -> Self {
        let axis = Unit::new_normalize(Vector3::new(axis.x, axis.y, axis.z));
        let r = Rotation3::from_axis_angle(&axis, angle).to_homogeneous();
        let to = Matrix4::new_translation(&Vector3::new(point.x, point.y, point.z));
        let from = Matrix4::new_translation(&Vector3::new(-point.x, -point.y, -point.z));
        Self::from_matrix(to * r * from)
    }

    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self::from_matrix(Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz)))
    }

    /// The change of basis that maps the world XY frame onto `frame`.
    pub fn from_frame(frame: &Frame) -> Self {
        let z = frame.zaxis();
        let (x, y, o) = (frame.xaxis, frame.yaxis, frame.point);
        Self {
            matrix: [
                [x.x, y.x, z.x, o.x],
                [x.y, y.y, z.y, o.y],
                [x.z, y.z, z.z, o.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Maps `from` onto `to`.
    pub fn from_frame_to_frame(from: &Frame, to: &Frame) -> Option<Self> {
        let inv = Self::from_frame(from).inverse()?;
        Some(Self::from_frame(to).compose(&inv))
    }

    /// `self * other`: applies `other` first.
    pub fn compose(&self, other: &Transformation) -> Transformation {
        Self::from_matrix(self.to_matrix() * other.to_matrix())
    }

    pub fn inverse(&self) -> Option<Transformation> {
        self.to_matrix().try_inverse().map(Self::from_matrix)
    }

    pub fn apply_point(&self, p: &Point) -> Point {
        let m = &self.matrix;
        let w = m[3][0] * p.x + m[3][1] * p.y + m[3][2] * p.z + m[3][3];
        let w = if w.abs() < 1e-300 { 1.0 } else { w };
        Point::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3]) / w,
            (m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3]) / w,
        )
    }

    pub fn apply_vector(&self, v: &Vector) -> Vector {
        let m = &self.matrix;
        Vector::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_frame_is_orthonormal() {
        let f = Frame::new(
            Point::origin(),
            Vector::new(1.0, 1.0, 0.0),
            Vector::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(f.xaxis.dot(&f.yaxis), 0.0, epsilon = 1e-12);
        assert_relative_eq!(f.zaxis().length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_point() {
        let t = Transformation::rotation(FRAC_PI_2, Vector::zaxis(), Point::new(1.0, 0.0, 0.0));
        let p = t.apply_point(&Point::new(2.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_to_frame_maps_origin() {
        let a = Frame::worldxy();
        let b = Frame::new(Point::new(1.0, 2.0, 3.0), Vector::yaxis(), -Vector::xaxis());
        let t = Transformation::from_frame_to_frame(&a, &b).unwrap();
        let p = t.apply_point(&Point::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-12);
    }
}
