use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// A 4x4 affine transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: Matrix4<f64>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            m: Matrix4::identity(),
        }
    }

    /// Build from row-major entries.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self {
            m: Matrix4::from_fn(|r, c| rows[r][c]),
        }
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.m[(r, c)];
            }
        }
        rows
    }

    pub fn translation(v: Vec3) -> Self {
        Self {
            m: Matrix4::new_translation(&Vector3::new(v.x, v.y, v.z)),
        }
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            m: Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz)),
        }
    }

    pub fn uniform_scaling(s: f64) -> Self {
        Self::scaling(s, s, s)
    }

    /// Rotation by `angle` radians about the axis through `origin`.
    pub fn rotation(origin: Point3d, axis: Vec3, angle: f64) -> Self {
        let axis = Unit::new_normalize(Vector3::new(axis.x, axis.y, axis.z));
        let r = Rotation3::from_axis_angle(&axis, angle).to_homogeneous();
        let to = Matrix4::new_translation(&Vector3::new(origin.x, origin.y, origin.z));
        let from = Matrix4::new_translation(&Vector3::new(-origin.x, -origin.y, -origin.z));
        Self { m: to * r * from }
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        Transform { m: next.m * self.m }
    }

    pub fn inverse(&self) -> Option<Self> {
        self.m.try_inverse().map(|m| Self { m })
    }

    fn linear(&self) -> Matrix3<f64> {
        self.m.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Determinant of the linear part. Negative for mirroring transforms.
    pub fn determinant(&self) -> f64 {
        self.linear().determinant()
    }

    /// Scale factor when the transform is a similarity (rotation, mirror,
    /// uniform scale and translation), `None` otherwise.
    pub fn similarity_scale(&self) -> Option<f64> {
        let l = self.linear();
        let g = l.transpose() * l;
        let s2 = g[(0, 0)];
        if s2 <= 1e-300 {
            return None;
        }
        let tol = 1e-9 * s2;
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { s2 } else { 0.0 };
                if (g[(r, c)] - expected).abs() > tol {
                    return None;
                }
            }
        }
        let last_row_ok = self.m[(3, 0)].abs() < 1e-12
            && self.m[(3, 1)].abs() < 1e-12
            && self.m[(3, 2)].abs() < 1e-12
            && (self.m[(3, 3)] - 1.0).abs() < 1e-12;
        last_row_ok.then(|| s2.sqrt())
    }

    pub fn is_identity(&self) -> bool {
        (self.m - Matrix4::identity()).amax() < 1e-15
    }

    /// Transform a point (applies translation).
    pub fn transform_point(&self, p: &Point3d) -> Point3d {
        let h = self.m * nalgebra::Vector4::new(p.x, p.y, p.z, 1.0);
        let w = if h.w.abs() < 1e-300 { 1.0 } else { h.w };
        Point3d::new(h.x / w, h.y / w, h.z / w)
    }

    /// Transform a vector (no translation).
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let r = self.linear() * Vector3::new(v.x, v.y, v.z);
        Vec3::new(r.x, r.y, r.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut bb = *self;
        bb.expand_to_include(&other.min);
        bb.expand_to_include(&other.max);
        bb
    }

    /// Overlap of two boxes, `None` when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let bb = Self {
            min: Point3d::new(
                self.min.x.max(other.min.x),
                self.min.y.max(other.min.y),
                self.min.z.max(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.min(other.max.x),
                self.max.y.min(other.max.y),
                self.max.z.min(other.max.z),
            ),
        };
        bb.is_valid().then_some(bb)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.intersection(other).is_some()
    }

    pub fn contains_point(&self, p: &Point3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn center(&self) -> Point3d {
        self.min.midpoint(&self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    pub fn diagonal(&self) -> f64 {
        self.size().length()
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    pub fn corners(&self) -> [Point3d; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3d::new(a.x, a.y, a.z),
            Point3d::new(b.x, a.y, a.z),
            Point3d::new(b.x, b.y, a.z),
            Point3d::new(a.x, b.y, a.z),
            Point3d::new(a.x, a.y, b.z),
            Point3d::new(b.x, a.y, b.z),
            Point3d::new(b.x, b.y, b.z),
            Point3d::new(a.x, b.y, b.z),
        ]
    }
}
