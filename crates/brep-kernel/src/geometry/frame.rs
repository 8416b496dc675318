use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::transform::Transform;
use super::vector::Vec3;

/// A local coordinate system placing an analytic curve or surface.
///
/// The three directions are unit and mutually orthogonal. The system is
/// usually right-handed; mirroring transforms produce a left-handed one,
/// which flips the natural normal of surfaces placed by it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ax3 {
    pub origin: Point3d,
    pub x_dir: Vec3,
    pub y_dir: Vec3,
    pub z_dir: Vec3,
}

impl Ax3 {
    /// Right-handed system from a main direction and an x reference. The x
    /// reference is projected to be orthogonal to `z`.
    pub fn new(origin: Point3d, z: Vec3, x_ref: Vec3) -> Self {
        let z_dir = z.normalized_or(Vec3::Z);
        let x_proj = x_ref - z_dir * x_ref.dot(&z_dir);
        let x_dir = x_proj
            .normalized()
            .unwrap_or_else(|| z_dir.any_perpendicular());
        let y_dir = z_dir.cross(&x_dir);
        Self {
            origin,
            x_dir,
            y_dir,
            z_dir,
        }
    }

    /// Right-handed system with an arbitrary x direction.
    pub fn from_normal(origin: Point3d, z: Vec3) -> Self {
        let z_dir = z.normalized_or(Vec3::Z);
        Self::new(origin, z_dir, z_dir.any_perpendicular())
    }

    pub fn world() -> Self {
        Self::new(Point3d::ORIGIN, Vec3::Z, Vec3::X)
    }

    pub fn is_direct(&self) -> bool {
        self.x_dir.cross(&self.y_dir).dot(&self.z_dir) > 0.0
    }

    pub fn to_global(&self, x: f64, y: f64, z: f64) -> Point3d {
        self.origin + self.x_dir * x + self.y_dir * y + self.z_dir * z
    }

    pub fn to_local(&self, p: &Point3d) -> (f64, f64, f64) {
        let d = *p - self.origin;
        (d.dot(&self.x_dir), d.dot(&self.y_dir), d.dot(&self.z_dir))
    }

    /// Move the system with a similarity transform. Directions are
    /// renormalized, so lengths measured in the system scale by the
    /// transform's scale factor.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            origin: t.transform_point(&self.origin),
            x_dir: t.transform_vector(&self.x_dir).normalized_or(Vec3::X),
            y_dir: t.transform_vector(&self.y_dir).normalized_or(Vec3::Y),
            z_dir: t.transform_vector(&self.z_dir).normalized_or(Vec3::Z),
        }
    }

    /// The transform mapping world coordinates onto this system.
    pub fn to_transform(&self) -> Transform {
        let (x, y, z, o) = (self.x_dir, self.y_dir, self.z_dir, self.origin);
        Transform::from_rows([
            [x.x, y.x, z.x, o.x],
            [x.y, y.y, z.y, o.y],
            [x.z, y.z, z.z, o.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}

impl Default for Ax3 {
    fn default() -> Self {
        Self::world()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_orthogonalizes() {
        let a = Ax3::new(Point3d::ORIGIN, Vec3::Z, Vec3::new(1.0, 0.0, 1.0));
        assert!(a.x_dir.dot(&a.z_dir).abs() < 1e-12);
        assert!(a.is_direct());
    }

    #[test]
    fn test_round_trip_local() {
        let a = Ax3::new(Point3d::new(1.0, 2.0, 3.0), Vec3::X, Vec3::Y);
        let p = a.to_global(0.5, -1.0, 2.0);
        let (x, y, z) = a.to_local(&p);
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y + 1.0).abs() < 1e-12);
        assert!((z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mirror_makes_indirect() {
        let a = Ax3::world().transformed(&Transform::scaling(-1.0, 1.0, 1.0));
        assert!(!a.is_direct());
    }
}
