pub mod curves;
pub mod curves2d;
pub mod frame;
pub mod nurbs;
pub mod point;
pub mod surfaces;
pub mod transform;
pub mod vector;

pub use curves::{Circle3d, Curve, Ellipse3d, Hyperbola3d, Line3d, Parabola3d};
pub use curves2d::{Circle2d, Curve2d, Ellipse2d, Line2d};
pub use frame::Ax3;
pub use nurbs::{NurbsCurve, NurbsSurface};
pub use point::{Point2d, Point3d};
pub use surfaces::{
    ConicalSurface, CylindricalSurface, PlaneSurface, SphericalSurface, Surface, ToroidalSurface,
};
pub use transform::{BoundingBox, Transform};
pub use vector::{Vec2, Vec3};
