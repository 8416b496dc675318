//! Stateless conversions between the domain primitives of `brep-types` and
//! the native geometry of the kernel.

use brep_kernel::geometry::{
    Ax3, Circle2d, Circle3d, Curve2d, Ellipse2d, Ellipse3d, Hyperbola3d, Line2d, Line3d,
    Parabola3d, Point2d, Point3d, Transform, Vec2, Vec3,
};
use brep_types::{
    Circle, Cone, Cuboid, Cylinder, Ellipse, Frame, Hyperbola, Line, Parabola, Plane, Point,
    Transformation, Vector,
};

// ─── Points, vectors, frames ─────────────────────────────────────────────────

pub fn point_to_kernel(p: &Point) -> Point3d {
    Point3d::new(p.x, p.y, p.z)
}

pub fn point_from_kernel(p: &Point3d) -> Point {
    Point::new(p.x, p.y, p.z)
}

pub fn point2d_to_kernel(p: &Point) -> Point2d {
    Point2d::new(p.x, p.y)
}

pub fn point2d_from_kernel(p: &Point2d) -> Point {
    Point::new(p.x, p.y, 0.0)
}

pub fn vector_to_kernel(v: &Vector) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn vector_from_kernel(v: &Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

pub fn frame_to_kernel(f: &Frame) -> Ax3 {
    Ax3::new(
        point_to_kernel(&f.point),
        vector_to_kernel(&f.zaxis()),
        vector_to_kernel(&f.xaxis),
    )
}

pub fn frame_from_kernel(a: &Ax3) -> Frame {
    Frame {
        point: point_from_kernel(&a.origin),
        xaxis: vector_from_kernel(&a.x_dir),
        yaxis: vector_from_kernel(&a.y_dir),
    }
}

pub fn plane_to_kernel(p: &Plane) -> Ax3 {
    Ax3::from_normal(point_to_kernel(&p.point), vector_to_kernel(&p.normal))
}

pub fn plane_from_kernel(a: &Ax3) -> Plane {
    Plane::new(point_from_kernel(&a.origin), vector_from_kernel(&a.z_dir))
}

pub fn transformation_to_kernel(t: &Transformation) -> Transform {
    Transform::from_rows(t.matrix)
}

pub fn transformation_from_kernel(t: &Transform) -> Transformation {
    Transformation {
        matrix: t.to_rows(),
    }
}

// ─── Curves ──────────────────────────────────────────────────────────────────

/// A segment as an arc-length parameterized line and its range.
pub fn line_to_kernel(l: &Line) -> (Line3d, (f64, f64)) {
    let a = point_to_kernel(&l.start);
    let b = point_to_kernel(&l.end);
    (Line3d::from_points(a, b), (0.0, a.distance_to(&b)))
}

pub fn line_from_kernel(l: &Line3d, range: (f64, f64)) -> Line {
    Line::new(
        point_from_kernel(&l.evaluate(range.0)),
        point_from_kernel(&l.evaluate(range.1)),
    )
}

pub fn circle_to_kernel(c: &Circle) -> Circle3d {
    Circle3d::new(frame_to_kernel(&c.frame), c.radius)
}

pub fn circle_from_kernel(c: &Circle3d) -> Circle {
    Circle::new(frame_from_kernel(&c.position), c.radius)
}

pub fn ellipse_to_kernel(e: &Ellipse) -> Ellipse3d {
    Ellipse3d {
        position: frame_to_kernel(&e.frame),
        major_radius: e.major,
        minor_radius: e.minor,
    }
}

pub fn ellipse_from_kernel(e: &Ellipse3d) -> Ellipse {
    Ellipse::new(frame_from_kernel(&e.position), e.major_radius, e.minor_radius)
}

pub fn hyperbola_to_kernel(h: &Hyperbola) -> Hyperbola3d {
    Hyperbola3d {
        position: frame_to_kernel(&h.frame),
        major_radius: h.major,
        minor_radius: h.minor,
    }
}

pub fn hyperbola_from_kernel(h: &Hyperbola3d) -> Hyperbola {
    Hyperbola::new(frame_from_kernel(&h.position), h.major_radius, h.minor_radius)
}

pub fn parabola_to_kernel(p: &Parabola) -> Parabola3d {
    Parabola3d {
        position: frame_to_kernel(&p.frame),
        focal: p.focal,
    }
}

pub fn parabola_from_kernel(p: &Parabola3d) -> Parabola {
    Parabola::new(frame_from_kernel(&p.position), p.focal)
}

// ─── Curves in a parameter plane ─────────────────────────────────────────────
//
// Parameter-plane curves travel as the 3D primitives with z = 0. A circle or
// ellipse runs counter-clockwise when its frame's z axis points up.

pub fn line2d_to_kernel(l: &Line, range: (f64, f64)) -> Curve2d {
    Curve2d::line(
        point2d_to_kernel(&l.start),
        point2d_to_kernel(&l.end),
        range.0,
        range.1,
    )
}

pub fn line2d_from_kernel(l: &Line2d, range: (f64, f64)) -> Line {
    let at = |t: f64| Point::new(l.origin.x + l.direction.x * t, l.origin.y + l.direction.y * t, 0.0);
    Line::new(at(range.0), at(range.1))
}

fn planar_x(frame: &Frame) -> Vec2 {
    Vec2::new(frame.xaxis.x, frame.xaxis.y)
        .normalized()
        .unwrap_or(Vec2::new(1.0, 0.0))
}

fn frame2d(center: &Point2d, x: &Vec2, ccw: bool) -> Frame {
    let xaxis = Vector::new(x.x, x.y, 0.0);
    let up = if ccw { 1.0 } else { -1.0 };
    Frame::new(
        point2d_from_kernel(center),
        xaxis,
        Vector::new(-x.y * up, x.x * up, 0.0),
    )
}

pub fn circle2d_to_kernel(c: &Circle) -> Curve2d {
    Curve2d::Circle(Circle2d {
        center: point2d_to_kernel(&c.frame.point),
        x_dir: planar_x(&c.frame),
        radius: c.radius,
        ccw: c.frame.zaxis().z >= 0.0,
    })
}

pub fn circle2d_from_kernel(c: &Circle2d) -> Circle {
    Circle::new(frame2d(&c.center, &c.x_dir, c.ccw), c.radius)
}

pub fn ellipse2d_to_kernel(e: &Ellipse) -> Curve2d {
    Curve2d::Ellipse(Ellipse2d {
        center: point2d_to_kernel(&e.frame.point),
        x_dir: planar_x(&e.frame),
        major_radius: e.major,
        minor_radius: e.minor,
        ccw: e.frame.zaxis().z >= 0.0,
    })
}

pub fn ellipse2d_from_kernel(e: &Ellipse2d) -> Ellipse {
    Ellipse::new(
        frame2d(&e.center, &e.x_dir, e.ccw),
        e.major_radius,
        e.minor_radius,
    )
}

// ─── Solid placements ────────────────────────────────────────────────────────

/// Kernel boxes start at a corner; domain boxes are centred on their frame.
pub fn box_corner_frame(b: &Cuboid) -> Ax3 {
    let corner = b.frame.to_world(-b.xsize / 2.0, -b.ysize / 2.0, -b.zsize / 2.0);
    Ax3 {
        origin: point_to_kernel(&corner),
        ..frame_to_kernel(&b.frame)
    }
}

/// Kernel cylinders start at their base circle; domain cylinders are
/// centred on their frame.
pub fn cylinder_base_frame(c: &Cylinder) -> Ax3 {
    let base = c.frame.to_world(0.0, 0.0, -c.height / 2.0);
    Ax3 {
        origin: point_to_kernel(&base),
        ..frame_to_kernel(&c.frame)
    }
}

pub fn cone_base_frame(c: &Cone) -> Ax3 {
    frame_to_kernel(&c.frame)
}
