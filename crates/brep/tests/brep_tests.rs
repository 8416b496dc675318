use std::f64::consts::PI;

use approx::assert_relative_eq;
use brep::{Brep, BrepError, CurveKind, Face, Loop, ShapeKind, SurfaceKind};
use brep_kernel::MockKernel;
use brep_types::{
    Circle, Cone, Cuboid, Cylinder, Frame, Plane, Point, Polygon, Sphere, Torus, Transformation,
    Vector,
};

fn frame_at(x: f64, y: f64, z: f64) -> Frame {
    Frame {
        point: Point::new(x, y, z),
        ..Frame::worldxy()
    }
}

fn tilted_frame() -> Frame {
    Frame::new(
        Point::new(1.0, -2.0, 3.0),
        Vector::new(1.0, 1.0, 0.0),
        Vector::new(-1.0, 1.0, 1.0),
    )
}

fn assert_point(p: Point, q: Point, eps: f64) {
    assert!(
        (p - q).length() < eps,
        "expected {q:?}, got {p:?} (eps {eps})"
    );
}

// ── Primitives ─────────────────────────────────────────────────────────────

#[test]
fn box_volume_and_centroid() {
    let b = Brep::from_box(&Cuboid::new(frame_at(1.0, 2.0, 3.0), 2.0, 3.0, 4.0)).unwrap();
    assert!(b.is_solid().unwrap());
    assert!(b.is_closed().unwrap());
    assert_relative_eq!(b.volume().unwrap(), 24.0, epsilon = 1e-9);
    assert_relative_eq!(b.area().unwrap(), 2.0 * (6.0 + 8.0 + 12.0), epsilon = 1e-9);
    assert_point(b.centroid().unwrap(), Point::new(1.0, 2.0, 3.0), 1e-9);
}

#[test]
fn box_in_tilted_frame() {
    let f = tilted_frame();
    let b = Brep::from_box(&Cuboid::new(f, 1.0, 2.0, 3.0)).unwrap();
    assert_relative_eq!(b.volume().unwrap(), 6.0, epsilon = 1e-9);
    assert_point(b.centroid().unwrap(), f.point, 1e-9);
}

#[test]
fn cylinder_volume_and_centroid() {
    let c = Cylinder::new(frame_at(0.0, 0.0, 5.0), 1.5, 4.0);
    let b = Brep::from_cylinder(&c).unwrap();
    assert_relative_eq!(b.volume().unwrap(), PI * 1.5 * 1.5 * 4.0, max_relative = 1e-2);
    assert_point(b.centroid().unwrap(), Point::new(0.0, 0.0, 5.0), 1e-4);
    assert_eq!(b.faces().unwrap().len(), 3);
}

#[test]
fn cylinder_in_tilted_frame() {
    let f = tilted_frame();
    let b = Brep::from_cylinder(&Cylinder::new(f, 1.0, 2.0)).unwrap();
    assert_relative_eq!(b.volume().unwrap(), 2.0 * PI, max_relative = 1e-2);
    assert_point(b.centroid().unwrap(), f.point, 1e-4);
}

#[test]
fn sphere_volume_and_centroid() {
    let b = Brep::from_sphere(&Sphere::new(Point::new(1.0, -2.0, 3.0), 2.0)).unwrap();
    assert_relative_eq!(b.volume().unwrap(), 4.0 / 3.0 * PI * 8.0, max_relative = 1e-2);
    assert_relative_eq!(b.area().unwrap(), 16.0 * PI, max_relative = 1e-2);
    assert_point(b.centroid().unwrap(), Point::new(1.0, -2.0, 3.0), 1e-4);
}

#[test]
fn cone_and_torus_volumes() {
    let cone = Brep::from_cone(&Cone::new(Frame::worldxy(), 1.0, 3.0)).unwrap();
    assert_relative_eq!(cone.volume().unwrap(), PI, max_relative = 1e-2);
    assert_relative_eq!(cone.centroid().unwrap().z, 0.75, epsilon = 1e-3);

    let torus = Brep::from_torus(&Torus::new(Frame::worldxy(), 3.0, 1.0)).unwrap();
    assert_relative_eq!(torus.volume().unwrap(), 2.0 * PI * PI * 3.0, max_relative = 1e-2);
    assert!(torus.faces().unwrap()[0].is_torus());
}

#[test]
fn extrusion_of_triangle() {
    let profile = Polygon::new(vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(2.0, 0.0, 0.0),
        Point::new(0.0, 2.0, 0.0),
    ]);
    let b = Brep::from_extrusion(&profile, &Vector::new(0.0, 0.0, 3.0)).unwrap();
    assert!(b.is_solid().unwrap());
    assert_eq!(b.faces().unwrap().len(), 5);
    assert_relative_eq!(b.volume().unwrap(), 6.0, epsilon = 1e-9);
}

// ── Faces with holes ───────────────────────────────────────────────────────

#[test]
fn plane_face_with_three_holes() {
    let mut face =
        Face::from_plane(&Plane::worldxy(), (-10.0, 10.0), (-10.0, 10.0)).unwrap();
    let holes = [
        Loop::from_circle(&Circle::new(frame_at(-5.0, -5.0, 0.0), 1.0)).unwrap(),
        Loop::from_circle(&Circle::new(frame_at(4.0, 4.0, 0.0), 2.0)).unwrap(),
        Loop::from_circle(&Circle::new(frame_at(5.0, -5.0, 0.0), 0.5)).unwrap(),
    ];
    face.add_loops(&holes).unwrap();

    let b = Brep::from_faces(&[face]).unwrap();
    let faces = b.faces().unwrap();
    assert_eq!(faces.len(), 1);
    let face = &faces[0];
    assert_eq!(face.loops().unwrap().len(), 4);
    assert_eq!(face.innerloops().unwrap().len(), 3);
    assert_eq!(face.outerloop().unwrap().edges().unwrap().len(), 4);
    for inner in face.innerloops().unwrap() {
        let edges = inner.edges().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind(), CurveKind::Circle);
    }
    let expected = 400.0 - PI * (1.0 + 4.0 + 0.25);
    assert_relative_eq!(b.area().unwrap(), expected, max_relative = 1e-2);
}

// ── Booleans ───────────────────────────────────────────────────────────────

#[test]
fn union_of_touching_boxes() {
    let mut kernel = MockKernel::new();
    let a = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
    let b = Brep::from_box(&Cuboid::new(frame_at(0.5, 0.0, 1.0), 1.0, 1.0, 1.0)).unwrap();
    let u = Brep::from_boolean_union(&mut kernel, &a, &b, 1e-6).unwrap();
    assert!(u.is_solid().unwrap());
    assert!(u.is_closed().unwrap());
    assert_relative_eq!(u.volume().unwrap(), 2.0, epsilon = 1e-9);
}

#[test]
fn boolean_results_are_closed_solids() {
    let mut kernel = MockKernel::new();
    let a = Brep::from_box(&Cuboid::new(Frame::worldxy(), 2.0, 2.0, 2.0)).unwrap();
    let b = Brep::from_box(&Cuboid::new(frame_at(1.0, 1.0, 1.0), 2.0, 2.0, 2.0)).unwrap();

    let diff = Brep::from_boolean_difference(&mut kernel, &a, &b, 1e-6).unwrap();
    assert!(diff.is_solid().unwrap());
    assert!(diff.is_closed().unwrap());
    assert_relative_eq!(diff.volume().unwrap(), 7.0, epsilon = 1e-9);

    let common = Brep::from_boolean_intersection(&mut kernel, &a, &b, 1e-6).unwrap();
    assert!(common.is_closed().unwrap());
    assert_relative_eq!(common.volume().unwrap(), 1.0, epsilon = 1e-9);
    assert_point(common.centroid().unwrap(), Point::new(0.5, 0.5, 0.5), 1e-9);
}

#[test]
fn difference_with_list_of_tools() {
    let mut kernel = MockKernel::new();
    let block = Brep::from_box(&Cuboid::from_corners(
        Point::new(0.0, 0.0, 0.0),
        Point::new(4.0, 1.0, 1.0),
    ))
    .unwrap();
    let tools = vec![
        Brep::from_box(&Cuboid::from_corners(Point::new(0.5, -1.0, 0.5), Point::new(1.5, 2.0, 2.0))).unwrap(),
        Brep::from_box(&Cuboid::from_corners(Point::new(2.5, -1.0, 0.5), Point::new(3.5, 2.0, 2.0))).unwrap(),
    ];
    let cut = Brep::from_boolean_difference(&mut kernel, &block, &tools, 1e-6).unwrap();
    assert!(cut.is_closed().unwrap());
    assert_relative_eq!(cut.volume().unwrap(), 3.0, epsilon = 1e-9);
}

#[test]
fn disjoint_intersection_is_boolean_error() {
    let mut kernel = MockKernel::new();
    let a = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
    let b = Brep::from_box(&Cuboid::new(frame_at(5.0, 0.0, 0.0), 1.0, 1.0, 1.0)).unwrap();
    let err = Brep::from_boolean_intersection(&mut kernel, &a, &b, 1e-6).unwrap_err();
    assert!(matches!(err, BrepError::Boolean { .. }));
    assert_eq!(err.operation(), "Brep::from_boolean_intersection");
}

// ── Exchange ───────────────────────────────────────────────────────────────

#[test]
fn json_round_trip_of_boolean_result() {
    let mut kernel = MockKernel::new();
    let a = Brep::from_box(&Cuboid::new(Frame::worldxy(), 2.0, 2.0, 2.0)).unwrap();
    let b = Brep::from_box(&Cuboid::new(frame_at(1.0, 0.0, 0.0), 2.0, 1.0, 1.0)).unwrap();
    let u = Brep::from_boolean_union(&mut kernel, &a, &b, 1e-6).unwrap();

    let back = Brep::from_json(&u.to_json().unwrap()).unwrap();
    assert!(back.is_solid().unwrap());
    assert_eq!(back.faces().unwrap().len(), u.faces().unwrap().len());
    assert_relative_eq!(back.volume().unwrap(), u.volume().unwrap(), epsilon = 1e-9);
}

#[test]
fn data_schema_field_names() {
    let b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&b.to_json().unwrap()).unwrap();
    assert_eq!(value["vertices"].as_array().unwrap().len(), 8);
    assert_eq!(value["edges"].as_array().unwrap().len(), 12);
    let face = &value["faces"][0];
    assert_eq!(face["type"], "plane");
    assert_eq!(face["loops"][0][0]["type"], "line");
}

#[test]
fn bspline_surface_kept_exactly() {
    let rows = vec![
        vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.3), Point::new(0.0, 2.0, 0.0)],
        vec![Point::new(1.0, 0.0, 0.5), Point::new(1.0, 1.0, 1.0), Point::new(1.0, 2.0, 0.5)],
        vec![Point::new(2.0, 0.0, 0.0), Point::new(2.0, 1.0, 0.3), Point::new(2.0, 2.0, 0.0)],
    ];
    let s = brep::NurbsSurface::from_points(&rows, 2, 2).unwrap();
    let b = Brep::from_faces(&[Face::from_surface(&s).unwrap()]).unwrap();
    let data = b.to_data().unwrap();
    assert_eq!(data.faces[0].kind, SurfaceKind::BsplineSurface);
    let back = Brep::from_data(&data).unwrap();
    let surfaces = back.surfaces().unwrap();
    assert_eq!(surfaces.len(), 1);
    assert_eq!(surfaces[0].to_data(), s.to_data());
}

// ── Transform and copy ─────────────────────────────────────────────────────

#[test]
fn transformed_is_a_new_shape() {
    let b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
    let moved = b
        .transformed(&Transformation::translation(Vector::new(0.0, 0.0, 10.0)))
        .unwrap();
    assert_point(b.centroid().unwrap(), Point::origin(), 1e-9);
    assert_point(moved.centroid().unwrap(), Point::new(0.0, 0.0, 10.0), 1e-9);
    assert_eq!(moved.kind().unwrap(), ShapeKind::Solid);
}

#[test]
fn compound_of_breps_lists_solids() {
    let a = Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap();
    let b = Brep::from_sphere(&Sphere::new(Point::new(5.0, 0.0, 0.0), 1.0)).unwrap();
    let c = Brep::from_breps(&[a, b]).unwrap();
    assert!(c.is_compound().unwrap());
    assert_eq!(c.solids().unwrap().len(), 2);
    assert_eq!(c.shells().unwrap().len(), 2);
}
