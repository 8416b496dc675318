//! Property-based tests for kernel invariants using the `proptest` crate.

use proptest::prelude::*;

use brep_kernel::geometry::{Ax3, Circle3d, Curve, Point3d, Surface, SphericalSurface, Transform, Vec3};
use brep_kernel::mesh::{mass, MeshParams};
use brep_kernel::primitives::{make_box, make_polygon_face, make_sphere};
use brep_kernel::topology::{check, explorer, heal, EntityStore, ShapeKind};
use brep_kernel::Tolerance;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_point() -> impl Strategy<Value = Point3d> {
    (-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0)
        .prop_map(|(x, y, z)| Point3d::new(x, y, z))
}

fn arb_positive_dim() -> impl Strategy<Value = f64> {
    0.1f64..100.0
}

fn arb_angle() -> impl Strategy<Value = f64> {
    -std::f64::consts::PI..std::f64::consts::PI
}

/// Unit vector that is never close to zero before normalization.
fn arb_axis() -> impl Strategy<Value = Vec3> {
    (-1.0f64..1.0, -1.0f64..1.0, 0.2f64..1.0)
        .prop_map(|(x, y, z)| Vec3::new(x, y, z).normalized_or(Vec3::Z))
}

const TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// 1. Transform inverse roundtrip: T^{-1}(T(p)) == p
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn transform_inverse_roundtrip(
        p in arb_point(),
        origin in arb_point(),
        axis in arb_axis(),
        angle in arb_angle(),
        shift in arb_point(),
    ) {
        let t = Transform::rotation(origin, axis, angle)
            .then(&Transform::translation(shift.to_vec3()));
        let inv = t.inverse();
        prop_assert!(inv.is_some());
        if let Some(inv) = inv {
            let back = inv.transform_point(&t.transform_point(&p));
            prop_assert!(back.distance_to(&p) < TOL, "roundtrip moved {:?} to {:?}", p, back);
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Box Euler formula: V - E + F = 2
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn box_euler_formula(
        o in arb_point(),
        dx in arb_positive_dim(),
        dy in arb_positive_dim(),
        dz in arb_positive_dim(),
    ) {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, &Ax3::new(o, Vec3::Z, Vec3::X), dx, dy, dz)?;
        let v = explorer::map_shapes(&store, solid, ShapeKind::Vertex)?.len();
        let e = explorer::map_shapes(&store, solid, ShapeKind::Edge)?.len();
        let f = explorer::map_shapes(&store, solid, ShapeKind::Face)?.len();
        prop_assert_eq!((v, e, f), (8, 12, 6));
        prop_assert!(check::is_valid(&store, solid)?);

        let m = mass::mass_properties(&store, solid, &MeshParams::default())?;
        prop_assert!((m.volume - dx * dy * dz).abs() < 1e-9 * (dx * dy * dz).max(1.0));
    }
}

// ---------------------------------------------------------------------------
// 3. Sewing six loose quads gives a closed shell of the right volume
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sewn_quads_close_up(
        o in arb_point(),
        dx in 0.5f64..10.0,
        dy in 0.5f64..10.0,
        dz in 0.5f64..10.0,
    ) {
        let p = |x: f64, y: f64, z: f64| Point3d::new(o.x + x * dx, o.y + y * dy, o.z + z * dz);
        let quads = [
            [p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)],
            [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
            [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
            [p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)],
            [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
            [p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)],
        ];
        let mut store = EntityStore::new();
        let faces = quads
            .iter()
            .map(|q| make_polygon_face(&mut store, q))
            .collect::<Result<Vec<_>, _>>()?;
        let compound = store.add_compound(faces)?;
        let sewn = heal::sew(&mut store, compound, Tolerance::default().sewing)?;
        prop_assert!(check::is_closed(&store, sewn)?);
        prop_assert_eq!(explorer::map_shapes(&store, sewn, ShapeKind::Edge)?.len(), 12);
        let solid = heal::make_solid(&mut store, sewn)?;
        let volume = mass::mass_properties(&store, solid, &MeshParams::default())?.volume;
        prop_assert!((volume.abs() - dx * dy * dz).abs() < 1e-9 * dx * dy * dz);
    }
}

// ---------------------------------------------------------------------------
// 4. NURBS conversion keeps the end points of a circular arc
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn arc_nurbs_end_points(
        c in arb_point(),
        axis in arb_axis(),
        r in arb_positive_dim(),
        t0 in 0.0f64..3.0,
        span in 0.1f64..3.0,
    ) {
        let circle = Curve::Circle(Circle3d::new(Ax3::from_normal(c, axis), r));
        let n = circle.to_nurbs(t0, t0 + span);
        let (d0, d1) = n.domain();
        prop_assert!(n.evaluate(d0).distance_to(&circle.evaluate(t0)) < TOL * r.max(1.0));
        prop_assert!(n.evaluate(d1).distance_to(&circle.evaluate(t0 + span)) < TOL * r.max(1.0));
        let mid = n.evaluate((d0 + d1) / 2.0);
        prop_assert!((mid.distance_to(&c) - r).abs() < TOL * r.max(1.0));
    }
}

// ---------------------------------------------------------------------------
// 5. Surface parameters_of inverts evaluate
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn sphere_parameters_roundtrip(
        c in arb_point(),
        r in arb_positive_dim(),
        u in 0.1f64..6.0,
        v in -1.4f64..1.4,
    ) {
        let s = Surface::Sphere(SphericalSurface {
            position: Ax3::new(c, Vec3::Z, Vec3::X),
            radius: r,
        });
        let p = s.evaluate(u, v);
        let uv = s.parameters_of(&p);
        prop_assert!((uv.x - u).abs() < 1e-6 && (uv.y - v).abs() < 1e-6, "({}, {}) -> {:?}", u, v, uv);
    }

    #[test]
    fn sphere_solid_is_valid(c in arb_point(), r in arb_positive_dim()) {
        let mut store = EntityStore::new();
        let solid = make_sphere(&mut store, &Ax3::new(c, Vec3::Z, Vec3::X), r)?;
        prop_assert!(check::is_closed(&store, solid)?);
        let m = mass::mass_properties(&store, solid, &MeshParams::default())?;
        let expected = 4.0 / 3.0 * std::f64::consts::PI * r * r * r;
        prop_assert!((m.volume - expected).abs() < 1e-2 * expected);
    }
}
