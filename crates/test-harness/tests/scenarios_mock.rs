//! Multi-step modelling regression tests against MockKernel.
//!
//! These scenarios run the real `Brep` operations through ModelBuilder,
//! validating topology, volume, mesh quality and oracle results at each step.

use brep_kernel::MockKernel;
use test_harness::assertions::{assert_bodies, assert_bounding_box, assert_topology_eq, assert_volume};
use test_harness::helpers::{circle_profile, mesh_surface_area, mesh_volume};
use test_harness::oracle;
use test_harness::ModelBuilder;

// ── Scenario 1: Basic box ───────────────────────────────────────────────

#[test]
fn test_box_basic() {
    let mut m = ModelBuilder::mock();
    m.add_box("box", [5., 5., 5.], [10., 10., 10.]).unwrap();

    m.assert_has_solid("box").unwrap();
    m.assert_no_errors().unwrap();

    let (v, e, f) = m.topology_counts("box").unwrap();
    assert_eq!((v, e, f), (8, 12, 6), "Box: V=8 E=12 F=6");

    let mesh = m.tessellate("box").unwrap();
    assert_bounding_box(&mesh, [0.; 3], [10.; 3], 1e-9, "box").unwrap();
}

// ── Scenario 2: Box with a bore ─────────────────────────────────────────

#[test]
fn test_box_with_bore() {
    let mut m = ModelBuilder::mock();
    m.add_box("block", [0., 0., 0.], [20., 20., 10.]).unwrap();
    m.add_box("bore", [0., 0., 0.], [4., 4., 20.]).unwrap();
    m.subtract("drilled", "block", &["bore"]).unwrap();

    m.assert_has_solid("drilled").unwrap();
    assert_volume(m.body("drilled").unwrap(), 20. * 20. * 10. - 16. * 10., 1e-9, "drilled").unwrap();
    // A through hole makes the solid genus one
    let euler = oracle::check_euler_formula(m.body("drilled").unwrap());
    assert!(!euler.passed, "genus-one solid: {}", euler.detail);
    assert_eq!(euler.value, Some(0.0));
}

// ── Scenario 3: Extruded polygon ────────────────────────────────────────

#[test]
fn test_extruded_polygon() {
    let mut m = ModelBuilder::mock();
    let profile = circle_profile(0., 0., 5., 0., 16);
    m.extrude("prism", &profile, [0., 0., 3.]).unwrap();

    m.assert_has_solid("prism").unwrap();
    assert_topology_eq(m.body("prism").unwrap(), 32, 48, 18, "prism").unwrap();
    assert_volume(m.body("prism").unwrap(), profile.area() * 3.0, 1e-9, "prism").unwrap();
}

// ── Scenario 4: Booleans ────────────────────────────────────────────────

#[test]
fn test_boolean_union() {
    let mut m = ModelBuilder::mock();
    m.add_box("a", [0.5, 0.5, 0.5], [1., 1., 1.]).unwrap();
    m.add_box("b", [1.0, 1.0, 1.0], [1., 1., 1.]).unwrap();
    m.union("merged", "a", "b").unwrap();

    m.assert_has_solid("merged").unwrap();
    assert_volume(m.body("merged").unwrap(), 2.0 - 0.125, 1e-9, "union").unwrap();
    for v in m.check_topology("merged").unwrap() {
        assert!(v.passed, "{}: {}", v.oracle_name, v.detail);
    }
}

#[test]
fn test_boolean_subtract() {
    let mut m = ModelBuilder::mock();
    m.add_box("a", [1., 1., 1.], [2., 2., 2.]).unwrap();
    m.add_box("corner", [2., 2., 2.], [2., 2., 2.]).unwrap();
    m.subtract("notched", "a", &["corner"]).unwrap();

    assert_volume(m.body("notched").unwrap(), 7.0, 1e-9, "notched").unwrap();
    for v in m.check_mesh("notched").unwrap() {
        assert!(v.passed, "{}: {}", v.oracle_name, v.detail);
    }
}

#[test]
fn test_boolean_intersect() {
    let mut m = ModelBuilder::mock();
    m.add_box("a", [1., 1., 1.], [2., 2., 2.]).unwrap();
    m.add_box("b", [2., 2., 2.], [2., 2., 2.]).unwrap();
    m.intersect("common", "a", "b").unwrap();

    assert_volume(m.body("common").unwrap(), 1.0, 1e-9, "common").unwrap();
    let c = m.body("common").unwrap().centroid().unwrap();
    assert!((c.x - 1.5).abs() < 1e-9 && (c.y - 1.5).abs() < 1e-9 && (c.z - 1.5).abs() < 1e-9);
}

#[test]
fn test_disjoint_union_is_compound() {
    let mut m = ModelBuilder::mock();
    m.add_box("a", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.add_box("b", [5., 0., 0.], [1., 1., 1.]).unwrap();
    m.union("pair", "a", "b").unwrap();

    assert_bodies(&m, &[("a", "solid"), ("b", "solid"), ("pair", "compound")]).unwrap();
    assert_eq!(m.body("pair").unwrap().solids().unwrap().len(), 2);
}

#[test]
fn test_subtract_several_tools() {
    let mut m = ModelBuilder::mock();
    m.add_box("plate", [0., 0., 0.], [10., 10., 1.]).unwrap();
    m.add_box("h1", [-3., 0., 0.], [2., 2., 4.]).unwrap();
    m.add_box("h2", [3., 0., 0.], [2., 2., 4.]).unwrap();
    m.subtract("perforated", "plate", &["h1", "h2"]).unwrap();

    assert_volume(m.body("perforated").unwrap(), 100.0 - 8.0, 1e-9, "perforated").unwrap();
}

// ── Scenario 5: Fillet ──────────────────────────────────────────────────

#[test]
fn test_fillet_box_rounds_every_edge() {
    let mut m = ModelBuilder::mock();
    m.add_box("box", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.fillet("rounded", "box", 0.2).unwrap();
    m.assert_has_solid("rounded").unwrap();

    let (_, _, faces) = m.topology_counts("rounded").unwrap();
    assert_eq!(faces, 26);
    assert_volume(m.body("rounded").unwrap(), 0.907705, 5e-3, "rounded").unwrap();
}

#[test]
fn test_fillet_records_every_edge() {
    let b = brep::Brep::from_box(&brep_types::Cuboid::new(brep_types::Frame::worldxy(), 1., 1., 1.)).unwrap();
    let mut kernel = MockKernel::new();
    b.filleted(&mut kernel, 0.1, &[]).unwrap();
    let call = kernel.last_fillet().unwrap();
    assert_eq!(call.edges.len(), 12);
    assert_eq!(call.radius, 0.1);
}

// ── Scenario 6: Multiple bodies ─────────────────────────────────────────

#[test]
fn test_multi_body_no_boolean() {
    let mut m = ModelBuilder::mock();
    m.add_box("left", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.add_cylinder("right", [5., 0., 0.], 1., 2.).unwrap();
    m.add_sphere("top", [0., 0., 5.], 1.).unwrap();

    assert_bodies(&m, &[("left", "solid"), ("right", "solid"), ("top", "solid")]).unwrap();
    m.assert_no_errors().unwrap();
}

// ── Scenario 7: Undo/redo ───────────────────────────────────────────────

#[test]
fn test_undo_redo_preserves_topology() {
    let mut m = ModelBuilder::mock();
    m.add_box("a", [0.5, 0.5, 0.5], [1., 1., 1.]).unwrap();
    m.add_box("b", [1., 0.5, 0.5], [1., 1., 1.]).unwrap();
    m.union("merged", "a", "b").unwrap();
    let before = m.topology_counts("merged").unwrap();

    m.undo().unwrap();
    assert!(m.body("merged").is_err());
    m.redo().unwrap();
    assert_eq!(m.topology_counts("merged").unwrap(), before);
}

// ── Scenario 8: Save/load ───────────────────────────────────────────────

#[test]
fn test_save_load_roundtrip() {
    let mut m = ModelBuilder::mock();
    m.add_box("a", [1., 1., 1.], [2., 2., 2.]).unwrap();
    m.add_box("corner", [2., 2., 2.], [2., 2., 2.]).unwrap();
    m.subtract("notched", "a", &["corner"]).unwrap();
    let json = m.save().unwrap();

    let mut m2 = ModelBuilder::mock();
    m2.load(&json).unwrap();
    assert_bodies(&m2, &[("a", "solid"), ("corner", "solid"), ("notched", "solid")]).unwrap();
    assert_volume(m2.body("notched").unwrap(), 7.0, 1e-9, "reloaded").unwrap();
    assert_eq!(
        m2.topology_counts("notched").unwrap(),
        m.topology_counts("notched").unwrap()
    );
}

// ── Scenario 9: STL ─────────────────────────────────────────────────────

#[test]
fn test_stl_export_valid() {
    let mut m = ModelBuilder::mock();
    m.add_box("box", [0., 0., 0.], [1., 1., 1.]).unwrap();
    let stl = m.export_stl("box").unwrap();
    let count = u32::from_le_bytes([stl[80], stl[81], stl[82], stl[83]]) as usize;
    assert_eq!(stl.len(), 84 + 50 * count);
    assert!(count >= 12);
}

// ── Scenario 10: Mesh sanity ────────────────────────────────────────────

#[test]
fn test_mesh_volume_and_area_match_brep() {
    let mut m = ModelBuilder::mock();
    m.add_box("box", [0., 0., 0.], [2., 3., 4.]).unwrap();
    let mesh = m.tessellate("box").unwrap();
    assert!((mesh_volume(&mesh) - 24.0).abs() < 1e-9);
    assert!((mesh_surface_area(&mesh) - 52.0).abs() < 1e-9);
}

// ── Scenario 11: Full workflow ──────────────────────────────────────────

#[test]
fn test_full_workflow() {
    let mut m = ModelBuilder::mock().with_auto_check();
    m.extrude_rect("base", 0., 0., 10., 10., 2.)
        .unwrap()
        .add_box("boss", [5., 5., 3.], [4., 4., 2.])
        .unwrap()
        .union("body", "base", "boss")
        .unwrap()
        .add_box("groove", [5., 5., 4.], [2., 12., 2.])
        .unwrap()
        .subtract("part", "body", &["groove"])
        .unwrap()
        .translate("moved", "part", [0., 0., 10.])
        .unwrap();

    m.assert_no_errors().unwrap();
    let expected = 200. + 32. - 2. * 4. * 1.;
    assert_volume(m.body("part").unwrap(), expected, 1e-9, "part").unwrap();
    assert_volume(m.body("moved").unwrap(), expected, 1e-9, "moved").unwrap();

    let mesh = m.tessellate("moved").unwrap();
    assert_bounding_box(&mesh, [0., 0., 10.], [10., 10., 14.], 1e-9, "moved").unwrap();

    let report = m.report().unwrap();
    assert_eq!(report.failed_checks(), 0, "{}", report);
}
