use approx::assert_relative_eq;
use brep::{Brep, BrepError};
use brep_types::{Cuboid, Cylinder, Frame, Mesh, Plane, Point};
use file_format::{
    export_ascii_stl, export_binary_stl, export_step, export_stl, import_iges, import_step,
    load_bodies, load_brep, parse_step, read_brep, save_bodies, save_brep, write_brep, BrepExchange,
    ExportError, LengthUnit, LoadError, ProjectMetadata, StepOptions, StlOptions, FORMAT_ID,
    FORMAT_VERSION,
};
use serde_json::{json, Value};
use uuid::Uuid;

// ── Helper Functions ─────────────────────────────────────────────────────

fn unit_box() -> Brep {
    Brep::from_box(&Cuboid::new(Frame::worldxy(), 1.0, 1.0, 1.0)).unwrap()
}

fn temp_path(ext: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("file-format-{}.{}", Uuid::new_v4(), ext))
}

fn unit_square_mesh() -> Mesh {
    Mesh::from_vertices_and_faces(
        vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ],
        vec![vec![0, 1, 2, 3]],
    )
}

// ── M1: JSON Schema Tests ──────────────────────────────────────────────

#[test]
fn save_produces_valid_json() {
    let meta = ProjectMetadata::new("Test Project");
    let json = save_brep(&unit_box(), &meta).unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert!(parsed.is_object());
}

#[test]
fn save_includes_format_and_version() {
    let meta = ProjectMetadata::new("Test");
    let json = save_brep(&unit_box(), &meta).unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed["format"], FORMAT_ID);
    assert_eq!(parsed["version"], FORMAT_VERSION);
}

#[test]
fn save_includes_project_metadata() {
    let meta = ProjectMetadata::new("My Part").with_author("alice");
    let json = save_brep(&unit_box(), &meta).unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed["project"]["name"], "My Part");
    assert_eq!(parsed["project"]["author"], "alice");
    assert_eq!(parsed["project"]["id"], meta.id.to_string());
    assert!(parsed["project"]["created"].is_string());
}

#[test]
fn save_writes_named_bodies() {
    let meta = ProjectMetadata::new("Two Bodies");
    let a = unit_box();
    let b = Brep::from_cylinder(&Cylinder::new(Frame::worldxy(), 1.0, 2.0)).unwrap();
    let json = save_bodies(&[("block", &a), ("pin", &b)], &meta).unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();

    let bodies = parsed["bodies"].as_array().unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["name"], "block");
    assert_eq!(bodies[1]["name"], "pin");
    assert_eq!(bodies[0]["brep"]["faces"].as_array().unwrap().len(), 6);
    assert_eq!(bodies[0]["brep"]["faces"][0]["type"], "plane");
}

// ── M2: Save Tests ─────────────────────────────────────────────────────

#[test]
fn save_brep_names_body_after_project() {
    let meta = ProjectMetadata::new("Bracket");
    let json = save_brep(&unit_box(), &meta).unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["bodies"][0]["name"], "Bracket");
}

#[test]
fn metadata_touch_advances_modified() {
    let mut meta = ProjectMetadata::new("Touched");
    let created = meta.created;
    meta.touch();
    assert!(meta.modified >= created);
    assert_eq!(meta.created, created);
}

#[test]
fn write_and_read_file() {
    let path = temp_path("json");
    let meta = ProjectMetadata::new("On Disk");
    write_brep(&path, &unit_box(), &meta).unwrap();

    let (brep, loaded) = read_brep(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, meta);
    assert_relative_eq!(brep.volume().unwrap(), 1.0, epsilon = 1e-9);
}

// ── M3: Load Tests ─────────────────────────────────────────────────────

#[test]
fn load_round_trip_preserves_geometry() {
    let meta = ProjectMetadata::new("Round Trip");
    let original = Brep::from_box(&Cuboid::new(Frame::worldxy(), 2.0, 3.0, 4.0)).unwrap();
    let json = save_brep(&original, &meta).unwrap();

    let (loaded, loaded_meta) = load_brep(&json).unwrap();
    assert_eq!(loaded_meta.name, "Round Trip");
    assert!(loaded.is_solid().unwrap());
    assert_eq!(loaded.faces().unwrap().len(), 6);
    assert_eq!(loaded.points().unwrap().len(), 8);
    assert_relative_eq!(loaded.volume().unwrap(), 24.0, epsilon = 1e-9);
}

#[test]
fn load_round_trip_several_bodies() {
    let meta = ProjectMetadata::new("Pair");
    let a = unit_box();
    let b = Brep::from_box(&Cuboid::new(Frame::worldxy(), 2.0, 2.0, 2.0)).unwrap();
    let json = save_bodies(&[("small", &a), ("large", &b)], &meta).unwrap();

    let (bodies, _) = load_bodies(&json).unwrap();
    let names: Vec<&str> = bodies.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["small", "large"]);
    assert_relative_eq!(bodies[1].1.volume().unwrap(), 8.0, epsilon = 1e-9);
}

#[test]
fn load_rejects_unknown_format() {
    let json = json!({ "format": "other-format", "version": 1, "bodies": [] }).to_string();
    let result = load_brep(&json);
    assert!(matches!(result, Err(LoadError::UnknownFormat(f)) if f == "other-format"));
}

#[test]
fn load_rejects_future_version() {
    let meta = ProjectMetadata::new("Future");
    let json = save_brep(&unit_box(), &meta).unwrap();
    let mut value: Value = serde_json::from_str(&json).unwrap();
    value["version"] = json!(FORMAT_VERSION + 1);

    match load_brep(&value.to_string()) {
        Err(LoadError::FutureVersion {
            file_version,
            supported_version,
        }) => {
            assert_eq!(file_version, FORMAT_VERSION + 1);
            assert_eq!(supported_version, FORMAT_VERSION);
        }
        other => panic!("expected FutureVersion, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn load_rejects_invalid_json() {
    assert!(matches!(load_brep("{ not json"), Err(LoadError::ParseError(_))));
}

#[test]
fn load_rejects_missing_format() {
    let json = json!({ "version": FORMAT_VERSION, "bodies": [] }).to_string();
    assert!(matches!(load_brep(&json), Err(LoadError::ParseError(_))));
}

#[test]
fn load_empty_file_has_no_first_body() {
    let meta = ProjectMetadata::new("Empty");
    let json = save_bodies(&[], &meta).unwrap();
    assert!(load_bodies(&json).unwrap().0.is_empty());
    assert!(matches!(load_brep(&json), Err(LoadError::ParseError(_))));
}

#[test]
fn load_migrates_version_one() {
    let meta = ProjectMetadata::new("Legacy");
    let data = unit_box().to_data().unwrap();
    let v1 = json!({
        "format": FORMAT_ID,
        "version": 1,
        "project": meta,
        "brep": data,
    })
    .to_string();

    let (bodies, loaded_meta) = load_bodies(&v1).unwrap();
    assert_eq!(loaded_meta.name, "Legacy");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].0, "Legacy");
    assert_relative_eq!(bodies[0].1.volume().unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn load_version_one_without_brep_fails_migration() {
    let meta = ProjectMetadata::new("Broken");
    let v1 = json!({ "format": FORMAT_ID, "version": 1, "project": meta }).to_string();
    assert!(matches!(
        load_brep(&v1),
        Err(LoadError::MigrationFailed { from: 1, to: 2, .. })
    ));
}

#[test]
fn load_error_reports_status() {
    let err = load_brep("[").unwrap_err();
    let status = err.status();
    match err.into_brep_error("Brep::from_json") {
        BrepError::Io { operation, status: s, .. } => {
            assert_eq!(operation, "Brep::from_json");
            assert_eq!(s, status);
        }
        other => panic!("expected Io, got {other:?}"),
    }
}

// ── M4: STEP Export Tests ──────────────────────────────────────────────

#[test]
fn step_export_simple_box() {
    let options = StepOptions {
        author: Some("alice".to_string()),
        ..Default::default()
    };
    let step = export_step(&unit_box(), &options).unwrap();

    assert!(step.contains("ISO-10303-21"), "Should have STEP header");
    assert!(step.contains("/* unit: mm */"), "Should record the unit");
    assert!(step.contains("alice"), "Should record the author");
    assert!(
        step.contains("MANIFOLD_SOLID_BREP"),
        "Should have solid BREP entity"
    );
    assert!(step.contains("ENDSEC"), "Should have proper STEP footer");
}

#[test]
fn step_export_records_unit_and_description() {
    let options = StepOptions {
        unit: LengthUnit::Inch,
        description: Some("fixture plate".to_string()),
        ..Default::default()
    };
    let step = export_step(&unit_box(), &options).unwrap();
    assert!(step.contains("/* unit: in */"));
    assert!(step.contains("/* fixture plate */"));
}

#[test]
fn step_export_open_face_returns_error() {
    let face = Brep::from_plane(&Plane::worldxy(), (0.0, 1.0), (0.0, 1.0)).unwrap();
    let result = export_step(&face, &StepOptions::default());
    assert!(matches!(result, Err(ExportError::NoSolid)));
}

#[test]
fn step_export_through_exchange_trait() {
    let path = temp_path("step");
    unit_box().to_step(&path, &StepOptions::default()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert!(text.starts_with("ISO-10303-21"));
    assert!(text.contains(&*path.file_name().unwrap().to_string_lossy()));
}

// ── M5: STL Export Tests ───────────────────────────────────────────────

#[test]
fn binary_stl_size_matches_triangle_count() {
    let mesh = unit_square_mesh();
    let bytes = export_binary_stl(&mesh, "square").unwrap();
    // two triangles from the fanned quad
    assert_eq!(bytes.len(), 80 + 4 + 2 * 50);
    assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 2);
    assert!(bytes.starts_with(b"binary STL: square"));
}

#[test]
fn ascii_stl_has_keywords() {
    let text = export_ascii_stl(&unit_square_mesh(), "square").unwrap();
    assert!(text.starts_with("solid square\n"));
    assert_eq!(text.matches("facet normal 0 0 1").count(), 2);
    assert_eq!(text.matches("vertex ").count(), 6);
    assert!(text.trim_end().ends_with("endsolid square"));
}

#[test]
fn stl_rejects_empty_mesh() {
    let mesh = Mesh::from_vertices_and_faces(Vec::new(), Vec::new());
    assert!(matches!(
        export_binary_stl(&mesh, "empty"),
        Err(ExportError::StlExportFailed(_))
    ));
}

#[test]
fn stl_rejects_out_of_range_index() {
    let mut mesh = unit_square_mesh();
    mesh.faces.push(vec![0, 1, 9]);
    assert!(matches!(
        export_ascii_stl(&mesh, "bad"),
        Err(ExportError::StlExportFailed(_))
    ));
}

#[test]
fn stl_of_box_is_closed_triangle_set() {
    let bytes = export_stl(&unit_box(), "box", &StlOptions::default()).unwrap();
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    assert!(count >= 12);
    assert_eq!(bytes.len(), 84 + count * 50);
}

#[test]
fn stl_written_through_exchange_trait() {
    let path = temp_path("stl");
    let options = StlOptions {
        binary: false,
        ..Default::default()
    };
    unit_box().to_stl(&path, &options).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let stem = path.file_stem().unwrap().to_string_lossy();
    assert!(text.starts_with(&format!("solid {stem}")));
}

// ── M6: STEP Import and Unsupported Exchange Tests ─────────────────────

#[test]
fn step_write_then_read_box() {
    let path = temp_path("step");
    let original = Brep::from_box(&Cuboid::new(Frame::worldxy(), 2.0, 3.0, 4.0)).unwrap();
    original.to_step(&path, &StepOptions::default()).unwrap();
    let back = Brep::from_step(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(back.is_solid().unwrap());
    assert_eq!(back.faces().unwrap().len(), 6);
    assert_eq!(back.edges().unwrap().len(), 12);
    assert_eq!(back.vertices().unwrap().len(), 8);
    assert!(back.is_valid().unwrap());
    assert_relative_eq!(back.volume().unwrap(), 24.0, max_relative = 1e-9);
}

#[test]
fn step_read_scales_back_from_recorded_unit() {
    let options = StepOptions {
        unit: LengthUnit::Inch,
        ..Default::default()
    };
    let step = export_step(&unit_box(), &options).unwrap();
    let back = parse_step(&step).unwrap();
    assert_relative_eq!(back.volume().unwrap(), 1.0, max_relative = 1e-9);
}

#[test]
fn step_read_of_garbage_is_a_parse_error() {
    let path = temp_path("step");
    std::fs::write(&path, "solid not-a-step-file").unwrap();
    let result = import_step(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(LoadError::ParseError(_))));
    assert!(matches!(import_step(temp_path("step")), Err(LoadError::Io(_))));
}

#[test]
fn iges_import_is_unsupported() {
    assert!(matches!(import_iges("part.igs"), Err(LoadError::Unsupported { .. })));
}

#[test]
fn exchange_errors_carry_operation_and_status() {
    match Brep::from_iges("part.igs") {
        Err(BrepError::Io { operation, status, .. }) => {
            assert_eq!(operation, "Brep::from_iges");
            assert_eq!(status, 5);
        }
        other => panic!("expected Io error, got {:?}", other.map(|_| ())),
    }
    match Brep::from_step(temp_path("step")) {
        Err(BrepError::Io { operation, status, .. }) => {
            assert_eq!(operation, "Brep::from_step");
            assert_eq!(status, 7);
        }
        other => panic!("expected Io error, got {:?}", other.map(|_| ())),
    }
    match unit_box().to_iges(temp_path("igs")) {
        Err(BrepError::Io { operation, status, .. }) => {
            assert_eq!(operation, "Brep::to_iges");
            assert_eq!(status, 13);
        }
        other => panic!("expected Io error, got {other:?}"),
    }
}
