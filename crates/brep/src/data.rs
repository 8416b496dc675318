//! Plain serializable records of a BRep and of NURBS geometry.
//!
//! Curve and surface payloads stay untyped until the builder reads them, so
//! that a record naming an unknown kind fails as a construction error
//! instead of a parse error.

use brep_kernel::topology::Orientation;
use brep_types::{Frame, Point};
use serde::{Deserialize, Serialize};

use crate::kinds::{CurveKind, SurfaceKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurveData {
    pub points: Vec<Point>,
    pub weights: Vec<f64>,
    /// Distinct knots, strictly increasing.
    pub knots: Vec<f64>,
    pub multiplicities: Vec<usize>,
    pub degree: usize,
    pub is_periodic: bool,
}

/// Control net stored as rows along u, each row running along v.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsSurfaceData {
    pub points: Vec<Vec<Point>>,
    pub weights: Vec<Vec<f64>>,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub mults_u: Vec<usize>,
    pub mults_v: Vec<usize>,
    pub degree_u: usize,
    pub degree_v: usize,
    pub is_periodic_u: bool,
    pub is_periodic_v: bool,
}

/// One edge occurrence of a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(rename = "type")]
    pub kind: CurveKind,
    /// A 3D curve, or a curve in the parameter plane of the owning face
    /// when `dimension` is 2.
    pub curve: serde_json::Value,
    pub domain: [f64; 2],
    pub start: Point,
    pub end: Point,
    /// Orientation of the occurrence relative to the forward face.
    pub orientation: Orientation,
    pub dimension: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    #[serde(rename = "type")]
    pub kind: SurfaceKind,
    pub surface: serde_json::Value,
    pub domain_u: [f64; 2],
    pub domain_v: [f64; 2],
    /// Placement of analytic surfaces; the world frame for B-splines.
    pub frame: Frame,
    pub orientation: Orientation,
    /// Outer loop first.
    pub loops: Vec<Vec<EdgeData>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrepData {
    pub vertices: Vec<Point>,
    pub edges: Vec<EdgeData>,
    pub faces: Vec<FaceData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_is_renamed() {
        let e = EdgeData {
            kind: CurveKind::Line,
            curve: serde_json::json!({}),
            domain: [0.0, 1.0],
            start: Point::origin(),
            end: Point::new(1.0, 0.0, 0.0),
            orientation: Orientation::Reversed,
            dimension: 3,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "line");
        assert!(v.get("kind").is_none());
        let back: EdgeData = serde_json::from_value(v).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_unknown_kind_fails_to_parse() {
        let v = serde_json::json!({
            "type": "spiral",
            "curve": {},
            "domain": [0.0, 1.0],
            "start": {"x": 0.0, "y": 0.0, "z": 0.0},
            "end": {"x": 0.0, "y": 0.0, "z": 0.0},
            "orientation": "Forward",
            "dimension": 3
        });
        assert!(serde_json::from_value::<EdgeData>(v).is_err());
    }
}
