use std::fmt;

use brep_kernel::geometry::{Curve, Surface};
use brep_kernel::topology::TEdge;
use serde::{Deserialize, Serialize};

/// Geometric class of the curve under an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Line,
    Circle,
    Ellipse,
    Hyperbola,
    Parabola,
    Bezier,
    Bspline,
    /// Known only as a curve in the parameter plane of its faces.
    Curve2d,
    /// Degenerated edges.
    Other,
}

impl CurveKind {
    pub fn of_curve(curve: &Curve) -> Self {
        match curve {
            Curve::Line(_) => CurveKind::Line,
            Curve::Circle(_) => CurveKind::Circle,
            Curve::Ellipse(_) => CurveKind::Ellipse,
            Curve::Hyperbola(_) => CurveKind::Hyperbola,
            Curve::Parabola(_) => CurveKind::Parabola,
            Curve::Bezier(_) => CurveKind::Bezier,
            Curve::BSpline(_) => CurveKind::Bspline,
        }
    }

    pub fn of_edge(edge: &TEdge) -> Self {
        match &edge.curve {
            _ if edge.degenerated => CurveKind::Other,
            Some(c) => Self::of_curve(c),
            None if !edge.pcurves.is_empty() => CurveKind::Curve2d,
            None => CurveKind::Other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CurveKind::Line => "line",
            CurveKind::Circle => "circle",
            CurveKind::Ellipse => "ellipse",
            CurveKind::Hyperbola => "hyperbola",
            CurveKind::Parabola => "parabola",
            CurveKind::Bezier => "bezier",
            CurveKind::Bspline => "bspline",
            CurveKind::Curve2d => "curve2d",
            CurveKind::Other => "other",
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometric class of the surface under a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Plane,
    Cylinder,
    Cone,
    Sphere,
    Torus,
    BezierSurface,
    BsplineSurface,
}

impl SurfaceKind {
    pub fn of_surface(surface: &Surface) -> Self {
        match surface {
            Surface::Plane(_) => SurfaceKind::Plane,
            Surface::Cylinder(_) => SurfaceKind::Cylinder,
            Surface::Cone(_) => SurfaceKind::Cone,
            Surface::Sphere(_) => SurfaceKind::Sphere,
            Surface::Torus(_) => SurfaceKind::Torus,
            Surface::Bezier(_) => SurfaceKind::BezierSurface,
            Surface::BSpline(_) => SurfaceKind::BsplineSurface,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::Plane => "plane",
            SurfaceKind::Cylinder => "cylinder",
            SurfaceKind::Cone => "cone",
            SurfaceKind::Sphere => "sphere",
            SurfaceKind::Torus => "torus",
            SurfaceKind::BezierSurface => "bezier_surface",
            SurfaceKind::BsplineSurface => "bspline_surface",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
