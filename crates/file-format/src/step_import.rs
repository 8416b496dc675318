use std::path::Path;

use brep::Brep;
use brep_kernel::truck_convert::from_truck_solid;
use brep_types::Transformation;
use tracing::{debug, info, instrument};
use truck_modeling::topology::{Shell, Solid};
use truck_modeling::{BoundedCurve, Curve, ParameterDivision1D, Surface};
use truck_stepio::r#in::alias::{BSplineCurve, Curve3D, ElementarySurface, KnotVec, Point3, Surface as StepSurface};
use truck_stepio::r#in::Table;
use truck_topology::compress::{CompressedEdge, CompressedFace, CompressedShell};

use crate::errors::LoadError;
use crate::step_export::LengthUnit;

/// Chord tolerance for curves truck-modeling cannot hold exactly.
const SAMPLING_TOLERANCE: f64 = 1e-5;

/// Read the closed shells of a STEP string into one shape.
///
/// Lines, B-splines, NURBS and planes come across exactly. Other edge
/// curves are sampled into degree-1 B-splines; other surfaces are rejected
/// with [`LoadError::Unsupported`]. Coordinates recorded in a unit other
/// than millimetres, as written by [`export_step`](crate::export_step),
/// are scaled back to millimetres.
#[instrument(skip(step), fields(bytes = step.len()))]
pub fn parse_step(step: &str) -> Result<Brep, LoadError> {
    let table = Table::from_step(step)
        .ok_or_else(|| LoadError::ParseError("not a STEP exchange structure".to_string()))?;
    let mut ids: Vec<u64> = table.shell.keys().copied().collect();
    ids.sort_unstable();
    let mut shells = Vec::with_capacity(ids.len());
    for id in ids {
        let compressed = table
            .to_compressed_shell(&table.shell[&id])
            .map_err(|e| LoadError::ParseError(format!("shell #{id}: {e}")))?;
        let shell = Shell::extract(modeling_shell(compressed)?)
            .map_err(|e| LoadError::Rebuild(format!("shell #{id}: {e}")))?;
        debug!(id, faces = shell.len(), "STEP shell read");
        shells.push(shell);
    }
    if shells.is_empty() {
        return Err(LoadError::ParseError("no shell in STEP data".to_string()));
    }
    let solid = Solid::try_new(shells).map_err(|e| LoadError::Rebuild(e.to_string()))?;
    let (store, root) = from_truck_solid(&solid).map_err(|e| LoadError::Rebuild(e.to_string()))?;
    let brep = Brep::from_parts(store, root);

    let unit = recorded_unit(step);
    let scale = unit.scale();
    let brep = if scale == 1.0 {
        brep
    } else {
        brep.transformed(&Transformation::scale(1.0 / scale, 1.0 / scale, 1.0 / scale))
            .map_err(|e| LoadError::Rebuild(e.to_string()))?
    };
    info!(unit = unit.name(), "STEP read");
    Ok(brep)
}

pub fn read_step(path: impl AsRef<Path>) -> Result<Brep, LoadError> {
    parse_step(&std::fs::read_to_string(path)?)
}

/// Unit named in a `/* unit: .. */` comment; millimetres when there is none.
fn recorded_unit(step: &str) -> LengthUnit {
    let name = step
        .split_once("/* unit: ")
        .and_then(|(_, rest)| rest.split_once(" */"))
        .map(|(name, _)| name.trim());
    [LengthUnit::Meter, LengthUnit::Inch]
        .into_iter()
        .find(|u| Some(u.name()) == name)
        .unwrap_or_default()
}

fn modeling_shell(
    shell: CompressedShell<Point3, Curve3D, StepSurface>,
) -> Result<CompressedShell<Point3, Curve, Surface>, LoadError> {
    let CompressedShell {
        vertices,
        edges,
        faces,
    } = shell;
    let edges = edges
        .into_iter()
        .map(|e| {
            Ok(CompressedEdge {
                vertices: e.vertices,
                curve: modeling_curve(e.curve)?,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;
    let faces = faces
        .into_iter()
        .map(|f| {
            Ok(CompressedFace {
                boundaries: f.boundaries,
                orientation: f.orientation,
                surface: modeling_surface(f.surface)?,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;
    Ok(CompressedShell {
        vertices,
        edges,
        faces,
    })
}

fn modeling_curve(curve: Curve3D) -> Result<Curve, LoadError> {
    match curve {
        Curve3D::Line(l) => Ok(Curve::Line(l)),
        Curve3D::BSplineCurve(b) => Ok(Curve::BSplineCurve(b)),
        Curve3D::NurbsCurve(n) => Ok(Curve::NurbsCurve(n)),
        other => {
            let (_, points) = other.parameter_division(other.range_tuple(), SAMPLING_TOLERANCE);
            if points.len() < 2 {
                return Err(LoadError::ParseError("edge curve without extent".to_string()));
            }
            let n = points.len() - 1;
            let mut knots = vec![0.0];
            knots.extend((0..=n).map(|i| i as f64 / n as f64));
            knots.push(1.0);
            Ok(Curve::BSplineCurve(BSplineCurve::new(KnotVec::from(knots), points)))
        }
    }
}

fn modeling_surface(surface: StepSurface) -> Result<Surface, LoadError> {
    let kind = match surface {
        StepSurface::ElementarySurface(e) => match *e {
            ElementarySurface::Plane(p) => return Ok(Surface::Plane(p)),
            ElementarySurface::Sphere(_) => "spherical",
            ElementarySurface::CylindricalSurface(_) => "cylindrical",
            ElementarySurface::ToroidalSurface(_) => "toroidal",
            ElementarySurface::ConicalSurface(_) => "conical",
        },
        StepSurface::BSplineSurface(b) => return Ok(Surface::BSplineSurface(*b)),
        StepSurface::NurbsSurface(n) => return Ok(Surface::NurbsSurface(*n)),
        StepSurface::SweptCurve(_) => "swept",
    };
    Err(LoadError::Unsupported {
        format: format!("STEP {kind} surface"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_unit() {
        assert_eq!(recorded_unit("ISO-10303-21;\n/* unit: in */\nHEADER;"), LengthUnit::Inch);
        assert_eq!(recorded_unit("ISO-10303-21;\n/* unit: m */"), LengthUnit::Meter);
        assert_eq!(recorded_unit("ISO-10303-21;\nHEADER;"), LengthUnit::Millimeter);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(parse_step("not a step file"), Err(LoadError::ParseError(_))));
    }
}
