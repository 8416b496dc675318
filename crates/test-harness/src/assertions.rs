//! Rich assertion helpers with diagnostic output.
//!
//! Every failure includes expected vs actual and the context string, and
//! body-level assertions list the bodies currently in the model.

use brep::Brep;
use brep_types::Mesh;

use crate::helpers::HarnessError;
use crate::oracle::topology_counts;
use crate::workflow::ModelBuilder;

/// Assert exact topology counts (V, E, F) for a shape.
pub fn assert_topology_eq(
    brep: &Brep,
    expected_v: usize,
    expected_e: usize,
    expected_f: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (v, e, f) = topology_counts(brep)?;

    if v == expected_v && e == expected_e && f == expected_f {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected V={} E={} F={}, got V={} E={} F={}",
                ctx, expected_v, expected_e, expected_f, v, e, f,
            ),
        })
    }
}

/// Assert the enclosed volume within a relative tolerance.
pub fn assert_volume(brep: &Brep, expected: f64, rel_tol: f64, ctx: &str) -> Result<(), HarnessError> {
    let volume = brep.volume()?;
    if (volume - expected).abs() <= rel_tol * expected.abs().max(1e-12) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected volume {:.6}, got {:.6} (rel tol={})",
                ctx, expected, volume, rel_tol,
            ),
        })
    }
}

/// Assert the mesh bounding box matches expected values within tolerance.
pub fn assert_bounding_box(
    mesh: &Mesh,
    expected_min: [f64; 3],
    expected_max: [f64; 3],
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (actual_min, actual_max) =
        crate::helpers::mesh_bounding_box(mesh).ok_or_else(|| HarnessError::AssertionFailed {
            detail: format!("[{}] mesh has no vertices", ctx),
        })?;

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box min[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_min[i], actual_min[i], tol,
                ),
            });
        }
        if (actual_max[i] - expected_max[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box max[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_max[i], actual_max[i], tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert the model holds exactly these bodies, in order, with these root
/// kinds (`"solid"`, `"shell"`, `"compound"` and so on).
pub fn assert_bodies(model: &ModelBuilder, expected: &[(&str, &str)]) -> Result<(), HarnessError> {
    let actual = model
        .bodies()
        .map(|(name, brep)| Ok((name.to_string(), format!("{:?}", brep.kind()?).to_lowercase())))
        .collect::<Result<Vec<(String, String)>, HarnessError>>()?;

    if actual.len() != expected.len() {
        let errors: Vec<String> = model
            .errors()
            .iter()
            .map(|(name, msg)| format!("  {}: {}", name, msg))
            .collect();
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "body count mismatch: expected {}, got {}.\nActual: {:?}\nErrors:\n{}",
                expected.len(),
                actual.len(),
                actual,
                if errors.is_empty() {
                    "  none".to_string()
                } else {
                    errors.join("\n")
                },
            ),
        });
    }

    for (i, ((act_name, act_kind), (exp_name, exp_kind))) in
        actual.iter().zip(expected.iter()).enumerate()
    {
        if act_name != exp_name || act_kind != exp_kind {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "body mismatch at index {}: expected (\"{}\", \"{}\"), got (\"{}\", \"{}\")",
                    i, exp_name, exp_kind, act_name, act_kind,
                ),
            });
        }
    }

    Ok(())
}
