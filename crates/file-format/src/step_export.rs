use std::path::Path;

use brep::Brep;
use brep_kernel::truck_convert::to_truck_solid;
use brep_types::Transformation;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use truck_stepio::out::{CompleteStepDisplay, StepHeaderDescriptor, StepModel};

use crate::errors::ExportError;

/// Length unit of exported coordinates. Shapes are modelled in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    #[default]
    Millimeter,
    Meter,
    Inch,
}

impl LengthUnit {
    /// Factor taking millimetres to this unit.
    pub fn scale(self) -> f64 {
        match self {
            LengthUnit::Millimeter => 1.0,
            LengthUnit::Meter => 1e-3,
            LengthUnit::Inch => 1.0 / 25.4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Meter => "m",
            LengthUnit::Inch => "in",
        }
    }
}

/// Header fields and unit of a STEP file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOptions {
    pub unit: LengthUnit,
    pub author: Option<String>,
    /// File name recorded in the header.
    pub name: Option<String>,
    pub description: Option<String>,
    pub organization: Option<String>,
}

/// Export a solid to a STEP string.
///
/// The shape is converted to truck topology and written by truck-stepio.
/// Shapes that are not a single closed solid fail with
/// [`ExportError::NoSolid`].
#[instrument(skip(brep))]
pub fn export_step(brep: &Brep, options: &StepOptions) -> Result<String, ExportError> {
    let scale = options.unit.scale();
    let scaled;
    let brep = if scale == 1.0 {
        brep
    } else {
        scaled = brep
            .transformed(&Transformation::scale(scale, scale, scale))
            .map_err(|e| ExportError::StepExportFailed(e.to_string()))?;
        &scaled
    };

    let solid = to_truck_solid(brep.store(), brep.root()).map_err(|_| ExportError::NoSolid)?;
    let compressed = solid.compress();
    let header = StepHeaderDescriptor {
        file_name: options.name.clone().unwrap_or_else(|| "export.step".to_string()),
        time_stamp: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        authors: options.author.iter().cloned().collect(),
        organization: options.organization.iter().cloned().collect(),
        ..Default::default()
    };
    let body = CompleteStepDisplay::new(StepModel::from(&compressed), header).to_string();

    // Unit and description go in comments after the first line.
    let mut comment = format!("/* unit: {} */", options.unit.name());
    if let Some(d) = &options.description {
        comment.push_str(&format!("\n/* {} */", d.replace("*/", "* /")));
    }
    let step = match body.split_once('\n') {
        Some((first, rest)) => format!("{first}\n{comment}\n{rest}"),
        None => return Err(ExportError::StepExportFailed("empty STEP output".to_string())),
    };
    info!(bytes = step.len(), "STEP written");
    Ok(step)
}

pub fn write_step(path: impl AsRef<Path>, brep: &Brep, options: &StepOptions) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut options = options.clone();
    if options.name.is_none() {
        options.name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    std::fs::write(path, export_step(brep, &options)?)?;
    Ok(())
}
