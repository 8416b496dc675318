use std::path::Path;

use brep::{Brep, BrepData};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::ExportError;
use crate::metadata::ProjectMetadata;

/// Format identifier written at the top of every file.
pub const FORMAT_ID: &str = "brep-json";

/// Current file format version.
pub const FORMAT_VERSION: u32 = 2;

/// A named shape inside a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    pub brep: BrepData,
}

/// The top-level file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrepFile {
    /// Format identifier.
    pub format: String,
    /// Format version number.
    pub version: u32,
    pub project: ProjectMetadata,
    pub bodies: Vec<Body>,
}

/// Serialize several named shapes to a pretty-printed JSON string.
#[instrument(skip_all, fields(bodies = bodies.len()))]
pub fn save_bodies(bodies: &[(&str, &Brep)], metadata: &ProjectMetadata) -> Result<String, ExportError> {
    let bodies = bodies
        .iter()
        .map(|(name, brep)| {
            Ok(Body {
                name: name.to_string(),
                brep: brep.to_data().map_err(|e| ExportError::Serialize(e.to_string()))?,
            })
        })
        .collect::<Result<Vec<_>, ExportError>>()?;
    let file = BrepFile {
        format: FORMAT_ID.to_string(),
        version: FORMAT_VERSION,
        project: metadata.clone(),
        bodies,
    };
    let json = serde_json::to_string_pretty(&file).map_err(|e| ExportError::Serialize(e.to_string()))?;
    info!(bytes = json.len(), "project saved");
    Ok(json)
}

/// Serialize one shape, named after the project.
pub fn save_brep(brep: &Brep, metadata: &ProjectMetadata) -> Result<String, ExportError> {
    save_bodies(&[(metadata.name.as_str(), brep)], metadata)
}

pub fn write_brep(
    path: impl AsRef<Path>,
    brep: &Brep,
    metadata: &ProjectMetadata,
) -> Result<(), ExportError> {
    std::fs::write(path, save_brep(brep, metadata)?)?;
    Ok(())
}
