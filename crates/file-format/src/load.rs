use std::path::Path;

use brep::Brep;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::{BrepFile, FORMAT_ID, FORMAT_VERSION};

/// Deserialize every named shape from a JSON string.
///
/// Validates the format identifier and version, and migrates files written
/// by older versions.
#[instrument(skip_all)]
pub fn load_bodies(json: &str) -> Result<(Vec<(String, Brep)>, ProjectMetadata), LoadError> {
    let value: Value = serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    let format = value
        .get("format")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::ParseError("missing format identifier".to_string()))?;
    if format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(format.to_string()));
    }

    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| LoadError::ParseError("missing format version".to_string()))?;
    if version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: version,
            supported_version: FORMAT_VERSION,
        });
    }

    let value = if version < FORMAT_VERSION {
        crate::migrate::migrate(value, version, FORMAT_VERSION)?
    } else {
        value
    };
    let file: BrepFile =
        serde_json::from_value(value).map_err(|e| LoadError::ParseError(e.to_string()))?;

    let bodies = file
        .bodies
        .into_iter()
        .map(|b| {
            let brep = Brep::from_data(&b.brep).map_err(|e| LoadError::Rebuild(e.to_string()))?;
            Ok((b.name, brep))
        })
        .collect::<Result<Vec<_>, LoadError>>()?;
    debug!(bodies = bodies.len(), version, "project loaded");
    Ok((bodies, file.project))
}

/// Deserialize the first shape of a file.
pub fn load_brep(json: &str) -> Result<(Brep, ProjectMetadata), LoadError> {
    let (bodies, project) = load_bodies(json)?;
    let (_, brep) = bodies
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::ParseError("file holds no bodies".to_string()))?;
    Ok((brep, project))
}

pub fn read_brep(path: impl AsRef<Path>) -> Result<(Brep, ProjectMetadata), LoadError> {
    load_brep(&std::fs::read_to_string(path)?)
}
