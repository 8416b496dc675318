use serde_json::{json, Value};

use crate::errors::LoadError;

/// Apply format migrations from `from_version` to `to_version`.
///
/// Migrations are applied sequentially: v1 to v2, v2 to v3, and so on.
pub fn migrate(mut file: Value, from_version: u32, to_version: u32) -> Result<Value, LoadError> {
    let mut version = from_version;
    while version < to_version {
        file = match version {
            1 => v1_to_v2(file)?,
            _ => {
                return Err(LoadError::MigrationFailed {
                    from: version,
                    to: to_version,
                    reason: format!("no migration path from v{}", version),
                })
            }
        };
        version += 1;
    }
    if let Some(v) = file.get_mut("version") {
        *v = json!(version);
    }
    Ok(file)
}

/// Version 1 held a single unnamed shape under `brep`; version 2 holds a
/// list of named bodies.
fn v1_to_v2(mut file: Value) -> Result<Value, LoadError> {
    let failed = |reason: &str| LoadError::MigrationFailed {
        from: 1,
        to: 2,
        reason: reason.to_string(),
    };
    let obj = file.as_object_mut().ok_or_else(|| failed("file is not an object"))?;
    let brep = obj.remove("brep").ok_or_else(|| failed("missing brep"))?;
    let name = obj
        .get("project")
        .and_then(|p| p.get("name"))
        .cloned()
        .unwrap_or_else(|| json!("body"));
    obj.insert("bodies".to_string(), json!([{ "name": name, "brep": brep }]));
    Ok(file)
}
