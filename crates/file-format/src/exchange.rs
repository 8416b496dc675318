//! Exchange-format entry points on [`Brep`], reporting failures as
//! [`BrepError::Io`]. IGES is neither read nor written.

use std::path::Path;

use brep::{Brep, BrepError};
use tracing::warn;

use crate::errors::{ExportError, LoadError};
use crate::step_export::{write_step, StepOptions};
use crate::step_import::read_step;
use crate::stl::{write_stl, StlOptions};

pub fn import_step(path: impl AsRef<Path>) -> Result<Brep, LoadError> {
    read_step(path)
}

pub fn import_iges(path: impl AsRef<Path>) -> Result<Brep, LoadError> {
    warn!(path = %path.as_ref().display(), "IGES import requested");
    Err(LoadError::Unsupported {
        format: "IGES".to_string(),
    })
}

pub fn export_iges(_brep: &Brep, path: impl AsRef<Path>) -> Result<(), ExportError> {
    warn!(path = %path.as_ref().display(), "IGES export requested");
    Err(ExportError::Unsupported {
        format: "IGES".to_string(),
    })
}

/// File exchange for shapes.
pub trait BrepExchange: Sized {
    fn to_step(&self, path: impl AsRef<Path>, options: &StepOptions) -> Result<(), BrepError>;
    fn to_stl(&self, path: impl AsRef<Path>, options: &StlOptions) -> Result<(), BrepError>;
    fn to_iges(&self, path: impl AsRef<Path>) -> Result<(), BrepError>;
    fn from_step(path: impl AsRef<Path>) -> Result<Self, BrepError>;
    fn from_iges(path: impl AsRef<Path>) -> Result<Self, BrepError>;
}

impl BrepExchange for Brep {
    fn to_step(&self, path: impl AsRef<Path>, options: &StepOptions) -> Result<(), BrepError> {
        write_step(path, self, options).map_err(|e| e.into_brep_error("Brep::to_step"))
    }

    fn to_stl(&self, path: impl AsRef<Path>, options: &StlOptions) -> Result<(), BrepError> {
        write_stl(path, self, options).map_err(|e| e.into_brep_error("Brep::to_stl"))
    }

    fn to_iges(&self, path: impl AsRef<Path>) -> Result<(), BrepError> {
        export_iges(self, path).map_err(|e| e.into_brep_error("Brep::to_iges"))
    }

    fn from_step(path: impl AsRef<Path>) -> Result<Self, BrepError> {
        import_step(path).map_err(|e| e.into_brep_error("Brep::from_step"))
    }

    fn from_iges(path: impl AsRef<Path>) -> Result<Self, BrepError> {
        import_iges(path).map_err(|e| e.into_brep_error("Brep::from_iges"))
    }
}
