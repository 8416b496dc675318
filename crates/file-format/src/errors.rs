use brep::BrepError;

/// Errors while reading a file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse file: {0}")]
    ParseError(String),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error("file version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("{format} import is not supported")]
    Unsupported { format: String },

    #[error("rebuilding shape failed: {0}")]
    Rebuild(String),

    #[error("i/o: {0}")]
    Io(String),
}

impl LoadError {
    /// Numeric status reported alongside the message.
    pub fn status(&self) -> i32 {
        match self {
            LoadError::ParseError(_) => 1,
            LoadError::UnknownFormat(_) => 2,
            LoadError::FutureVersion { .. } => 3,
            LoadError::MigrationFailed { .. } => 4,
            LoadError::Unsupported { .. } => 5,
            LoadError::Rebuild(_) => 6,
            LoadError::Io(_) => 7,
        }
    }

    /// Report this failure as an i/o error of `operation`.
    pub fn into_brep_error(self, operation: &str) -> BrepError {
        BrepError::Io {
            operation: operation.to_string(),
            status: self.status(),
            reason: self.to_string(),
        }
    }
}

/// Errors while writing a file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("STEP export failed: {0}")]
    StepExportFailed(String),

    #[error("STL export failed: {0}")]
    StlExportFailed(String),

    #[error("{format} export is not supported")]
    Unsupported { format: String },

    #[error("serializing shape failed: {0}")]
    Serialize(String),

    #[error("no solid available for export")]
    NoSolid,

    #[error("i/o: {0}")]
    Io(String),
}

impl ExportError {
    pub fn status(&self) -> i32 {
        match self {
            ExportError::StepExportFailed(_) => 11,
            ExportError::StlExportFailed(_) => 12,
            ExportError::Unsupported { .. } => 13,
            ExportError::Serialize(_) => 14,
            ExportError::NoSolid => 15,
            ExportError::Io(_) => 16,
        }
    }

    pub fn into_brep_error(self, operation: &str) -> BrepError {
        BrepError::Io {
            operation: operation.to_string(),
            status: self.status(),
            reason: self.to_string(),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e.to_string())
    }
}

impl From<LoadError> for BrepError {
    fn from(e: LoadError) -> Self {
        e.into_brep_error("load")
    }
}

impl From<ExportError> for BrepError {
    fn from(e: ExportError) -> Self {
        e.into_brep_error("export")
    }
}
