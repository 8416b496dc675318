use brep_kernel::KernelError;

/// Errors from BRep operations. Every variant names the operation that
/// failed.
#[derive(Debug, thiserror::Error)]
pub enum BrepError {
    #[error("{operation}: boolean operation failed: {reason}")]
    Boolean { operation: String, reason: String },

    #[error("{operation}: fillet failed: {reason}")]
    Fillet { operation: String, reason: String },

    #[error("{operation}: expected {expected}, found {found}")]
    Domain {
        operation: String,
        expected: String,
        found: String,
    },

    #[error("{operation}: construction failed: {reason}")]
    Construction { operation: String, reason: String },

    #[error("{operation}: i/o failed with status {status}: {reason}")]
    Io {
        operation: String,
        status: i32,
        reason: String,
    },

    #[error("{operation}: {source}")]
    Kernel {
        operation: String,
        #[source]
        source: KernelError,
    },
}

impl BrepError {
    /// Wrap a kernel error raised while running `operation`.
    pub fn kernel(operation: &str) -> impl FnOnce(KernelError) -> BrepError + '_ {
        move |source| BrepError::Kernel {
            operation: operation.to_string(),
            source,
        }
    }

    pub(crate) fn domain(operation: &str, expected: &str, found: impl ToString) -> Self {
        BrepError::Domain {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn construction(operation: &str, reason: impl Into<String>) -> Self {
        BrepError::Construction {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// The operation named by this error.
    pub fn operation(&self) -> &str {
        match self {
            BrepError::Boolean { operation, .. }
            | BrepError::Fillet { operation, .. }
            | BrepError::Domain { operation, .. }
            | BrepError::Construction { operation, .. }
            | BrepError::Io { operation, .. }
            | BrepError::Kernel { operation, .. } => operation,
        }
    }
}

pub type Result<T> = std::result::Result<T, BrepError>;
