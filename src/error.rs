//! Error types for the assembly and eigen-solve core

use thiserror::Error;

/// Classification of a failure, used by drivers to decide whether a step
/// can be retried with different parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Modelling or API misuse. Not retried.
    Configuration,
    /// Numerical breakdown for the current parameters (shift, step).
    Numerical,
    /// Buffer allocation failed.
    OutOfMemory,
    /// Export/serialization failure.
    Io,
}

/// Main error type for FEA operations
#[derive(Error, Debug)]
pub enum FEAError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Unknown beam integration family '{0}'")]
    UnknownIntegration(String),

    #[error("DOF count mismatch for {what}: expected {expected}, found {found}")]
    DofMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("No free degrees of freedom - system of equations has size 0")]
    NoFreeDofs,

    #[error("Eigen mode {mode} out of range, {num_modes} mode(s) available")]
    ModeOutOfRange { mode: usize, num_modes: usize },

    #[error("Duplicate tag {tag} in {collection}")]
    DuplicateTag { collection: &'static str, tag: usize },

    #[error("Node {0} not found in domain")]
    NodeNotFound(usize),

    #[error("Element {0} not found in domain")]
    ElementNotFound(usize),

    #[error("DOF group {0} not found in analysis model")]
    DofGroupNotFound(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Factorization failed: non-positive pivot at row {row} (singular or indefinite matrix)")]
    SingularFactor { row: usize },

    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FEAError {
    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FEAError::SingularFactor { .. } | FEAError::NumericalFailure(_) => {
                ErrorKind::Numerical
            }
            FEAError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            FEAError::SerializationError(_) => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }

    /// True for modelling/configuration errors
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// True for failures that may succeed with different numerical parameters
    pub fn is_numerical(&self) -> bool {
        self.kind() == ErrorKind::Numerical
    }
}

/// Result type for FEA operations
pub type FEAResult<T> = Result<T, FEAError>;
