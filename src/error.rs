use thiserror::Error;

/// Top-level error type for slider path decoration.
#[derive(Debug, Error)]
pub enum TumourError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors raised by the point arena and the hint partition.
#[derive(Debug, Error)]
pub enum PathError {
    /// The handle does not belong to this path (or its point was removed).
    #[error("point not found in path")]
    PointNotFound,

    /// A hint or occurrence was requested over a single node.
    #[error("range start and end are the same point")]
    EmptyRange,

    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A zero-length run has T defined on some points but not on others.
    #[error("inconsistent T values: {0}")]
    InconsistentT(String),

    #[error("path is empty")]
    Empty,
}

/// Errors related to decoration operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Errors raised while turning a decorated path back into control points.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("reconstruction failed: {0}")]
    Failed(String),
}

/// Errors raised while loading generator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience type alias for results using [`TumourError`].
pub type Result<T> = std::result::Result<T, TumourError>;
