use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate metric definition: attribute '{attribute}' is already defined")]
    DuplicateDefinition { attribute: String },

    #[error("Histogram '{metric}' expects {expected} bucket counts, got {actual}")]
    BucketMismatch {
        metric: String,
        expected: usize,
        actual: usize,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Export timed out after {timeout_ms}ms")]
    ExportTimeout { timeout_ms: u64 },

    #[error("Failed to persist telemetry to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("GRPC error: {0}")]
    Grpc(#[from] tonic::Status),
}

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

impl TelemetryError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new export error
    pub fn export<S: Into<String>>(msg: S) -> Self {
        Self::Export(msg.into())
    }

    /// Creates a persistence error for `path`
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error must fail the `report()` call that raised it.
    ///
    /// Export problems are recovered inside the TS reporter; everything else
    /// (bad configuration, failed writes) reaches the caller.
    pub fn is_fatal_to_report(&self) -> bool {
        !matches!(self, Self::Export(_) | Self::ExportTimeout { .. } | Self::Grpc(_))
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::BucketMismatch { .. } | Self::Yaml(_) => "config",
            Self::DuplicateDefinition { .. } => "definition",
            Self::Export(_) | Self::ExportTimeout { .. } | Self::Grpc(_) => "export",
            Self::Persistence { .. } => "persistence",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
