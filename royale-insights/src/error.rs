//! Error types for the royale-insights library.
//!
//! All fallible operations return [`InsightsError`] through the [`Result`]
//! alias. Only structural problems surface here: a required identifier
//! column missing from the unified table, an unreadable source file, or a
//! malformed pipeline. Recoverable conditions such as missing optional
//! columns or empty denominators are represented as data in the reports.

use thiserror::Error;

/// The main error type for the royale-insights library.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON serialization.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error while rendering a report.
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required column is not present in the table.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A node asked for an artifact that has not been produced.
    #[error("Artifact '{name}' not found in store")]
    ArtifactNotFound { name: String },

    /// A stored artifact does not have the type a node expected.
    #[error("Artifact '{name}' has type {found}, expected {expected}")]
    ArtifactTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A pipeline input is neither produced by a node nor present in the store.
    #[error("Pipeline input '{name}' is not available")]
    MissingInput { name: String },

    /// Two nodes declare the same output.
    #[error("Output '{output}' is produced by both '{first}' and '{second}'")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },

    /// Node dependencies form a cycle.
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// No pipeline is registered under the requested name.
    #[error("Unknown pipeline '{0}'")]
    UnknownPipeline(String),

    /// A pipeline node failed; the run is aborted.
    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: Box<InsightsError>,
    },

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, InsightsError>`.
pub type Result<T> = std::result::Result<T, InsightsError>;

impl InsightsError {
    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Wraps an error raised while executing the named node.
    pub fn node_failed(node: impl Into<String>, source: InsightsError) -> Self {
        Self::NodeFailed {
            node: node.into(),
            source: Box::new(source),
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<InsightsError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            InsightsError::Internal(inner) => InsightsError::Internal(format!("{msg}: {inner}")),
            other => InsightsError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                InsightsError::Internal(inner) => {
                    InsightsError::Internal(format!("{msg}: {inner}"))
                }
                other => InsightsError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
