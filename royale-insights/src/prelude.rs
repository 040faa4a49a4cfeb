//! Prelude for commonly used types and traits in royale-insights.

pub use crate::catalog::{CardCatalog, CardId, CatalogConfig, DataCatalog, WinConditionCatalog};
pub use crate::config::InsightsConfig;
pub use crate::context::{InsightsContext, InsightsContextConfig};
pub use crate::error::{ErrorContext, InsightsError, Result};
pub use crate::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter, RunReport,
};
pub use crate::logging::LogConfig;
pub use crate::pipeline::{
    self, Artifact, ArtifactStore, Node, Pipeline, PipelineRunner, RunSummary,
};
pub use crate::sources::{CsvOptions, CsvSource, DataSource};
pub use crate::stages::{RankedCard, RarityTier};

pub use arrow::record_batch::RecordBatch;
