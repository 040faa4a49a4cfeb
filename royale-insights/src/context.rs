//! DataFusion context management.
//!
//! [`InsightsContext`] wraps a [`SessionContext`] and gives the stages a
//! scoped way to run SQL against an in-memory `RecordBatch`: the batch is
//! registered under a unique name for the duration of one query and removed
//! afterwards, so stages never see each other's tables.

use arrow::record_batch::RecordBatch;
use datafusion::execution::context::{SessionConfig, SessionContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

use crate::error::Result;

/// Configuration for creating an [`InsightsContext`].
#[derive(Debug, Clone)]
pub struct InsightsContextConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Target number of partitions for query execution
    pub target_partitions: usize,
}

impl Default for InsightsContextConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get().max(1),
        }
    }
}

/// A managed DataFusion context for the analysis stages.
pub struct InsightsContext {
    inner: SessionContext,
    config: InsightsContextConfig,
    next_table: AtomicUsize,
}

impl std::fmt::Debug for InsightsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for InsightsContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsContext {
    /// Creates a context with default configuration.
    pub fn new() -> Self {
        Self::with_config(InsightsContextConfig::default())
    }

    /// Creates a context with custom configuration.
    pub fn with_config(config: InsightsContextConfig) -> Self {
        let session_config = SessionConfig::new()
            .with_batch_size(config.batch_size)
            .with_target_partitions(config.target_partitions);

        Self {
            inner: SessionContext::new_with_config(session_config),
            config,
            next_table: AtomicUsize::new(0),
        }
    }

    /// Returns the underlying DataFusion [`SessionContext`].
    pub fn inner(&self) -> &SessionContext {
        &self.inner
    }

    /// Returns the configuration used to create this context.
    pub fn config(&self) -> &InsightsContextConfig {
        &self.config
    }

    /// Runs a query against `batch`.
    ///
    /// `build_sql` receives the temporary table name and returns the SQL to
    /// execute. Column names containing dots must be double-quoted by the
    /// caller (see [`quote_ident`]).
    #[instrument(skip(self, batch, build_sql), fields(rows = batch.num_rows()))]
    pub async fn query_batch<F>(&self, batch: &RecordBatch, build_sql: F) -> Result<Vec<RecordBatch>>
    where
        F: FnOnce(&str) -> String,
    {
        let table_name = format!(
            "insights_scratch_{}",
            self.next_table.fetch_add(1, Ordering::Relaxed)
        );
        self.inner.register_batch(table_name.as_str(), batch.clone())?;

        let sql = build_sql(&table_name);
        debug!(table = %table_name, sql = %sql, "Executing scratch query");

        let result = match self.inner.sql(&sql).await {
            Ok(df) => df.collect().await,
            Err(e) => Err(e),
        };

        self.inner.deregister_table(table_name.as_str())?;
        Ok(result?)
    }
}

/// Double-quotes an identifier for DataFusion SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
