//! Data sources that load a table into memory.
//!
//! Sources are read through DataFusion so schema inference and parsing are
//! the engine's; callers get back one `RecordBatch` per source.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::fmt::Debug;

use crate::context::InsightsContext;
use crate::error::Result;

mod csv;

pub use csv::{CsvOptions, CsvSource};

/// A source that can be materialized into a single table.
///
/// # Examples
///
/// ```rust,ignore
/// use royale_insights::sources::{CsvSource, DataSource};
/// use royale_insights::context::InsightsContext;
///
/// # async fn example() -> royale_insights::error::Result<()> {
/// let ctx = InsightsContext::new();
/// let source = CsvSource::new("data/01_raw/cardlist.csv")?;
/// let cards = source.load(&ctx).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Reads the whole source into one batch.
    async fn load(&self, ctx: &InsightsContext) -> Result<RecordBatch>;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}
