//! Quality checks over the combined dataset.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::normalize::BATTLE_ID_COLUMN;
use super::{data_types, missing_values, scalar_i64, ColumnCount, ColumnType};
use crate::context::{quote_ident, InsightsContext};
use crate::error::Result;
use crate::frequency::round2;
use crate::table::{card_id_columns, require_column};

const WINNER_TAG_COLUMN: &str = "winner.tag";
const LOSER_TAG_COLUMN: &str = "loser.tag";

/// Card-id columns found in the combined table, split by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardColumnAnalysis {
    pub total_card_columns: usize,
    pub winner_card_columns: usize,
    pub loser_card_columns: usize,
    pub winner_card_columns_names: Vec<String>,
    pub loser_card_columns_names: Vec<String>,
}

/// Distinct non-null values of the identifier columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValues {
    pub unique_battle_ids: u64,
    pub unique_winner_tags: u64,
    pub unique_loser_tags: u64,
}

/// Whether each identifier column is free of nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIntegrity {
    pub battle_ids_complete: bool,
    pub winner_tags_complete: bool,
    pub loser_tags_complete: bool,
}

/// Descriptive quality report of the combined dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub total_columns: usize,
    pub missing_values: Vec<ColumnCount>,
    /// Rows beyond the first occurrence of each distinct row.
    pub duplicate_records: u64,
    pub data_types: Vec<ColumnType>,
    pub memory_usage_bytes: usize,
    pub memory_usage_mb: f64,
    pub card_analysis: CardColumnAnalysis,
    pub unique_values: UniqueValues,
    pub data_integrity: DataIntegrity,
}

impl ValidationReport {
    /// Sum of null counts over all columns.
    pub fn total_missing_values(&self) -> usize {
        self.missing_values.iter().map(|c| c.count).sum()
    }
}

fn card_analysis(batch: &RecordBatch) -> CardColumnAnalysis {
    let card_columns = card_id_columns(batch);
    let by_side = |side: &str| -> Vec<String> {
        card_columns
            .iter()
            .filter(|c| c.to_lowercase().contains(side))
            .cloned()
            .collect()
    };
    let winner = by_side("winner");
    let loser = by_side("loser");

    CardColumnAnalysis {
        total_card_columns: card_columns.len(),
        winner_card_columns: winner.len(),
        loser_card_columns: loser.len(),
        winner_card_columns_names: winner,
        loser_card_columns_names: loser,
    }
}

/// Validates the combined dataset.
///
/// Fails with `ColumnNotFound` when `battle_id`, `winner.tag` or
/// `loser.tag` is missing. Duplicate rows compare nulls as equal.
#[instrument(skip(ctx, batch), fields(rows = batch.num_rows(), columns = batch.num_columns()))]
pub async fn validate_combined_dataset(
    ctx: &InsightsContext,
    batch: &RecordBatch,
) -> Result<ValidationReport> {
    let battle_ids = require_column(batch, BATTLE_ID_COLUMN)?;
    let winner_tags = require_column(batch, WINNER_TAG_COLUMN)?;
    let loser_tags = require_column(batch, LOSER_TAG_COLUMN)?;

    let data_integrity = DataIntegrity {
        battle_ids_complete: battle_ids.logical_null_count() == 0,
        winner_tags_complete: winner_tags.logical_null_count() == 0,
        loser_tags_complete: loser_tags.logical_null_count() == 0,
    };

    let distinct_rows = ctx
        .query_batch(batch, |table| {
            format!("SELECT COUNT(*) AS distinct_rows FROM (SELECT DISTINCT * FROM {table}) AS d")
        })
        .await?;
    let distinct_rows = scalar_i64(&distinct_rows, "distinct_rows")?.unwrap_or(0) as u64;
    let duplicate_records = (batch.num_rows() as u64).saturating_sub(distinct_rows);

    let cardinalities = ctx
        .query_batch(batch, |table| {
            format!(
                "SELECT COUNT(DISTINCT {}) AS battle_ids, \
                 COUNT(DISTINCT {}) AS winner_tags, \
                 COUNT(DISTINCT {}) AS loser_tags FROM {table}",
                quote_ident(BATTLE_ID_COLUMN),
                quote_ident(WINNER_TAG_COLUMN),
                quote_ident(LOSER_TAG_COLUMN),
            )
        })
        .await?;
    let unique_values = UniqueValues {
        unique_battle_ids: scalar_i64(&cardinalities, "battle_ids")?.unwrap_or(0) as u64,
        unique_winner_tags: scalar_i64(&cardinalities, "winner_tags")?.unwrap_or(0) as u64,
        unique_loser_tags: scalar_i64(&cardinalities, "loser_tags")?.unwrap_or(0) as u64,
    };

    let memory_usage_bytes = batch.get_array_memory_size();
    let report = ValidationReport {
        total_records: batch.num_rows(),
        total_columns: batch.num_columns(),
        missing_values: missing_values(batch),
        duplicate_records,
        data_types: data_types(batch),
        memory_usage_bytes,
        memory_usage_mb: round2(memory_usage_bytes as f64 / 1024.0 / 1024.0),
        card_analysis: card_analysis(batch),
        unique_values,
        data_integrity,
    };

    info!(
        records = report.total_records,
        duplicates = report.duplicate_records,
        "Validation completed"
    );
    Ok(report)
}
