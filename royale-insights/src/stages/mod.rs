//! Analysis stages.
//!
//! Each stage is a plain function over in-memory tables and upstream
//! reports. The pipeline layer wires them together by artifact name, but
//! every function here is usable on its own.

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::catalog::CardId;
use crate::error::Result;
use crate::frequency::{percentage, FrequencyCounter};
use crate::table::require_column;

pub mod business;
pub mod cards;
pub mod normalize;
pub mod rarity;
pub mod selection;
pub mod summary;
pub mod validation;
pub mod win_conditions;

pub use business::{
    analyze_business_objectives, define_ml_objectives, evaluate_current_situation,
    generate_project_plan, BusinessObjectives, CurrentSituation, MlObjectives, ProjectPlan,
};
pub use cards::{analyze_most_used_cards, CardUsageOutcome, CardUsageReport, CardUsageStats};
pub use normalize::{normalize_battle_table, BATTLE_ID_COLUMN};
pub use rarity::{
    analyze_rarity_distributions, RarityComparison, RarityReport, RarityStats, RarityTier,
};
pub use selection::{
    combine_datasets, select_relevant_columns, NamedTable, SelectedTables, RELEVANT_COLUMNS,
};
pub use summary::{
    create_business_summary, create_preparation_summary, generate_eda_summary, BusinessSummary,
    EdaSummary, PreparationSummary,
};
pub use validation::{validate_combined_dataset, ValidationReport};
pub use win_conditions::{
    analyze_win_conditions_usage, WinConditionOutcome, WinConditionReport, WinConditionUsageStats,
};

/// Serialized form of the "no card columns" marker outcome.
pub const NO_CARD_COLUMNS: &str = "No card columns found";

/// A column name with a count attached (missing values, for instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub column: String,
    pub count: usize,
}

/// A column name with its Arrow type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    pub column: String,
    pub data_type: String,
}

/// One entry of a card ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCard {
    pub card_id: CardId,
    pub card_name: String,
    pub count: u64,
    pub percentage: f64,
}

/// Null count of every column, in schema order.
pub fn missing_values(batch: &RecordBatch) -> Vec<ColumnCount> {
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| ColumnCount {
            column: field.name().clone(),
            count: array.logical_null_count(),
        })
        .collect()
}

/// Arrow type name of every column, in schema order.
pub fn data_types(batch: &RecordBatch) -> Vec<ColumnType> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|field| ColumnType {
            column: field.name().clone(),
            data_type: field.data_type().to_string(),
        })
        .collect()
}

/// Top `n` entries of `counter`, named by `resolve_name`.
///
/// Percentages use the counter's own total as base.
pub(crate) fn rank_cards<F>(counter: &FrequencyCounter<CardId>, n: usize, resolve_name: F) -> Vec<RankedCard>
where
    F: Fn(&CardId) -> String,
{
    let total = counter.total();
    counter
        .most_common(n)
        .into_iter()
        .map(|(card_id, count)| RankedCard {
            card_name: resolve_name(&card_id),
            card_id,
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

fn first_row(batches: &[RecordBatch]) -> Option<&RecordBatch> {
    batches.iter().find(|b| b.num_rows() > 0)
}

/// Reads a single aggregate value as `f64`; SQL NULL becomes `None`.
pub(crate) fn scalar_f64(batches: &[RecordBatch], column: &str) -> Result<Option<f64>> {
    let Some(batch) = first_row(batches) else {
        return Ok(None);
    };
    let values = cast(require_column(batch, column)?, &DataType::Float64)?;
    let values = values.as_primitive::<Float64Type>();
    Ok(values.is_valid(0).then(|| values.value(0)))
}

/// Reads a single aggregate value as `i64`; SQL NULL becomes `None`.
pub(crate) fn scalar_i64(batches: &[RecordBatch], column: &str) -> Result<Option<i64>> {
    let Some(batch) = first_row(batches) else {
        return Ok(None);
    };
    let values = cast(require_column(batch, column)?, &DataType::Int64)?;
    let values = values.as_primitive::<Int64Type>();
    Ok(values.is_valid(0).then(|| values.value(0)))
}
