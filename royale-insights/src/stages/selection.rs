//! Column selection and row-wise unification of the battle tables.

use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use tracing::{info, instrument, warn};

use super::normalize::BATTLE_ID_COLUMN;
use super::rarity::RarityTier;
use crate::error::Result;
use crate::table::{concat_outer, project};

/// Player sides in a battle record.
pub const SIDES: [&str; 2] = ["winner", "loser"];

/// Whitelist of columns kept for analysis, in output order.
///
/// `battle_id`, both player tags, then per side the eight card slot ids, the
/// serialized deck and the four rarity counts.
pub static RELEVANT_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut columns = vec![
        BATTLE_ID_COLUMN.to_string(),
        "winner.tag".to_string(),
        "loser.tag".to_string(),
    ];
    for side in SIDES {
        columns.extend((1..=8).map(|slot| format!("{side}.card{slot}.id")));
        columns.push(format!("{side}.cards.list"));
        columns.extend(RarityTier::ALL.iter().map(|tier| tier.column(side)));
    }
    columns
});

/// A table tagged with the name of the batch it came from.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub batch: RecordBatch,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, batch: RecordBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }
}

/// The per-batch projections, in batch order.
#[derive(Debug, Clone, Default)]
pub struct SelectedTables {
    pub tables: Vec<NamedTable>,
}

impl SelectedTables {
    /// Looks a projection up by batch name.
    pub fn get(&self, name: &str) -> Option<&RecordBatch> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .map(|t| &t.batch)
    }

    /// Total rows across all projections.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.batch.num_rows()).sum()
    }
}

/// Projects every table onto the whitelist columns it actually has.
///
/// Absent whitelist columns are reported with a warning and skipped; this
/// never fails for a well-formed table.
#[instrument(skip(tables), fields(tables = tables.len()))]
pub fn select_relevant_columns(tables: &[NamedTable]) -> Result<SelectedTables> {
    let mut selected = Vec::with_capacity(tables.len());

    for table in tables {
        let (present, missing): (Vec<String>, Vec<String>) = RELEVANT_COLUMNS
            .iter()
            .cloned()
            .partition(|column| table.batch.column_by_name(column).is_some());

        if !missing.is_empty() {
            warn!(
                table = %table.name,
                missing = ?missing,
                "Table lacks whitelisted columns"
            );
        }

        let batch = project(&table.batch, &present)?;
        info!(
            table = %table.name,
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "Selected relevant columns"
        );
        selected.push(NamedTable::new(table.name.clone(), batch));
    }

    Ok(SelectedTables { tables: selected })
}

/// Concatenates the selected projections row-wise, in batch order.
///
/// Columns are the ordered union of the inputs; rows from a batch lacking a
/// column are null there. No deduplication happens here.
#[instrument(skip(selected))]
pub fn combine_datasets(selected: &SelectedTables) -> Result<RecordBatch> {
    let batches: Vec<RecordBatch> = selected.tables.iter().map(|t| t.batch.clone()).collect();
    let combined = concat_outer(&batches)?;
    info!(
        rows = combined.num_rows(),
        columns = combined.num_columns(),
        "Combined datasets"
    );
    Ok(combined)
}
