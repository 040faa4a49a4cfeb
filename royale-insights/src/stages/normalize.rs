//! Leading-column normalization for raw battle tables.

use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;

/// Canonical name of the battle identifier column.
pub const BATTLE_ID_COLUMN: &str = "battle_id";

/// Renames the first column of a raw battle table to [`BATTLE_ID_COLUMN`].
///
/// Raw exports carry the row identifier in an unlabeled leading column.
/// Rows, arrays and the remaining columns are passed through untouched. A
/// table without columns is returned as is.
#[instrument(skip(batch), fields(rows = batch.num_rows(), columns = batch.num_columns()))]
pub fn normalize_battle_table(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    if schema.fields().is_empty() {
        return Ok(batch.clone());
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            if i == 0 {
                field.as_ref().clone().with_name(BATTLE_ID_COLUMN)
            } else {
                field.as_ref().clone()
            }
        })
        .collect();
    let renamed = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    let normalized =
        RecordBatch::try_new_with_options(renamed, batch.columns().to_vec(), &options)?;

    info!(
        first_column = BATTLE_ID_COLUMN,
        rows = normalized.num_rows(),
        columns = normalized.num_columns(),
        "Normalized battle table"
    );
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};

    #[test]
    fn test_renames_only_the_first_column() {
        let batch = RecordBatch::try_from_iter(vec![
            ("", Arc::new(StringArray::from(vec!["B1", "B2"])) as ArrayRef),
            ("winner.tag", Arc::new(StringArray::from(vec!["#A", "#B"])) as ArrayRef),
            ("winner.card1.id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
        ])
        .unwrap();

        let normalized = normalize_battle_table(&batch).unwrap();
        let schema = normalized.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["battle_id", "winner.tag", "winner.card1.id"]);
        assert_eq!(normalized.num_rows(), 2);
        assert_eq!(normalized.column(0), batch.column(0));
    }

    #[test]
    fn test_already_named_column_is_overwritten() {
        let batch = RecordBatch::try_from_iter(vec![(
            "Unnamed: 0",
            Arc::new(Int64Array::from(vec![7])) as ArrayRef,
        )])
        .unwrap();
        let normalized = normalize_battle_table(&batch).unwrap();
        assert_eq!(normalized.schema().field(0).name(), BATTLE_ID_COLUMN);
    }

    #[test]
    fn test_table_without_columns_is_untouched() {
        let options = RecordBatchOptions::new().with_row_count(Some(0));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::empty()), vec![], &options)
                .unwrap();
        let normalized = normalize_battle_table(&batch).unwrap();
        assert_eq!(normalized.num_columns(), 0);
    }
}
