//! Arrow `RecordBatch` helpers shared by the stages.

use arrow::array::{new_null_array, Array, ArrayRef, AsArray};
use arrow::compute::{cast, cast_with_options, concat_batches, CastOptions};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::CardId;
use crate::error::{InsightsError, Result};

/// Names of all columns in order.
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Returns the named column, or a `ColumnNotFound` error.
pub fn require_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| InsightsError::column_not_found(name))
}

/// Projects `batch` onto `names`, in the given order.
///
/// Every name must exist; callers filter beforehand.
pub fn project(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices = names
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| InsightsError::column_not_found(name.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;

    if indices.is_empty() {
        let empty = Arc::new(Schema::empty());
        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        return Ok(RecordBatch::try_new_with_options(empty, vec![], &options)?);
    }

    Ok(batch.project(&indices)?)
}

/// Row-wise concatenation with outer column alignment.
///
/// The result has the union of the input columns in first-appearance order.
/// Rows from a batch lacking a column get nulls there. A column whose type
/// differs between batches takes the common type of [`widen`], so every
/// value survives the union. All output fields are nullable.
pub fn concat_outer(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let mut fields: Vec<Field> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for batch in batches {
        for field in batch.schema().fields() {
            match positions.get(field.name()) {
                Some(&pos) => {
                    let common = widen(fields[pos].data_type(), field.data_type());
                    if &common != fields[pos].data_type() {
                        fields[pos] = Field::new(field.name(), common, true);
                    }
                }
                None => {
                    positions.insert(field.name().clone(), fields.len());
                    fields.push(Field::new(field.name(), field.data_type().clone(), true));
                }
            }
        }
    }

    let schema: SchemaRef = Arc::new(Schema::new(fields));
    let total_rows: usize = batches.iter().map(RecordBatch::num_rows).sum();

    if schema.fields().is_empty() {
        let options = RecordBatchOptions::new().with_row_count(Some(total_rows));
        return Ok(RecordBatch::try_new_with_options(schema, vec![], &options)?);
    }

    let aligned = batches
        .iter()
        .map(|batch| align_to_schema(batch, &schema))
        .collect::<Result<Vec<_>>>()?;

    Ok(concat_batches(&schema, &aligned)?)
}

/// Common type of a column seen as both `a` and `b`.
///
/// `Null` yields to the other side, mixed integers become `Int64`, any
/// other numeric mix becomes `Float64`, and everything else falls back to
/// `Utf8`.
pub fn widen(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        _ if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        _ if a.is_integer() && b.is_integer() => DataType::Int64,
        _ if a.is_numeric() && b.is_numeric() => DataType::Float64,
        _ => DataType::Utf8,
    }
}

fn align_to_schema(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(array) if array.data_type() == field.data_type() => Ok(array.clone()),
            Some(array) => Ok(cast_with_options(array, field.data_type(), &strict)?),
            None => Ok(new_null_array(field.data_type(), rows)),
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(
        schema.clone(),
        columns,
        &options,
    )?)
}

/// Normalized card identifiers of an array, with `None` for nulls.
///
/// Integer columns and integral floats render as decimal integers so the
/// same card compares equal whether it was read as `Int64`, `Float64` or
/// text. NaN counts as missing.
pub fn card_ids(array: &ArrayRef) -> Result<Vec<Option<CardId>>> {
    let data_type = array.data_type();
    let values = if data_type == &DataType::Null {
        vec![None; array.len()]
    } else if data_type.is_integer() {
        let ints = cast(array, &DataType::Int64)?;
        ints.as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map(CardId::from_int))
            .collect()
    } else if data_type.is_floating() {
        let floats = cast(array, &DataType::Float64)?;
        floats
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.and_then(CardId::from_float))
            .collect()
    } else {
        let strings = cast(array, &DataType::Utf8)?;
        strings
            .as_string::<i32>()
            .iter()
            .map(|v| v.map(CardId::from))
            .collect()
    };
    Ok(values)
}

/// Text values of an array, with `None` for nulls.
pub fn string_values(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    if array.data_type() == &DataType::Null {
        return Ok(vec![None; array.len()]);
    }
    let strings = cast(array, &DataType::Utf8)?;
    Ok(strings
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Integer values of an array, with `None` for nulls.
///
/// Floats are truncated toward zero; values that cannot be represented
/// become `None`.
pub fn int_values(array: &ArrayRef) -> Result<Vec<Option<i64>>> {
    if array.data_type() == &DataType::Null {
        return Ok(vec![None; array.len()]);
    }
    let ints = cast(array, &DataType::Int64)?;
    Ok(ints.as_primitive::<Int64Type>().iter().collect())
}

/// Case-insensitive "card" + "id" substring test used to find card columns.
///
/// The test is literal: any column mentioning both words matches, not just
/// the `<side>.cardN.id` slots.
pub fn is_card_id_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("card") && lower.contains("id")
}

/// Card-id columns of `batch`, in schema order.
pub fn card_id_columns(batch: &RecordBatch) -> Vec<String> {
    column_names(batch)
        .into_iter()
        .filter(|name| is_card_id_column(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter(columns).unwrap()
    }

    #[test]
    fn test_concat_outer_aligns_columns() {
        let a = batch(vec![
            ("battle_id", Arc::new(StringArray::from(vec!["B1", "B2"])) as ArrayRef),
            ("winner.tag", Arc::new(StringArray::from(vec!["#A", "#B"])) as ArrayRef),
        ]);
        let b = batch(vec![
            ("battle_id", Arc::new(StringArray::from(vec!["B3"])) as ArrayRef),
            ("loser.tag", Arc::new(StringArray::from(vec!["#Z"])) as ArrayRef),
        ]);

        let combined = concat_outer(&[a, b]).unwrap();
        assert_eq!(combined.num_rows(), 3);
        assert_eq!(
            column_names(&combined),
            vec!["battle_id", "winner.tag", "loser.tag"]
        );
        let winner_tag = combined.column_by_name("winner.tag").unwrap();
        assert_eq!(winner_tag.null_count(), 1);
        let loser_tag = combined.column_by_name("loser.tag").unwrap();
        assert_eq!(loser_tag.null_count(), 2);
    }

    #[test]
    fn test_concat_outer_widens_mixed_numbers() {
        let a = batch(vec![(
            "winner.card1.id",
            Arc::new(Int64Array::from(vec![26000000])) as ArrayRef,
        )]);
        let b = batch(vec![(
            "winner.card1.id",
            Arc::new(Float64Array::from(vec![Some(26000001.5), None])) as ArrayRef,
        )]);

        let combined = concat_outer(&[a, b]).unwrap();
        let column = combined.column(0);
        assert_eq!(column.data_type(), &DataType::Float64);
        assert_eq!(column.len(), 3);
        assert_eq!(column.null_count(), 1);
        let values = column.as_primitive::<Float64Type>();
        assert_eq!(values.value(0), 26000000.0);
        assert_eq!(values.value(1), 26000001.5);
    }

    #[test]
    fn test_concat_outer_keeps_text_ids_next_to_integers() {
        let a = batch(vec![(
            "battle_id",
            Arc::new(Int64Array::from(vec![1])) as ArrayRef,
        )]);
        let b = batch(vec![(
            "battle_id",
            Arc::new(StringArray::from(vec!["B2"])) as ArrayRef,
        )]);

        let combined = concat_outer(&[a, b]).unwrap();
        let ids = combined.column(0);
        assert_eq!(ids.data_type(), &DataType::Utf8);
        assert_eq!(ids.null_count(), 0);
        assert_eq!(
            string_values(ids).unwrap(),
            vec![Some("1".to_string()), Some("B2".to_string())]
        );
    }

    #[test]
    fn test_widen() {
        assert_eq!(widen(&DataType::Null, &DataType::Utf8), DataType::Utf8);
        assert_eq!(widen(&DataType::Int32, &DataType::Int64), DataType::Int64);
        assert_eq!(widen(&DataType::Int64, &DataType::Float32), DataType::Float64);
        assert_eq!(widen(&DataType::Boolean, &DataType::Int64), DataType::Utf8);
        assert_eq!(widen(&DataType::Utf8, &DataType::Utf8), DataType::Utf8);
    }

    #[test]
    fn test_concat_outer_of_nothing() {
        let combined = concat_outer(&[]).unwrap();
        assert_eq!(combined.num_rows(), 0);
        assert_eq!(combined.num_columns(), 0);
    }

    #[test]
    fn test_project_to_empty_keeps_row_count() {
        let a = batch(vec![(
            "x",
            Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
        )]);
        let projected = project(&a, &[]).unwrap();
        assert_eq!(projected.num_rows(), 3);
        assert_eq!(projected.num_columns(), 0);
    }

    #[test]
    fn test_project_unknown_column() {
        let a = batch(vec![("x", Arc::new(Int64Array::from(vec![1])) as ArrayRef)]);
        let err = project(&a, &["y".to_string()]).unwrap_err();
        assert!(matches!(err, InsightsError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_card_ids_normalize_numeric_forms() {
        let ints: ArrayRef = Arc::new(Int64Array::from(vec![Some(99), None]));
        let floats: ArrayRef = Arc::new(Float64Array::from(vec![Some(99.0), Some(f64::NAN)]));
        let text: ArrayRef = Arc::new(StringArray::from(vec![Some("99"), None]));

        let expected = vec![Some(CardId::from("99")), None];
        assert_eq!(card_ids(&ints).unwrap(), expected);
        assert_eq!(card_ids(&floats).unwrap(), expected);
        assert_eq!(card_ids(&text).unwrap(), expected);
    }

    #[test]
    fn test_card_column_heuristic_is_literal() {
        assert!(is_card_id_column("winner.card1.id"));
        assert!(is_card_id_column("Loser.CARD8.ID"));
        assert!(is_card_id_column("team.card1.id"));
        assert!(is_card_id_column("cards_valid"));
        assert!(!is_card_id_column("winner.cards.list"));
        assert!(!is_card_id_column("battle_id"));
    }
}
