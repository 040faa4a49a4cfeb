//! Card identifiers and the lookup catalogs used for display names.

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{info, warn};

use crate::error::Result;
use crate::table::{card_ids, string_values};

/// Id column of the master card list.
pub const CARD_ID_COLUMN: &str = "team.card1.id";
/// Name column of the master card list.
pub const CARD_NAME_COLUMN: &str = "team.card1.name";
/// Id column of the win-condition list.
pub const WIN_CONDITION_ID_COLUMN: &str = "card_id";
/// Name column of the win-condition list.
pub const WIN_CONDITION_NAME_COLUMN: &str = "card_name";

/// Normalized textual form of a card identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Card id from an integer value.
    pub fn from_int(value: i64) -> Self {
        Self(value.to_string())
    }

    /// Card id from a float value; integral floats render without a
    /// fractional part. NaN and infinities are not ids.
    pub fn from_float(value: f64) -> Option<Self> {
        if !value.is_finite() {
            None
        } else if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Some(Self((value as i64).to_string()))
        } else {
            Some(Self(value.to_string()))
        }
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for CardId {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads `id_column → name_column` pairs; later rows overwrite earlier ones.
fn read_name_map(
    batch: &RecordBatch,
    id_column: &str,
    name_column: &str,
) -> Result<HashMap<CardId, String>> {
    let (Some(ids), Some(names)) = (
        batch.column_by_name(id_column),
        batch.column_by_name(name_column),
    ) else {
        return Ok(HashMap::new());
    };

    let mut map = HashMap::new();
    for (id, name) in card_ids(ids)?.into_iter().zip(string_values(names)?) {
        if let (Some(id), Some(name)) = (id, name) {
            map.insert(id, name);
        }
    }
    Ok(map)
}

/// Master card list: id to display name.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    names: HashMap<CardId, String>,
    rows: usize,
}

impl CardCatalog {
    /// Builds the lookup from the master card list table.
    ///
    /// Missing id or name columns produce an empty lookup, not an error.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        if batch.column_by_name(CARD_ID_COLUMN).is_none()
            || batch.column_by_name(CARD_NAME_COLUMN).is_none()
        {
            warn!(
                id_column = CARD_ID_COLUMN,
                name_column = CARD_NAME_COLUMN,
                "Card list lacks id/name columns; names will be synthesized"
            );
        }
        let names = read_name_map(batch, CARD_ID_COLUMN, CARD_NAME_COLUMN)?;
        info!(cards = names.len(), rows = batch.num_rows(), "Card catalog loaded");
        Ok(Self {
            names,
            rows: batch.num_rows(),
        })
    }

    /// Builds a catalog from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<CardId>,
        V: Into<String>,
    {
        let names: HashMap<CardId, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let rows = names.len();
        Self { names, rows }
    }

    /// Display name of `id`, if known.
    pub fn name(&self, id: &CardId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of rows in the source table.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Whether any id/name pair is available.
    pub fn has_mapping(&self) -> bool {
        !self.names.is_empty()
    }
}

/// Win-condition list: membership set plus display names.
#[derive(Debug, Clone, Default)]
pub struct WinConditionCatalog {
    ids: HashSet<CardId>,
    names: HashMap<CardId, String>,
    rows: usize,
}

impl WinConditionCatalog {
    /// Builds the membership set and names from the win-condition table.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        let ids: HashSet<CardId> = match batch.column_by_name(WIN_CONDITION_ID_COLUMN) {
            Some(column) => card_ids(column)?.into_iter().flatten().collect(),
            None => {
                warn!(
                    column = WIN_CONDITION_ID_COLUMN,
                    "Win-condition list lacks an id column; no card will qualify"
                );
                HashSet::new()
            }
        };
        let names = read_name_map(batch, WIN_CONDITION_ID_COLUMN, WIN_CONDITION_NAME_COLUMN)?;
        info!(
            win_conditions = ids.len(),
            rows = batch.num_rows(),
            "Win-condition catalog loaded"
        );
        Ok(Self {
            ids,
            names,
            rows: batch.num_rows(),
        })
    }

    /// Builds a catalog from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<CardId>,
        V: Into<String>,
    {
        let names: HashMap<CardId, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let ids = names.keys().cloned().collect();
        let rows = names.len();
        Self { ids, names, rows }
    }

    /// Whether `id` is a win condition.
    pub fn contains(&self, id: &CardId) -> bool {
        self.ids.contains(id)
    }

    /// Display name of `id` from this list, if present.
    pub fn name(&self, id: &CardId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of distinct known win-condition ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the membership set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of rows in the source table.
    pub fn row_count(&self) -> usize {
        self.rows
    }
}
