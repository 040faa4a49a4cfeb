//! Card usage frequency across every card-id column.

use arrow::record_batch::RecordBatch;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{rank_cards, RankedCard, NO_CARD_COLUMNS};
use crate::catalog::{CardCatalog, CardId};
use crate::error::Result;
use crate::frequency::{round2, FrequencyCounter};
use crate::table::{card_id_columns, card_ids, concat_outer};

#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct CardUsageStats {
    pub total_card_uses: u64,
    pub unique_cards: usize,
    /// 0 when no card was seen.
    pub average_uses_per_card: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct CardUsageReport {
    pub card_usage_stats: CardUsageStats,
    pub top_cards: Vec<RankedCard>,
    pub card_columns_found: Vec<String>,
    pub card_mapping_used: bool,
}

/// Result of the card usage analysis.
///
/// `NoCardColumns` is a data outcome, not a failure: it serializes as
/// `{"error": "No card columns found"}`.
#[derive(Debug, Clone, PartialEq)]
pub enum CardUsageOutcome {
    Report(CardUsageReport),
    NoCardColumns,
}

impl CardUsageOutcome {
    pub fn report(&self) -> Option<&CardUsageReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::NoCardColumns => None,
        }
    }
}

impl Serialize for CardUsageOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Report(report) => report.serialize(serializer),
            Self::NoCardColumns => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", NO_CARD_COLUMNS)?;
                map.end()
            }
        }
    }
}

/// Every non-null card id of `columns`, column by column and row by row.
pub(crate) fn collect_card_ids(batch: &RecordBatch, columns: &[String]) -> Result<Vec<CardId>> {
    let mut ids = Vec::new();
    for column in columns {
        if let Some(array) = batch.column_by_name(column) {
            ids.extend(card_ids(array)?.into_iter().flatten());
        }
    }
    Ok(ids)
}

/// Ranks the most used cards over the union of `tables`.
///
/// Names come from `catalog`, falling back to `Carta_<id>`.
#[instrument(skip(tables, catalog), fields(tables = tables.len()))]
pub fn analyze_most_used_cards(
    tables: &[RecordBatch],
    catalog: &CardCatalog,
    top_n: usize,
) -> Result<CardUsageOutcome> {
    let all = concat_outer(tables)?;
    let card_columns = card_id_columns(&all);
    if card_columns.is_empty() {
        warn!("No card id columns found");
        return Ok(CardUsageOutcome::NoCardColumns);
    }

    let counter: FrequencyCounter<CardId> = collect_card_ids(&all, &card_columns)?
        .into_iter()
        .collect();
    let total_card_uses = counter.total();
    let unique_cards = counter.distinct();
    let average_uses_per_card = if unique_cards == 0 {
        0.0
    } else {
        round2(total_card_uses as f64 / unique_cards as f64)
    };

    let top_cards = rank_cards(&counter, top_n, |id| {
        catalog
            .name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Carta_{id}"))
    });

    info!(unique_cards, total_card_uses, "Card usage analysis completed");

    Ok(CardUsageOutcome::Report(CardUsageReport {
        card_usage_stats: CardUsageStats {
            total_card_uses,
            unique_cards,
            average_uses_per_card,
        },
        top_cards,
        card_columns_found: card_columns,
        card_mapping_used: catalog.has_mapping(),
    }))
}
