//! Win-condition usage, split by winning and losing side.

use arrow::record_batch::RecordBatch;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::cards::collect_card_ids;
use super::{rank_cards, RankedCard, NO_CARD_COLUMNS};
use crate::catalog::{CardCatalog, CardId, WinConditionCatalog};
use crate::error::Result;
use crate::frequency::FrequencyCounter;
use crate::table::{card_id_columns, concat_outer};

#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct WinConditionUsageStats {
    pub total_winner_wc_uses: u64,
    pub total_loser_wc_uses: u64,
    pub total_wc_uses: u64,
    pub unique_win_conditions: usize,
    /// Size of the known win-condition set, whether seen or not.
    pub total_win_conditions_available: usize,
}

/// Rankings of win conditions. Each list has its own percentage base.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct WinConditionReport {
    pub winner_win_conditions: Vec<RankedCard>,
    pub loser_win_conditions: Vec<RankedCard>,
    pub overall_win_conditions: Vec<RankedCard>,
    pub usage_stats: WinConditionUsageStats,
}

/// Result of the win-condition analysis; see [`super::CardUsageOutcome`]
/// for the marker semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum WinConditionOutcome {
    Report(WinConditionReport),
    NoCardColumns,
}

impl WinConditionOutcome {
    pub fn report(&self) -> Option<&WinConditionReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::NoCardColumns => None,
        }
    }
}

impl Serialize for WinConditionOutcome {
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

/// Win-condition occurrences in the card columns whose name contains
/// `side` (case-sensitive).
fn side_occurrences(
    batch: &RecordBatch,
    card_columns: &[String],
    side: &str,
    wincons: &WinConditionCatalog,
) -> Result<Vec<CardId>> {
    let columns: Vec<String> = card_columns
        .iter()
        .filter(|c| c.contains(side))
        .cloned()
        .collect();
    Ok(collect_card_ids(batch, &columns)?
        .into_iter()
        .filter(|id| wincons.contains(id))
        .collect())
}

/// Ranks win conditions over the union of `tables`.
///
/// Names resolve through `wincons`, then `cards`, then `WinCondition_<id>`.
#[instrument(skip(tables, wincons, cards), fields(tables = tables.len()))]
pub fn analyze_win_conditions_usage(
    tables: &[RecordBatch],
    wincons: &WinConditionCatalog,
    cards: &CardCatalog,
    top_n: usize,
) -> Result<WinConditionOutcome> {
    let all = concat_outer(tables)?;
    let card_columns = card_id_columns(&all);
    if card_columns.is_empty() {
        warn!("No card id columns found");
        return Ok(WinConditionOutcome::NoCardColumns);
    }

    let winner_ids = side_occurrences(&all, &card_columns, "winner", wincons)?;
    let loser_ids = side_occurrences(&all, &card_columns, "loser", wincons)?;

    let winner: FrequencyCounter<CardId> = winner_ids.iter().cloned().collect();
    let loser: FrequencyCounter<CardId> = loser_ids.iter().cloned().collect();
    let overall: FrequencyCounter<CardId> = winner_ids.into_iter().chain(loser_ids).collect();

    let resolve = |id: &CardId| {
        wincons
            .name(id)
            .or_else(|| cards.name(id))
            .map(str::to_string)
            .unwrap_or_else(|| format!("WinCondition_{id}"))
    };

    let usage_stats = WinConditionUsageStats {
        total_winner_wc_uses: winner.total(),
        total_loser_wc_uses: loser.total(),
        total_wc_uses: overall.total(),
        unique_win_conditions: overall.distinct(),
        total_win_conditions_available: wincons.len(),
    };

    info!(
        unique_win_conditions = usage_stats.unique_win_conditions,
        total_wc_uses = usage_stats.total_wc_uses,
        "Win-condition analysis completed"
    );

    Ok(WinConditionOutcome::Report(WinConditionReport {
        winner_win_conditions: rank_cards(&winner, top_n, resolve),
        loser_win_conditions: rank_cards(&loser, top_n, resolve),
        overall_win_conditions: rank_cards(&overall, top_n, resolve),
        usage_stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn battles() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("battle_id", Arc::new(StringArray::from(vec!["B1", "B2"])) as ArrayRef),
            (
                "winner.card1.id",
                Arc::new(Int64Array::from(vec![Some(10), Some(10)])) as ArrayRef,
            ),
            (
                "winner.card2.id",
                Arc::new(Int64Array::from(vec![Some(1), Some(20)])) as ArrayRef,
            ),
            (
                "loser.card1.id",
                Arc::new(Int64Array::from(vec![Some(20), None])) as ArrayRef,
            ),
            (
                "Winner.card3.id",
                Arc::new(Int64Array::from(vec![Some(10), Some(10)])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_side_split_and_name_resolution() {
        let wincons = WinConditionCatalog::from_pairs([(10i64, "Hog Rider"), (20, "Giant"), (30, "Golem")]);
        let cards = CardCatalog::default();

        let outcome = analyze_win_conditions_usage(&[battles()], &wincons, &cards, 20).unwrap();
        let report = outcome.report().unwrap();

        // "Winner.card3.id" matches neither side.
        assert_eq!(report.usage_stats.total_winner_wc_uses, 3);
        assert_eq!(report.usage_stats.total_loser_wc_uses, 1);
        assert_eq!(report.usage_stats.total_wc_uses, 4);
        assert_eq!(report.usage_stats.unique_win_conditions, 2);
        assert_eq!(report.usage_stats.total_win_conditions_available, 3);

        assert_eq!(report.winner_win_conditions[0].card_name, "Hog Rider");
        assert_eq!(report.winner_win_conditions[0].percentage, 66.67);
        assert_eq!(report.loser_win_conditions[0].card_name, "Giant");
        assert_eq!(report.loser_win_conditions[0].percentage, 100.0);
        assert_eq!(report.overall_win_conditions[1].count, 2);
    }

    #[test]
    fn test_name_fallbacks() {
        let batch = RecordBatch::try_from_iter(vec![
            ("winner.card1.id", Arc::new(Int64Array::from(vec![5, 6])) as ArrayRef),
        ])
        .unwrap();
        let wincons = {
            let ids = RecordBatch::try_from_iter(vec![(
                "card_id",
                Arc::new(Int64Array::from(vec![5, 6])) as ArrayRef,
            )])
            .unwrap();
            WinConditionCatalog::from_batch(&ids).unwrap()
        };
        let cards = CardCatalog::from_pairs([(5i64, "Balloon")]);

        let outcome = analyze_win_conditions_usage(&[batch], &wincons, &cards, 20).unwrap();
        let names: Vec<&str> = outcome
            .report()
            .unwrap()
            .winner_win_conditions
            .iter()
            .map(|c| c.card_name.as_str())
            .collect();
        assert_eq!(names, vec!["Balloon", "WinCondition_6"]);
    }

    #[test]
    fn test_empty_sides_have_no_entries() {
        let wincons = WinConditionCatalog::from_pairs([(99i64, "Knight")]);
        let outcome =
            analyze_win_conditions_usage(&[battles()], &wincons, &CardCatalog::default(), 20)
                .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.usage_stats.total_wc_uses, 0);
        assert!(report.overall_win_conditions.is_empty());
        assert_eq!(report.usage_stats.total_win_conditions_available, 1);
    }

    #[test]
    fn test_no_card_columns_marker() {
        let batch = RecordBatch::try_from_iter(vec![(
            "battle_id",
            Arc::new(StringArray::from(vec!["B1"])) as ArrayRef,
        )])
        .unwrap();
        let outcome = analyze_win_conditions_usage(
            &[batch],
            &WinConditionCatalog::default(),
            &CardCatalog::default(),
            20,
        )
        .unwrap();
        assert_eq!(outcome, WinConditionOutcome::NoCardColumns);
    }
}
