//! Rarity-count distributions per side.

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, instrument};

use super::selection::SIDES;
use super::{scalar_f64, scalar_i64};
use crate::context::{quote_ident, InsightsContext};
use crate::error::Result;
use crate::frequency::{FrequencyCounter, ValueCount};
use crate::table::{concat_outer, int_values};

/// Card rarity tiers, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RarityTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl RarityTier {
    pub const ALL: [RarityTier; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    /// Count column of this tier for `side`, e.g. `winner.epic.count`.
    pub fn column(&self, side: &str) -> String {
        format!("{side}.{}.count", self.as_str())
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive statistics of one rarity-count column.
///
/// Statistics are `None` when the column has no non-null value; `std` is
/// the sample deviation and needs at least two values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Most frequent values, ties in first-seen order.
    pub distribution: Vec<ValueCount<i64>>,
}

/// Winner and loser averages of one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityComparison {
    pub winner_avg: f64,
    pub loser_avg: f64,
    /// `winner_avg - loser_avg`
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityReport {
    pub winner_rarity_distribution: BTreeMap<RarityTier, RarityStats>,
    pub loser_rarity_distribution: BTreeMap<RarityTier, RarityStats>,
    pub winner_vs_loser_comparison: BTreeMap<RarityTier, RarityComparison>,
    pub total_records_analyzed: usize,
}

impl RarityReport {
    /// Stats of `tier` for `side` ("winner" or "loser").
    pub fn stats(&self, side: &str, tier: RarityTier) -> Option<&RarityStats> {
        match side {
            "winner" => self.winner_rarity_distribution.get(&tier),
            "loser" => self.loser_rarity_distribution.get(&tier),
            _ => None,
        }
    }
}

fn histogram(batch: &RecordBatch, column: &str, size: usize) -> Result<Vec<ValueCount<i64>>> {
    let Some(array) = batch.column_by_name(column) else {
        return Ok(Vec::new());
    };
    let counter: FrequencyCounter<i64> = int_values(array)?.into_iter().flatten().collect();
    Ok(counter
        .most_common(size)
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect())
}

/// Computes rarity statistics over the union of `tables`.
///
/// Tiers whose column is absent are left out of the corresponding map.
/// Aggregates run as one SQL query; histograms keep `histogram_size`
/// values.
#[instrument(skip(ctx, tables), fields(tables = tables.len()))]
pub async fn analyze_rarity_distributions(
    ctx: &InsightsContext,
    tables: &[RecordBatch],
    histogram_size: usize,
) -> Result<RarityReport> {
    let all = concat_outer(tables)?;

    let targets: Vec<(&str, RarityTier, String)> = SIDES
        .iter()
        .flat_map(|side| RarityTier::ALL.iter().map(move |tier| (*side, *tier, tier.column(side))))
        .filter(|(_, _, column)| all.column_by_name(column).is_some())
        .collect();

    let aggregates = if targets.is_empty() {
        Vec::new()
    } else {
        ctx.query_batch(&all, |table| {
            let projections: Vec<String> = targets
                .iter()
                .enumerate()
                .map(|(i, (_, _, column))| {
                    let col = quote_ident(column);
                    format!(
                        "AVG(CAST({col} AS DOUBLE)) AS mean_{i}, \
                         MEDIAN(CAST({col} AS DOUBLE)) AS median_{i}, \
                         STDDEV(CAST({col} AS DOUBLE)) AS std_{i}, \
                         CAST(MIN({col}) AS BIGINT) AS min_{i}, \
                         CAST(MAX({col}) AS BIGINT) AS max_{i}"
                    )
                })
                .collect();
            format!("SELECT {} FROM {table}", projections.join(", "))
        })
        .await?
    };

    let mut winner = BTreeMap::new();
    let mut loser = BTreeMap::new();
    for (i, (side, tier, column)) in targets.iter().enumerate() {
        let stats = RarityStats {
            mean: scalar_f64(&aggregates, &format!("mean_{i}"))?,
            median: scalar_f64(&aggregates, &format!("median_{i}"))?,
            std: scalar_f64(&aggregates, &format!("std_{i}"))?,
            min: scalar_i64(&aggregates, &format!("min_{i}"))?,
            max: scalar_i64(&aggregates, &format!("max_{i}"))?,
            distribution: histogram(&all, column, histogram_size)?,
        };
        if *side == "winner" {
            winner.insert(*tier, stats);
        } else {
            loser.insert(*tier, stats);
        }
    }

    let comparison = RarityTier::ALL
        .iter()
        .filter_map(|tier| {
            let winner_avg = winner.get(tier)?.mean?;
            let loser_avg = loser.get(tier)?.mean?;
            Some((
                *tier,
                RarityComparison {
                    winner_avg,
                    loser_avg,
                    difference: winner_avg - loser_avg,
                },
            ))
        })
        .collect();

    info!(
        records = all.num_rows(),
        columns = targets.len(),
        "Rarity analysis completed"
    );

    Ok(RarityReport {
        winner_rarity_distribution: winner,
        loser_rarity_distribution: loser,
        winner_vs_loser_comparison: comparison,
        total_records_analyzed: all.num_rows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn battles(common: Vec<Option<i64>>, loser_common: Vec<Option<i64>>) -> RecordBatch {
        let ids: Vec<String> = (0..common.len()).map(|i| format!("B{i}")).collect();
        RecordBatch::try_from_iter(vec![
            ("battle_id", Arc::new(StringArray::from(ids)) as ArrayRef),
            ("winner.common.count", Arc::new(Int64Array::from(common)) as ArrayRef),
            ("loser.common.count", Arc::new(Int64Array::from(loser_common)) as ArrayRef),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_statistics_match_independent_computation() {
        let ctx = InsightsContext::new();
        let a = battles(vec![Some(2), Some(4)], vec![Some(1), Some(1)]);
        let b = battles(vec![Some(4), None], vec![Some(3), Some(3)]);

        let report = analyze_rarity_distributions(&ctx, &[a, b], 10).await.unwrap();
        assert_eq!(report.total_records_analyzed, 4);

        let common = report.stats("winner", RarityTier::Common).unwrap();
        // values 2, 4, 4
        assert!((common.mean.unwrap() - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(common.median, Some(4.0));
        let var = ((2.0 - 10.0 / 3.0_f64).powi(2) + 2.0 * (4.0 - 10.0 / 3.0_f64).powi(2)) / 2.0;
        assert!((common.std.unwrap() - var.sqrt()).abs() < 1e-9);
        assert_eq!(common.min, Some(2));
        assert_eq!(common.max, Some(4));
        assert_eq!(
            common.distribution,
            vec![
                ValueCount { value: 4, count: 2 },
                ValueCount { value: 2, count: 1 }
            ]
        );

        let comparison = &report.winner_vs_loser_comparison[&RarityTier::Common];
        assert!((comparison.loser_avg - 2.0).abs() < 1e-9);
        assert!((comparison.difference - (10.0 / 3.0 - 2.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_absent_tiers_are_omitted() {
        let ctx = InsightsContext::new();
        let batch = battles(vec![Some(3)], vec![Some(5)]);
        let report = analyze_rarity_distributions(&ctx, &[batch], 10).await.unwrap();

        assert_eq!(report.winner_rarity_distribution.len(), 1);
        assert!(report.stats("winner", RarityTier::Epic).is_none());
        let common = report.stats("loser", RarityTier::Common).unwrap();
        assert_eq!(common.std, None);
        assert_eq!(common.min, Some(5));
    }

    #[tokio::test]
    async fn test_no_rarity_columns() {
        let ctx = InsightsContext::new();
        let batch = RecordBatch::try_from_iter(vec![(
            "battle_id",
            Arc::new(StringArray::from(vec!["B1"])) as ArrayRef,
        )])
        .unwrap();
        let report = analyze_rarity_distributions(&ctx, &[batch], 10).await.unwrap();
        assert!(report.winner_rarity_distribution.is_empty());
        assert!(report.winner_vs_loser_comparison.is_empty());
        assert_eq!(report.total_records_analyzed, 1);
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        let json = serde_json::to_string(&RarityTier::Legendary).unwrap();
        assert_eq!(json, "\"legendary\"");
        assert_eq!(RarityTier::Epic.column("loser"), "loser.epic.count");
    }
}
