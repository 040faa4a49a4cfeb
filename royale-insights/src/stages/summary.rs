//! Roll-ups of upstream reports into executive summaries.
//!
//! Summaries only select and format. Marker outcomes from the card and
//! win-condition analyses degrade to empty lists and zero counts.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::business::{BusinessObjectives, CurrentSituation, MlObjectives, ProjectPlan};
use super::cards::CardUsageOutcome;
use super::rarity::{RarityReport, RarityTier};
use super::validation::{DataIntegrity, UniqueValues, ValidationReport};
use super::win_conditions::WinConditionOutcome;

/// Formats an integer with comma thousands separators.
pub fn format_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub project: String,
    pub main_objective: String,
    /// e.g. "12,345 historical battles"
    pub available_data: String,
    pub key_objectives: Vec<String>,
    pub expected_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSummary {
    pub executive_summary: ExecutiveSummary,
    pub next_steps: Vec<String>,
    pub recommendations: Vec<String>,
}

#[instrument(skip_all)]
pub fn create_business_summary(
    objectives: &BusinessObjectives,
    situation: &CurrentSituation,
    _ml_objectives: &MlObjectives,
    _plan: &ProjectPlan,
) -> BusinessSummary {
    let summary = BusinessSummary {
        executive_summary: ExecutiveSummary {
            project: objectives.project.clone(),
            main_objective: "Analyze effective strategies in Clash Royale".to_string(),
            available_data: format!(
                "{} historical battles",
                format_thousands(situation.data_quality.total_records)
            ),
            key_objectives: objectives.main_objectives.clone(),
            expected_value: objectives.expected_value.clone(),
        },
        next_steps: strings(&[
            "Proceed with phase 2: data understanding",
            "Run a detailed EDA of the datasets",
            "Clean and prepare the data for analysis",
            "Implement the popular card analysis",
        ]),
        recommendations: strings(&[
            "Focus the analysis on winning decks",
            "Take temporal factors in the data into account",
            "Validate results with multiple metrics",
            "Document findings for future iterations",
        ]),
    };
    info!("Business summary created");
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationOverview {
    pub phase: String,
    pub total_records_combined: usize,
    pub total_columns_selected: usize,
    pub memory_usage_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationQuality {
    pub duplicate_records: u64,
    pub missing_values_summary: usize,
    pub data_integrity_checks: DataIntegrity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeatures {
    pub card_columns_total: usize,
    pub winner_card_columns: usize,
    pub loser_card_columns: usize,
    pub count_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationSummary {
    pub preparation_overview: PreparationOverview,
    pub data_quality: PreparationQuality,
    pub selected_features: SelectedFeatures,
    pub dataset_statistics: UniqueValues,
    pub next_steps: Vec<String>,
}

#[instrument(skip_all)]
pub fn create_preparation_summary(validation: &ValidationReport) -> PreparationSummary {
    let summary = PreparationSummary {
        preparation_overview: PreparationOverview {
            phase: "Phase 3 - Data preparation".to_string(),
            total_records_combined: validation.total_records,
            total_columns_selected: validation.total_columns,
            memory_usage_mb: validation.memory_usage_mb,
        },
        data_quality: PreparationQuality {
            duplicate_records: validation.duplicate_records,
            missing_values_summary: validation.total_missing_values(),
            data_integrity_checks: validation.data_integrity.clone(),
        },
        selected_features: SelectedFeatures {
            card_columns_total: validation.card_analysis.total_card_columns,
            winner_card_columns: validation.card_analysis.winner_card_columns,
            loser_card_columns: validation.card_analysis.loser_card_columns,
            count_columns: RarityTier::ALL
                .iter()
                .map(|tier| format!("{tier}.count"))
                .collect(),
        },
        dataset_statistics: validation.unique_values.clone(),
        next_steps: strings(&[
            "Dataset ready for pattern analysis",
            "Prepared for machine learning modelling",
            "Card columns and rarity counts available",
            "Unique player and battle identifiers preserved",
        ]),
    };
    info!("Data preparation summary created");
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaOverview {
    pub dataset_size: usize,
    pub analysis_focus: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFindings {
    pub most_popular_cards: Vec<String>,
    pub total_unique_cards: usize,
    pub total_win_conditions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaSummary {
    pub eda_overview: EdaOverview,
    pub key_findings: KeyFindings,
    pub insights: Vec<String>,
}

/// Builds the EDA summary and its insight sentences.
///
/// `popular_cards` caps the number of names in the key findings.
#[instrument(skip_all)]
pub fn generate_eda_summary(
    rarity: &RarityReport,
    cards: &CardUsageOutcome,
    win_conditions: &WinConditionOutcome,
    popular_cards: usize,
) -> EdaSummary {
    let cards = cards.report();
    let win_conditions = win_conditions.report();

    let total_unique_cards = cards.map_or(0, |r| r.card_usage_stats.unique_cards);
    let total_win_conditions = win_conditions.map_or(0, |r| r.usage_stats.unique_win_conditions);
    let most_popular_cards = cards
        .map(|r| {
            r.top_cards
                .iter()
                .take(popular_cards)
                .map(|c| c.card_name.clone())
                .collect()
        })
        .unwrap_or_default();

    let mut insights = vec![
        format!(
            "Dataset contains {} battle records",
            format_thousands(rarity.total_records_analyzed)
        ),
        format!("{total_unique_cards} unique cards identified"),
        format!("Total win conditions analyzed: {total_win_conditions}"),
    ];

    if let Some(top) = cards.and_then(|r| r.top_cards.first()) {
        insights.push(format!(
            "Most popular card: {} ({:?}% usage)",
            top.card_name, top.percentage
        ));
    }
    if let Some(top) = win_conditions.and_then(|r| r.overall_win_conditions.first()) {
        insights.push(format!(
            "Most used win condition: {} ({:?}% usage)",
            top.card_name, top.percentage
        ));
    }

    for (tier, comparison) in &rarity.winner_vs_loser_comparison {
        let difference = comparison.difference;
        if difference > 0.0 {
            insights.push(format!(
                "Winners use more {tier} cards: +{difference:.2} on average"
            ));
        } else if difference < 0.0 {
            insights.push(format!(
                "Losers use more {tier} cards: +{:.2} on average",
                difference.abs()
            ));
        }
    }

    info!(insights = insights.len(), "EDA summary generated");

    EdaSummary {
        eda_overview: EdaOverview {
            dataset_size: rarity.total_records_analyzed,
            analysis_focus: strings(&[
                "Most used cards",
                "Most used win conditions",
                "Rarity distribution",
            ]),
        },
        key_findings: KeyFindings {
            most_popular_cards,
            total_unique_cards,
            total_win_conditions,
        },
        insights,
    }
}
