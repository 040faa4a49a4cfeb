//! Business-understanding reports: objectives, data situation and plan.
//!
//! Apart from the counts in [`BusinessObjectives`] and [`CurrentSituation`],
//! the content here is fixed descriptive text for the report.

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::selection::NamedTable;
use super::{data_types, missing_values, ColumnCount, ColumnType};
use crate::error::Result;
use crate::table::concat_outer;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableData {
    pub total_battles: usize,
    pub total_cards: usize,
    pub total_win_conditions: usize,
    pub time_period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessObjectives {
    pub project: String,
    pub main_objectives: Vec<String>,
    pub available_data: AvailableData,
    pub business_questions: Vec<String>,
    pub expected_value: String,
}

/// States the project objectives against the available data volume.
#[instrument(skip_all, fields(tables = battles.len()))]
pub fn analyze_business_objectives(
    battles: &[RecordBatch],
    card_master_list: &RecordBatch,
    wincons: &RecordBatch,
) -> BusinessObjectives {
    let total_battles = battles.iter().map(RecordBatch::num_rows).sum();
    let objectives = BusinessObjectives {
        project: "Clash Royale Strategy Analysis".to_string(),
        main_objectives: strings(&[
            "Identify the cards used most often in decks",
            "Analyze the most effective win conditions",
            "Study the rarity distribution of decks",
            "Understand the patterns behind winning battles",
        ]),
        available_data: AvailableData {
            total_battles,
            total_cards: card_master_list.num_rows(),
            total_win_conditions: wincons.num_rows(),
            time_period: "December 2020 - January 2021".to_string(),
        },
        business_questions: strings(&[
            "Which cards are most popular in winning decks?",
            "Which win conditions are the most effective?",
            "How does card rarity influence success?",
            "Are there specific patterns in successful decks?",
        ]),
        expected_value: "Better understanding of effective strategies for players and developers"
            .to_string(),
    };

    info!(
        battles = total_battles,
        cards = objectives.available_data.total_cards,
        "Business objectives analyzed"
    );
    objectives
}

/// Shape of one input batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetShape {
    pub name: String,
    pub records: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub total_records: usize,
    pub total_columns: usize,
    pub missing_values: Vec<ColumnCount>,
    pub data_types: Vec<ColumnType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSituation {
    pub datasets: Vec<DatasetShape>,
    pub data_quality: DataQuality,
    pub strengths: Vec<String>,
    pub limitations: Vec<String>,
}

/// Inventories the battle tables and their combined form.
#[instrument(skip_all, fields(tables = tables.len()))]
pub fn evaluate_current_situation(tables: &[NamedTable]) -> Result<CurrentSituation> {
    let batches: Vec<RecordBatch> = tables.iter().map(|t| t.batch.clone()).collect();
    let all = concat_outer(&batches)?;

    let situation = CurrentSituation {
        datasets: tables
            .iter()
            .map(|t| DatasetShape {
                name: t.name.clone(),
                records: t.batch.num_rows(),
                columns: t.batch.num_columns(),
            })
            .collect(),
        data_quality: DataQuality {
            total_records: all.num_rows(),
            total_columns: all.num_columns(),
            missing_values: missing_values(&all),
            data_types: data_types(&all),
        },
        strengths: strings(&[
            "Several collection periods available",
            "Structured and consistent records",
            "Detailed card and battle information",
        ]),
        limitations: strings(&[
            "History limited to three periods",
            "Some fields may contain missing values",
            "Cleaning and validation required",
        ]),
    };

    info!(records = all.num_rows(), "Current situation evaluated");
    Ok(situation)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlObjective {
    pub objective: String,
    pub description: String,
    pub kind: String,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlObjectives {
    pub objectives: Vec<MlObjective>,
    pub success_criteria: Vec<String>,
    pub technical_limitations: Vec<String>,
}

fn objective(objective: &str, description: &str, kind: &str, metrics: &[&str]) -> MlObjective {
    MlObjective {
        objective: objective.to_string(),
        description: description.to_string(),
        kind: kind.to_string(),
        metrics: strings(metrics),
    }
}

/// Analysis objectives derived from the business goals.
pub fn define_ml_objectives() -> MlObjectives {
    MlObjectives {
        objectives: vec![
            objective(
                "Popular card classification",
                "Identify the cards used most in successful decks",
                "Descriptive analysis",
                &["Usage frequency", "Success rate"],
            ),
            objective(
                "Win condition analysis",
                "Determine the most effective win conditions",
                "Effectiveness analysis",
                &["Win rate", "Usage frequency"],
            ),
            objective(
                "Rarity distribution",
                "Analyze how rarity affects deck success",
                "Statistical analysis",
                &["Distribution by rarity", "Correlation with success"],
            ),
        ],
        success_criteria: strings(&[
            "Identify at least the 10 most popular cards",
            "Determine the 5 most effective win conditions",
            "Establish clear patterns in rarity distribution",
        ]),
        technical_limitations: strings(&[
            "Limited historical data",
            "Possible temporal bias in the data",
            "Cross-validation needed",
        ]),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPhase {
    pub phase: String,
    pub name: String,
    pub status: String,
    pub activities: Vec<String>,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub phases: Vec<ProjectPhase>,
    pub deliverables: Vec<String>,
    pub required_resources: Vec<String>,
}

fn phase(phase: &str, name: &str, status: &str, activities: &[&str], duration: &str) -> ProjectPhase {
    ProjectPhase {
        phase: phase.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        activities: strings(activities),
        duration: duration.to_string(),
    }
}

/// The three-phase project plan.
pub fn generate_project_plan() -> ProjectPlan {
    ProjectPlan {
        phases: vec![
            phase(
                "phase_1",
                "Business understanding",
                "In progress",
                &[
                    "Define project objectives",
                    "Assess the current situation",
                    "Determine analysis objectives",
                    "Produce the project plan",
                ],
                "1-2 days",
            ),
            phase(
                "phase_2",
                "Data understanding",
                "Pending",
                &[
                    "Collect initial data",
                    "Describe the data",
                    "Explore the data (EDA)",
                    "Verify data quality",
                ],
                "3-5 days",
            ),
            phase(
                "phase_3",
                "Data preparation",
                "Pending",
                &[
                    "Select relevant data",
                    "Clean the data",
                    "Construct new variables",
                    "Integrate data from multiple sources",
                ],
                "2-3 days",
            ),
        ],
        deliverables: strings(&[
            "Business objectives analysis",
            "Current situation evaluation",
            "Analysis objectives",
            "Project plan",
            "Executive summary",
        ]),
        required_resources: strings(&[
            "Historical battle data",
            "Card catalog",
            "Win condition list",
            "Analysis tooling",
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn table(name: &str, rows: usize, extra: bool) -> NamedTable {
        let ids: Vec<String> = (0..rows).map(|i| format!("{name}-{i}")).collect();
        let mut columns = vec![("battle_id", Arc::new(StringArray::from(ids)) as ArrayRef)];
        if extra {
            columns.push((
                "winner.card1.id",
                Arc::new(Int64Array::from(vec![None::<i64>; rows])) as ArrayRef,
            ));
        }
        NamedTable::new(name, RecordBatch::try_from_iter(columns).unwrap())
    }

    #[test]
    fn test_business_objectives_counts() {
        let battles = vec![table("a", 2, false).batch, table("b", 3, false).batch];
        let cards = table("cards", 4, false).batch;
        let wincons = table("wincons", 1, false).batch;

        let objectives = analyze_business_objectives(&battles, &cards, &wincons);
        assert_eq!(objectives.available_data.total_battles, 5);
        assert_eq!(objectives.available_data.total_cards, 4);
        assert_eq!(objectives.available_data.total_win_conditions, 1);
        assert_eq!(objectives.main_objectives.len(), 4);
    }

    #[test]
    fn test_current_situation_uses_column_union() {
        let tables = vec![table("battles_1", 2, true), table("battles_2", 1, false)];
        let situation = evaluate_current_situation(&tables).unwrap();

        assert_eq!(situation.datasets[0].columns, 2);
        assert_eq!(situation.datasets[1].records, 1);
        assert_eq!(situation.data_quality.total_records, 3);
        assert_eq!(situation.data_quality.total_columns, 2);
        assert_eq!(situation.data_quality.missing_values[1].count, 3);
    }

    #[test]
    fn test_static_plan_content() {
        let plan = generate_project_plan();
        assert_eq!(plan.phases.len(), 3);
        assert_eq!(plan.phases[0].status, "In progress");
        assert_eq!(define_ml_objectives().objectives.len(), 3);
    }
}
