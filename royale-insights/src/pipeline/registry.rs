//! Named pipelines and the stage adapters they run.

use arrow::record_batch::RecordBatch;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::node::{Node, Pipeline, StageContext};
use super::store::Artifact;
use crate::catalog::{CardCatalog, WinConditionCatalog};
use crate::error::{InsightsError, Result};
use crate::stages::business::{BusinessObjectives, CurrentSituation, MlObjectives, ProjectPlan};
use crate::stages::{self, NamedTable};

/// Raw battle tables, as loaded from the catalog.
pub const BATTLE_INPUTS: [&str; 3] = ["battles_1", "battles_2", "battles_3"];
/// Normalized battle tables.
pub const CLEANED_BATTLES: [&str; 3] =
    ["battles_1_cleaned", "battles_2_cleaned", "battles_3_cleaned"];
pub const CARD_MASTER_LIST: &str = "card_master_list";
pub const WINCONS: &str = "wincons";

/// Report outputs of the business understanding pipeline.
pub const BUSINESS_SUMMARY: &str = "business_understanding_summary";
/// Validation report of the combined dataset.
pub const DATASET_VALIDATION: &str = "dataset_validation";
pub const PREPARATION_SUMMARY: &str = "data_preparation_summary";
pub const RARITY_ANALYSIS: &str = "rarity_distributions_analysis";
pub const CARD_USAGE_ANALYSIS: &str = "most_used_cards_analysis";
pub const WIN_CONDITIONS_ANALYSIS: &str = "win_conditions_usage_analysis";
pub const EDA_SUMMARY: &str = "eda_summary";

/// Name of the pipeline that runs everything.
pub const DEFAULT_PIPELINE: &str = "__default__";

/// Registered pipeline names.
pub const PIPELINE_NAMES: [&str; 4] = [
    "business_understanding",
    "data_preparation",
    "eda",
    DEFAULT_PIPELINE,
];

fn named_tables(stage: &StageContext<'_>, count: usize) -> Result<Vec<NamedTable>> {
    (0..count)
        .map(|i| {
            Ok(NamedTable::new(
                stage.input_name(i)?,
                stage.input::<RecordBatch>(i)?.clone(),
            ))
        })
        .collect()
}

fn clean_battles<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let raw = stage.input::<RecordBatch>(0)?;
        Ok(stages::normalize_battle_table(raw)?.into())
    }
    .boxed()
}

fn business_objectives<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let battles = stage.tables(3)?;
        let cards = stage.input::<RecordBatch>(3)?;
        let wincons = stage.input::<RecordBatch>(4)?;
        Ok(stages::analyze_business_objectives(&battles, cards, wincons).into())
    }
    .boxed()
}

fn current_situation<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let tables = named_tables(&stage, 3)?;
        Ok(stages::evaluate_current_situation(&tables)?.into())
    }
    .boxed()
}

fn ml_objectives<'a>(_stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move { Ok(stages::define_ml_objectives().into()) }.boxed()
}

fn project_plan<'a>(_stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move { Ok(stages::generate_project_plan().into()) }.boxed()
}

fn business_summary<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let summary = stages::create_business_summary(
            stage.input::<BusinessObjectives>(0)?,
            stage.input::<CurrentSituation>(1)?,
            stage.input::<MlObjectives>(2)?,
            stage.input::<ProjectPlan>(3)?,
        );
        Ok(summary.into())
    }
    .boxed()
}

fn select_columns<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let tables = named_tables(&stage, 3)?;
        Ok(stages::select_relevant_columns(&tables)?.into())
    }
    .boxed()
}

fn combine<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let selected = stage.input::<stages::SelectedTables>(0)?;
        Ok(stages::combine_datasets(selected)?.into())
    }
    .boxed()
}

fn validate<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let combined = stage.input::<RecordBatch>(0)?;
        let report = stages::validate_combined_dataset(stage.session(), combined).await?;
        Ok(report.into())
    }
    .boxed()
}

fn preparation_summary<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let validation = stage.input::<stages::ValidationReport>(0)?;
        Ok(stages::create_preparation_summary(validation).into())
    }
    .boxed()
}

fn rarity<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let battles = stage.tables(3)?;
        let report = stages::analyze_rarity_distributions(
            stage.session(),
            &battles,
            stage.config().rarity_histogram_size,
        )
        .await?;
        Ok(report.into())
    }
    .boxed()
}

fn most_used_cards<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let battles = stage.tables(3)?;
        let cards = CardCatalog::from_batch(stage.input::<RecordBatch>(3)?)?;
        let outcome = stages::analyze_most_used_cards(&battles, &cards, stage.config().top_cards)?;
        Ok(outcome.into())
    }
    .boxed()
}

fn win_conditions<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let battles = stage.tables(3)?;
        let wincons = WinConditionCatalog::from_batch(stage.input::<RecordBatch>(3)?)?;
        let cards = CardCatalog::from_batch(stage.input::<RecordBatch>(4)?)?;
        let outcome = stages::analyze_win_conditions_usage(
            &battles,
            &wincons,
            &cards,
            stage.config().top_win_conditions,
        )?;
        Ok(outcome.into())
    }
    .boxed()
}

fn eda_summary<'a>(stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
    async move {
        let summary = stages::generate_eda_summary(
            stage.input::<stages::RarityReport>(0)?,
            stage.input::<stages::CardUsageOutcome>(1)?,
            stage.input::<stages::WinConditionOutcome>(2)?,
            stage.config().summary_popular_cards,
        );
        Ok(summary.into())
    }
    .boxed()
}

fn with_cleaned(extra: &[&'static str]) -> Vec<&'static str> {
    CLEANED_BATTLES.iter().copied().chain(extra.iter().copied()).collect()
}

/// Normalization of the three raw battle tables.
pub fn cleaning_pipeline() -> Pipeline {
    BATTLE_INPUTS
        .into_iter()
        .zip(CLEANED_BATTLES)
        .enumerate()
        .map(|(i, (raw, cleaned))| {
            Node::new(format!("clean_battles_{}", i + 1), clean_battles, &[raw], cleaned)
                .with_tags(&["business_understanding", "data_cleaning"])
        })
        .collect()
}

/// Objectives, situation, analysis goals, plan and executive summary.
pub fn business_understanding_pipeline() -> Pipeline {
    let tags = |t: &'static str| ["business_understanding", t];
    Pipeline::new(vec![
        Node::new(
            "analyze_business_objectives",
            business_objectives,
            &with_cleaned(&[CARD_MASTER_LIST, WINCONS]),
            "business_objectives_analysis",
        )
        .with_tags(&tags("objectives")),
        Node::new(
            "evaluate_current_situation",
            current_situation,
            &CLEANED_BATTLES,
            "current_situation_evaluation",
        )
        .with_tags(&tags("situation")),
        Node::new(
            "define_ml_objectives",
            ml_objectives,
            &["business_objectives_analysis", "current_situation_evaluation"],
            "ml_objectives_definition",
        )
        .with_tags(&tags("ml_objectives")),
        Node::new(
            "generate_project_plan",
            project_plan,
            &[
                "business_objectives_analysis",
                "current_situation_evaluation",
                "ml_objectives_definition",
            ],
            "project_plan",
        )
        .with_tags(&tags("planning")),
        Node::new(
            "create_business_summary",
            business_summary,
            &[
                "business_objectives_analysis",
                "current_situation_evaluation",
                "ml_objectives_definition",
                "project_plan",
            ],
            BUSINESS_SUMMARY,
        )
        .with_tags(&tags("summary")),
    ])
}

/// Column selection, union, validation and its summary.
pub fn data_preparation_pipeline() -> Pipeline {
    let tags = |t: &'static str| ["data_preparation", t];
    Pipeline::new(vec![
        Node::new(
            "select_relevant_columns",
            select_columns,
            &CLEANED_BATTLES,
            "selected_datasets",
        )
        .with_tags(&tags("column_selection")),
        Node::new("combine_datasets", combine, &["selected_datasets"], "combined_dataset")
            .with_tags(&tags("data_combination")),
        Node::new(
            "validate_combined_dataset",
            validate,
            &["combined_dataset"],
            DATASET_VALIDATION,
        )
        .with_tags(&tags("validation")),
        Node::new(
            "create_preparation_summary",
            preparation_summary,
            &[DATASET_VALIDATION],
            PREPARATION_SUMMARY,
        )
        .with_tags(&tags("summary")),
    ])
}

/// Rarity, card usage, win conditions and the EDA summary.
pub fn eda_pipeline() -> Pipeline {
    let tags = |t: &'static str| ["eda", t];
    Pipeline::new(vec![
        Node::new(
            "analyze_rarity_distributions",
            rarity,
            &CLEANED_BATTLES,
            RARITY_ANALYSIS,
        )
        .with_tags(&tags("rarity")),
        Node::new(
            "analyze_most_used_cards",
            most_used_cards,
            &with_cleaned(&[CARD_MASTER_LIST]),
            CARD_USAGE_ANALYSIS,
        )
        .with_tags(&tags("cards")),
        Node::new(
            "analyze_win_conditions_usage",
            win_conditions,
            &with_cleaned(&[WINCONS, CARD_MASTER_LIST]),
            WIN_CONDITIONS_ANALYSIS,
        )
        .with_tags(&tags("win_conditions")),
        Node::new(
            "generate_eda_summary",
            eda_summary,
            &[
                RARITY_ANALYSIS,
                CARD_USAGE_ANALYSIS,
                WIN_CONDITIONS_ANALYSIS,
            ],
            EDA_SUMMARY,
        )
        .with_tags(&tags("summary")),
    ])
}

/// Looks a registered pipeline up by name.
///
/// Every pipeline includes the cleaning nodes, so each can run from the
/// raw inputs alone.
pub fn pipeline(name: &str) -> Result<Pipeline> {
    match name {
        "business_understanding" => Ok(cleaning_pipeline() + business_understanding_pipeline()),
        "data_preparation" => Ok(cleaning_pipeline() + data_preparation_pipeline()),
        "eda" => Ok(cleaning_pipeline() + eda_pipeline()),
        DEFAULT_PIPELINE => Ok(cleaning_pipeline()
            + business_understanding_pipeline()
            + data_preparation_pipeline()
            + eda_pipeline()),
        other => Err(InsightsError::UnknownPipeline(other.to_string())),
    }
}
