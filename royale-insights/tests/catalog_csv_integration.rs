//! Runs pipelines from CSV files on disk and writes their outputs back.

use royale_insights::pipeline::registry::{
    CARD_USAGE_ANALYSIS, CLEANED_BATTLES, DATASET_VALIDATION, EDA_SUMMARY, RARITY_ANALYSIS,
    WIN_CONDITIONS_ANALYSIS,
};
use royale_insights::prelude::*;
use royale_insights::stages::{
    CardUsageOutcome, RarityReport, ValidationReport, WinConditionOutcome, BATTLE_ID_COLUMN,
};
use royale_insights::table::{column_names, string_values};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "index,winner.tag,loser.tag,winner.card1.id,winner.card2.id,\
loser.card1.id,loser.card2.id,winner.common.count,loser.common.count";

fn write(dir: &Path, name: &str, lines: &[&str]) {
    fs::write(dir.join(name), format!("{}\n", lines.join("\n"))).unwrap();
}

/// Raw inputs in the default file layout. The third battle file stores
/// card ids as floats.
fn create_raw_data() -> TempDir {
    let dir = TempDir::new().unwrap();
    let raw = dir.path();

    write(
        raw,
        "battles_12272020.csv",
        &[
            HEADER,
            "0,#A,#B,26000000,26000003,26000000,26000001,4,5",
            "1,#C,#D,26000000,26000021,26000000,,3,4",
        ],
    );
    write(
        raw,
        "battles_12312020.csv",
        &[HEADER, "0,#E,#F,26000000,26000003,26000001,26000003,2,3"],
    );
    write(
        raw,
        "battles_01042021.csv",
        &[
            HEADER,
            "0,#G,#H,26000000.0,26000021.0,26000000.0,26000003.0,4,4",
        ],
    );
    write(
        raw,
        "card_master_list.csv",
        &[
            "team.card1.id,team.card1.name",
            "26000000,Knight",
            "26000001,Archers",
            "26000003,Giant",
            "26000021,Hog Rider",
        ],
    );
    write(
        raw,
        "wincons.csv",
        &["card_id,card_name", "26000003,Giant", "26000021,Hog Rider"],
    );
    dir
}

async fn run_from_disk(
    pipeline_name: &str,
    catalog: &DataCatalog,
) -> Result<(RunSummary, ArtifactStore)> {
    let runner = PipelineRunner::new(InsightsConfig::default());
    let selected = pipeline::pipeline(pipeline_name)?;
    let mut store = ArtifactStore::new();
    catalog
        .load_inputs(runner.session(), &mut store, &selected.free_inputs())
        .await?;
    let summary = runner.run(&selected, &mut store).await?;
    Ok((summary, store))
}

#[tokio::test]
async fn test_eda_from_csv_files() {
    let raw = create_raw_data();
    let out = TempDir::new().unwrap();
    let catalog = DataCatalog::new(
        CatalogConfig::default()
            .with_data_dir(raw.path())
            .with_output_dir(out.path()),
    );

    let (_, store) = run_from_disk("eda", &catalog).await.unwrap();

    let cards = store.get::<CardUsageOutcome>(CARD_USAGE_ANALYSIS).unwrap();
    let cards = cards.report().unwrap();
    assert_eq!(cards.card_usage_stats.total_card_uses, 15);
    assert_eq!(cards.card_usage_stats.unique_cards, 4);
    assert_eq!(cards.top_cards[0].card_name, "Knight");
    assert_eq!(cards.top_cards[0].count, 7);
    assert_eq!(cards.top_cards[1].card_name, "Giant");
    assert_eq!(cards.top_cards[1].count, 4);

    let wc = store
        .get::<WinConditionOutcome>(WIN_CONDITIONS_ANALYSIS)
        .unwrap();
    let wc = wc.report().unwrap();
    assert_eq!(wc.usage_stats.total_winner_wc_uses, 4);
    assert_eq!(wc.usage_stats.total_loser_wc_uses, 2);
    assert_eq!(wc.overall_win_conditions[0].card_name, "Giant");
    assert_eq!(wc.overall_win_conditions[0].count, 4);

    let rarity = store.get::<RarityReport>(RARITY_ANALYSIS).unwrap();
    assert_eq!(rarity.total_records_analyzed, 4);
    assert_eq!(rarity.winner_vs_loser_comparison.len(), 1);
    let common = &rarity.winner_vs_loser_comparison[&RarityTier::Common];
    assert_eq!(common.winner_avg, 3.25);
    assert_eq!(common.loser_avg, 4.0);
}

#[tokio::test]
async fn test_outputs_are_written() {
    let raw = create_raw_data();
    let out = TempDir::new().unwrap();
    let catalog = DataCatalog::new(
        CatalogConfig::default()
            .with_data_dir(raw.path())
            .with_output_dir(out.path()),
    );

    let (summary, store) = run_from_disk(pipeline::DEFAULT_PIPELINE, &catalog)
        .await
        .unwrap();
    let written = catalog.save_outputs(&store, &summary.outputs()).unwrap();
    assert!(!written.is_empty());

    assert!(out.path().join("battles_1_cleaned.csv").is_file());
    assert!(out.path().join("combined_dataset.csv").is_file());
    assert!(out.path().join("selected_datasets").is_dir());

    let eda: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join(format!("{EDA_SUMMARY}.json"))).unwrap())
            .unwrap();
    assert_eq!(eda["key_findings"]["total_unique_cards"], 4);
    assert_eq!(eda["key_findings"]["most_popular_cards"][0], "Knight");

    let cleaned = fs::read_to_string(out.path().join("battles_1_cleaned.csv")).unwrap();
    assert!(cleaned.starts_with("battle_id,winner.tag,loser.tag"));
}

#[tokio::test]
async fn test_missing_input_file() {
    let empty = TempDir::new().unwrap();
    let catalog = DataCatalog::new(CatalogConfig::default().with_data_dir(empty.path()));

    let err = run_from_disk("eda", &catalog).await.unwrap_err();
    assert!(matches!(err, InsightsError::DataSource { .. }));
}

#[tokio::test]
async fn test_unnamed_leading_column_becomes_battle_id() {
    let raw = create_raw_data();
    write(
        raw.path(),
        "battles_12272020.csv",
        &[
            ",winner.tag,loser.tag,winner.card1.id,winner.common.count",
            "0,#A,#B,26000000,4",
            "1,#C,#D,26000021,3",
        ],
    );
    let catalog = DataCatalog::new(
        CatalogConfig::default()
            .with_data_dir(raw.path())
            .with_save_outputs(false),
    );

    let (_, store) = run_from_disk("data_preparation", &catalog).await.unwrap();

    let cleaned = store.get::<RecordBatch>(CLEANED_BATTLES[0]).unwrap();
    assert_eq!(
        column_names(cleaned)[..3],
        [BATTLE_ID_COLUMN, "winner.tag", "loser.tag"]
    );
    assert_eq!(cleaned.num_rows(), 2);
    let ids = string_values(cleaned.column(0)).unwrap();
    assert_eq!(ids, vec![Some("0".to_string()), Some("1".to_string())]);

    let validation = store.get::<ValidationReport>(DATASET_VALIDATION).unwrap();
    assert_eq!(validation.total_records, 4);
    assert!(validation.data_integrity.battle_ids_complete);
}
