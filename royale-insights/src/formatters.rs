//! Rendering of pipeline results for terminals, documents and tools.
//!
//! A [`RunReport`] bundles what a pipeline run produced: the run timings and
//! the artifact store. Formatters pick the report artifacts they know about
//! (summaries and analyses) and skip whatever the pipeline did not produce,
//! so the same formatter serves every registered pipeline.
//!
//! # Examples
//!
//! ```rust,ignore
//! use royale_insights::formatters::{HumanFormatter, ReportFormatter, RunReport};
//!
//! let report = RunReport::new("eda", &summary, &store);
//! println!("{}", HumanFormatter::new().format(&report)?);
//! ```

use serde_json::{json, Map, Value};
use std::fmt::Write;

use crate::error::Result;
use crate::pipeline::registry::{
    BUSINESS_SUMMARY, CARD_USAGE_ANALYSIS, EDA_SUMMARY, PREPARATION_SUMMARY, RARITY_ANALYSIS,
    WIN_CONDITIONS_ANALYSIS,
};
use crate::pipeline::{ArtifactStore, ArtifactValue, RunSummary};
use crate::stages::summary::format_thousands;
use crate::stages::{
    BusinessSummary, CardUsageOutcome, EdaSummary, PreparationSummary, RarityReport,
    WinConditionOutcome, NO_CARD_COLUMNS,
};
use crate::stages::RankedCard;

/// Configuration options for rendering a run.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include per-node execution times
    pub include_timings: bool,
    /// Maximum number of ranked cards shown per table
    pub max_entries: usize,
    /// Whether to use ANSI colors (human formatter)
    pub use_colors: bool,
    /// Whether to include run timestamps
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_timings: true,
            max_entries: 10,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Only the headline figures.
    pub fn minimal() -> Self {
        Self {
            include_timings: false,
            max_entries: 5,
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Everything, including full rankings.
    pub fn detailed() -> Self {
        Self {
            include_timings: true,
            max_entries: usize::MAX,
            use_colors: true,
            include_timestamps: true,
        }
    }

    /// Plain output suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_timings: true,
            max_entries: 20,
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_timings(mut self, include: bool) -> Self {
        self.include_timings = include;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }
}

/// The outcome of one pipeline run, ready to be rendered.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pipeline: &'a str,
    run: &'a RunSummary,
    store: &'a ArtifactStore,
}

impl<'a> RunReport<'a> {
    pub fn new(pipeline: &'a str, run: &'a RunSummary, store: &'a ArtifactStore) -> Self {
        Self {
            pipeline,
            run,
            store,
        }
    }

    pub fn pipeline(&self) -> &'a str {
        self.pipeline
    }

    pub fn run(&self) -> &'a RunSummary {
        self.run
    }

    pub fn store(&self) -> &'a ArtifactStore {
        self.store
    }

    fn artifact<T: ArtifactValue>(&self, name: &str) -> Option<&'a T> {
        self.store.get(name).ok()
    }

    fn business(&self) -> Option<&'a BusinessSummary> {
        self.artifact(BUSINESS_SUMMARY)
    }

    fn preparation(&self) -> Option<&'a PreparationSummary> {
        self.artifact(PREPARATION_SUMMARY)
    }

    fn rarity(&self) -> Option<&'a RarityReport> {
        self.artifact(RARITY_ANALYSIS)
    }

    fn card_usage(&self) -> Option<&'a CardUsageOutcome> {
        self.artifact(CARD_USAGE_ANALYSIS)
    }

    fn win_conditions(&self) -> Option<&'a WinConditionOutcome> {
        self.artifact(WIN_CONDITIONS_ANALYSIS)
    }

    fn eda(&self) -> Option<&'a EdaSummary> {
        self.artifact(EDA_SUMMARY)
    }
}

/// Renders a [`RunReport`] into a string.
///
/// ```rust,ignore
/// struct Headline;
///
/// impl ReportFormatter for Headline {
///     fn format(&self, report: &RunReport<'_>) -> Result<String> {
///         Ok(format!("{} nodes", report.run().nodes.len()))
///     }
/// }
/// ```
pub trait ReportFormatter {
    /// Renders `report` with the formatter's own configuration.
    fn format(&self, report: &RunReport<'_>) -> Result<String>;

    /// Renders `report` with an explicit configuration.
    fn format_with_config(&self, report: &RunReport<'_>, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

fn shown<'a>(cards: &'a [RankedCard], config: &FormatterConfig) -> &'a [RankedCard] {
    &cards[..cards.len().min(config.max_entries)]
}

/// Structured JSON: run metadata plus every report artifact the run
/// produced, keyed by artifact name.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &RunReport<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &RunReport<'_>, config: &FormatterConfig) -> Result<String> {
        let mut root = Map::new();
        root.insert("pipeline".into(), json!(report.pipeline()));

        let run = report.run();
        if config.include_timestamps {
            root.insert("started_at".into(), json!(run.started_at));
            root.insert("finished_at".into(), json!(run.finished_at));
        }
        if config.include_timings {
            let nodes: Vec<Value> = run
                .nodes
                .iter()
                .map(|n| {
                    json!({
                        "node": n.node,
                        "output": n.output,
                        "elapsed_ms": n.elapsed.as_millis() as u64,
                    })
                })
                .collect();
            root.insert("nodes".into(), Value::Array(nodes));
        }

        let mut outputs = Map::new();
        for name in run.outputs() {
            let artifact = report.store().artifact(name)?;
            if let Some(value) = artifact.to_json()? {
                outputs.insert(name.to_string(), value);
            }
        }
        root.insert("outputs".into(), Value::Object(outputs));

        let root = Value::Object(root);
        Ok(if self.pretty {
            serde_json::to_string_pretty(&root)?
        } else {
            serde_json::to_string(&root)?
        })
    }
}

/// Console output with optional ANSI colors.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn section(output: &mut String, title: &str, config: &FormatterConfig) -> Result<()> {
    writeln!(output)?;
    if config.use_colors {
        writeln!(output, "\x1b[1m{title}\x1b[0m")?;
    } else {
        writeln!(output, "{title}")?;
    }
    Ok(())
}

fn human_ranking(output: &mut String, cards: &[RankedCard], config: &FormatterConfig) -> Result<()> {
    for (i, card) in shown(cards, config).iter().enumerate() {
        writeln!(
            output,
            "   {:>2}. {} ({}): {} uses, {:.2}%",
            i + 1,
            card.card_name,
            card.card_id,
            format_thousands(card.count as usize),
            card.percentage
        )?;
    }
    Ok(())
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &RunReport<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &RunReport<'_>, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let run = report.run();

        writeln!(output)?;
        if config.use_colors {
            writeln!(output, "\x1b[32mPipeline '{}' completed\x1b[0m", report.pipeline())?;
        } else {
            writeln!(output, "Pipeline '{}' completed", report.pipeline())?;
        }
        if config.include_timestamps {
            writeln!(output, "Started: {}", run.started_at.to_rfc3339())?;
        }
        writeln!(
            output,
            "Nodes executed: {} in {}ms",
            run.nodes.len(),
            run.elapsed().num_milliseconds()
        )?;

        if let Some(business) = report.business() {
            let exec = &business.executive_summary;
            section(&mut output, "Business understanding", config)?;
            writeln!(output, "   Project: {}", exec.project)?;
            writeln!(output, "   Objective: {}", exec.main_objective)?;
            writeln!(output, "   Available data: {}", exec.available_data)?;
            for objective in &exec.key_objectives {
                writeln!(output, "   - {objective}")?;
            }
        }

        if let Some(prep) = report.preparation() {
            let overview = &prep.preparation_overview;
            let quality = &prep.data_quality;
            section(&mut output, "Data preparation", config)?;
            writeln!(
                output,
                "   Records combined: {}",
                format_thousands(overview.total_records_combined)
            )?;
            writeln!(output, "   Columns selected: {}", overview.total_columns_selected)?;
            writeln!(output, "   Memory usage: {:.2} MB", overview.memory_usage_mb)?;
            writeln!(output, "   Duplicate records: {}", quality.duplicate_records)?;
            writeln!(output, "   Missing values: {}", quality.missing_values_summary)?;
            let integrity = &quality.data_integrity_checks;
            writeln!(
                output,
                "   Identifiers complete: battle_id={} winner.tag={} loser.tag={}",
                integrity.battle_ids_complete,
                integrity.winner_tags_complete,
                integrity.loser_tags_complete
            )?;
        }

        if let Some(rarity) = report.rarity() {
            section(&mut output, "Rarity (average cards per deck)", config)?;
            for (tier, comparison) in &rarity.winner_vs_loser_comparison {
                writeln!(
                    output,
                    "   {:<10} winner {:>5.2}  loser {:>5.2}  diff {:+.2}",
                    tier.as_str(),
                    comparison.winner_avg,
                    comparison.loser_avg,
                    comparison.difference
                )?;
            }
        }

        if let Some(outcome) = report.card_usage() {
            section(&mut output, "Most used cards", config)?;
            match outcome.report() {
                Some(cards) => {
                    writeln!(
                        output,
                        "   {} uses across {} unique cards",
                        format_thousands(cards.card_usage_stats.total_card_uses as usize),
                        cards.card_usage_stats.unique_cards
                    )?;
                    human_ranking(&mut output, &cards.top_cards, config)?;
                }
                None => writeln!(output, "   {NO_CARD_COLUMNS}")?,
            }
        }

        if let Some(outcome) = report.win_conditions() {
            section(&mut output, "Win conditions", config)?;
            match outcome.report() {
                Some(wc) => {
                    writeln!(
                        output,
                        "   {} uses ({} by winners, {} by losers), {} of {} known win conditions seen",
                        format_thousands(wc.usage_stats.total_wc_uses as usize),
                        format_thousands(wc.usage_stats.total_winner_wc_uses as usize),
                        format_thousands(wc.usage_stats.total_loser_wc_uses as usize),
                        wc.usage_stats.unique_win_conditions,
                        wc.usage_stats.total_win_conditions_available
                    )?;
                    human_ranking(&mut output, &wc.overall_win_conditions, config)?;
                }
                None => writeln!(output, "   {NO_CARD_COLUMNS}")?,
            }
        }

        if let Some(eda) = report.eda() {
            section(&mut output, "Insights", config)?;
            for insight in &eda.insights {
                writeln!(output, "   - {insight}")?;
            }
        }

        if config.include_timings && !run.nodes.is_empty() {
            section(&mut output, "Timings", config)?;
            for timing in &run.nodes {
                writeln!(
                    output,
                    "   {:<32} {:>6}ms",
                    timing.node,
                    timing.elapsed.as_millis()
                )?;
            }
        }

        Ok(output)
    }
}

/// Markdown suitable for a README or a pull request comment.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the level of the top heading (clamped to 1..=5).
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn heading(&self, depth: u8) -> String {
        "#".repeat((self.heading_level + depth) as usize)
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn markdown_ranking(
    output: &mut String,
    cards: &[RankedCard],
    config: &FormatterConfig,
) -> Result<()> {
    writeln!(output, "| # | Card | Id | Uses | Share |")?;
    writeln!(output, "|---|------|----|------|-------|")?;
    for (i, card) in shown(cards, config).iter().enumerate() {
        writeln!(
            output,
            "| {} | {} | {} | {} | {:.2}% |",
            i + 1,
            card.card_name,
            card.card_id,
            card.count,
            card.percentage
        )?;
    }
    Ok(())
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &RunReport<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &RunReport<'_>, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let run = report.run();
        let h1 = self.heading(0);
        let h2 = self.heading(1);

        writeln!(output, "{h1} Royale insights: `{}`", report.pipeline())?;
        writeln!(output)?;
        if config.include_timestamps {
            writeln!(output, "**Started:** {}  ", run.started_at.to_rfc3339())?;
        }
        writeln!(
            output,
            "**Nodes executed:** {} in {}ms",
            run.nodes.len(),
            run.elapsed().num_milliseconds()
        )?;

        if let Some(business) = report.business() {
            let exec = &business.executive_summary;
            writeln!(output)?;
            writeln!(output, "{h2} Business understanding")?;
            writeln!(output)?;
            writeln!(output, "**{}**: {}", exec.project, exec.main_objective)?;
            writeln!(output)?;
            for objective in &exec.key_objectives {
                writeln!(output, "- {objective}")?;
            }
            writeln!(output)?;
            writeln!(output, "_{}_", exec.expected_value)?;
        }

        if let Some(prep) = report.preparation() {
            let overview = &prep.preparation_overview;
            let quality = &prep.data_quality;
            writeln!(output)?;
            writeln!(output, "{h2} Data preparation")?;
            writeln!(output)?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(
                output,
                "| Records combined | {} |",
                format_thousands(overview.total_records_combined)
            )?;
            writeln!(output, "| Columns selected | {} |", overview.total_columns_selected)?;
            writeln!(output, "| Memory usage | {:.2} MB |", overview.memory_usage_mb)?;
            writeln!(output, "| Duplicate records | {} |", quality.duplicate_records)?;
            writeln!(output, "| Missing values | {} |", quality.missing_values_summary)?;
            writeln!(
                output,
                "| Unique battles | {} |",
                prep.dataset_statistics.unique_battle_ids
            )?;
        }

        if let Some(rarity) = report.rarity() {
            writeln!(output)?;
            writeln!(output, "{h2} Rarity")?;
            writeln!(output)?;
            writeln!(output, "| Rarity | Winner avg | Loser avg | Difference |")?;
            writeln!(output, "|--------|------------|-----------|------------|")?;
            for (tier, c) in &rarity.winner_vs_loser_comparison {
                writeln!(
                    output,
                    "| {} | {:.2} | {:.2} | {:+.2} |",
                    tier.as_str(),
                    c.winner_avg,
                    c.loser_avg,
                    c.difference
                )?;
            }
        }

        if let Some(outcome) = report.card_usage() {
            writeln!(output)?;
            writeln!(output, "{h2} Most used cards")?;
            writeln!(output)?;
            match outcome.report() {
                Some(cards) => markdown_ranking(&mut output, &cards.top_cards, config)?,
                None => writeln!(output, "> {NO_CARD_COLUMNS}")?,
            }
        }

        if let Some(outcome) = report.win_conditions() {
            writeln!(output)?;
            writeln!(output, "{h2} Win conditions")?;
            writeln!(output)?;
            match outcome.report() {
                Some(wc) => markdown_ranking(&mut output, &wc.overall_win_conditions, config)?,
                None => writeln!(output, "> {NO_CARD_COLUMNS}")?,
            }
        }

        if let Some(eda) = report.eda() {
            writeln!(output)?;
            writeln!(output, "{h2} Insights")?;
            writeln!(output)?;
            for insight in &eda.insights {
                writeln!(output, "- {insight}")?;
            }
        }

        if config.include_timings && !run.nodes.is_empty() {
            writeln!(output)?;
            writeln!(output, "{h2} Timings")?;
            writeln!(output)?;
            writeln!(output, "| Node | Output | Elapsed |")?;
            writeln!(output, "|------|--------|---------|")?;
            for timing in &run.nodes {
                writeln!(
                    output,
                    "| {} | `{}` | {}ms |",
                    timing.node,
                    timing.output,
                    timing.elapsed.as_millis()
                )?;
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CardId;
    use crate::pipeline::NodeTiming;
    use crate::stages::summary::{EdaOverview, KeyFindings};
    use crate::stages::{CardUsageReport, CardUsageStats};
    use chrono::Utc;
    use std::time::Duration;

    fn knight() -> RankedCard {
        RankedCard {
            card_id: CardId::from("99"),
            card_name: "Knight".to_string(),
            count: 3,
            percentage: 100.0,
        }
    }

    fn sample() -> (RunSummary, ArtifactStore) {
        let mut store = ArtifactStore::new();
        store.insert(
            CARD_USAGE_ANALYSIS,
            CardUsageOutcome::Report(CardUsageReport {
                card_usage_stats: CardUsageStats {
                    total_card_uses: 3,
                    unique_cards: 1,
                    average_uses_per_card: 3.0,
                },
                top_cards: vec![knight()],
                card_columns_found: vec!["winner.card1.id".to_string()],
                card_mapping_used: true,
            }),
        );
        store.insert(WIN_CONDITIONS_ANALYSIS, WinConditionOutcome::NoCardColumns);
        store.insert(
            EDA_SUMMARY,
            EdaSummary {
                eda_overview: EdaOverview {
                    dataset_size: 3,
                    analysis_focus: vec![],
                },
                key_findings: KeyFindings {
                    most_popular_cards: vec!["Knight".to_string()],
                    total_unique_cards: 1,
                    total_win_conditions: 0,
                },
                insights: vec!["Most popular card: Knight (100.0% usage)".to_string()],
            },
        );

        let now = Utc::now();
        let run = RunSummary {
            started_at: now,
            finished_at: now,
            nodes: vec![
                NodeTiming {
                    node: "analyze_most_used_cards".to_string(),
                    output: CARD_USAGE_ANALYSIS.to_string(),
                    elapsed: Duration::from_millis(4),
                },
                NodeTiming {
                    node: "analyze_win_conditions_usage".to_string(),
                    output: WIN_CONDITIONS_ANALYSIS.to_string(),
                    elapsed: Duration::from_millis(2),
                },
                NodeTiming {
                    node: "generate_eda_summary".to_string(),
                    output: EDA_SUMMARY.to_string(),
                    elapsed: Duration::from_millis(1),
                },
            ],
        };
        (run, store)
    }

    #[test]
    fn test_json_formatter_collects_outputs() {
        let (run, store) = sample();
        let report = RunReport::new("eda", &run, &store);
        let output = JsonFormatter::new().format(&report).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["pipeline"], "eda");
        assert_eq!(value["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(
            value["outputs"][CARD_USAGE_ANALYSIS]["top_cards"][0]["card_name"],
            "Knight"
        );
        assert_eq!(
            value["outputs"][WIN_CONDITIONS_ANALYSIS]["error"],
            NO_CARD_COLUMNS
        );
    }

    #[test]
    fn test_json_formatter_minimal_drops_run_metadata() {
        let (run, store) = sample();
        let report = RunReport::new("eda", &run, &store);
        let output = JsonFormatter::with_config(FormatterConfig::minimal())
            .with_pretty(false)
            .format(&report)
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert!(value.get("nodes").is_none());
        assert!(value.get("started_at").is_none());
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_human_formatter_without_colors() {
        let (run, store) = sample();
        let report = RunReport::new("eda", &run, &store);
        let output = HumanFormatter::with_config(FormatterConfig::ci())
            .format(&report)
            .unwrap();

        assert!(output.contains("Pipeline 'eda' completed"));
        assert!(output.contains("Knight (99): 3 uses, 100.00%"));
        assert!(output.contains(NO_CARD_COLUMNS));
        assert!(output.contains("- Most popular card: Knight (100.0% usage)"));
        assert!(output.contains("analyze_most_used_cards"));
        assert!(!output.contains("\x1b["));
        assert!(!output.contains("Data preparation"));
    }

    #[test]
    fn test_human_formatter_with_colors() {
        let (run, store) = sample();
        let report = RunReport::new("eda", &run, &store);
        let output = HumanFormatter::new().format(&report).unwrap();
        assert!(output.contains("\x1b[1mMost used cards\x1b[0m"));
    }

    #[test]
    fn test_markdown_formatter_tables_and_heading_level() {
        let (run, store) = sample();
        let report = RunReport::new("eda", &run, &store);
        let output = MarkdownFormatter::new()
            .with_heading_level(1)
            .format_with_config(&report, &FormatterConfig::minimal())
            .unwrap();

        assert!(output.starts_with("# Royale insights: `eda`"));
        assert!(output.contains("## Most used cards"));
        assert!(output.contains("| 1 | Knight | 99 | 3 | 100.00% |"));
        assert!(output.contains("> No card columns found"));
        assert!(!output.contains("## Timings"));
    }

    #[test]
    fn test_max_entries_limits_rankings() {
        let cards = vec![knight(), knight(), knight()];
        let config = FormatterConfig::default().with_max_entries(2);
        assert_eq!(shown(&cards, &config).len(), 2);
        assert_eq!(shown(&cards, &FormatterConfig::detailed()).len(), 3);
    }
}
