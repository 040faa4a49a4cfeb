//! Command-line runner for the insight pipelines.
//!
//! Loads the battle logs and lookup lists from a data directory, runs one
//! registered pipeline, writes its outputs and prints a report.

use clap::{Parser, ValueEnum};
use royale_insights::logging::setup::{init_logging, LoggingConfig};
use royale_insights::prelude::*;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Markdown,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pipeline to run
    #[arg(short, long, default_value = pipeline::DEFAULT_PIPELINE)]
    pipeline: String,

    /// Directory holding the raw CSV inputs
    #[arg(long, default_value = "data/01_raw")]
    data_dir: PathBuf,

    /// Directory receiving the pipeline outputs
    #[arg(long, default_value = "data/08_reporting")]
    output_dir: PathBuf,

    /// Only run nodes carrying one of these tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Report format printed on stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Number of cards in the usage ranking
    #[arg(long, default_value_t = 20)]
    top_cards: usize,

    /// Number of entries in each win-condition ranking
    #[arg(long, default_value_t = 20)]
    top_win_conditions: usize,

    /// Log level for royale-insights
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Do not write outputs to disk
    #[arg(long)]
    no_save: bool,

    /// Disable ANSI colors in the human report
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_logging(
        LoggingConfig::default()
            .with_crate_level(args.log_level)
            .with_json_format(args.json_logs),
    )?;

    let mut selected = pipeline::pipeline(&args.pipeline)?;
    if !args.tags.is_empty() {
        let tags: Vec<&str> = args.tags.iter().map(String::as_str).collect();
        selected = selected.only_tags(&tags);
    }

    let log = LogConfig::for_level(args.log_level);
    let config = InsightsConfig::default()
        .with_top_cards(args.top_cards)
        .with_top_win_conditions(args.top_win_conditions)
        .with_log_config(log.clone());
    let catalog = DataCatalog::new(
        CatalogConfig::default()
            .with_data_dir(&args.data_dir)
            .with_output_dir(&args.output_dir)
            .with_save_outputs(!args.no_save),
    )
    .with_log_config(log);

    let runner = PipelineRunner::new(config);
    let mut store = ArtifactStore::new();
    catalog
        .load_inputs(runner.session(), &mut store, &selected.free_inputs())
        .await?;

    let summary = runner.run(&selected, &mut store).await?;
    let written = catalog.save_outputs(&store, &summary.outputs())?;
    if !written.is_empty() {
        info!(
            files = written.len(),
            dir = %args.output_dir.display(),
            "Outputs saved"
        );
    }

    let report = RunReport::new(&args.pipeline, &summary, &store);
    let formatter_config = FormatterConfig::default().with_colors(!args.no_color);
    let rendered = match args.format {
        OutputFormat::Human => HumanFormatter::with_config(formatter_config).format(&report)?,
        OutputFormat::Markdown => MarkdownFormatter::with_config(formatter_config).format(&report)?,
        OutputFormat::Json => JsonFormatter::with_config(formatter_config).format(&report)?,
    };
    println!("{rendered}");

    Ok(())
}
