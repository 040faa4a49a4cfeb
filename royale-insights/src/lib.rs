//! # Royale Insights - descriptive statistics over Clash Royale battles
//!
//! Royale Insights turns raw battle-log tables into descriptive reports:
//! which cards are played most, how rarity tiers differ between winning and
//! losing decks, and which win conditions show up on each side. It runs on
//! Apache Arrow record batches and uses DataFusion for the aggregate
//! queries.
//!
//! ## Overview
//!
//! Work is organised as named-artifact pipelines. Each stage reads named
//! inputs from an [`ArtifactStore`](pipeline::ArtifactStore) and writes one
//! named output, and the [`PipelineRunner`](pipeline::PipelineRunner)
//! executes stages in dependency order:
//!
//! - **business_understanding**: dataset inventory, objectives and an
//!   executive summary
//! - **data_preparation**: column selection, row-wise union, validation
//! - **eda**: rarity distributions, card usage, win-condition usage and key
//!   findings
//! - **`__default__`**: all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use royale_insights::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = InsightsConfig::default();
//! let catalog = DataCatalog::new(CatalogConfig::default().with_data_dir("data/01_raw"));
//! let pipeline = pipeline::pipeline("eda")?;
//!
//! let runner = PipelineRunner::new(config);
//! let mut store = ArtifactStore::new();
//! catalog
//!     .load_inputs(runner.session(), &mut store, &pipeline.free_inputs())
//!     .await?;
//!
//! let summary = runner.run(&pipeline, &mut store).await?;
//! let report = RunReport::new("eda", &summary, &store);
//! println!("{}", HumanFormatter::new().format(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Inputs
//!
//! Three battle tables in a flattened `winner.*` / `loser.*` layout, the
//! master card list (`team.card1.id`, `team.card1.name`) and the
//! win-condition list (`card_id`, `card_name`). Card identifiers compare
//! equal whether they were read as integers, floats or text.
//!
//! ## Determinism
//!
//! Rankings are stable: ties keep the order in which values were first
//! seen, scanning tables in input order, rows in order and card columns in
//! schema order.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod formatters;
pub mod frequency;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod sources;
pub mod stages;
pub mod table;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
