//! Card lookups and the on-disk data catalog.
//!
//! [`DataCatalog`] maps artifact names to files: the five CSV inputs under
//! the data directory, and stage outputs under the output directory (tables
//! as CSV, reports as pretty-printed JSON).

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{instrument, warn};

use crate::context::InsightsContext;
use crate::error::{ErrorContext, InsightsError, Result};
use crate::log_data_op;
use crate::logging::LogConfig;
use crate::pipeline::registry::{BATTLE_INPUTS, CARD_MASTER_LIST, WINCONS};
use crate::pipeline::{Artifact, ArtifactStore};
use crate::sources::{CsvOptions, CsvSource, DataSource};

pub mod cards;

pub use cards::*;

/// File layout of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Directory holding the raw CSV inputs
    pub data_dir: PathBuf,
    /// Directory receiving stage outputs
    pub output_dir: PathBuf,
    /// File names of `battles_1`, `battles_2` and `battles_3`
    pub battle_files: [String; 3],
    /// File name of `card_master_list`
    pub card_master_list_file: String,
    /// File name of `wincons`
    pub wincons_file: String,
    /// Whether outputs are written at all
    pub save_outputs: bool,
    /// CSV parsing options for every input
    pub csv: CsvOptions,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/01_raw"),
            output_dir: PathBuf::from("data/08_reporting"),
            battle_files: [
                "battles_12272020.csv".to_string(),
                "battles_12312020.csv".to_string(),
                "battles_01042021.csv".to_string(),
            ],
            card_master_list_file: "card_master_list.csv".to_string(),
            wincons_file: "wincons.csv".to_string(),
            save_outputs: true,
            csv: CsvOptions::default(),
        }
    }
}

impl CatalogConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_save_outputs(mut self, save: bool) -> Self {
        self.save_outputs = save;
        self
    }
}

/// Reads catalog inputs into an [`ArtifactStore`] and writes outputs back.
#[derive(Debug, Clone)]
pub struct DataCatalog {
    config: CatalogConfig,
    log: LogConfig,
}

impl DataCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            log: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Path of the input artifact `name`, if it is a catalog input.
    pub fn input_path(&self, name: &str) -> Option<PathBuf> {
        let file = match name {
            CARD_MASTER_LIST => &self.config.card_master_list_file,
            WINCONS => &self.config.wincons_file,
            other => {
                let index = BATTLE_INPUTS.iter().position(|b| *b == other)?;
                &self.config.battle_files[index]
            }
        };
        Some(self.config.data_dir.join(file))
    }

    /// Names of all catalog inputs.
    pub fn input_names(&self) -> Vec<&'static str> {
        BATTLE_INPUTS
            .iter()
            .copied()
            .chain([CARD_MASTER_LIST, WINCONS])
            .collect()
    }

    /// Loads the inputs `names` into `store`.
    ///
    /// A name that is not a catalog input is a configuration error.
    #[instrument(skip(self, ctx, store, names))]
    pub async fn load_inputs<S: AsRef<str>>(
        &self,
        ctx: &InsightsContext,
        store: &mut ArtifactStore,
        names: &[S],
    ) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            let path = self.input_path(name).ok_or_else(|| {
                InsightsError::Configuration(format!("'{name}' is not a catalog input"))
            })?;
            let source = CsvSource::with_options(&path, self.config.csv.clone())?;
            let batch = source.load(ctx).await?;
            log_data_op!(
                self.log,
                artifact = name,
                path = %path.display(),
                rows = batch.num_rows(),
                "Loaded input"
            );
            store.insert(name, batch);
        }
        Ok(())
    }

    /// Writes the artifacts `names` under the output directory.
    ///
    /// Returns the written paths. Nothing is written when saving is off.
    #[instrument(skip(self, store, names))]
    pub fn save_outputs<S: AsRef<str>>(
        &self,
        store: &ArtifactStore,
        names: &[S],
    ) -> Result<Vec<PathBuf>> {
        if !self.config.save_outputs {
            return Ok(Vec::new());
        }
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Creating output directory {}", output_dir.display()))?;

        let mut written = Vec::new();
        for name in names {
            let name = name.as_ref();
            match store.artifact(name)? {
                Artifact::Table(batch) => {
                    let path = self.config.output_dir.join(format!("{name}.csv"));
                    write_csv(&path, batch)?;
                    written.push(path);
                }
                Artifact::SelectedTables(selected) => {
                    let dir = self.config.output_dir.join(name);
                    fs::create_dir_all(&dir)?;
                    for table in &selected.tables {
                        let path = dir.join(format!("{}.csv", table.name));
                        write_csv(&path, &table.batch)?;
                        written.push(path);
                    }
                }
                report => match report.to_json()? {
                    Some(json) => {
                        let path = self.config.output_dir.join(format!("{name}.json"));
                        let mut writer = BufWriter::new(File::create(&path)?);
                        serde_json::to_writer_pretty(&mut writer, &json)?;
                        writer.flush()?;
                        written.push(path);
                    }
                    None => warn!(artifact = name, "Artifact has no file form"),
                },
            }
            log_data_op!(self.log, artifact = name, "Saved output");
        }
        Ok(written)
    }
}

fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(BufWriter::new(file));
    writer.write(batch)?;
    writer.into_inner().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::define_ml_objectives;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    #[test]
    fn test_input_paths() {
        let catalog = DataCatalog::new(CatalogConfig::default().with_data_dir("/data"));
        assert_eq!(
            catalog.input_path("battles_2"),
            Some(PathBuf::from("/data/battles_12312020.csv"))
        );
        assert_eq!(
            catalog.input_path("wincons"),
            Some(PathBuf::from("/data/wincons.csv"))
        );
        assert_eq!(catalog.input_path("eda_summary"), None);
        assert_eq!(catalog.input_names().len(), 5);
    }

    #[test]
    fn test_save_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DataCatalog::new(CatalogConfig::default().with_output_dir(dir.path()));

        let mut store = ArtifactStore::new();
        store.insert(
            "combined_dataset",
            RecordBatch::try_from_iter(vec![
                ("battle_id", Arc::new(StringArray::from(vec!["B1"])) as ArrayRef),
                ("winner.card1.id", Arc::new(Int64Array::from(vec![99])) as ArrayRef),
            ])
            .unwrap(),
        );
        store.insert("ml_objectives_definition", define_ml_objectives());

        let written = catalog
            .save_outputs(&store, &["combined_dataset", "ml_objectives_definition"])
            .unwrap();
        assert_eq!(written.len(), 2);

        let csv = fs::read_to_string(dir.path().join("combined_dataset.csv")).unwrap();
        assert_eq!(csv, "battle_id,winner.card1.id\nB1,99\n");

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("ml_objectives_definition.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["objectives"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_saving_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DataCatalog::new(
            CatalogConfig::default()
                .with_output_dir(dir.path().join("out"))
                .with_save_outputs(false),
        );
        let written = catalog
            .save_outputs(&ArtifactStore::new(), &["anything"])
            .unwrap();
        assert!(written.is_empty());
        assert!(!dir.path().join("out").exists());
    }
}
