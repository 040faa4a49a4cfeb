//! CSV file source implementation.

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::CsvReadOptions;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::DataSource;
use crate::context::InsightsContext;
use crate::error::{InsightsError, Result};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            schema_infer_max_records: 1000,
        }
    }
}

/// A single CSV file read with schema inference.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a new CSV source from a file path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, CsvOptions::default())
    }

    /// Creates a new CSV source with custom options.
    pub fn with_options(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(InsightsError::Configuration(
                "CSV path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            options,
        })
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }

    /// Inferred schema with blank header cells named `column_<n>`.
    ///
    /// Raw battle exports leave the leading index column unnamed. Returns
    /// `None` when every header cell has a name.
    fn schema_for_unnamed_columns(&self) -> Result<Option<Schema>> {
        if !self.options.has_header {
            return Ok(None);
        }
        let format = Format::default()
            .with_header(true)
            .with_delimiter(self.options.delimiter)
            .with_quote(self.options.quote);
        let (schema, _) = format.infer_schema(
            File::open(&self.path)?,
            Some(self.options.schema_infer_max_records),
        )?;
        if schema.fields().iter().all(|f| !f.name().is_empty()) {
            return Ok(None);
        }

        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let named = field.as_ref().clone();
                if field.name().is_empty() {
                    named.with_name(format!("column_{}", i + 1))
                } else {
                    named
                }
            })
            .collect();
        Ok(Some(Schema::new(fields)))
    }
}

#[async_trait]
impl DataSource for CsvSource {
    #[instrument(skip(self, ctx), fields(
        source.type = "csv",
        source.path = %self.path.display(),
        csv.has_header = self.options.has_header
    ))]
    async fn load(&self, ctx: &InsightsContext) -> Result<RecordBatch> {
        if !self.path.is_file() {
            return Err(InsightsError::data_source(
                "CSV",
                format!("File not found: {}", self.path.display()),
            ));
        }

        let path = self.path.to_str().ok_or_else(|| {
            InsightsError::Configuration("Path contains invalid UTF-8".to_string())
        })?;
        let extension = self.extension();
        let explicit_schema = self.schema_for_unnamed_columns()?;
        let mut read_options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(&extension);
        if let Some(schema) = &explicit_schema {
            debug!(columns = schema.fields().len(), "Naming blank CSV header cells");
            read_options = read_options.schema(schema);
        }

        let df = ctx.inner().read_csv(path, read_options).await.map_err(|e| {
            InsightsError::data_source_with_source(
                "CSV",
                format!("Failed to read {}", self.path.display()),
                Box::new(e),
            )
        })?;
        let schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        let batch = concat_batches(&schema, &batches)?;

        info!(
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "Loaded CSV data source"
        );
        Ok(batch)
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_csv() {
        let file = write_csv("card_id,card_name\n26000003,Giant\n26000021,Hog Rider\n");
        let source = CsvSource::new(file.path()).unwrap();
        let ctx = InsightsContext::new();

        let batch = source.load(&ctx).await.unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);
        assert!(batch.column_by_name("card_name").is_some());
    }

    #[tokio::test]
    async fn test_blank_header_cell_is_named() {
        let file = write_csv(",winner.tag,winner.card1.id\n0,#A,26000000\n1,#B,26000001\n");
        let source = CsvSource::new(file.path()).unwrap();
        let ctx = InsightsContext::new();

        let batch = source.load(&ctx).await.unwrap();
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["column_1", "winner.tag", "winner.card1.id"]);
        assert_eq!(batch.num_rows(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_data_source_error() {
        let source = CsvSource::new("/nonexistent/battles.csv").unwrap();
        let ctx = InsightsContext::new();
        let err = source.load(&ctx).await.unwrap_err();
        assert!(matches!(err, InsightsError::DataSource { .. }));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(CsvSource::new("").is_err());
    }

    #[test]
    fn test_description() {
        let source = CsvSource::new("data/wincons.csv").unwrap();
        assert_eq!(source.description(), "CSV file: data/wincons.csv");
    }
}
