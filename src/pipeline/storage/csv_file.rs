use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::app::ports::TableSink;
use crate::error::{PrepError, Result};
use crate::observability::metrics;
use crate::types::Table;

/// Writes processed tables as comma-delimited files under a directory
pub struct CsvFileSink {
    dir: PathBuf,
}

impl CsvFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Header row first, then one row per record; missing values render empty.
pub fn render_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for row in table.rendered_rows() {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PrepError::Io(e.into_error()))
}

#[async_trait]
impl TableSink for CsvFileSink {
    async fn write_table(&self, table: &Table, destination: &str) -> Result<String> {
        let bytes = match render_csv(table) {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::sink::write_error();
                return Err(e);
            }
        };
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(destination);
        debug!(path = %path.display(), bytes = bytes.len(), "writing table");
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            metrics::sink::write_error();
            return Err(e.into());
        }
        metrics::sink::table_written(destination);
        info!(path = %path.display(), rows = table.row_count(), "table written");
        Ok(path.display().to_string())
    }
}
