use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::types::Table;

/// Source of raw feed files, keyed by bucket and object key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Destination for fully processed tables
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Persist `table` under `destination`; returns where it was written.
    async fn write_table(&self, table: &Table, destination: &str) -> Result<String>;
}
