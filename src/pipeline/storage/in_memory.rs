use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::app::ports::TableSink;
use crate::error::Result;
use crate::observability::metrics;
use crate::types::Table;

/// Keeps written tables in memory, keyed by destination name
#[derive(Clone, Default)]
pub struct InMemorySink {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, destination: &str) -> Option<Table> {
        self.lock().get(destination).cloned()
    }

    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TableSink for InMemorySink {
    async fn write_table(&self, table: &Table, destination: &str) -> Result<String> {
        self.lock().insert(destination.to_string(), table.clone());
        metrics::sink::table_written(destination);
        debug!(destination, rows = table.row_count(), "stored table in memory");
        Ok(destination.to_string())
    }
}
