use crate::{Record, RecordSchema, Result};
use std::sync::Arc;

/// Reads records from some source into a schema.
///
/// Implementations live in `fsmatch-io`; anything that can produce column
/// values (a file, a query, an in-memory table) can implement this.
pub trait RecordLoader {
    /// Schema the loaded records belong to.
    fn schema(&self) -> &Arc<RecordSchema>;

    /// Load every record from `source`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecordLoading`] naming the source when it
    /// cannot be read or a row does not fit the schema.
    fn load(&self, source: &str) -> Result<Vec<Record>>;
}

/// Loader over rows already in memory, keyed by source name.
#[derive(Debug)]
pub struct MemoryLoader {
    schema: Arc<RecordSchema>,
    sources: Vec<(String, Vec<Vec<String>>)>,
}

impl MemoryLoader {
    pub fn new(schema: &Arc<RecordSchema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            sources: Vec::new(),
        }
    }

    /// Register `rows` under the source name `source`.
    pub fn with_source<S: AsRef<str>>(mut self, source: &str, rows: &[Vec<S>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| v.as_ref().to_string()).collect())
            .collect();
        self.sources.push((source.to_string(), rows));
        self
    }
}

impl RecordLoader for MemoryLoader {
    fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    fn load(&self, source: &str) -> Result<Vec<Record>> {
        let (_, rows) = self
            .sources
            .iter()
            .find(|(name, _)| name == source)
            .ok_or_else(|| crate::Error::loading(source, "no such source"))?;

        rows.iter()
            .map(|row| {
                self.schema
                    .new_record(row.as_slice())
                    .map_err(|e| crate::Error::loading(source, e))
            })
            .collect()
    }
}
