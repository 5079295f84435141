//! Fixed-width text files

use fsmatch_core::{Error, Record, RecordLoader, RecordSchema, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::debug;

/// A column occupying characters `start..end` of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
}

impl ColumnSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Loads one record per non-empty line, cutting each schema column out of
/// the line by character position.
#[derive(Debug)]
pub struct FixedWidthLoader {
    schema: Arc<RecordSchema>,
    spans: Vec<ColumnSpan>,
}

impl FixedWidthLoader {
    /// `spans` gives one span per schema column, in column order.
    ///
    /// # Errors
    /// Fails if the span count differs from the column count or a span ends
    /// before it starts.
    pub fn new(schema: &Arc<RecordSchema>, spans: Vec<ColumnSpan>) -> Result<Self> {
        if spans.len() != schema.columns().len() {
            return Err(Error::InvalidConfig(format!(
                "expected {} column spans, got {}",
                schema.columns().len(),
                spans.len()
            )));
        }
        if let Some((i, span)) = spans.iter().enumerate().find(|(_, s)| s.end < s.start) {
            return Err(Error::InvalidConfig(format!(
                "span of column {:?} ends before it starts ({}..{})",
                schema.columns()[i],
                span.start,
                span.end
            )));
        }

        Ok(Self {
            schema: Arc::clone(schema),
            spans,
        })
    }

    /// Characters a line must have to hold every span.
    pub fn line_width(&self) -> usize {
        self.spans.iter().map(|s| s.end).max().unwrap_or(0)
    }

    fn cut<'l>(&self, line: &'l str, line_no: usize, source_id: &str) -> Result<Vec<&'l str>> {
        // byte offset of every char boundary, plus the end of the line
        let bounds: Vec<usize> = line
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(line.len()))
            .collect();
        let n_chars = bounds.len() - 1;

        if n_chars < self.line_width() {
            return Err(Error::loading(
                source_id,
                format!("line {} has {} characters, expected at least {}", line_no, n_chars, self.line_width()),
            ));
        }

        Ok(self
            .spans
            .iter()
            .map(|span| &line[bounds[span.start]..bounds[span.end]])
            .collect())
    }

    /// Load records from any reader. `source_id` names the source in errors.
    pub fn load_from_reader<R: Read>(&self, reader: R, source_id: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|e| Error::loading(source_id, e))?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let values = self.cut(line, i + 1, source_id)?;
            let record = self
                .schema
                .new_record(&values)
                .map_err(|e| Error::loading(source_id, e))?;
            records.push(record);
        }

        debug!("Loaded {} records from {}", records.len(), source_id);
        Ok(records)
    }
}

impl RecordLoader for FixedWidthLoader {
    fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    fn load(&self, source: &str) -> Result<Vec<Record>> {
        let file = File::open(source).map_err(|e| Error::loading(source, e))?;
        self.load_from_reader(file, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn loader() -> FixedWidthLoader {
        let schema = RecordSchema::new(&["zip", "first", "age"], &["zip"], None, None).unwrap();
        FixedWidthLoader::new(
            &schema,
            vec![ColumnSpan::new(0, 5), ColumnSpan::new(5, 13), ColumnSpan::new(13, 16)],
        )
        .unwrap()
    }

    #[test]
    fn test_cut_columns() {
        let data = "12345john     42 \n\n54321zoë       7\n";
        let records = loader().load_from_reader(data.as_bytes(), "inline").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].blocking_key(), "12345");
        assert_eq!(records[0].field(0).as_str(), "john    ");
        assert_eq!(records[0].field(1).as_int().unwrap(), 42);
        assert_eq!(records[1].field(0).as_str(), "zoë     ");
        assert_eq!(records[1].field(1).as_int().unwrap(), 7);
    }

    #[test]
    fn test_short_line_names_the_line() {
        let data = "12345john     42\n12345jo\n";
        match loader().load_from_reader(data.as_bytes(), "people.txt") {
            Err(Error::RecordLoading { source_id, cause }) => {
                assert_eq!(source_id, "people.txt");
                assert!(cause.to_string().contains("line 2"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_span_validation() {
        let schema = RecordSchema::new(&["zip", "first"], &["zip"], None, None).unwrap();
        assert!(FixedWidthLoader::new(&schema, vec![ColumnSpan::new(0, 5)]).is_err());
        assert!(FixedWidthLoader::new(&schema, vec![ColumnSpan::new(0, 5), ColumnSpan::new(9, 6)]).is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "11111ann     30 ").unwrap();
        file.flush().unwrap();

        let records = loader().load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field(1).as_int().unwrap(), 30);
    }
}
