//! Delimited text files

use fsmatch_core::{Error, Record, RecordLoader, RecordSchema, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Values equal to this are read as blank.
pub const BLANK_INDICATOR: &str = "NA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedOptions {
    pub delimiter: char,
    /// Skip the first row. Column names always come from the schema.
    pub has_header: bool,
    /// Lines starting with this character are ignored.
    pub comment: Option<char>,
    pub blank_indicator: Option<String>,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: false,
            comment: Some('#'),
            blank_indicator: Some(BLANK_INDICATOR.to_string()),
        }
    }
}

fn ascii_byte(c: char, what: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::InvalidConfig(format!("{} must be an ASCII character, got {:?}", what, c)))
}

/// Loads records from delimited files with the `csv` crate. Empty lines
/// are skipped and fields may be quoted with `"`.
#[derive(Debug)]
pub struct DelimitedLoader {
    schema: Arc<RecordSchema>,
    options: DelimitedOptions,
    delimiter: u8,
    comment: Option<u8>,
}

impl DelimitedLoader {
    /// # Errors
    /// Fails if the delimiter or comment character is not ASCII.
    pub fn new(schema: &Arc<RecordSchema>, options: DelimitedOptions) -> Result<Self> {
        let delimiter = ascii_byte(options.delimiter, "delimiter")?;
        let comment = options.comment.map(|c| ascii_byte(c, "comment")).transpose()?;

        Ok(Self {
            schema: Arc::clone(schema),
            options,
            delimiter,
            comment,
        })
    }

    pub fn options(&self) -> &DelimitedOptions {
        &self.options
    }

    /// Load records from any reader. `source_id` names the source in errors.
    pub fn load_from_reader<R: Read>(&self, reader: R, source_id: &str) -> Result<Vec<Record>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.options.has_header)
            .comment(self.comment)
            .flexible(true)
            .from_reader(reader);

        let blank = self.options.blank_indicator.as_deref();
        let mut records = Vec::new();

        for row in csv_reader.records() {
            let row = row.map_err(|e| Error::loading(source_id, e))?;
            let values: Vec<&str> = row
                .iter()
                .map(|v| if Some(v) == blank { "" } else { v })
                .collect();
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

impl RecordLoader for DelimitedLoader {
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

    fn schema() -> Arc<RecordSchema> {
        RecordSchema::new(&["zip", "first", "last", "id"], &["zip"], None, Some("id")).unwrap()
    }

    #[test]
    fn test_load_with_comments_and_blanks() {
        let loader = DelimitedLoader::new(&schema(), DelimitedOptions::default()).unwrap();
        let data = "# people\n12345,john,smith,p1\n\n12345,NA,\"jones, jr\",p2\n";

        let records = loader.load_from_reader(data.as_bytes(), "inline").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(0).as_str(), "john");
        assert!(records[1].field(0).is_blank());
        assert_eq!(records[1].field(1).as_str(), "jones, jr");
        assert_eq!(records[1].id(), "p2");
    }

    #[test]
    fn test_header_and_delimiter() {
        let options = DelimitedOptions {
            delimiter: '|',
            has_header: true,
            blank_indicator: None,
            ..Default::default()
        };
        let loader = DelimitedLoader::new(&schema(), options).unwrap();
        let data = "zip|first|last|id\n1|NA|lee|a\n";

        let records = loader.load_from_reader(data.as_bytes(), "inline").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field(0).as_str(), "NA");
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1,ann,lee,a").unwrap();
        writeln!(file, "2,bob,kim,b").unwrap();
        file.flush().unwrap();

        let loader = DelimitedLoader::new(&schema(), DelimitedOptions::default()).unwrap();
        let records = loader.load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].blocking_key(), "2");
    }

    #[test]
    fn test_errors_name_the_source() {
        let loader = DelimitedLoader::new(&schema(), DelimitedOptions::default()).unwrap();

        match loader.load("/nonexistent/people.csv") {
            Err(Error::RecordLoading { source_id, .. }) => assert_eq!(source_id, "/nonexistent/people.csv"),
            other => panic!("unexpected result: {:?}", other),
        }

        let short = loader.load_from_reader("1,ann\n".as_bytes(), "short");
        assert!(matches!(short, Err(Error::RecordLoading { .. })));
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        let options = DelimitedOptions {
            delimiter: '§',
            ..Default::default()
        };
        assert!(matches!(
            DelimitedLoader::new(&schema(), options),
            Err(Error::InvalidConfig(_))
        ));
    }
}
