use fsmatch_core::{Error, Record, RecordComparator, Result};
use fsmatch_matcher::MatchSink;
use std::io::Write;
use std::sync::Arc;

/// Writes matches as CSV: a header `score,a.<field>,b.<field>,...` then one
/// row per pair with the score and the compared values of both records,
/// interleaved per comparison.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    comparator: Arc<RecordComparator>,
    rows: usize,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, comparator: &Arc<RecordComparator>) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            comparator: Arc::clone(comparator),
            rows: 0,
        }
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Output(Box::new(e.into_error())))
    }
}

impl<W: Write> MatchSink for CsvSink<W> {
    fn begin(&mut self, field_names: &[(&str, &str)]) -> Result<()> {
        let mut header = Vec::with_capacity(1 + 2 * field_names.len());
        header.push("score".to_string());
        for (a, b) in field_names {
            header.push(format!("a.{}", a));
            header.push(format!("b.{}", b));
        }
        self.writer
            .write_record(&header)
            .map_err(|e| Error::Output(Box::new(e)))
    }

    fn accept(&mut self, a: &Record, b: &Record, score: f64) -> Result<()> {
        let values_a = self.comparator.comparison_fields_a(a);
        let values_b = self.comparator.comparison_fields_b(b);

        let score = score.to_string();
        let mut row = Vec::with_capacity(1 + values_a.len() * 2);
        row.push(score.as_str());
        for (va, vb) in values_a.into_iter().zip(values_b) {
            row.push(va);
            row.push(vb);
        }

        self.writer
            .write_record(&row)
            .map_err(|e| Error::Output(Box::new(e)))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmatch_core::{FieldComparator, RecordSchema};

    #[test]
    fn test_header_and_interleaved_rows() {
        let schema = RecordSchema::new(&["zip", "first", "last"], &["zip"], None, None).unwrap();
        let cmp = RecordComparator::builder(&schema, &schema)
            .compare("last", FieldComparator::exact())
            .unwrap()
            .compare("first", FieldComparator::exact())
            .unwrap()
            .build()
            .unwrap();

        let a = schema.new_record(&["1", "ann", "lee"]).unwrap();
        let b = schema.new_record(&["1", "anne", "lee, jr"]).unwrap();

        let mut sink = CsvSink::new(Vec::new(), &cmp);
        sink.begin(&cmp.field_names()).unwrap();
        sink.accept(&a, &b, 2.5).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.rows(), 1);

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out, "score,a.last,b.last,a.first,b.first\n2.5,lee,\"lee, jr\",ann,anne\n");
    }
}
