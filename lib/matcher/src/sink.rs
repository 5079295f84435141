use fsmatch_core::{Record, Result};

/// Receives matched pairs, highest score first.
pub trait MatchSink {
    /// Called once before any pair with the compared field names as
    /// `(side A, side B)` pairs.
    fn begin(&mut self, field_names: &[(&str, &str)]) -> Result<()>;

    /// Called for every pair meeting the cutoff.
    fn accept(&mut self, a: &Record, b: &Record, score: f64) -> Result<()>;

    /// Called once after the last pair.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects pairs in memory as displayed records.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub header: Vec<(String, String)>,
    /// `(score, record a, record b)`
    pub rows: Vec<(f64, String, String)>,
    pub finished: bool,
}

impl MatchSink for MemorySink {
    fn begin(&mut self, field_names: &[(&str, &str)]) -> Result<()> {
        self.header = field_names
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        Ok(())
    }

    fn accept(&mut self, a: &Record, b: &Record, score: f64) -> Result<()> {
        self.rows.push((score, a.to_string(), b.to_string()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
