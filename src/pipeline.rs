//! End-to-end linkage: load, count, fit, match, write.

use crate::config::{LinkageConfig, SourceConfig, SourceFormat, TrainingConfig};
use fsmatch_core::{BlockIndex, Record, RecordComparator, RecordLoader, Result};
use fsmatch_io::{DelimitedLoader, FixedWidthLoader};
use fsmatch_matcher::{MatchSink, MatchStats, Matcher};
use fsmatch_model::{
    fit_semisupervised, fit_supervised, fit_unsupervised, tally, tally_truth, FitReport, MixtureModel, Tally,
};
use std::sync::Arc;
use tracing::info;

/// What a pipeline run did.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub left_records: usize,
    pub right_records: usize,
    /// Blocked pairs counted for training.
    pub pairs: u64,
    pub distinct_patterns: usize,
    /// Absent for supervised training.
    pub fit: Option<FitReport>,
    pub matching: MatchStats,
    pub written: usize,
}

/// A configured linkage run.
pub struct Pipeline {
    config: LinkageConfig,
    left: Box<dyn RecordLoader + Send + Sync>,
    right: Box<dyn RecordLoader + Send + Sync>,
    comparator: Arc<RecordComparator>,
}

fn loader(source: &SourceConfig) -> Result<Box<dyn RecordLoader + Send + Sync>> {
    let schema = source.schema()?;
    Ok(match &source.format {
        SourceFormat::Delimited { options } => Box::new(DelimitedLoader::new(&schema, options.clone())?),
        SourceFormat::FixedWidth { spans } => Box::new(FixedWidthLoader::new(&schema, spans.clone())?),
    })
}

impl Pipeline {
    /// Build schemas, loaders and the record comparator.
    pub fn from_config(config: LinkageConfig) -> Result<Self> {
        config.validate()?;
        let left = loader(&config.left)?;
        let right = loader(&config.right)?;

        let mut builder = RecordComparator::builder(left.schema(), right.schema());
        for comparison in &config.comparisons {
            builder = builder.compare_fields(
                &comparison.field,
                comparison.right_field(),
                comparison.comparator.resolve(),
            )?;
        }
        let comparator = builder.handle_blanks(config.handle_blanks).build()?;

        Ok(Self {
            config,
            left,
            right,
            comparator,
        })
    }

    pub fn config(&self) -> &LinkageConfig {
        &self.config
    }

    pub fn comparator(&self) -> &Arc<RecordComparator> {
        &self.comparator
    }

    /// Load both sources.
    pub fn load(&self) -> Result<(Vec<Record>, Vec<Record>)> {
        let left = self.left.load(&self.config.left.path)?;
        let right = self.right.load(&self.config.right.path)?;
        info!(
            "Loaded {} left records from {} and {} right records from {}",
            left.len(),
            self.config.left.path,
            right.len(),
            self.config.right.path
        );
        Ok((left, right))
    }

    /// Estimate the model configured for this run. `counts` is the tally of
    /// all blocked pairs of `left` and `right`.
    pub fn train(&self, counts: &Tally, left: &[Record], right: &[Record]) -> Result<(MixtureModel, Option<FitReport>)> {
        let config = &self.config;
        match config.training {
            TrainingConfig::Unsupervised { n_classes } => {
                let fit = fit_unsupervised(counts, n_classes, config.seed, config.em)?;
                Ok((fit.model, Some(fit.report)))
            }
            TrainingConfig::Supervised => {
                let (matches, nonmatches) = tally_truth(&self.comparator, left, right)?;
                Ok((fit_supervised(&matches, &nonmatches)?, None))
            }
            TrainingConfig::SemiSupervised { lambda } => {
                let (matches, nonmatches) = tally_truth(&self.comparator, left, right)?;
                let fit = fit_semisupervised(counts, &matches, &nonmatches, lambda, config.seed, config.em)?;
                Ok((fit.model, Some(fit.report)))
            }
        }
    }

    /// Load, fit, match in parallel and write every pair scoring at least
    /// the configured cutoff to `sink`.
    pub fn run<S: MatchSink + ?Sized>(&self, sink: &mut S) -> Result<PipelineReport> {
        let (left, right) = self.load()?;

        let counts = tally(&self.comparator, &left, &right)?;
        let (model, fit) = self.train(&counts, &left, &right)?;
        info!("Fitted model:\n{}", model);

        let block = BlockIndex::new(&left);
        let matcher = Matcher::new(&model, self.config.matching)?;
        let (scores, matching) = matcher.match_parallel(&block, &right)?;

        let written = scores.write_matches(sink, self.config.cutoff)?;
        info!("Wrote {} pairs scoring at least {}", written, self.config.cutoff);

        Ok(PipelineReport {
            left_records: left.len(),
            right_records: right.len(),
            pairs: counts.total(),
            distinct_patterns: counts.len(),
            fit,
            matching,
            written,
        })
    }
}
