//! # fsmatch
//!
//! Probabilistic record linkage in the Fellegi-Sunter tradition.
//!
//! fsmatch compares pairs of records that share a blocking key, reduces every
//! pair to a discrete comparison pattern, estimates a mixture model over those
//! patterns and ranks candidate pairs by their log-likelihood ratio.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! cargo install fsmatch
//! fsmatch linkage.json --output matches.csv
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use fsmatch::prelude::*;
//!
//! let schema = RecordSchema::new(&["zip", "first", "last"], &["zip"], None, None).unwrap();
//! let cmp = RecordComparator::builder(&schema, &schema)
//!     .compare("first", FieldComparator::exact()).unwrap()
//!     .compare("last", FieldComparator::exact()).unwrap()
//!     .handle_blanks(false)
//!     .build()
//!     .unwrap();
//!
//! // Class 0 is the match class.
//! let weights = vec![
//!     vec![vec![0.1, 0.9], vec![0.1, 0.9]],
//!     vec![vec![0.9, 0.1], vec![0.9, 0.1]],
//! ];
//! let model = MixtureModel::new(&cmp, weights, 1).unwrap();
//!
//! let left = vec![schema.new_record(&["02139", "ann", "lee"]).unwrap()];
//! let right = vec![
//!     schema.new_record(&["02139", "ann", "lee"]).unwrap(),
//!     schema.new_record(&["02139", "bob", "lee"]).unwrap(),
//! ];
//! let block = BlockIndex::new(&left);
//! let matcher = Matcher::new(&model, MatchConfig::default()).unwrap();
//! let (scores, _) = matcher.match_parallel(&block, &right).unwrap();
//! assert_eq!(scores.len(), 2);
//! // Ascending by score; the exact duplicate ranks last.
//! assert_eq!(scores.iter().last().unwrap().b.field(0).as_str(), "ann");
//! ```
//!
//! ## Crate Structure
//!
//! - [`fsmatch-core`](https://docs.rs/fsmatch-core) - Records, field comparators, patterns, blocking
//! - [`fsmatch-model`](https://docs.rs/fsmatch-model) - Pattern tallies, mixture models and EM learners
//! - [`fsmatch-matcher`](https://docs.rs/fsmatch-matcher) - Parallel scoring and score maps
//! - [`fsmatch-io`](https://docs.rs/fsmatch-io) - Delimited and fixed-width loaders, CSV output

pub mod config;
pub mod pipeline;

// Re-export core types
pub use fsmatch_core::{
    Adjustments, BlockIndex, Error, Field, FieldComparator, MemoryLoader, Pattern, Record,
    RecordComparator, RecordLoader, RecordSchema, Result,
};

// Re-export models
pub use fsmatch_model::{
    fit_semisupervised, fit_supervised, fit_unsupervised, tally, tally_truth, EmConfig, Fit,
    FitReport, MixtureModel, SemiSupervisedLearner, SupervisedLearner, Tally, UnsupervisedLearner,
};

// Re-export matching
pub use fsmatch_matcher::{MatchConfig, MatchRecord, MatchSink, MatchStats, Matcher, MemorySink, ScoreMap};

// Re-export IO
pub use fsmatch_io::{CsvSink, DelimitedLoader, DelimitedOptions, FixedWidthLoader};

pub use config::LinkageConfig;
pub use pipeline::{Pipeline, PipelineReport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BlockIndex, Error, FieldComparator, Fit, LinkageConfig, MatchConfig, MatchSink, Matcher,
        MixtureModel, Pipeline, Record, RecordComparator, RecordLoader, RecordSchema, Result,
        ScoreMap, Tally,
    };
}
