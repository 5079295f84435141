//! # fsmatch Model
//!
//! Pattern counting and mixture-model estimation for Fellegi-Sunter record
//! linkage.
//!
//! - [`Tally`] - Sparse agreement pattern counts over blocked pairs
//! - [`UnsupervisedLearner`] - EM over unlabeled counts
//! - [`SupervisedLearner`] - Closed-form estimates from labeled counts
//! - [`SemiSupervisedLearner`] - EM blending labeled and unlabeled counts
//! - [`MixtureModel`] - Log-likelihood ratio scoring of record pairs
//!
//! ## Example
//!
//! ```rust
//! use fsmatch_core::{FieldComparator, RecordComparator, RecordSchema};
//! use fsmatch_model::{tally_truth, SupervisedLearner};
//!
//! let schema = RecordSchema::new(&["zip", "name", "id"], &["zip"], None, Some("id")).unwrap();
//! let cmp = RecordComparator::builder(&schema, &schema)
//!     .compare("name", FieldComparator::standard_fuzzy()).unwrap()
//!     .build()
//!     .unwrap();
//!
//! let left = vec![
//!     schema.new_record(&["1", "smith", "a"]).unwrap(),
//!     schema.new_record(&["1", "jones", "b"]).unwrap(),
//! ];
//! let right = vec![
//!     schema.new_record(&["1", "smyth", "a"]).unwrap(),
//!     schema.new_record(&["1", "jones", "b"]).unwrap(),
//! ];
//!
//! let (matches, nonmatches) = tally_truth(&cmp, &left, &right).unwrap();
//! let model = SupervisedLearner::new(1).fit(&[&matches, &nonmatches]).unwrap();
//! assert_eq!(model.n_classes(), 2);
//! ```

pub mod em;
pub mod fit;
pub mod mixture;
pub mod observer;
pub mod semisupervised;
pub mod simplex;
pub mod supervised;
pub mod tally;
pub mod unsupervised;

pub use em::{EmConfig, Fit, FitReport, Weights};
pub use fit::{fit_semisupervised, fit_supervised, fit_unsupervised, rng_from_seed};
pub use mixture::MixtureModel;
pub use observer::{FitObserver, NoopObserver, TracingObserver};
pub use semisupervised::SemiSupervisedLearner;
pub use simplex::partition_one;
pub use supervised::SupervisedLearner;
pub use tally::{tally, tally_truth, IncrementalTally, Tally};
pub use unsupervised::UnsupervisedLearner;
