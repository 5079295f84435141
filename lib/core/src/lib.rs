//! # fsmatch Core
//!
//! Core data model for Fellegi-Sunter record linkage.
//!
//! This crate provides the building blocks every other fsmatch crate uses:
//!
//! - [`Field`] - A text value with cached numeric interpretations
//! - [`RecordSchema`] / [`Record`] - Column layout and the records built from it
//! - [`FieldComparator`] - Reduces two field values to an agreement level
//! - [`RecordComparator`] - Turns a record pair into an agreement pattern index
//! - [`BlockIndex`] - Groups records by blocking key
//! - [`RecordLoader`] - Source-agnostic record loading
//!
//! ## Example
//!
//! ```rust
//! use fsmatch_core::{FieldComparator, RecordComparator, RecordSchema};
//!
//! let schema = RecordSchema::new(&["zip", "first", "last"], &["zip"], None, None).unwrap();
//! let comparator = RecordComparator::builder(&schema, &schema)
//!     .compare("first", FieldComparator::standard_fuzzy()).unwrap()
//!     .compare("last", FieldComparator::standard_fuzzy()).unwrap()
//!     .build()
//!     .unwrap();
//!
//! let a = schema.new_record(&["12345", "john", "smith"]).unwrap();
//! let b = schema.new_record(&["12345", "jon", "smith"]).unwrap();
//! let index = comparator.compare_index(&a, &b).unwrap();
//! assert!(index < comparator.n_patterns());
//! ```

pub mod blocking;
pub mod comparator;
pub mod error;
pub mod field;
pub mod fuzzy;
pub mod loader;
pub mod record;

pub use blocking::BlockIndex;
pub use comparator::{FieldComparator, Pattern, RecordComparator, RecordComparatorBuilder};
pub use error::{BoxError, Error, Result};
pub use field::Field;
pub use fuzzy::Adjustments;
pub use loader::{MemoryLoader, RecordLoader};
pub use record::{Record, RecordSchema};
