//! # fsmatch IO
//!
//! File adapters for fsmatch: record loaders for delimited and fixed-width
//! text files, and a CSV match sink.

pub mod csv_sink;
pub mod delimited;
pub mod fixed_width;

pub use csv_sink::CsvSink;
pub use delimited::{DelimitedLoader, DelimitedOptions, BLANK_INDICATOR};
pub use fixed_width::{ColumnSpan, FixedWidthLoader};
