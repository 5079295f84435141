use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by loading and output errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No such column ({role}): {name}")]
    UnknownColumn { role: &'static str, name: String },

    #[error("No such field: {0}")]
    UnknownField(String),

    #[error("Wrong number of columns to construct a record: expected {expected}, got {actual}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("Field value {value:?} is not a valid {kind}")]
    NotNumeric { value: String, kind: &'static str },

    #[error("Invalid comparator: {0}")]
    InvalidComparator(String),

    #[error("Invalid model arguments: {0}")]
    InvalidModel(String),

    #[error("All tallies must share the same record comparator")]
    ComparatorMismatch,

    #[error("Records must come from schemas with an id field")]
    MissingId,

    #[error("Class {class} received no expected mass during estimation")]
    DegenerateClass { class: usize },

    #[error("Pattern {pattern} has zero likelihood under every class")]
    DegeneratePattern { pattern: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load records from {source_id}: {cause}")]
    RecordLoading {
        source_id: String,
        #[source]
        cause: BoxError,
    },

    #[error("Output error: {0}")]
    Output(#[source] BoxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a loader failure with the source it came from.
    pub fn loading<E>(source_id: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::RecordLoading {
            source_id: source_id.into(),
            cause: cause.into(),
        }
    }
}
