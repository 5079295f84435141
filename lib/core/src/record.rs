//! Records and the schema that builds them
//!
//! Throughout this crate "column" refers to a column of incoming data (from
//! a file, a database, ...) and "field" refers to a column that takes part in
//! record comparison. Blocking, sequence and id columns are not fields.

use crate::{Error, Field, Result};
use ahash::AHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Describes how to build a [`Record`] from an array of column values.
#[derive(Debug)]
pub struct RecordSchema {
    columns: Vec<String>,
    fields: Vec<String>,
    blocking_fields: Vec<String>,
    sequence_field: Option<String>,
    id_field: Option<String>,
    column_index: AHashMap<String, usize>,
    field_index: AHashMap<String, usize>,
    next_sequence: AtomicU64,
}

impl RecordSchema {
    /// Create a schema. Columns that are not blocking, sequence or id
    /// columns become comparison fields, in column order.
    ///
    /// # Errors
    /// Returns [`Error::UnknownColumn`] if a blocking, sequence or id name is
    /// not one of `columns`.
    pub fn new<S: AsRef<str>>(
        columns: &[S],
        blocking_fields: &[S],
        sequence_field: Option<&str>,
        id_field: Option<&str>,
    ) -> Result<Arc<Self>> {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let blocking_fields: Vec<String> = blocking_fields
            .iter()
            .map(|c| c.as_ref().to_string())
            .collect();

        let column_index: AHashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let require = |role: &'static str, name: &str| {
            if column_index.contains_key(name) {
                Ok(())
            } else {
                Err(Error::UnknownColumn { role, name: name.to_string() })
            }
        };

        for name in &blocking_fields {
            require("blocking", name)?;
        }
        if let Some(name) = sequence_field {
            require("sequence", name)?;
        }
        if let Some(name) = id_field {
            require("id", name)?;
        }

        let fields: Vec<String> = columns
            .iter()
            .filter(|name: &&String| {
                !blocking_fields.contains(*name)
                    && sequence_field != Some(name.as_str())
                    && id_field != Some(name.as_str())
            })
            .cloned()
            .collect();

        let field_index = fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Arc::new(Self {
            columns,
            fields,
            blocking_fields,
            sequence_field: sequence_field.map(str::to_string),
            id_field: id_field.map(str::to_string),
            column_index,
            field_index,
            next_sequence: AtomicU64::new(0),
        }))
    }

    /// Build a record from raw column values given in column order.
    ///
    /// The blocking key is the concatenation of the blocking columns in
    /// declared order. Without a sequence column, records are numbered by a
    /// per-schema counter.
    pub fn new_record<S: AsRef<str>>(self: &Arc<Self>, values: &[S]) -> Result<Record> {
        if values.len() != self.columns.len() {
            return Err(Error::ColumnCount {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let value = |name: &str| values[self.column_index[name]].as_ref();

        let blocking_key: String = self.blocking_fields.iter().map(|name| value(name)).collect();

        let id = self
            .id_field
            .as_deref()
            .map(|name| value(name).to_string())
            .unwrap_or_default();

        let sequence = match self.sequence_field.as_deref() {
            Some(name) => value(name).to_string(),
            None => self.next_sequence.fetch_add(1, Ordering::Relaxed).to_string(),
        };

        let fields = self.fields.iter().map(|name| Field::new(value(name))).collect();

        Ok(Record {
            schema: Arc::clone(self),
            blocking_key,
            id,
            sequence,
            fields,
        })
    }

    /// Index of a comparison field within a [`Record`].
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.field_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Index of a column within the incoming column values.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.column_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownColumn { role: "column", name: name.to_string() })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Comparison field names in field-index order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn blocking_fields(&self) -> &[String] {
        &self.blocking_fields
    }

    pub fn has_id(&self) -> bool {
        self.id_field.is_some()
    }
}

/// An immutable tuple of fields with a blocking key, id and sequence value.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    blocking_key: String,
    id: String,
    sequence: String,
    fields: Vec<Field>,
}

impl Record {
    #[inline]
    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn blocking_key(&self) -> &str {
        &self.blocking_key
    }

    /// The id value, or the empty string if the schema has no id column.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.blocking_key == other.blocking_key
            && self.id == other.id
            && self.fields == other.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key: {}, ", self.blocking_key)?;
        if self.schema.has_id() {
            write!(f, "ID: {}, ", self.id)?;
        }
        let values: Vec<&str> = self.fields.iter().map(Field::as_str).collect();
        write!(f, "Fields: [{}]", values.join(", "))
    }
}
