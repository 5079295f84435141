//! Linkage configuration
//!
//! A [`LinkageConfig`] is read from JSON and describes both record sources,
//! the field comparisons, how the model is trained and how matches are
//! written.

use chrono::Datelike;
use fsmatch_core::{Error, FieldComparator, RecordSchema, Result};
use fsmatch_io::{ColumnSpan, DelimitedOptions};
use fsmatch_matcher::MatchConfig;
use fsmatch_model::EmConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// File layout of a record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    Delimited {
        #[serde(flatten)]
        options: DelimitedOptions,
    },
    FixedWidth {
        /// One span per column, in column order.
        spans: Vec<ColumnSpan>,
    },
}

impl Default for SourceFormat {
    fn default() -> Self {
        SourceFormat::Delimited {
            options: DelimitedOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: String,
    #[serde(default)]
    pub format: SourceFormat,
    pub columns: Vec<String>,
    pub blocking_fields: Vec<String>,
    #[serde(default)]
    pub sequence_field: Option<String>,
    #[serde(default)]
    pub id_field: Option<String>,
}

impl SourceConfig {
    pub fn schema(&self) -> Result<Arc<RecordSchema>> {
        RecordSchema::new(
            &self.columns,
            &self.blocking_fields,
            self.sequence_field.as_deref(),
            self.id_field.as_deref(),
        )
    }
}

/// Comparators with the default parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardComparator {
    Exact,
    Prorated,
    /// Prorated on age relative to the current year.
    Year,
    Fuzzy,
}

/// Either a standard comparator by name or a fully specified one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparatorSpec {
    Standard(StandardComparator),
    Custom(FieldComparator),
}

impl ComparatorSpec {
    pub fn resolve(&self) -> FieldComparator {
        match self {
            ComparatorSpec::Standard(StandardComparator::Exact) => FieldComparator::exact(),
            ComparatorSpec::Standard(StandardComparator::Prorated) => FieldComparator::standard_prorated(),
            ComparatorSpec::Standard(StandardComparator::Year) => {
                FieldComparator::standard_year(chrono::Local::now().year())
            }
            ComparatorSpec::Standard(StandardComparator::Fuzzy) => FieldComparator::standard_fuzzy(),
            ComparatorSpec::Custom(cmp) => cmp.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Field of the left source.
    pub field: String,
    /// Field of the right source, if it is named differently.
    #[serde(default)]
    pub right_field: Option<String>,
    pub comparator: ComparatorSpec,
}

impl ComparisonConfig {
    pub fn right_field(&self) -> &str {
        self.right_field.as_deref().unwrap_or(&self.field)
    }
}

/// How the mixture model is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrainingConfig {
    /// EM over all blocked pairs.
    Unsupervised {
        #[serde(default = "default_classes")]
        n_classes: usize,
    },
    /// Closed-form estimate; pairs with equal ids are true matches.
    Supervised,
    /// EM over all pairs blended with id-labeled pairs.
    SemiSupervised { lambda: f64 },
}

fn default_classes() -> usize {
    2
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig::Unsupervised {
            n_classes: default_classes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageConfig {
    /// The blocked collection; side A of every comparison.
    pub left: SourceConfig,
    pub right: SourceConfig,
    pub comparisons: Vec<ComparisonConfig>,
    #[serde(default = "default_handle_blanks")]
    pub handle_blanks: bool,
    #[serde(default)]
    pub training: TrainingConfig,
    /// Seed for EM initialization; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub em: EmConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    /// Pairs scoring below this are not written.
    #[serde(default)]
    pub cutoff: f64,
}

fn default_handle_blanks() -> bool {
    true
}

impl LinkageConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.comparisons.is_empty() {
            return Err(Error::InvalidConfig("at least one comparison is required".into()));
        }
        if !self.cutoff.is_finite() {
            return Err(Error::InvalidConfig(format!("cutoff must be finite, got {}", self.cutoff)));
        }
        self.em.validate()?;
        self.matching.validate()?;

        match self.training {
            TrainingConfig::Unsupervised { n_classes } if n_classes < 2 => Err(Error::InvalidConfig(format!(
                "unsupervised training needs at least two classes, got {}",
                n_classes
            ))),
            TrainingConfig::SemiSupervised { lambda } if !(0.0..=1.0).contains(&lambda) => Err(
                Error::InvalidConfig(format!("lambda must be in [0, 1], got {}", lambda)),
            ),
            TrainingConfig::Supervised | TrainingConfig::SemiSupervised { .. }
                if self.left.id_field.is_none() || self.right.id_field.is_none() =>
            {
                Err(Error::InvalidConfig(
                    "supervised training needs an id field on both sources".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "left": {
            "path": "left.csv",
            "columns": ["zip", "first", "last", "birth_year", "id"],
            "blocking_fields": ["zip"],
            "id_field": "id"
        },
        "right": {
            "path": "right.txt",
            "format": {"type": "fixed_width", "spans": [
                {"start": 0, "end": 5}, {"start": 5, "end": 15},
                {"start": 15, "end": 25}, {"start": 25, "end": 29}, {"start": 29, "end": 33}
            ]},
            "columns": ["zip", "given", "last", "birth_year", "id"],
            "blocking_fields": ["zip"],
            "id_field": "id"
        },
        "comparisons": [
            {"field": "first", "right_field": "given", "comparator": "fuzzy"},
            {"field": "last", "comparator": {"type": "fuzzy_string", "levels": [0.9, 0.8]}},
            {"field": "birth_year", "comparator": "year"}
        ],
        "training": {"mode": "semi_supervised", "lambda": 0.25},
        "seed": 7,
        "em": {"max_iterations": 500},
        "cutoff": 2.5
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = LinkageConfig::from_json(CONFIG).unwrap();

        assert_eq!(config.left.format, SourceFormat::default());
        assert!(matches!(config.right.format, SourceFormat::FixedWidth { ref spans } if spans.len() == 5));
        assert_eq!(config.comparisons[0].right_field(), "given");
        assert_eq!(config.comparisons[1].right_field(), "last");
        assert_eq!(config.comparisons[1].comparator.resolve().n_levels(), 3);
        assert_eq!(config.training, TrainingConfig::SemiSupervised { lambda: 0.25 });
        assert_eq!(config.em.max_iterations, 500);
        assert_eq!(config.em.restarts, 1);
        assert_eq!(config.matching, MatchConfig::default());
        assert!(config.handle_blanks);
        assert_eq!(config.seed, Some(7));

        let schema = config.right.schema().unwrap();
        assert_eq!(schema.fields(), &["given", "last", "birth_year"]);
    }

    #[test]
    fn test_standard_comparators() {
        let year = ComparatorSpec::Standard(StandardComparator::Year).resolve();
        match year {
            FieldComparator::YearAdjusted { base_year, .. } => {
                assert_eq!(base_year, chrono::Local::now().year())
            }
            other => panic!("unexpected comparator {:?}", other),
        }
        assert_eq!(
            ComparatorSpec::Standard(StandardComparator::Exact).resolve(),
            FieldComparator::Exact
        );
    }

    #[test]
    fn test_delimited_options_flatten() {
        let json = r#"{"type": "delimited", "delimiter": ";", "has_header": true}"#;
        let format: SourceFormat = serde_json::from_str(json).unwrap();
        match format {
            SourceFormat::Delimited { options } => {
                assert_eq!(options.delimiter, ';');
                assert!(options.has_header);
                assert_eq!(options.blank_indicator.as_deref(), Some("NA"));
            }
            other => panic!("unexpected format {:?}", other),
        }
    }

    #[test]
    fn test_validation() {
        let mut config = LinkageConfig::from_json(CONFIG).unwrap();

        config.training = TrainingConfig::SemiSupervised { lambda: 2.0 };
        assert!(config.validate().is_err());

        config.training = TrainingConfig::Unsupervised { n_classes: 1 };
        assert!(config.validate().is_err());

        config.training = TrainingConfig::Supervised;
        config.right.id_field = None;
        assert!(config.validate().is_err());

        config.training = TrainingConfig::default();
        assert!(config.validate().is_ok());

        config.matching.work_threshold = 1;
        assert!(config.validate().is_err());

        assert!(matches!(
            LinkageConfig::from_json("{\"left\": 3}"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
