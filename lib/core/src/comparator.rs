//! Field and record comparators
//!
//! A [`FieldComparator`] reduces two field values to a discrete agreement
//! level. A [`RecordComparator`] applies an ordered list of field
//! comparators to a pair of records and encodes the resulting agreement
//! pattern as a single integer in a mixed-radix pattern space.

use crate::fuzzy::{self, Adjustments};
use crate::{Error, Field, Record, RecordSchema, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::sync::Arc;

/// An agreement pattern: one level per comparator.
pub type Pattern = SmallVec<[usize; 8]>;

/// Default prorated slopes.
pub const PRORATED_SLOPES: [f64; 3] = [0.1, 0.2, 0.4];
/// Default prorated intercepts.
pub const PRORATED_INTERCEPTS: [f64; 3] = [1.1, 1.0, 1.0];
/// Default fuzzy string thresholds, strongest first.
pub const FUZZY_LEVELS: [f64; 3] = [0.92, 0.86, 0.81];

/// Compares two field values and returns an agreement level in
/// `0..n_levels()`, where higher levels mean stronger agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldComparator {
    /// String equality: level 1 if equal, 0 otherwise.
    Exact,
    /// Numeric difference compared to thresholds that scale with the
    /// smaller of the two values.
    Prorated {
        slopes: Vec<f64>,
        intercepts: Vec<f64>,
    },
    /// Absolute numeric difference compared to fixed, increasing thresholds.
    AbsoluteDifference { thresholds: Vec<f64> },
    /// Prorated comparison of `base_year - value`, for birth years.
    YearAdjusted {
        base_year: i32,
        slopes: Vec<f64>,
        intercepts: Vec<f64>,
    },
    /// Fuzzy string similarity compared to descending thresholds.
    FuzzyString {
        levels: Vec<f64>,
        #[serde(default)]
        adjustments: Adjustments,
    },
}

impl FieldComparator {
    pub fn exact() -> Self {
        FieldComparator::Exact
    }

    /// # Errors
    /// Fails if the slices are empty, differ in length, or the
    /// `(slope, intercept)` pairs are not strictly increasing.
    pub fn prorated(slopes: &[f64], intercepts: &[f64]) -> Result<Self> {
        let cmp = FieldComparator::Prorated {
            slopes: slopes.to_vec(),
            intercepts: intercepts.to_vec(),
        };
        cmp.validate()?;
        Ok(cmp)
    }

    /// # Errors
    /// Fails if `thresholds` is empty or not strictly increasing.
    pub fn absolute_difference(thresholds: &[f64]) -> Result<Self> {
        let cmp = FieldComparator::AbsoluteDifference {
            thresholds: thresholds.to_vec(),
        };
        cmp.validate()?;
        Ok(cmp)
    }

    pub fn year_adjusted(base_year: i32, slopes: &[f64], intercepts: &[f64]) -> Result<Self> {
        let cmp = FieldComparator::YearAdjusted {
            base_year,
            slopes: slopes.to_vec(),
            intercepts: intercepts.to_vec(),
        };
        cmp.validate()?;
        Ok(cmp)
    }

    /// # Errors
    /// Fails if `levels` is empty or not strictly decreasing.
    pub fn fuzzy(levels: &[f64]) -> Result<Self> {
        let cmp = FieldComparator::FuzzyString {
            levels: levels.to_vec(),
            adjustments: Adjustments::default(),
        };
        cmp.validate()?;
        Ok(cmp)
    }

    /// Prorated comparator with the default slopes and intercepts.
    pub fn standard_prorated() -> Self {
        FieldComparator::Prorated {
            slopes: PRORATED_SLOPES.to_vec(),
            intercepts: PRORATED_INTERCEPTS.to_vec(),
        }
    }

    /// Year comparator with the default slopes and intercepts.
    pub fn standard_year(base_year: i32) -> Self {
        FieldComparator::YearAdjusted {
            base_year,
            slopes: PRORATED_SLOPES.to_vec(),
            intercepts: PRORATED_INTERCEPTS.to_vec(),
        }
    }

    /// Fuzzy string comparator with the default thresholds.
    pub fn standard_fuzzy() -> Self {
        FieldComparator::FuzzyString {
            levels: FUZZY_LEVELS.to_vec(),
            adjustments: Adjustments::default(),
        }
    }

    /// Check parameters. Deserialized comparators are validated when they
    /// are bound into a [`RecordComparator`].
    pub fn validate(&self) -> Result<()> {
        match self {
            FieldComparator::Exact => Ok(()),
            FieldComparator::Prorated { slopes, intercepts }
            | FieldComparator::YearAdjusted { slopes, intercepts, .. } => {
                if slopes.is_empty() {
                    return Err(Error::InvalidComparator("prorated comparator needs at least one slope".into()));
                }
                if slopes.len() != intercepts.len() {
                    return Err(Error::InvalidComparator(format!(
                        "slopes and intercepts should have the same length ({} vs {})",
                        slopes.len(),
                        intercepts.len()
                    )));
                }
                let pairs: Vec<(f64, f64)> = slopes.iter().copied().zip(intercepts.iter().copied()).collect();
                if !pairs.windows(2).all(|w| w[0].partial_cmp(&w[1]) == Some(Ordering::Less)) {
                    return Err(Error::InvalidComparator(format!(
                        "(slope, intercept) pairs should be strictly increasing, got {:?}",
                        pairs
                    )));
                }
                Ok(())
            }
            FieldComparator::AbsoluteDifference { thresholds } => {
                if thresholds.is_empty() {
                    return Err(Error::InvalidComparator("difference comparator needs at least one threshold".into()));
                }
                if !thresholds.windows(2).all(|w| w[0] < w[1]) {
                    return Err(Error::InvalidComparator(format!(
                        "difference thresholds should be strictly increasing, got {:?}",
                        thresholds
                    )));
                }
                Ok(())
            }
            FieldComparator::FuzzyString { levels, .. } => {
                if levels.is_empty() {
                    return Err(Error::InvalidComparator("fuzzy comparator needs at least one level".into()));
                }
                if !levels.windows(2).all(|w| w[0] > w[1]) {
                    return Err(Error::InvalidComparator(format!(
                        "fuzzy levels should be strictly decreasing, got {:?}",
                        levels
                    )));
                }
                Ok(())
            }
        }
    }

    /// Number of agreement levels this comparator produces.
    pub fn n_levels(&self) -> usize {
        match self {
            FieldComparator::Exact => 2,
            FieldComparator::Prorated { slopes, .. } | FieldComparator::YearAdjusted { slopes, .. } => {
                slopes.len() + 1
            }
            FieldComparator::AbsoluteDifference { thresholds } => thresholds.len() + 1,
            FieldComparator::FuzzyString { levels, .. } => levels.len() + 1,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, FieldComparator::Exact)
    }

    /// Compare two fields.
    ///
    /// # Errors
    /// Numeric comparators fail if either value does not parse as a number.
    pub fn compare(&self, a: &Field, b: &Field) -> Result<usize> {
        match self {
            FieldComparator::Exact => Ok(usize::from(a.as_str() == b.as_str())),
            FieldComparator::Prorated { slopes, intercepts } => {
                Ok(prorated_level(slopes, intercepts, a.as_float()?, b.as_float()?))
            }
            FieldComparator::AbsoluteDifference { thresholds } => {
                let diff = (a.as_float()? - b.as_float()?).abs();
                Ok(thresholds
                    .iter()
                    .position(|&t| diff <= t)
                    .map_or(0, |i| thresholds.len() - i))
            }
            FieldComparator::YearAdjusted { base_year, slopes, intercepts } => {
                let base = f64::from(*base_year);
                Ok(prorated_level(slopes, intercepts, base - a.as_float()?, base - b.as_float()?))
            }
            FieldComparator::FuzzyString { levels, adjustments } => {
                let weight = fuzzy::similarity(a.as_str(), b.as_str(), *adjustments);
                Ok(threshold_level(levels, weight))
            }
        }
    }
}

/// Level for the first `i` with `|a - b| < slopes[i] * min(a, b) + intercepts[i]`.
pub fn prorated_level(slopes: &[f64], intercepts: &[f64], a: f64, b: f64) -> usize {
    let min = a.min(b);
    let diff = (a - b).abs();

    slopes
        .iter()
        .zip(intercepts)
        .position(|(slope, intercept)| diff < slope * min + intercept)
        .map_or(0, |i| slopes.len() - i)
}

/// Level for the first threshold in `levels` that `weight` exceeds.
fn threshold_level(levels: &[f64], weight: f64) -> usize {
    levels
        .iter()
        .position(|&level| weight > level)
        .map_or(0, |i| levels.len() - i)
}

#[derive(Debug, Clone)]
struct Binding {
    index_a: usize,
    index_b: usize,
    name_a: String,
    name_b: String,
    comparator: FieldComparator,
    exact: bool,
}

/// Builder for [`RecordComparator`].
#[derive(Debug)]
pub struct RecordComparatorBuilder {
    schema_a: Arc<RecordSchema>,
    schema_b: Arc<RecordSchema>,
    bindings: Vec<Binding>,
    handle_blanks: bool,
}

impl RecordComparatorBuilder {
    /// Compare the field `name` present in both schemas.
    pub fn compare(self, name: &str, comparator: FieldComparator) -> Result<Self> {
        self.compare_fields(name, name, comparator)
    }

    /// Compare field `name_a` of side A with field `name_b` of side B.
    pub fn compare_fields(mut self, name_a: &str, name_b: &str, comparator: FieldComparator) -> Result<Self> {
        comparator.validate()?;
        let index_a = self.schema_a.field_index(name_a)?;
        let index_b = self.schema_b.field_index(name_b)?;
        let exact = comparator.is_exact();

        self.bindings.push(Binding {
            index_a,
            index_b,
            name_a: name_a.to_string(),
            name_b: name_b.to_string(),
            comparator,
            exact,
        });
        Ok(self)
    }

    /// Reserve level 0 of every comparator for "either field blank".
    /// Enabled by default.
    pub fn handle_blanks(mut self, handle_blanks: bool) -> Self {
        self.handle_blanks = handle_blanks;
        self
    }

    pub fn build(self) -> Result<Arc<RecordComparator>> {
        RecordComparator::new(self.bindings, self.handle_blanks).map(Arc::new)
    }
}

/// A Fellegi-Sunter record comparator.
///
/// Side A is the "left" collection (the blocked one) and side B the "right"
/// collection in counting and matching.
#[derive(Debug, Clone)]
pub struct RecordComparator {
    bindings: Vec<Binding>,
    handle_blanks: bool,
    offset: usize,
    levels: Vec<usize>,
    steps: Vec<usize>,
    n_patterns: usize,
}

impl RecordComparator {
    pub fn builder(schema_a: &Arc<RecordSchema>, schema_b: &Arc<RecordSchema>) -> RecordComparatorBuilder {
        RecordComparatorBuilder {
            schema_a: Arc::clone(schema_a),
            schema_b: Arc::clone(schema_b),
            bindings: Vec::new(),
            handle_blanks: true,
        }
    }

    fn new(bindings: Vec<Binding>, handle_blanks: bool) -> Result<Self> {
        if bindings.is_empty() {
            return Err(Error::InvalidComparator("need at least one field comparison".into()));
        }

        let offset = usize::from(handle_blanks);
        let levels: Vec<usize> = bindings.iter().map(|b| b.comparator.n_levels() + offset).collect();

        let mut steps = Vec::with_capacity(levels.len());
        let mut n_patterns: usize = 1;
        for &n_levels in &levels {
            steps.push(n_patterns);
            n_patterns = n_patterns
                .checked_mul(n_levels)
                .ok_or_else(|| Error::InvalidComparator("pattern space is too large".into()))?;
        }

        Ok(Self {
            bindings,
            handle_blanks,
            offset,
            levels,
            steps,
            n_patterns,
        })
    }

    /// Compare two records and return their agreement pattern.
    pub fn compare(&self, a: &Record, b: &Record) -> Result<Pattern> {
        let mut pattern = Pattern::with_capacity(self.bindings.len());

        for binding in &self.bindings {
            let field_a = a.field(binding.index_a);
            let field_b = b.field(binding.index_b);

            let level = if field_a.is_blank() || field_b.is_blank() {
                0
            } else if field_a.as_str() == field_b.as_str() {
                binding.comparator.n_levels() - 1 + self.offset
            } else if binding.exact {
                self.offset
            } else {
                binding.comparator.compare(field_a, field_b)? + self.offset
            };

            pattern.push(level);
        }

        Ok(pattern)
    }

    /// Compare two records and return the index of their pattern.
    pub fn compare_index(&self, a: &Record, b: &Record) -> Result<usize> {
        self.compare(a, b).map(|pattern| self.pattern_index(&pattern))
    }

    /// Encode a pattern as an index in `0..n_patterns()`.
    ///
    /// # Panics
    /// Panics if the pattern has the wrong length or a level is out of range.
    pub fn pattern_index(&self, pattern: &[usize]) -> usize {
        assert_eq!(
            pattern.len(),
            self.levels.len(),
            "pattern has {} levels, comparator has {}",
            pattern.len(),
            self.levels.len()
        );

        pattern
            .iter()
            .zip(&self.levels)
            .zip(&self.steps)
            .map(|((&level, &n_levels), &step)| {
                assert!(level < n_levels, "level {} out of range 0..{}", level, n_levels);
                level * step
            })
            .sum()
    }

    /// Decode a pattern index.
    ///
    /// # Panics
    /// Panics if `index >= n_patterns()`.
    pub fn pattern_for(&self, index: usize) -> Pattern {
        assert!(
            index < self.n_patterns,
            "pattern index {} out of range 0..{}",
            index,
            self.n_patterns
        );

        let mut pattern: Pattern = SmallVec::from_elem(0, self.levels.len());
        let mut rest = index;
        for j in (0..self.levels.len()).rev() {
            pattern[j] = rest / self.steps[j];
            rest %= self.steps[j];
        }
        pattern
    }

    pub fn handle_blanks(&self) -> bool {
        self.handle_blanks
    }

    pub fn n_comparators(&self) -> usize {
        self.bindings.len()
    }

    pub fn n_patterns(&self) -> usize {
        self.n_patterns
    }

    /// Number of levels of comparator `i`, including the blank level.
    pub fn n_levels(&self, i: usize) -> usize {
        self.levels[i]
    }

    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn comparator(&self, i: usize) -> &FieldComparator {
        &self.bindings[i].comparator
    }

    /// Names of the compared fields as `(side A, side B)` pairs.
    pub fn field_names(&self) -> Vec<(&str, &str)> {
        self.bindings
            .iter()
            .map(|b| (b.name_a.as_str(), b.name_b.as_str()))
            .collect()
    }

    /// Values of `record` that side A of this comparator reads.
    pub fn comparison_fields_a<'r>(&self, record: &'r Record) -> Vec<&'r str> {
        self.bindings.iter().map(|b| record.field(b.index_a).as_str()).collect()
    }

    /// Values of `record` that side B of this comparator reads.
    pub fn comparison_fields_b<'r>(&self, record: &'r Record) -> Vec<&'r str> {
        self.bindings.iter().map(|b| record.field(b.index_b).as_str()).collect()
    }
}
