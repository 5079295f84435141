//! Mixture model scoring
//!
//! A [`MixtureModel`] holds, for every class, the distribution of agreement
//! levels of every comparator. The first `n_match_classes` classes are the
//! match classes; a pair is scored by the log-likelihood ratio of its
//! pattern under the match classes against the non-match classes.

use crate::em::Weights;
use crate::tally::Tally;
use fsmatch_core::{Error, Record, RecordComparator, Result};
use std::fmt;
use std::sync::Arc;

/// Rows must sum to one within this tolerance.
const ROW_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct MixtureModel {
    comparator: Arc<RecordComparator>,
    n_match_classes: usize,
    weights: Weights,
    log_weights: Weights,
    priors: Option<Vec<f64>>,
}

impl MixtureModel {
    /// Create a model from per-class weight tables.
    ///
    /// # Errors
    /// Fails unless there are at least two classes, `1 <= n_match_classes <
    /// n_classes`, every class has one row per comparator, every row has the
    /// comparator's level count and sums to one.
    pub fn new(comparator: &Arc<RecordComparator>, weights: Weights, n_match_classes: usize) -> Result<Self> {
        check_classes(weights.len(), n_match_classes)?;

        for (j, class) in weights.iter().enumerate() {
            if class.len() != comparator.n_comparators() {
                return Err(Error::InvalidModel(format!(
                    "class {} has {} weight rows, expected {}",
                    j,
                    class.len(),
                    comparator.n_comparators()
                )));
            }
            for (k, row) in class.iter().enumerate() {
                if row.len() != comparator.n_levels(k) {
                    return Err(Error::InvalidModel(format!(
                        "class {} comparator {} has {} levels, expected {}",
                        j,
                        k,
                        row.len(),
                        comparator.n_levels(k)
                    )));
                }
                let sum: f64 = row.iter().sum();
                if (sum - 1.0).abs() > ROW_TOLERANCE {
                    return Err(Error::InvalidModel(format!(
                        "class {} comparator {} weights sum to {}",
                        j, k, sum
                    )));
                }
            }
        }

        let log_weights = log_weights(&weights);

        Ok(Self {
            comparator: Arc::clone(comparator),
            n_match_classes,
            weights,
            log_weights,
            priors: None,
        })
    }

    /// Attach fitted class priors.
    pub fn with_priors(mut self, priors: Vec<f64>) -> Result<Self> {
        if priors.len() != self.n_classes() {
            return Err(Error::InvalidModel(format!(
                "expected {} class priors, got {}",
                self.n_classes(),
                priors.len()
            )));
        }
        self.priors = Some(priors);
        Ok(self)
    }

    /// Reorder classes so that `match_classes`, in the given order, come
    /// first and become the match classes. The other classes keep their
    /// relative order.
    pub fn with_match_classes(&self, match_classes: &[usize]) -> Result<Self> {
        let n_classes = self.n_classes();
        check_classes(n_classes, match_classes.len())?;

        let mut seen = vec![false; n_classes];
        for &j in match_classes {
            if j >= n_classes || seen[j] {
                return Err(Error::InvalidModel(format!(
                    "invalid match class list {:?} for {} classes",
                    match_classes, n_classes
                )));
            }
            seen[j] = true;
        }

        let order: Vec<usize> = match_classes
            .iter()
            .copied()
            .chain((0..n_classes).filter(|&j| !seen[j]))
            .collect();

        Ok(Self {
            comparator: Arc::clone(&self.comparator),
            n_match_classes: match_classes.len(),
            weights: order.iter().map(|&j| self.weights[j].clone()).collect(),
            log_weights: order.iter().map(|&j| self.log_weights[j].clone()).collect(),
            priors: self
                .priors
                .as_ref()
                .map(|p| order.iter().map(|&j| p[j]).collect()),
        })
    }

    pub fn comparator(&self) -> &Arc<RecordComparator> {
        &self.comparator
    }

    pub fn n_classes(&self) -> usize {
        self.weights.len()
    }

    pub fn n_match_classes(&self) -> usize {
        self.n_match_classes
    }

    pub fn is_match_class(&self, class: usize) -> bool {
        class < self.n_match_classes
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Probability of `level` at comparator `k` under `class`.
    pub fn weight(&self, class: usize, k: usize, level: usize) -> f64 {
        self.weights[class][k][level]
    }

    /// Fitted class priors, if the model came from an EM fit.
    pub fn priors(&self) -> Option<&[f64]> {
        self.priors.as_deref()
    }

    /// Log-likelihood ratio of a pattern: match classes minus non-match
    /// classes.
    pub fn score_pattern(&self, pattern: &[usize]) -> f64 {
        self.log_weights
            .iter()
            .enumerate()
            .map(|(j, class)| {
                let ll: f64 = pattern.iter().enumerate().map(|(k, &level)| class[k][level]).sum();
                if self.is_match_class(j) {
                    ll
                } else {
                    -ll
                }
            })
            .sum()
    }

    /// Score of an encoded pattern.
    pub fn score_index(&self, index: usize) -> f64 {
        self.score_pattern(&self.comparator.pattern_for(index))
    }

    /// Compare two records and score their pattern.
    pub fn match_score(&self, a: &Record, b: &Record) -> Result<f64> {
        let pattern = self.comparator.compare(a, b)?;
        Ok(self.score_pattern(&pattern))
    }

    /// Expected number of pairs per class for the counts in `tally`, using
    /// the fitted priors.
    pub fn class_counts(&self, tally: &Tally) -> Option<Vec<f64>> {
        let priors = self.priors.as_ref()?;
        let mut out = vec![0.0; self.n_classes()];

        for (_, pattern, count) in tally.iter() {
            let joint: Vec<f64> = priors
                .iter()
                .zip(&self.weights)
                .map(|(prior, class)| {
                    pattern
                        .iter()
                        .enumerate()
                        .fold(*prior, |p, (k, &level)| p * class[k][level])
                })
                .collect();
            let total: f64 = joint.iter().sum();
            if total > 0.0 {
                for (o, p) in out.iter_mut().zip(&joint) {
                    *o += count as f64 * p / total;
                }
            }
        }
        Some(out)
    }
}

impl fmt::Display for MixtureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.comparator.field_names();

        for (j, class) in self.weights.iter().enumerate() {
            let kind = if self.is_match_class(j) { "match" } else { "non-match" };
            write!(f, "Class {} ({})", j, kind)?;
            if let Some(priors) = &self.priors {
                write!(f, ", prior {:.6}", priors[j])?;
            }
            writeln!(f)?;

            for (k, row) in class.iter().enumerate() {
                let (a, b) = names[k];
                let label = if a == b { a.to_string() } else { format!("{}/{}", a, b) };
                let levels: Vec<String> = row.iter().map(|w| format!("{:.6}", w)).collect();
                writeln!(f, "  {:<16}{}", label, levels.join(" "))?;
            }
        }
        Ok(())
    }
}

/// Natural log of every weight. A level that no class ever produces carries
/// no evidence and gets log weight 0 in every class, so a pattern containing
/// it still scores on its other comparators.
fn log_weights(weights: &Weights) -> Weights {
    let mut logs: Weights = weights
        .iter()
        .map(|class| class.iter().map(|row| row.iter().map(|w| w.ln()).collect()).collect())
        .collect();

    let Some(first) = weights.first() else {
        return logs;
    };
    for (k, row) in first.iter().enumerate() {
        for level in 0..row.len() {
            if weights.iter().all(|class| class[k][level] == 0.0) {
                for class in logs.iter_mut() {
                    class[k][level] = 0.0;
                }
            }
        }
    }
    logs
}

pub(crate) fn check_classes(n_classes: usize, n_match_classes: usize) -> Result<()> {
    if n_classes < 2 {
        return Err(Error::InvalidModel(format!("need at least two classes, got {}", n_classes)));
    }
    if n_match_classes == 0 || n_match_classes >= n_classes {
        return Err(Error::InvalidModel(format!(
            "need between 1 and {} match classes, got {}",
            n_classes - 1,
            n_match_classes
        )));
    }
    Ok(())
}

/// All tallies must be nonempty and share one comparator, which is returned.
pub(crate) fn check_tallies<'t>(tallies: impl IntoIterator<Item = &'t Tally>) -> Result<Arc<RecordComparator>> {
    let mut iter = tallies.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::InvalidModel("no tallies given".into()))?;

    for tally in std::iter::once(first).chain(iter) {
        if !tally.same_comparator(first) {
            return Err(Error::ComparatorMismatch);
        }
        if tally.is_empty() {
            return Err(Error::InvalidModel("tallies must not be empty".into()));
        }
    }
    Ok(Arc::clone(first.comparator()))
}
