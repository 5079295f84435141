use crate::mixture::{check_classes, check_tallies, MixtureModel};
use crate::tally::Tally;
use fsmatch_core::Result;
use tracing::debug;

/// Closed-form estimates from labeled counts: one tally per class, match
/// classes first.
#[derive(Debug, Clone, Copy)]
pub struct SupervisedLearner {
    n_match_classes: usize,
}

impl Default for SupervisedLearner {
    fn default() -> Self {
        Self { n_match_classes: 1 }
    }
}

impl SupervisedLearner {
    pub fn new(n_match_classes: usize) -> Self {
        Self { n_match_classes }
    }

    /// Estimate `weight[j][k][level]` as the share of class `j` pairs whose
    /// comparator `k` is at `level`. The model carries no priors.
    pub fn fit(&self, labeled: &[&Tally]) -> Result<MixtureModel> {
        check_classes(labeled.len(), self.n_match_classes)?;
        let comparator = check_tallies(labeled.iter().copied())?;

        let weights = labeled
            .iter()
            .map(|tally| {
                let mut class: Vec<Vec<f64>> = comparator.levels().iter().map(|&n| vec![0.0; n]).collect();
                for (_, pattern, count) in tally.iter() {
                    for (k, &level) in pattern.iter().enumerate() {
                        class[k][level] += count as f64;
                    }
                }
                let total = tally.total() as f64;
                for w in class.iter_mut().flatten() {
                    *w /= total;
                }
                class
            })
            .collect();

        debug!(
            "Supervised fit over {} classes ({} labeled pairs)",
            labeled.len(),
            labeled.iter().map(|t| t.total()).sum::<u64>()
        );
        MixtureModel::new(&comparator, weights, self.n_match_classes)
    }
}
