use crate::em::{EmConfig, EmProblem, Fit};
use crate::mixture::{check_classes, check_tallies, MixtureModel};
use crate::observer::FitObserver;
use crate::tally::Tally;
use fsmatch_core::{Error, Result};
use rand::Rng;
use std::iter;

/// EM over unlabeled counts blended with labeled counts.
///
/// `lambda` weighs the labeled data: 0 ignores it, 1 ignores the unlabeled
/// data. Labeled pairs count toward their own class with certainty.
#[derive(Debug, Clone)]
pub struct SemiSupervisedLearner {
    n_match_classes: usize,
    lambda: f64,
    config: EmConfig,
}

impl SemiSupervisedLearner {
    /// # Errors
    /// Fails if `lambda` is outside `[0, 1]`.
    pub fn new(n_match_classes: usize, lambda: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&lambda) {
            return Err(Error::InvalidModel(format!("lambda must be in [0, 1], got {}", lambda)));
        }
        Ok(Self {
            n_match_classes,
            lambda,
            config: EmConfig::default(),
        })
    }

    pub fn with_config(mut self, config: EmConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Fit with one labeled tally per class, match classes first.
    pub fn fit<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        unlabeled: &Tally,
        labeled: &[&Tally],
        observer: &mut dyn FitObserver,
    ) -> Result<Fit> {
        check_classes(labeled.len(), self.n_match_classes)?;
        let comparator = check_tallies(iter::once(unlabeled).chain(labeled.iter().copied()))?;

        let problem = EmProblem {
            levels: comparator.levels(),
            n_classes: labeled.len(),
            unlabeled: Some(unlabeled),
            labeled,
            lambda: self.lambda,
        };
        let solution = problem.solve(rng, &self.config, observer)?;

        let model = MixtureModel::new(&comparator, solution.weights, self.n_match_classes)?
            .with_priors(solution.class_weights)?;

        Ok(Fit {
            model,
            report: solution.report,
        })
    }
}
