//! One-call estimators with default settings and progress logged through
//! `tracing`.

use crate::em::{EmConfig, Fit};
use crate::mixture::MixtureModel;
use crate::observer::TracingObserver;
use crate::semisupervised::SemiSupervisedLearner;
use crate::supervised::SupervisedLearner;
use crate::tally::Tally;
use crate::unsupervised::UnsupervisedLearner;
use fsmatch_core::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A seeded generator, or one seeded from the operating system.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Unsupervised EM with `n_classes` classes.
pub fn fit_unsupervised(tally: &Tally, n_classes: usize, seed: Option<u64>, config: EmConfig) -> Result<Fit> {
    UnsupervisedLearner::new(n_classes)?
        .with_config(config)?
        .fit(&mut rng_from_seed(seed), tally, &mut TracingObserver)
}

/// Supervised estimate from one match and one non-match tally.
pub fn fit_supervised(matches: &Tally, nonmatches: &Tally) -> Result<MixtureModel> {
    SupervisedLearner::new(1).fit(&[matches, nonmatches])
}

/// Semi-supervised EM with one match and one non-match class.
pub fn fit_semisupervised(
    unlabeled: &Tally,
    matches: &Tally,
    nonmatches: &Tally,
    lambda: f64,
    seed: Option<u64>,
    config: EmConfig,
) -> Result<Fit> {
    SemiSupervisedLearner::new(1, lambda)?
        .with_config(config)?
        .fit(&mut rng_from_seed(seed), unlabeled, &[matches, nonmatches], &mut TracingObserver)
}
