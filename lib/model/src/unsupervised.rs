use crate::em::{EmConfig, EmProblem, Fit};
use crate::mixture::{check_classes, check_tallies, MixtureModel};
use crate::observer::FitObserver;
use crate::tally::Tally;
use fsmatch_core::Result;
use rand::Rng;
use tracing::debug;

/// EM over unlabeled pattern counts.
///
/// The match class is chosen after fitting as the class with the smallest
/// prior; [`MixtureModel::with_match_classes`] overrides the choice.
#[derive(Debug, Clone)]
pub struct UnsupervisedLearner {
    n_classes: usize,
    config: EmConfig,
}

impl UnsupervisedLearner {
    /// # Errors
    /// Fails if `n_classes < 2`.
    pub fn new(n_classes: usize) -> Result<Self> {
        check_classes(n_classes, 1)?;
        Ok(Self {
            n_classes,
            config: EmConfig::default(),
        })
    }

    pub fn with_config(mut self, config: EmConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn fit<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tally: &Tally,
        observer: &mut dyn FitObserver,
    ) -> Result<Fit> {
        let comparator = check_tallies([tally])?;

        let problem = EmProblem {
            levels: comparator.levels(),
            n_classes: self.n_classes,
            unlabeled: Some(tally),
            labeled: &[],
            lambda: 0.0,
        };
        let solution = problem.solve(rng, &self.config, observer)?;

        let match_class = solution
            .class_weights
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(j, _)| j);
        debug!(
            "Unsupervised fit: class priors {:?}, match class {}",
            solution.class_weights, match_class
        );

        let model = MixtureModel::new(&comparator, solution.weights, 1)?
            .with_priors(solution.class_weights)?
            .with_match_classes(&[match_class])?;

        Ok(Fit {
            model,
            report: solution.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use crate::tally::IncrementalTally;
    use fsmatch_core::{FieldComparator, RecordComparator, RecordSchema};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn comparator() -> Arc<RecordComparator> {
        let schema = RecordSchema::new(&["zip", "a", "b", "c"], &["zip"], None, None).unwrap();
        RecordComparator::builder(&schema, &schema)
            .compare("a", FieldComparator::exact())
            .unwrap()
            .compare("b", FieldComparator::exact())
            .unwrap()
            .compare("c", FieldComparator::exact())
            .unwrap()
            .handle_blanks(false)
            .build()
            .unwrap()
    }

    /// A small population of agreeing pairs and a large one of disagreeing
    /// pairs.
    fn mixed_tally(cmp: &Arc<RecordComparator>) -> Tally {
        let counts: &[([usize; 3], usize)] = &[
            ([1, 1, 1], 80),
            ([1, 1, 0], 8),
            ([1, 0, 1], 8),
            ([0, 1, 1], 8),
            ([0, 0, 0], 600),
            ([1, 0, 0], 60),
            ([0, 1, 0], 60),
            ([0, 0, 1], 60),
        ];
        let mut counter = IncrementalTally::new(cmp);
        for (pattern, n) in counts {
            for _ in 0..*n {
                counter.add_index(cmp.pattern_index(pattern));
            }
        }
        counter.snapshot()
    }

    fn fit(seed: u64) -> Fit {
        let cmp = comparator();
        let tally = mixed_tally(&cmp);
        let mut rng = StdRng::seed_from_u64(seed);
        UnsupervisedLearner::new(2)
            .unwrap()
            .fit(&mut rng, &tally, &mut NoopObserver)
            .unwrap()
    }

    #[test]
    fn test_rows_and_priors_sum_to_one() {
        let fit = fit(1);
        assert!(fit.report.iterations >= 1);

        for class in fit.model.weights() {
            for row in class {
                assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
        }
        let priors = fit.model.priors().unwrap();
        assert!((priors.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_class_has_smallest_prior() {
        let fit = fit(3);
        let priors = fit.model.priors().unwrap();
        assert!(priors[0] <= priors[1]);
        assert!(fit.model.score_pattern(&[1, 1, 1]) > fit.model.score_pattern(&[0, 0, 0]));
    }

    #[test]
    fn test_deterministic_under_seed() {
        let a = fit(11);
        let b = fit(11);
        assert_eq!(a.report, b.report);
        assert_eq!(a.model.weights(), b.model.weights());
    }

    #[test]
    fn test_restarts_keep_best_fit() {
        let cmp = comparator();
        let tally = mixed_tally(&cmp);
        let config = EmConfig {
            restarts: 3,
            ..EmConfig::default()
        };
        let learner = UnsupervisedLearner::new(2).unwrap().with_config(config).unwrap();
        let fit = learner
            .fit(&mut StdRng::seed_from_u64(5), &tally, &mut NoopObserver)
            .unwrap();
        let single = learner
            .clone()
            .with_config(EmConfig::default())
            .unwrap()
            .fit(&mut StdRng::seed_from_u64(5), &tally, &mut NoopObserver)
            .unwrap();
        assert!(fit.report.log_likelihood >= single.report.log_likelihood);
    }

    #[test]
    fn test_argument_errors() {
        assert!(UnsupervisedLearner::new(1).is_err());
        let bad = EmConfig {
            restarts: 0,
            ..EmConfig::default()
        };
        assert!(UnsupervisedLearner::new(2).unwrap().with_config(bad).is_err());

        let cmp = comparator();
        let empty = IncrementalTally::new(&cmp).snapshot();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(UnsupervisedLearner::new(2)
            .unwrap()
            .fit(&mut rng, &empty, &mut NoopObserver)
            .is_err());
    }
}
