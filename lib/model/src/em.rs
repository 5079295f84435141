//! Expectation-maximization for mixtures of conditionally independent
//! agreement levels
//!
//! The same loop serves the unsupervised learner (unlabeled counts only) and
//! the semi-supervised learner, where every accumulator and log-likelihood
//! term is the blend `lambda * labeled + (1 - lambda) * unlabeled`.

use crate::mixture::MixtureModel;
use crate::observer::FitObserver;
use crate::simplex::fill_partition;
use crate::tally::Tally;
use fsmatch_core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default iteration cap.
pub const MAX_ITERATIONS: usize = 50_000;
/// Default convergence tolerance on the log-likelihood improvement.
pub const TOLERANCE: f64 = 1e-7;

/// Per-class, per-comparator, per-level weights.
pub type Weights = Vec<Vec<Vec<f64>>>;

/// EM stopping rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmConfig {
    pub max_iterations: usize,
    /// Stop once the log-likelihood improves by a nonnegative amount below this.
    pub tolerance: f64,
    /// Independent initializations; the best final log-likelihood wins.
    pub restarts: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
            restarts: 1,
        }
    }
}

impl EmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidModel("max_iterations must be at least 1".into()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::InvalidModel(format!("tolerance must be positive, got {}", self.tolerance)));
        }
        if self.restarts == 0 {
            return Err(Error::InvalidModel("restarts must be at least 1".into()));
        }
        Ok(())
    }
}

/// How an EM fit ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub iterations: usize,
    pub log_likelihood: f64,
    /// False if the iteration cap was hit first.
    pub converged: bool,
}

/// A fitted model with the report of the run that produced it.
#[derive(Debug, Clone)]
pub struct Fit {
    pub model: MixtureModel,
    pub report: FitReport,
}

pub(crate) struct EmSolution {
    pub class_weights: Vec<f64>,
    pub weights: Weights,
    pub report: FitReport,
}

struct State {
    class_weights: Vec<f64>,
    weights: Weights,
    /// Class responsibilities of each unlabeled pattern.
    expected: Vec<Vec<f64>>,
}

pub(crate) struct EmProblem<'t> {
    pub levels: &'t [usize],
    pub n_classes: usize,
    pub unlabeled: Option<&'t Tally>,
    pub labeled: &'t [&'t Tally],
    pub lambda: f64,
}

impl EmProblem<'_> {
    pub fn solve<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        config: &EmConfig,
        observer: &mut dyn FitObserver,
    ) -> Result<EmSolution> {
        let mut best: Option<EmSolution> = None;

        for restart in 0..config.restarts {
            let solution = self.run(rng, config, observer)?;
            if config.restarts > 1 {
                debug!(
                    "EM restart {}: log-likelihood {:.7}",
                    restart, solution.report.log_likelihood
                );
            }
            best = match best {
                Some(b) if b.report.log_likelihood >= solution.report.log_likelihood => Some(b),
                _ => Some(solution),
            };
        }

        best.ok_or_else(|| Error::InvalidModel("restarts must be at least 1".into()))
    }

    fn init<R: Rng + ?Sized>(&self, rng: &mut R) -> State {
        let mut class_weights = vec![0.0; self.n_classes];
        fill_partition(rng, &mut class_weights);

        let mut weights: Weights = (0..self.n_classes)
            .map(|_| self.levels.iter().map(|&n| vec![0.0; n]).collect())
            .collect();
        for row in weights.iter_mut().flatten() {
            fill_partition(rng, row);
        }

        let n_unlabeled = self.unlabeled.map_or(0, Tally::len);
        let mut expected = vec![vec![0.0; self.n_classes]; n_unlabeled];
        for row in &mut expected {
            fill_partition(rng, row);
        }

        State {
            class_weights,
            weights,
            expected,
        }
    }

    fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        config: &EmConfig,
        observer: &mut dyn FitObserver,
    ) -> Result<EmSolution> {
        let mut state = self.init(rng);
        let mut old = self.log_likelihood(&state);
        let mut report = FitReport {
            iterations: 0,
            log_likelihood: old,
            converged: false,
        };

        for iteration in 1..=config.max_iterations {
            self.e_step(&mut state)?;
            self.m_step(&mut state)?;

            let new = self.log_likelihood(&state);
            let delta = new - old;
            observer.on_iteration(iteration, new, delta);

            report.iterations = iteration;
            report.log_likelihood = new;
            if (0.0..config.tolerance).contains(&delta) {
                report.converged = true;
                break;
            }
            old = new;
        }

        observer.on_finish(&report);
        Ok(EmSolution {
            class_weights: state.class_weights,
            weights: state.weights,
            report,
        })
    }

    fn pattern_likelihood(state: &State, class: usize, pattern: &[usize]) -> f64 {
        pattern
            .iter()
            .enumerate()
            .fold(state.class_weights[class], |p, (k, &level)| p * state.weights[class][k][level])
    }

    fn pattern_log_likelihood(state: &State, class: usize, pattern: &[usize]) -> f64 {
        pattern
            .iter()
            .enumerate()
            .fold(state.class_weights[class].ln(), |ll, (k, &level)| {
                ll + state.weights[class][k][level].ln()
            })
    }

    fn e_step(&self, state: &mut State) -> Result<()> {
        // at lambda 1 responsibilities never reach the M-step, and levels seen
        // only in unlabeled pairs have zero weight in every class
        let Some(unlabeled) = self.unlabeled.filter(|_| self.lambda < 1.0) else {
            return Ok(());
        };

        for (i, (index, pattern, _)) in unlabeled.iter().enumerate() {
            let mut total = 0.0;
            for j in 0..self.n_classes {
                let p = Self::pattern_likelihood(state, j, pattern);
                state.expected[i][j] = p;
                total += p;
            }

            if !(total > 0.0) {
                return Err(Error::DegeneratePattern { pattern: index });
            }
            for r in &mut state.expected[i] {
                *r /= total;
            }
        }
        Ok(())
    }

    fn m_step(&self, state: &mut State) -> Result<()> {
        let mut class_totals = vec![0.0; self.n_classes];
        for row in state.weights.iter_mut().flatten() {
            row.fill(0.0);
        }

        if self.lambda > 0.0 {
            for (j, tally) in self.labeled.iter().enumerate() {
                for (_, pattern, count) in tally.iter() {
                    let d = self.lambda * count as f64;
                    class_totals[j] += d;
                    for (k, &level) in pattern.iter().enumerate() {
                        state.weights[j][k][level] += d;
                    }
                }
            }
        }

        if let (Some(unlabeled), true) = (self.unlabeled, self.lambda < 1.0) {
            for (i, (_, pattern, count)) in unlabeled.iter().enumerate() {
                for j in 0..self.n_classes {
                    let d = (1.0 - self.lambda) * state.expected[i][j] * count as f64;
                    class_totals[j] += d;
                    for (k, &level) in pattern.iter().enumerate() {
                        state.weights[j][k][level] += d;
                    }
                }
            }
        }

        for (j, &class_total) in class_totals.iter().enumerate() {
            if !(class_total > 0.0) {
                return Err(Error::DegenerateClass { class: j });
            }
            for w in state.weights[j].iter_mut().flatten() {
                *w /= class_total;
            }
        }

        let grand_total: f64 = class_totals.iter().sum();
        for (w, total) in state.class_weights.iter_mut().zip(&class_totals) {
            *w = total / grand_total;
        }
        Ok(())
    }

    fn log_likelihood(&self, state: &State) -> f64 {
        let mut labeled_ll = 0.0;
        if self.lambda > 0.0 {
            for (j, tally) in self.labeled.iter().enumerate() {
                for (_, pattern, count) in tally.iter() {
                    labeled_ll += count as f64 * Self::pattern_log_likelihood(state, j, pattern);
                }
            }
        }

        let mut unlabeled_ll = 0.0;
        if let (Some(unlabeled), true) = (self.unlabeled, self.lambda < 1.0) {
            for (i, (_, pattern, count)) in unlabeled.iter().enumerate() {
                let mut ll = 0.0;
                for (j, &r) in state.expected[i].iter().enumerate() {
                    if r == 0.0 {
                        continue;
                    }
                    ll += r * Self::pattern_log_likelihood(state, j, pattern);
                }
                unlabeled_ll += count as f64 * ll;
            }
        }

        self.lambda * labeled_ll + (1.0 - self.lambda) * unlabeled_ll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmConfig::default();
        assert_eq!(config.max_iterations, 50_000);
        assert_eq!(config.tolerance, 1e-7);
        assert_eq!(config.restarts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            EmConfig { max_iterations: 0, ..Default::default() },
            EmConfig { tolerance: 0.0, ..Default::default() },
            EmConfig { tolerance: f64::NAN, ..Default::default() },
            EmConfig { restarts: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidModel(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_config_deserialize_fills_defaults() {
        let config: EmConfig = serde_json::from_str(r#"{"restarts": 5}"#).unwrap();
        assert_eq!(config.restarts, 5);
        assert_eq!(config.max_iterations, MAX_ITERATIONS);
    }
}
