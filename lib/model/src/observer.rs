//! EM progress reporting

use crate::em::FitReport;
use tracing::info;

/// Receives progress from an EM fit.
pub trait FitObserver {
    /// Called after every iteration.
    fn on_iteration(&mut self, _iteration: usize, _log_likelihood: f64, _delta: f64) {}

    /// Called once when the fit stops, converged or not.
    fn on_finish(&mut self, _report: &FitReport) {}
}

/// Logs progress every 10 iterations up to 100, every 100 up to 1000 and
/// every 1000 after that, plus the final state.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn should_report(iteration: usize) -> bool {
        (iteration < 101 && iteration % 10 == 0)
            || (iteration < 1001 && iteration % 100 == 0)
            || iteration % 1000 == 0
    }
}

impl FitObserver for TracingObserver {
    fn on_iteration(&mut self, iteration: usize, log_likelihood: f64, delta: f64) {
        if Self::should_report(iteration) {
            info!("EM iteration {:>6}: log-likelihood {:.7} (delta {:.7})", iteration, log_likelihood, delta);
        }
    }

    fn on_finish(&mut self, report: &FitReport) {
        if report.converged {
            info!(
                "EM converged after {} iterations: log-likelihood {:.7}",
                report.iterations, report.log_likelihood
            );
        } else {
            info!(
                "EM stopped at the iteration cap ({}): log-likelihood {:.7}",
                report.iterations, report.log_likelihood
            );
        }
    }
}

/// Ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FitObserver for NoopObserver {}
