//! # Predictive Checks for Bayesian Models
//!
//! This crate validates a fitted (or prior) Bayesian model against observed data by simulation:
//! every parameter draw generates a replicated dataset, and a discrepancy statistic computed on
//! the real data is located within the distribution of the same statistic on the replicas.
//!
//! ## Features
//!
//! - **Parameter draws:**
//!   - [`ParameterDraw`] holds named scalar and vector parameters for one MCMC iteration.
//!   - [`DrawBatch`] checks that a batch shares one schema and serves draws by index or in order.
//!   - [`PriorModel`] draws batches from priors, for prior predictive checks.
//!
//! - **Replication:**
//!   - Five likelihood families ([`Family`]): normal, Student-t, Poisson, binomial and gamma,
//!     with regression (linear predictor plus link) support through a covariate [`Design`].
//!   - All randomness comes from an injected generator. Batch replication seeds one generator
//!     per draw, so sequential and parallel (`rayon` feature) runs are bit-identical.
//!
//! - **Evaluation:**
//!   - [`evaluate`] computes the observed statistic, the replicated statistics and the rank
//!     (Bayesian p-value) of the observed value.
//!   - [`evaluate_direct`] pairs observed and replicated values for scatter-style comparison.
//!   - [`PredictiveCheck`] runs the whole workflow from a [`CheckConfig`].
//!
//! ## Conventions
//!
//! The gamma family and the gamma prior use shape/rate: a draw has mean `shape / rate`.
//!
//! ## Usage Example
//!
//! ```rust
//! use nalgebra::DMatrix;
//! use predictive_check::{Design, DrawBatch, Family, ParameterDraw, Replicator, Statistic, evaluate};
//!
//! let x = DMatrix::from_fn(30, 1, |i, _| i as f64 / 30.0);
//! let observed: Vec<f64> = (0..30).map(|i| 1.0 + 2.0 * i as f64 / 30.0).collect();
//!
//! // Posterior draws would normally come from an inference engine.
//! let draws = DrawBatch::new(
//!     (0..200)
//!         .map(|i| {
//!             ParameterDraw::new()
//!                 .with_vector("beta", vec![2.0 + 0.001 * i as f64])
//!                 .with_scalar("intercept", 1.0)
//!                 .with_scalar("sigma", 0.2)
//!                 .with_scalar("nu", 4.0)
//!         })
//!         .collect(),
//! )
//! .unwrap();
//!
//! let replicator = Replicator::new(Family::StudentT, Design::with_covariates(x));
//! let replicated = replicator.replicate_batch(&draws, 42).unwrap();
//! let result = evaluate(&observed, &replicated, &Statistic::Skewness).unwrap();
//! println!("{result}");
//! ```
//!
//! ## License
//! This crate is dual-licensed under the MIT OR Apache-2.0 licenses.

pub use check::{CheckConfig, CheckOutcome, PredictiveCheck};
#[cfg(feature = "ndarray")]
pub use draws::Field;
pub use draws::{DrawBatch, Param, ParameterDraw};
pub use error::{CheckError, Result};
pub use evaluate::{CheckResult, DirectComparison, PairedPoint, evaluate, evaluate_direct};
pub use family::Family;
pub use prior::{Prior, PriorModel};
pub use replicate::{Design, Replicator, replicate};
pub use statistic::{CustomStatistic, Statistic};

mod check;
mod draws;
mod error;
mod evaluate;
mod family;
mod prior;
mod replicate;
pub(crate) mod rng;
mod statistic;

#[cfg(test)]
mod tests {
    use super::*;

    /// Posterior draws centred on the data-generating values should not flag misfit, while a
    /// model whose mean is far off should put the observed statistic in a tail.
    #[test]
    fn rank_separates_good_and_bad_models() {
        // symmetric about 10, spread comparable to sigma = 2
        let observed: Vec<f64> = (0..200)
            .map(|i| {
                let d = 0.02 * (i / 2) as f64;
                if i % 2 == 0 { 10.0 + d } else { 10.0 - d }
            })
            .collect();

        let batch = |mu: f64| {
            DrawBatch::new(
                (0..400)
                    .map(|_| {
                        ParameterDraw::new()
                            .with_scalar("intercept", mu)
                            .with_scalar("sigma", 2.0)
                    })
                    .collect(),
            )
            .unwrap()
        };
        let replicator = Replicator::new(Family::Normal, Design::rows(200));

        let good = replicator.replicate_batch(&batch(10.0), 1).unwrap();
        let good = evaluate(&observed, &good, &Statistic::Mean).unwrap();
        assert!((0.3..=0.7).contains(&good.rank()), "rank {}", good.rank());

        let bad = replicator.replicate_batch(&batch(14.0), 1).unwrap();
        let bad = evaluate(&observed, &bad, &Statistic::Mean).unwrap();
        assert_eq!(bad.rank(), 0.0);
    }
}
