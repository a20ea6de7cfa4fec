//! End-to-end predictive checks.
//!
//! [`PredictiveCheck`] runs the whole workflow from a single [`CheckConfig`]: take at most
//! `batch_size` draws, replicate one dataset per draw, and evaluate the discrepancy statistic.
//! The same workflow serves posterior checks (draws from a fitted model) and prior checks
//! (draws from a [`PriorModel`](crate::PriorModel)).

use crate::draws::DrawBatch;
use crate::error::{CheckError, Result};
use crate::evaluate::{CheckResult, DirectComparison, evaluate, evaluate_direct};
use crate::family::Family;
use crate::replicate::{Design, Replicator};
use crate::rng::entropy_seed;
use crate::statistic::Statistic;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-check settings.
///
/// `family`, `statistic`, `batch_size` and `seed` (de)serialize; a custom statistic and the
/// design are set in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub family: Family,
    #[serde(default)]
    pub statistic: Statistic,
    pub batch_size: usize,
    /// Base seed for replication. `None` picks one at run time and reports it in the outcome.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Row count, covariates and trial counts of the observed data. When absent, the row count
    /// is taken from the observations and no covariates are used.
    #[serde(skip)]
    pub design: Option<Design>,
}

impl CheckConfig {
    pub fn new(family: Family, batch_size: usize) -> Self {
        Self {
            family,
            statistic: Statistic::default(),
            batch_size,
            seed: None,
            design: None,
        }
    }

    pub fn with_statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_design(mut self, design: Design) -> Self {
        self.design = Some(design);
        self
    }

    /// # Errors
    /// `InvalidConfig` if `batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CheckError::InvalidConfig("batch_size must be positive".into()));
        }
        Ok(())
    }
}

/// Replicated data and the resulting comparison from one run.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Base seed used for replication; rerunning with it reproduces the outcome exactly.
    pub seed: u64,
    /// One dataset per draw used, in batch order.
    pub replicated: Vec<Vec<f64>>,
    pub result: CheckResult,
}

impl CheckOutcome {
    /// Point-by-point pairing of `observed` against this outcome's replicated data.
    pub fn direct<'a>(&'a self, observed: &'a [f64]) -> Result<DirectComparison<'a>> {
        evaluate_direct(observed, &self.replicated)
    }
}

/// A configured predictive check.
///
/// # Example
/// ```rust
/// use predictive_check::{CheckConfig, DrawBatch, Family, ParameterDraw, PredictiveCheck, Statistic};
///
/// let observed = vec![2.0, 0.0, 3.0, 1.0, 4.0, 2.0];
/// let draws = DrawBatch::new(
///     (0..200).map(|i| ParameterDraw::new().with_scalar("lambda", 1.5 + (i % 10) as f64 * 0.1)).collect(),
/// )
/// .unwrap();
///
/// let config = CheckConfig::new(Family::Poisson, 100)
///     .with_statistic(Statistic::Max)
///     .with_seed(7);
/// let outcome = PredictiveCheck::new(config).unwrap().run(&draws, &observed).unwrap();
/// assert_eq!(outcome.replicated.len(), 100);
/// println!("{}", outcome.result);
/// ```
#[derive(Debug, Clone)]
pub struct PredictiveCheck {
    config: CheckConfig,
}

impl PredictiveCheck {
    /// # Errors
    /// `InvalidConfig` if the configuration does not validate.
    pub fn new(config: CheckConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Replicate from up to `batch_size` draws and compare against `observed`.
    ///
    /// # Errors
    /// - `EmptyBatch` if `draws` or `observed` is empty
    /// - `ShapeMismatch` if the design's row count differs from `observed.len()`
    /// - any replication error of the first failing draw
    pub fn run(&self, draws: &DrawBatch, observed: &[f64]) -> Result<CheckOutcome> {
        let cfg = &self.config;
        if draws.is_empty() {
            return Err(CheckError::EmptyBatch("no parameter draws"));
        }
        if observed.is_empty() {
            return Err(CheckError::EmptyBatch("no observations"));
        }

        let design = match &cfg.design {
            Some(design) if design.len() != observed.len() => {
                return Err(CheckError::shape(
                    "design rows vs observations",
                    observed.len(),
                    design.len(),
                ));
            }
            Some(design) => design.clone(),
            None => Design::rows(observed.len()),
        };

        if cfg.batch_size > draws.len() {
            warn!(
                batch_size = cfg.batch_size,
                available = draws.len(),
                "batch size exceeds available draws; using all draws"
            );
        }
        let used = draws.truncated(cfg.batch_size);
        let seed = cfg.seed.unwrap_or_else(entropy_seed);
        debug!(
            family = %cfg.family,
            statistic = %cfg.statistic,
            draws = used.len(),
            seed,
            "running predictive check"
        );

        let replicator = Replicator::new(cfg.family, design);
        #[cfg(feature = "rayon")]
        let replicated = replicator.replicate_batch_par(&used, seed)?;
        #[cfg(not(feature = "rayon"))]
        let replicated = replicator.replicate_batch(&used, seed)?;

        let result = evaluate(observed, &replicated, &cfg.statistic)?;
        Ok(CheckOutcome {
            seed,
            replicated,
            result,
        })
    }
}
