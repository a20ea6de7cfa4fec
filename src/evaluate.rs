//! Comparing observed data against replicated datasets.
//!
//! [`evaluate`] reduces every dataset to one discrepancy statistic and locates the observed
//! value within the replicated distribution: `rank = #{T(y_rep) <= T(y)} / n_rep`, the
//! Bayesian p-value. [`evaluate_direct`] skips the reduction and pairs the raw values by
//! index for scatter-style inspection.
//!
//! Nothing here is random and no input is modified.

use crate::error::{CheckError, Result};
use crate::statistic::Statistic;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Outcome of a statistic-based predictive check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    statistic: String,
    observed: f64,
    replicated: Vec<f64>,
    rank: f64,
}

impl CheckResult {
    /// Name of the statistic that produced this result.
    pub fn statistic_name(&self) -> &str {
        &self.statistic
    }

    /// `T(y)` for the observed data.
    pub fn observed(&self) -> f64 {
        self.observed
    }

    /// `T(y_rep)` for each replicated dataset, in batch order.
    pub fn replicated(&self) -> &[f64] {
        &self.replicated
    }

    /// Fraction of replicated statistics at or below the observed one.
    pub fn rank(&self) -> f64 {
        self.rank
    }

    /// Fraction of replicated statistics at or above the observed one.
    pub fn upper_tail(&self) -> f64 {
        let n = self.replicated.len() as f64;
        self.replicated.iter().filter(|&&t| t >= self.observed).count() as f64 / n
    }

    pub fn replicated_mean(&self) -> f64 {
        self.replicated.iter().sum::<f64>() / self.replicated.len() as f64
    }

    pub fn batch_size(&self) -> usize {
        self.replicated.len()
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:<15} {:<15} {:<10} {:<10}",
            "Statistic", "Observed", "Rep. mean", "Rank", "Draws"
        )?;
        writeln!(f, "{}", "-".repeat(72))?;
        write!(
            f,
            "{:<20} {:<15.4} {:<15.4} {:<10.3} {:<10}",
            self.statistic,
            self.observed,
            self.replicated_mean(),
            self.rank,
            self.batch_size()
        )
    }
}

fn check_batch(observed: &[f64], replicated: &[Vec<f64>]) -> Result<()> {
    if observed.is_empty() {
        return Err(CheckError::EmptyBatch("no observations"));
    }
    if replicated.is_empty() {
        return Err(CheckError::EmptyBatch("no replicated datasets"));
    }
    if let Some((j, y)) = replicated
        .iter()
        .enumerate()
        .find(|(_, y)| y.len() != observed.len())
    {
        return Err(CheckError::shape(
            format!("replicated dataset {j}"),
            observed.len(),
            y.len(),
        ));
    }
    Ok(())
}

/// Compare `statistic(observed)` with `statistic` applied to each replicated dataset.
///
/// Infinite statistics compare as usual. A NaN statistic (for instance the mean of data
/// containing NaN) is rejected rather than counted.
///
/// # Errors
/// - `EmptyBatch` if there are no observations or no replicated datasets
/// - `ShapeMismatch` if a replicated dataset's length differs from the observations'
/// - `UndefinedStatistic` if the statistic is NaN on the observed or any replicated dataset
///
/// # Example
/// ```rust
/// use predictive_check::{Statistic, evaluate};
///
/// let observed = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let replicated = vec![
///     vec![0.0, 1.0, 2.0, 3.0, 4.0],
///     vec![1.0, 2.0, 3.0, 4.0, 5.0],
///     vec![3.0, 4.0, 5.0, 6.0, 7.0],
/// ];
/// let result = evaluate(&observed, &replicated, &Statistic::Mean).unwrap();
/// assert_eq!(result.replicated(), &[2.0, 3.0, 5.0]);
/// assert!((result.rank() - 2.0 / 3.0).abs() < 1e-12);
/// ```
pub fn evaluate(observed: &[f64], replicated: &[Vec<f64>], statistic: &Statistic) -> Result<CheckResult> {
    check_batch(observed, replicated)?;

    let undefined = |dataset: String| CheckError::UndefinedStatistic {
        statistic: statistic.name(),
        dataset,
    };
    let t_obs = statistic.apply(observed);
    if t_obs.is_nan() {
        return Err(undefined("the observed data".into()));
    }
    let t_rep: Vec<f64> = replicated.iter().map(|y| statistic.apply(y)).collect();
    if let Some(j) = t_rep.iter().position(|t| t.is_nan()) {
        return Err(undefined(format!("replicated dataset {j}")));
    }
    let at_or_below = t_rep.iter().filter(|&&t| t <= t_obs).count();
    let rank = at_or_below as f64 / t_rep.len() as f64;

    debug!(statistic = %statistic, observed = t_obs, rank, draws = t_rep.len(), "evaluated check");

    Ok(CheckResult {
        statistic: statistic.name(),
        observed: t_obs,
        replicated: t_rep,
        rank,
    })
}

/// Observed and replicated values paired by position, for point-by-point comparison.
#[derive(Debug, Clone, Copy)]
pub struct DirectComparison<'a> {
    observed: &'a [f64],
    replicated: &'a [Vec<f64>],
}

/// One point of a direct comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedPoint {
    pub draw: usize,
    pub index: usize,
    pub observed: f64,
    pub replicated: f64,
}

impl<'a> DirectComparison<'a> {
    pub fn observed(&self) -> &'a [f64] {
        self.observed
    }

    pub fn replicated(&self) -> &'a [Vec<f64>] {
        self.replicated
    }

    pub fn n_draws(&self) -> usize {
        self.replicated.len()
    }

    /// `(observed[i], replicated[draw][i])` for every `i`, or `None` past the last draw.
    pub fn pairs(&self, draw: usize) -> Option<impl Iterator<Item = (f64, f64)> + use<'a>> {
        let observed = self.observed;
        self.replicated
            .get(draw)
            .map(move |y| observed.iter().copied().zip(y.iter().copied()))
    }

    /// Every paired point, draw by draw.
    pub fn points(&self) -> impl Iterator<Item = PairedPoint> + use<'a> {
        let observed = self.observed;
        self.replicated.iter().enumerate().flat_map(move |(draw, y)| {
            observed
                .iter()
                .zip(y)
                .enumerate()
                .map(move |(index, (&o, &r))| PairedPoint {
                    draw,
                    index,
                    observed: o,
                    replicated: r,
                })
        })
    }
}

/// Pair observed and replicated data by index without reducing them.
///
/// # Errors
/// Same as [`evaluate`].
pub fn evaluate_direct<'a>(observed: &'a [f64], replicated: &'a [Vec<f64>]) -> Result<DirectComparison<'a>> {
    check_batch(observed, replicated)?;
    Ok(DirectComparison {
        observed,
        replicated,
    })
}
