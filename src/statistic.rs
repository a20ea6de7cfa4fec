//! Discrepancy statistics: scalar summaries applied identically to observed and replicated data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A user-supplied statistic with a display name.
#[derive(Clone)]
pub struct CustomStatistic {
    name: String,
    func: Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>,
}

impl CustomStatistic {
    pub fn new(name: impl Into<String>, func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for CustomStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStatistic")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Scalar summary of a dataset.
///
/// All built-ins expect a non-empty slice; the evaluator rejects empty data before calling
/// one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
    /// Third standardized moment (population form). Zero for constant data.
    Skewness,
    Max,
    Min,
    /// Population standard deviation.
    StdDev,
    /// Fraction of values strictly below the threshold.
    ProportionBelow(f64),
    #[serde(skip)]
    Custom(CustomStatistic),
}

impl Statistic {
    pub fn custom(name: impl Into<String>, func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Statistic::Custom(CustomStatistic::new(name, func))
    }

    pub fn apply(&self, data: &[f64]) -> f64 {
        match self {
            Statistic::Mean => mean(data),
            Statistic::Median => median(data),
            Statistic::Skewness => skewness(data),
            Statistic::Max => data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Statistic::Min => data.iter().copied().fold(f64::INFINITY, f64::min),
            Statistic::StdDev => central_moment(data, mean(data), 2).sqrt(),
            Statistic::ProportionBelow(t) => {
                data.iter().filter(|&&x| x < *t).count() as f64 / data.len() as f64
            }
            Statistic::Custom(c) => (c.func)(data),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Statistic::Mean => "mean".into(),
            Statistic::Median => "median".into(),
            Statistic::Skewness => "skewness".into(),
            Statistic::Max => "max".into(),
            Statistic::Min => "min".into(),
            Statistic::StdDev => "std_dev".into(),
            Statistic::ProportionBelow(t) => format!("proportion_below({t})"),
            Statistic::Custom(c) => c.name.clone(),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

fn central_moment(data: &[f64], m: f64, k: i32) -> f64 {
    data.iter().map(|x| (x - m).powi(k)).sum::<f64>() / data.len() as f64
}

fn median(data: &[f64]) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

fn skewness(data: &[f64]) -> f64 {
    let m = mean(data);
    let m2 = central_moment(data, m, 2);
    if m2 == 0.0 {
        return 0.0;
    }
    central_moment(data, m, 3) / m2.powf(1.5)
}
