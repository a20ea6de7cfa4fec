//! Parameter draws from prior distributions.
//!
//! A prior predictive check runs the same replicate-and-compare workflow as a posterior check,
//! with the parameter batch drawn from the priors instead of from a fitted model. A
//! [`PriorModel`] declares one prior per field and produces a [`DrawBatch`] whose schema matches
//! what the likelihood families read.

use crate::draws::{DrawBatch, Param, ParameterDraw};
use crate::error::{CheckError, Result};
use rand::Rng;
use rand::prelude::Distribution;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, Exp, Gamma, Normal, Uniform};
use tracing::debug;

/// A univariate prior.
///
/// `Gamma` uses the shape/rate convention, like the gamma likelihood family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dist", rename_all = "snake_case")]
pub enum Prior {
    Fixed { value: f64 },
    Normal { mean: f64, sd: f64 },
    HalfNormal { sd: f64 },
    Exponential { rate: f64 },
    Gamma { shape: f64, rate: f64 },
    Uniform { low: f64, high: f64 },
    Beta { alpha: f64, beta: f64 },
}

#[derive(Debug, Clone)]
enum Compiled {
    Fixed(f64),
    Normal(Normal),
    HalfNormal(Normal),
    Exponential(Exp),
    Gamma(Gamma),
    Uniform(Uniform),
    Beta(Beta),
}

fn config_err(name: &str, reason: String) -> CheckError {
    CheckError::InvalidConfig(format!("prior for `{name}`: {reason}"))
}

impl Prior {
    fn compile(&self, name: &str) -> Result<Compiled> {
        let err = |e| config_err(name, e);
        Ok(match *self {
            Prior::Fixed { value } if value.is_finite() => Compiled::Fixed(value),
            Prior::Fixed { value } => return Err(err(format!("fixed value {value} is not finite"))),
            Prior::Normal { mean, sd } => {
                Compiled::Normal(Normal::new(mean, sd).map_err(|e| err(e.to_string()))?)
            }
            Prior::HalfNormal { sd } => {
                Compiled::HalfNormal(Normal::new(0.0, sd).map_err(|e| err(e.to_string()))?)
            }
            Prior::Exponential { rate } => {
                Compiled::Exponential(Exp::new(rate).map_err(|e| err(e.to_string()))?)
            }
            Prior::Gamma { shape, rate } => {
                Compiled::Gamma(Gamma::new(shape, rate).map_err(|e| err(e.to_string()))?)
            }
            Prior::Uniform { low, high } => {
                if !(low < high) {
                    return Err(err(format!("uniform bounds [{low}, {high}) are empty")));
                }
                Compiled::Uniform(Uniform::new(low, high).map_err(|e| err(e.to_string()))?)
            }
            Prior::Beta { alpha, beta } => {
                Compiled::Beta(Beta::new(alpha, beta).map_err(|e| err(e.to_string()))?)
            }
        })
    }
}

impl Compiled {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Compiled::Fixed(v) => *v,
            Compiled::Normal(d) => d.sample(rng),
            Compiled::HalfNormal(d) => d.sample(rng).abs(),
            Compiled::Exponential(d) => d.sample(rng),
            Compiled::Gamma(d) => d.sample(rng),
            Compiled::Uniform(d) => d.sample(rng),
            Compiled::Beta(d) => d.sample(rng),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PriorField {
    name: String,
    /// `None` for a scalar field.
    len: Option<usize>,
    prior: Prior,
}

/// Named priors, one per parameter field.
///
/// # Example
/// ```rust
/// # use rand::SeedableRng;
/// # use rand_chacha::ChaCha8Rng;
/// use predictive_check::{Prior, PriorModel};
///
/// let model = PriorModel::new()
///     .vector("beta", 2, Prior::Normal { mean: 0.0, sd: 1.0 })
///     .scalar("intercept", Prior::Normal { mean: 0.0, sd: 5.0 })
///     .scalar("sigma", Prior::HalfNormal { sd: 1.0 });
/// let draws = model.sample_batch(500, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
/// assert_eq!(draws.len(), 500);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorModel {
    fields: Vec<PriorField>,
}

impl PriorModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: impl Into<String>, prior: Prior) -> Self {
        self.fields.push(PriorField {
            name: name.into(),
            len: None,
            prior,
        });
        self
    }

    /// A vector field whose `len` components are independent draws from `prior`.
    pub fn vector(mut self, name: impl Into<String>, len: usize, prior: Prior) -> Self {
        self.fields.push(PriorField {
            name: name.into(),
            len: Some(len),
            prior,
        });
        self
    }

    /// Check every hyperparameter without drawing anything.
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<Vec<(&PriorField, Compiled)>> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.fields.len());
        self.fields
            .iter()
            .map(|f| {
                if seen.contains(&f.name.as_str()) {
                    return Err(CheckError::InvalidConfig(format!(
                        "field `{}` declared twice",
                        f.name
                    )));
                }
                seen.push(&f.name);
                Ok((f, f.prior.compile(&f.name)?))
            })
            .collect()
    }

    fn draw_compiled<R: Rng + ?Sized>(compiled: &[(&PriorField, Compiled)], rng: &mut R) -> ParameterDraw {
        let mut draw = ParameterDraw::new();
        for (field, dist) in compiled {
            let value = match field.len {
                None => Param::Scalar(dist.sample(rng)),
                Some(k) => Param::Vector((0..k).map(|_| dist.sample(rng)).collect()),
            };
            draw.insert(field.name.clone(), value);
        }
        draw
    }

    /// One draw from the joint prior.
    pub fn sample_draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParameterDraw> {
        let compiled = self.compile()?;
        Ok(Self::draw_compiled(&compiled, rng))
    }

    /// `n` independent draws from the joint prior.
    ///
    /// # Errors
    /// `InvalidConfig` if a hyperparameter is invalid or a field name repeats.
    pub fn sample_batch<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<DrawBatch> {
        let compiled = self.compile()?;
        debug!(fields = compiled.len(), draws = n, "sampling prior batch");
        let draws = (0..n).map(|_| Self::draw_compiled(&compiled, rng)).collect();
        DrawBatch::new(draws)
    }
}
