//! Parameter draws and the batch sampler over them.
//!
//! A [`ParameterDraw`] is one iteration's worth of named model parameters as produced by an
//! inference engine. A [`DrawBatch`] holds a fixed set of draws that all share one schema and
//! hands them out by index or in storage order. Storage order carries no statistical meaning:
//! draws are exchangeable.

use crate::error::{CheckError, Result};
use serde::{Deserialize, Serialize};

/// A single named parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Param {
    /// Number of components: 1 for scalars.
    pub fn len(&self) -> usize {
        match self {
            Param::Scalar(_) => 1,
            Param::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn same_shape(&self, other: &Param) -> bool {
        match (self, other) {
            (Param::Scalar(_), Param::Scalar(_)) => true,
            (Param::Vector(a), Param::Vector(b)) => a.len() == b.len(),
            _ => false,
        }
    }
}

/// One sampled set of model parameters.
///
/// Fields keep the order they were inserted in. Re-inserting a name replaces the earlier value
/// in place.
///
/// # Example
/// ```rust
/// use predictive_check::ParameterDraw;
///
/// let draw = ParameterDraw::new()
///     .with_vector("beta", vec![0.5, -1.0])
///     .with_scalar("intercept", 2.0)
///     .with_scalar("sigma", 0.3);
/// assert_eq!(draw.scalar("sigma").unwrap(), 0.3);
/// assert_eq!(draw.vector("beta").unwrap(), &[0.5, -1.0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDraw {
    fields: Vec<(String, Param)>,
}

impl ParameterDraw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, Param::Scalar(value));
        self
    }

    pub fn with_vector(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, Param::Vector(values));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Param) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Look up a scalar field.
    ///
    /// # Errors
    /// `MissingParameter` if absent, `ShapeMismatch` if the field is a vector.
    pub fn scalar(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            Param::Scalar(x) => Ok(*x),
            Param::Vector(v) => Err(CheckError::shape(
                format!("parameter `{name}` (expected scalar)"),
                1,
                v.len(),
            )),
        }
    }

    /// Look up a vector field. A scalar field is not silently promoted.
    pub fn vector(&self, name: &str) -> Result<&[f64]> {
        match self.require(name)? {
            Param::Vector(v) => Ok(v),
            Param::Scalar(_) => Err(CheckError::shape(
                format!("parameter `{name}` (expected vector)"),
                0,
                1,
            )),
        }
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn require(&self, name: &str) -> Result<&Param> {
        self.get(name).ok_or_else(|| CheckError::MissingParameter {
            name: name.to_string(),
        })
    }

    fn same_schema(&self, other: &ParameterDraw) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((na, pa), (nb, pb))| na == nb && pa.same_shape(pb))
    }
}

/// A fixed batch of parameter draws sharing one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawBatch {
    draws: Vec<ParameterDraw>,
}

impl DrawBatch {
    /// Build a batch, checking that every draw has the field set and shapes of the first.
    ///
    /// # Errors
    /// `ShapeMismatch` naming the first draw whose schema differs.
    pub fn new(draws: Vec<ParameterDraw>) -> Result<Self> {
        if let Some(first) = draws.first() {
            if let Some((i, odd)) = draws
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, d)| !d.same_schema(first))
            {
                return Err(CheckError::shape(
                    format!("schema of draw {i}"),
                    first.len(),
                    odd.len(),
                ));
            }
        }
        Ok(Self { draws })
    }

    /// The `index`-th draw, 0-indexed.
    ///
    /// # Errors
    /// `OutOfRange` if `index >= self.len()`.
    pub fn draw_at(&self, index: usize) -> Result<&ParameterDraw> {
        self.draws.get(index).ok_or(CheckError::OutOfRange {
            index,
            len: self.draws.len(),
        })
    }

    /// Every draw in storage order. Each call starts from the beginning; the returned iterator
    /// can also be cloned to restart.
    pub fn all_draws(&self) -> std::slice::Iter<'_, ParameterDraw> {
        self.draws.iter()
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Keep at most the first `n` draws.
    pub fn truncated(&self, n: usize) -> DrawBatch {
        DrawBatch {
            draws: self.draws.iter().take(n).cloned().collect(),
        }
    }

    /// The trace of a scalar field across the batch.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        self.draws.iter().map(|d| d.scalar(name)).collect()
    }
}

impl<'a> IntoIterator for &'a DrawBatch {
    type Item = &'a ParameterDraw;
    type IntoIter = std::slice::Iter<'a, ParameterDraw>;

    fn into_iter(self) -> Self::IntoIter {
        self.all_draws()
    }
}

/// Layout of one field inside a flat parameter vector.
#[cfg(feature = "ndarray")]
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// `None` for a scalar, `Some(k)` for a vector of `k` components.
    pub width: Option<usize>,
}

#[cfg(feature = "ndarray")]
impl Field {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: None,
        }
    }

    pub fn vector(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width: Some(width),
        }
    }

    fn span(&self) -> usize {
        self.width.unwrap_or(1)
    }
}

#[cfg(feature = "ndarray")]
impl DrawBatch {
    /// Pool an MCMC trace of shape `[n_chains, n_samples, dim]` into a batch.
    ///
    /// `fields` slice each state vector from the front; trailing components (latent variables
    /// and the like) are ignored. Draws are ordered chain by chain.
    ///
    /// # Errors
    /// `ShapeMismatch` if the fields need more components than `dim`.
    pub fn from_chains(samples: &ndarray::Array3<f64>, fields: &[Field]) -> Result<Self> {
        let (n_chains, n_samples, dim) = samples.dim();
        let needed: usize = fields.iter().map(Field::span).sum();
        if needed > dim {
            return Err(CheckError::shape("trace state dimension", needed, dim));
        }

        let mut draws = Vec::with_capacity(n_chains * n_samples);
        for chain in 0..n_chains {
            for sample in 0..n_samples {
                let state = samples.slice(ndarray::s![chain, sample, ..]);
                let mut draw = ParameterDraw::new();
                let mut offset = 0;
                for field in fields {
                    let value = match field.width {
                        None => Param::Scalar(state[offset]),
                        Some(k) => Param::Vector(state.slice(ndarray::s![offset..offset + k]).to_vec()),
                    };
                    draw.insert(field.name.clone(), value);
                    offset += field.span();
                }
                draws.push(draw);
            }
        }
        Ok(Self { draws })
    }
}
