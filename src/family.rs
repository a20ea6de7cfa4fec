//! Likelihood families and the parameters each one reads from a draw.
//!
//! | family      | location / mean                                   | other fields          |
//! |-------------|---------------------------------------------------|-----------------------|
//! | `normal`    | `intercept + beta · x_i`                          | `sigma >= 0`          |
//! | `student_t` | `intercept + beta · x_i`                          | `sigma >= 0`, `nu > 0`|
//! | `poisson`   | `lambda` (scalar or per row), else `exp(eta_i)`   |                       |
//! | `binomial`  | `theta` (scalar or per row), else `logistic(eta_i)` | trials from the design |
//! | `gamma`     | `rate` (scalar or per row), else `shape / exp(eta_i)` | `shape > 0`        |
//!
//! The gamma family uses the shape/rate convention throughout: a draw has mean `shape / rate`.
//!
//! Every value is resolved and checked for all rows before any randomness is consumed, so an
//! invalid draw leaves the random source untouched.

use crate::draws::{Param, ParameterDraw};
use crate::error::{CheckError, Result};
use crate::replicate::Design;
use crate::rng::{Noise, RngDraw};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Likelihood family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Normal,
    StudentT,
    Poisson,
    Binomial,
    Gamma,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Normal,
        Family::StudentT,
        Family::Poisson,
        Family::Binomial,
        Family::Gamma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Normal => "normal",
            Family::StudentT => "student_t",
            Family::Poisson => "poisson",
            Family::Binomial => "binomial",
            Family::Gamma => "gamma",
        }
    }

    /// Whether replicated values are counts.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Family::Poisson | Family::Binomial)
    }

    /// Resolve and validate every parameter this family needs for `design`.
    pub(crate) fn resolve<'a>(
        &self,
        draw: &ParameterDraw,
        design: &'a Design,
    ) -> Result<Resolved<'a>> {
        let fam = *self;
        match fam {
            Family::Normal => {
                let sigma = non_negative(fam, "sigma", draw.scalar("sigma")?)?;
                Ok(Resolved::Normal {
                    loc: location(fam, draw, design)?,
                    sigma,
                })
            }
            Family::StudentT => {
                let sigma = non_negative(fam, "sigma", draw.scalar("sigma")?)?;
                let nu = positive(fam, "nu", draw.scalar("nu")?)?;
                Ok(Resolved::StudentT {
                    loc: location(fam, draw, design)?,
                    sigma,
                    nu,
                })
            }
            Family::Poisson => {
                let lambda = match per_row(draw, "lambda", design)? {
                    Some(lambda) => lambda,
                    None => linked(draw, design, "lambda", f64::exp)?,
                };
                for (i, &l) in lambda.iter().enumerate() {
                    non_negative(fam, &row_name("lambda", i), l)?;
                }
                Ok(Resolved::Poisson { lambda })
            }
            Family::Binomial => {
                let theta = match per_row(draw, "theta", design)? {
                    Some(theta) => theta,
                    None => linked(draw, design, "theta", logistic)?,
                };
                for (i, &t) in theta.iter().enumerate() {
                    if !(0.0..=1.0).contains(&t) {
                        return Err(invalid(fam, &row_name("theta", i), t, "must lie in [0, 1]"));
                    }
                }
                Ok(Resolved::Binomial {
                    theta,
                    trials: design.trials(),
                })
            }
            Family::Gamma => {
                let shape = positive(fam, "shape", draw.scalar("shape")?)?;
                let rate = match per_row(draw, "rate", design)? {
                    Some(rate) => rate,
                    None => linked(draw, design, "rate", |eta| shape / eta.exp())?,
                };
                for (i, &r) in rate.iter().enumerate() {
                    positive(fam, &row_name("rate", i), r)?;
                }
                Ok(Resolved::Gamma { shape, rate })
            }
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        Family::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CheckError::InvalidConfig(format!("unknown family `{s}`")))
    }
}

/// Parameters of one family, validated for every row of a design.
#[derive(Debug, Clone)]
pub(crate) enum Resolved<'a> {
    Normal {
        loc: Vec<f64>,
        sigma: f64,
    },
    StudentT {
        loc: Vec<f64>,
        sigma: f64,
        nu: f64,
    },
    Poisson {
        lambda: Vec<f64>,
    },
    Binomial {
        theta: Vec<f64>,
        trials: Option<&'a [u64]>,
    },
    Gamma {
        shape: f64,
        rate: Vec<f64>,
    },
}

impl Resolved<'_> {
    /// Draw one synthetic dataset.
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        match self {
            Resolved::Normal { loc, sigma } => {
                let noise = Noise::standard();
                loc.iter()
                    .map(|&m| m + sigma * noise.sample_norm(rng))
                    .collect()
            }
            Resolved::StudentT { loc, sigma, nu } => {
                let noise = Noise::standard().with_student_t(*nu);
                loc.iter()
                    .map(|&m| m + sigma * noise.sample_student_t(rng))
                    .collect()
            }
            Resolved::Poisson { lambda } => {
                let noise = Noise::standard();
                lambda
                    .iter()
                    .map(|&l| noise.sample_poisson(rng, l))
                    .collect()
            }
            Resolved::Binomial { theta, trials } => {
                let noise = Noise::standard();
                theta
                    .iter()
                    .enumerate()
                    .map(|(i, &t)| {
                        let n = trials.map_or(1, |trials| trials[i]);
                        noise.sample_binomial(rng, n, t)
                    })
                    .collect()
            }
            Resolved::Gamma { shape, rate } => {
                let noise = Noise::standard().with_gamma_shape(*shape);
                rate.iter().map(|&r| noise.sample_gamma(rng, r)).collect()
            }
        }
    }
}

/// `intercept + beta · x_i` for every row, or just `intercept` without covariates.
///
/// A draw that carries coefficients needs covariates to apply them to.
pub(crate) fn linear_predictor(draw: &ParameterDraw, design: &Design) -> Result<Vec<f64>> {
    let intercept = draw.scalar("intercept")?;
    let Some(x) = design.covariates() else {
        let width = match draw.get("beta") {
            None => 0,
            Some(Param::Scalar(_)) => 1,
            Some(Param::Vector(v)) => v.len(),
        };
        if width > 0 {
            return Err(CheckError::shape("covariate columns for `beta`", 0, width));
        }
        return Ok(vec![intercept; design.len()]);
    };
    let beta = draw.vector("beta")?;
    if beta.len() != x.ncols() {
        return Err(CheckError::shape(
            "length of `beta` vs covariate columns",
            x.ncols(),
            beta.len(),
        ));
    }
    Ok(x
        .row_iter()
        .map(|row| intercept + row.iter().zip(beta).map(|(xi, bi)| xi * bi).sum::<f64>())
        .collect())
}

/// Linear predictor of a location family, finite in every row.
fn location(family: Family, draw: &ParameterDraw, design: &Design) -> Result<Vec<f64>> {
    let loc = linear_predictor(draw, design)?;
    if let Some((i, &m)) = loc.iter().enumerate().find(|(_, m)| !m.is_finite()) {
        return Err(invalid(family, &row_name("loc", i), m, "must be finite"));
    }
    Ok(loc)
}

/// A field broadcast to every row. `None` if the draw does not carry it.
fn per_row(draw: &ParameterDraw, name: &str, design: &Design) -> Result<Option<Vec<f64>>> {
    let n = design.len();
    match draw.get(name) {
        None => Ok(None),
        Some(Param::Scalar(x)) => Ok(Some(vec![*x; n])),
        Some(Param::Vector(v)) if v.len() == n => Ok(Some(v.clone())),
        Some(Param::Vector(v)) => Err(CheckError::shape(
            format!("per-row parameter `{name}`"),
            n,
            v.len(),
        )),
    }
}

/// Map the linear predictor through an inverse link. Only used with covariates; without them
/// the family's own field is required.
fn linked(
    draw: &ParameterDraw,
    design: &Design,
    name: &str,
    inverse_link: impl Fn(f64) -> f64,
) -> Result<Vec<f64>> {
    if design.covariates().is_none() {
        return Err(CheckError::MissingParameter {
            name: name.to_string(),
        });
    }
    Ok(linear_predictor(draw, design)?
        .into_iter()
        .map(inverse_link)
        .collect())
}

fn logistic(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

fn row_name(name: &str, i: usize) -> String {
    format!("{name}[{i}]")
}

fn invalid(family: Family, name: &str, value: f64, reason: &'static str) -> CheckError {
    CheckError::InvalidParameter {
        family,
        name: name.to_string(),
        value,
        reason,
    }
}

fn positive(family: Family, name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(family, name, value, "must be finite and > 0"))
    }
}

fn non_negative(family: Family, name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid(family, name, value, "must be finite and >= 0"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn design() -> Design {
        Design::with_covariates(DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 2.0, 2.0]))
    }

    #[test]
    fn linear_predictor_dots_each_row() {
        let draw = ParameterDraw::new()
            .with_vector("beta", vec![0.5, -1.0])
            .with_scalar("intercept", 1.0);
        let eta = linear_predictor(&draw, &design()).unwrap();
        assert_eq!(eta, vec![1.5, 0.0, 0.0]);
    }

    #[test]
    fn beta_length_must_match_covariates() {
        let draw = ParameterDraw::new()
            .with_vector("beta", vec![0.5])
            .with_scalar("intercept", 1.0);
        assert!(matches!(
            linear_predictor(&draw, &design()),
            Err(CheckError::ShapeMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn coefficients_without_covariates_are_rejected() {
        let draw = ParameterDraw::new()
            .with_vector("beta", vec![5.0, -3.0])
            .with_scalar("intercept", 1.0)
            .with_scalar("sigma", 0.0);
        for fam in [Family::Normal, Family::StudentT] {
            let draw = draw.clone().with_scalar("nu", 3.0);
            assert_eq!(
                fam.resolve(&draw, &Design::rows(3)).unwrap_err(),
                CheckError::ShapeMismatch {
                    what: "covariate columns for `beta`".into(),
                    expected: 0,
                    found: 2
                }
            );
        }

        // an empty coefficient vector is an intercept-only model
        let draw = ParameterDraw::new()
            .with_vector("beta", vec![])
            .with_scalar("intercept", 1.0);
        assert_eq!(linear_predictor(&draw, &Design::rows(2)).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn non_finite_location_is_invalid() {
        for (fam, intercept) in [
            (Family::Normal, f64::NAN),
            (Family::StudentT, f64::INFINITY),
            (Family::Normal, f64::NEG_INFINITY),
        ] {
            let draw = ParameterDraw::new()
                .with_scalar("intercept", intercept)
                .with_scalar("sigma", 1.0)
                .with_scalar("nu", 4.0);
            match fam.resolve(&draw, &Design::rows(3)) {
                Err(CheckError::InvalidParameter { family, name, .. }) => {
                    assert_eq!(family, fam);
                    assert_eq!(name, "loc[0]");
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        // one overflowing row is enough
        let draw = ParameterDraw::new()
            .with_vector("beta", vec![f64::MAX, 0.0])
            .with_scalar("intercept", 0.0)
            .with_scalar("sigma", 1.0);
        match Family::Normal.resolve(&draw, &design()) {
            Err(CheckError::InvalidParameter { name, .. }) => assert_eq!(name, "loc[2]"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_count_families_are_discrete() {
        let discrete: Vec<_> = Family::ALL.into_iter().filter(Family::is_discrete).collect();
        assert_eq!(discrete, vec![Family::Poisson, Family::Binomial]);
    }

    #[test]
    fn poisson_log_link_without_lambda() {
        let draw = ParameterDraw::new()
            .with_vector("beta", vec![0.0, 0.0])
            .with_scalar("intercept", 2.0_f64.ln());
        match Family::Poisson.resolve(&draw, &design()).unwrap() {
            Resolved::Poisson { lambda } => {
                for l in lambda {
                    assert_relative_eq!(l, 2.0, epsilon = 1e-12);
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn per_row_vector_must_cover_design() {
        let draw = ParameterDraw::new().with_vector("lambda", vec![1.0, 2.0]);
        assert!(matches!(
            Family::Poisson.resolve(&draw, &Design::rows(3)),
            Err(CheckError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn family_without_field_or_covariates_is_missing_parameter() {
        let draw = ParameterDraw::new().with_scalar("intercept", 0.0);
        assert!(matches!(
            Family::Binomial.resolve(&draw, &Design::rows(2)),
            Err(CheckError::MissingParameter { .. })
        ));
    }

    #[test]
    fn domain_violations_name_the_offending_row() {
        let draw = ParameterDraw::new().with_vector("theta", vec![0.2, 1.5]);
        match Family::Binomial.resolve(&draw, &Design::rows(2)) {
            Err(CheckError::InvalidParameter { name, value, .. }) => {
                assert_eq!(name, "theta[1]");
                assert_eq!(value, 1.5);
            }
            other => panic!("unexpected {other:?}"),
        }

        let draw = ParameterDraw::new()
            .with_scalar("intercept", 0.0)
            .with_scalar("sigma", 1.0)
            .with_scalar("nu", 0.0);
        assert!(matches!(
            Family::StudentT.resolve(&draw, &Design::rows(2)),
            Err(CheckError::InvalidParameter { .. })
        ));

        let draw = ParameterDraw::new().with_scalar("lambda", f64::NAN);
        assert!(Family::Poisson.resolve(&draw, &Design::rows(2)).is_err());
    }

    #[test]
    fn family_tags_round_trip_through_strings() {
        for fam in Family::ALL {
            assert_eq!(fam.as_str().parse::<Family>().unwrap(), fam);
            let json = serde_json::to_string(&fam).unwrap();
            assert_eq!(json, format!("\"{}\"", fam.as_str()));
        }
        assert!("weibull".parse::<Family>().is_err());
    }
}
