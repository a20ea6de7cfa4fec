//! Synthetic datasets from parameter draws.
//!
//! A [`Replicator`] pairs a likelihood [`Family`] with a [`Design`] (the covariates and row
//! count the observed data was collected under) and turns a single [`ParameterDraw`] into a
//! dataset of the same length as the observations.
//!
//! Batch replication gives the `j`-th draw its own generator seeded from `base_seed + j`, so
//! the sequential and parallel batch routines produce bit-identical output.

use crate::draws::{DrawBatch, ParameterDraw};
use crate::error::{CheckError, Result};
use crate::family::Family;
use crate::rng::seed_for_draw;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::marker::PhantomData;
use tracing::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Shape of the data being replicated.
///
/// Row `i` of the covariate matrix is observation `i`. Without covariates only the row count
/// is known. Binomial trial counts, when present, are one per row; without them every row is a
/// single Bernoulli trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    n: usize,
    covariates: Option<DMatrix<f64>>,
    trials: Option<Vec<u64>>,
}

impl Design {
    /// `n` observations with no covariates.
    pub fn rows(n: usize) -> Self {
        Self {
            n,
            covariates: None,
            trials: None,
        }
    }

    /// One observation per row of `x`.
    pub fn with_covariates(x: DMatrix<f64>) -> Self {
        Self {
            n: x.nrows(),
            covariates: Some(x),
            trials: None,
        }
    }

    /// Attach per-row binomial trial counts.
    ///
    /// # Errors
    /// `ShapeMismatch` if there is not exactly one count per row.
    pub fn with_trials(mut self, trials: Vec<u64>) -> Result<Self> {
        if trials.len() != self.n {
            return Err(CheckError::shape("binomial trial counts", self.n, trials.len()));
        }
        self.trials = Some(trials);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn covariates(&self) -> Option<&DMatrix<f64>> {
        self.covariates.as_ref()
    }

    pub fn trials(&self) -> Option<&[u64]> {
        self.trials.as_deref()
    }
}

/// Draw one replicated dataset from `draw`.
///
/// Parameters are validated for every row before `rng` is touched.
///
/// # Example
/// ```rust
/// # use rand::SeedableRng;
/// # use rand::rngs::StdRng;
/// use predictive_check::{Design, Family, ParameterDraw, replicate};
///
/// let draw = ParameterDraw::new().with_scalar("lambda", 3.5);
/// let y_rep = replicate(&draw, Family::Poisson, &Design::rows(10), &mut StdRng::seed_from_u64(0))
///     .unwrap();
/// assert_eq!(y_rep.len(), 10);
/// ```
pub fn replicate<R: Rng + ?Sized>(
    draw: &ParameterDraw,
    family: Family,
    design: &Design,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let resolved = family.resolve(draw, design)?;
    let out = resolved.sample(rng);
    debug_assert_eq!(out.len(), design.len());
    Ok(out)
}

/// Replicates whole batches of draws for one family and design.
///
/// # Type Parameters
/// * `R` - The generator built for each draw in batch mode (defaults to `ChaCha8Rng`)
///
/// # Example
/// ```rust
/// use predictive_check::{Design, DrawBatch, Family, ParameterDraw, Replicator};
///
/// let draws = DrawBatch::new(
///     (0..4)
///         .map(|i| ParameterDraw::new().with_scalar("intercept", i as f64).with_scalar("sigma", 1.0))
///         .collect(),
/// )
/// .unwrap();
/// let replicator = Replicator::new(Family::Normal, Design::rows(25));
/// let batch = replicator.replicate_batch(&draws, 42).unwrap();
/// assert_eq!(batch.len(), 4);
/// assert!(batch.iter().all(|y| y.len() == 25));
/// ```
#[derive(Debug, Clone)]
pub struct Replicator<R = ChaCha8Rng> {
    family: Family,
    design: Design,
    _rng: PhantomData<fn() -> R>,
}

impl Replicator<ChaCha8Rng> {
    pub fn new(family: Family, design: Design) -> Self {
        Self::with_generator(family, design)
    }
}

impl<R: SeedableRng + Rng> Replicator<R> {
    /// Like [`Replicator::new`], with a custom per-draw generator type.
    pub fn with_generator(family: Family, design: Design) -> Self {
        Self {
            family,
            design,
            _rng: PhantomData,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn design(&self) -> &Design {
        &self.design
    }

    /// Replicate a single draw from a caller-supplied random source.
    pub fn replicate<G: Rng + ?Sized>(&self, draw: &ParameterDraw, rng: &mut G) -> Result<Vec<f64>> {
        replicate(draw, self.family, &self.design, rng)
    }

    /// Replicate the `index`-th draw of a batch with the generator batch mode would use for it.
    pub fn replicate_seeded(&self, draw: &ParameterDraw, base_seed: u64, index: usize) -> Result<Vec<f64>> {
        let mut rng = R::seed_from_u64(seed_for_draw(base_seed, index));
        self.replicate(draw, &mut rng)
    }

    /// One replicated dataset per draw, in batch order.
    ///
    /// # Errors
    /// The error of the first draw (in batch order) that fails to replicate.
    pub fn replicate_batch(&self, draws: &DrawBatch, base_seed: u64) -> Result<Vec<Vec<f64>>> {
        debug!(
            family = %self.family,
            draws = draws.len(),
            rows = self.design.len(),
            "replicating batch"
        );
        draws
            .all_draws()
            .enumerate()
            .map(|(j, draw)| self.replicate_seeded(draw, base_seed, j))
            .collect()
    }
}

#[cfg(feature = "rayon")]
impl<R: SeedableRng + Rng> Replicator<R> {
    /// Parallel [`Replicator::replicate_batch`]. The output, including which error is reported,
    /// is identical to the sequential version for any thread count.
    pub fn replicate_batch_par(&self, draws: &DrawBatch, base_seed: u64) -> Result<Vec<Vec<f64>>> {
        debug!(
            family = %self.family,
            draws = draws.len(),
            rows = self.design.len(),
            threads = rayon::current_num_threads(),
            "replicating batch in parallel"
        );
        let draws: Vec<&ParameterDraw> = draws.all_draws().collect();
        let results: Vec<Result<Vec<f64>>> = draws
            .into_par_iter()
            .enumerate()
            .map(|(j, draw)| self.replicate_seeded(draw, base_seed, j))
            .collect();
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::RngCore;
    use rand::rngs::StdRng;

    fn regression_draw(sigma: f64) -> ParameterDraw {
        ParameterDraw::new()
            .with_vector("beta", vec![2.0, -0.5])
            .with_scalar("intercept", 1.0)
            .with_scalar("sigma", sigma)
            .with_scalar("nu", 3.0)
    }

    fn covariates() -> DMatrix<f64> {
        DMatrix::from_fn(20, 2, |i, j| (i as f64) * 0.1 + j as f64)
    }

    #[test]
    fn normal_without_noise_is_the_linear_predictor() {
        let x = covariates();
        let design = Design::with_covariates(x.clone());
        let mut rng = StdRng::seed_from_u64(1);
        let y = replicate(&regression_draw(1e-12), Family::Normal, &design, &mut rng).unwrap();
        for (i, yi) in y.iter().enumerate() {
            let eta = 1.0 + 2.0 * x[(i, 0)] - 0.5 * x[(i, 1)];
            assert_abs_diff_eq!(*yi, eta, epsilon = 1e-9);
        }
    }

    #[test]
    fn same_seed_same_output() {
        let design = Design::with_covariates(covariates());
        for family in [Family::Normal, Family::StudentT] {
            let a = replicate(&regression_draw(1.0), family, &design, &mut StdRng::seed_from_u64(9)).unwrap();
            let b = replicate(&regression_draw(1.0), family, &design, &mut StdRng::seed_from_u64(9)).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn zero_lambda_poisson_is_all_zero() {
        let draw = ParameterDraw::new().with_scalar("lambda", 0.0);
        let mut rng = StdRng::seed_from_u64(5);
        let y = replicate(&draw, Family::Poisson, &Design::rows(50), &mut rng).unwrap();
        assert_eq!(y, vec![0.0; 50]);
    }

    #[test]
    fn invalid_gamma_shape_consumes_no_randomness() {
        let draw = ParameterDraw::new()
            .with_scalar("shape", -1.0)
            .with_scalar("rate", 1.0);
        let mut rng = StdRng::seed_from_u64(11);
        let err = replicate(&draw, Family::Gamma, &Design::rows(5), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            CheckError::InvalidParameter {
                family: Family::Gamma,
                ..
            }
        ));
        assert_eq!(rng.next_u64(), StdRng::seed_from_u64(11).next_u64());
    }

    #[test]
    fn bad_location_draws_fail_before_sampling() {
        let nan_intercept = ParameterDraw::new()
            .with_scalar("intercept", f64::NAN)
            .with_scalar("sigma", 1.0);
        let uncovered = regression_draw(0.0);
        for (draw, family) in [
            (&nan_intercept, Family::Normal),
            (&uncovered, Family::Normal),
            (&uncovered, Family::StudentT),
        ] {
            let mut rng = StdRng::seed_from_u64(4);
            assert!(replicate(draw, family, &Design::rows(3), &mut rng).is_err());
            assert_eq!(rng.next_u64(), StdRng::seed_from_u64(4).next_u64());
        }
    }

    #[test]
    fn binomial_uses_per_row_trials() {
        let trials = vec![0, 1, 5, 10, 100];
        let design = Design::rows(5).with_trials(trials.clone()).unwrap();
        let draw = ParameterDraw::new().with_scalar("theta", 1.0);
        let y = replicate(&draw, Family::Binomial, &design, &mut StdRng::seed_from_u64(2)).unwrap();
        let expected: Vec<f64> = trials.iter().map(|&n| n as f64).collect();
        assert_eq!(y, expected);

        assert!(Design::rows(5).with_trials(vec![1, 2]).is_err());
    }

    #[test]
    fn batch_error_reports_first_bad_draw() {
        let draws = DrawBatch::new(vec![
            ParameterDraw::new().with_scalar("lambda", 1.0),
            ParameterDraw::new().with_scalar("lambda", -2.0),
            ParameterDraw::new().with_scalar("lambda", -3.0),
        ])
        .unwrap();
        let replicator = Replicator::new(Family::Poisson, Design::rows(4));
        match replicator.replicate_batch(&draws, 0) {
            Err(CheckError::InvalidParameter { value, .. }) => assert_eq!(value, -2.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_batch_matches_sequential() {
        let draws = DrawBatch::new(
            (0..64)
                .map(|j| regression_draw(0.5 + j as f64 / 64.0))
                .collect(),
        )
        .unwrap();
        let replicator = Replicator::new(Family::StudentT, Design::with_covariates(covariates()));
        let seq = replicator.replicate_batch(&draws, 1234).unwrap();
        let par = replicator.replicate_batch_par(&draws, 1234).unwrap();
        assert_eq!(seq, par);
    }

    fn family_draw(family: Family, a: f64, b: f64) -> ParameterDraw {
        match family {
            Family::Normal | Family::StudentT => ParameterDraw::new()
                .with_scalar("intercept", a)
                .with_scalar("sigma", b)
                .with_scalar("nu", b + 0.5),
            Family::Poisson => ParameterDraw::new().with_scalar("lambda", b * 10.0),
            Family::Binomial => ParameterDraw::new().with_scalar("theta", b / 10.0),
            Family::Gamma => ParameterDraw::new()
                .with_scalar("shape", b + 0.1)
                .with_scalar("rate", b + 0.5),
        }
    }

    proptest! {
        #[test]
        fn output_length_equals_rows(
            fam in 0usize..5,
            n in 0usize..64,
            a in -5.0f64..5.0,
            b in 0.0f64..10.0,
            seed in any::<u64>(),
        ) {
            let family = Family::ALL[fam];
            let design = Design::rows(n).with_trials(vec![7; n]).unwrap();
            let draw = family_draw(family, a, b);
            let y = replicate(&draw, family, &design, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert_eq!(y.len(), n);
            let again = replicate(&draw, family, &design, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert_eq!(y, again);
        }

        #[test]
        fn count_families_stay_in_their_support(
            n in 1usize..64,
            b in 0.0f64..10.0,
            seed in any::<u64>(),
        ) {
            let trials: Vec<u64> = (0..n as u64).map(|i| i % 13).collect();
            let design = Design::rows(n).with_trials(trials.clone()).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);

            let y = replicate(&family_draw(Family::Poisson, 0.0, b), Family::Poisson, &design, &mut rng).unwrap();
            prop_assert!(y.iter().all(|v| *v >= 0.0 && v.fract() == 0.0));

            let y = replicate(&family_draw(Family::Binomial, 0.0, b), Family::Binomial, &design, &mut rng).unwrap();
            for (v, n_i) in y.iter().zip(&trials) {
                prop_assert!(*v >= 0.0 && *v <= *n_i as f64 && v.fract() == 0.0);
            }
        }
    }
}
