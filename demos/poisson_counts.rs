//! Prior and posterior predictive checks for a Poisson regression on count data.
//!
//! The example:
//! 1. Draws parameters from weakly informative priors and checks what counts they imply
//! 2. Simulates "observed" counts from a log-linear model
//! 3. Runs a posterior predictive check with stand-in posterior draws
//! 4. Prints a few paired points for visual comparison

use nalgebra::DMatrix;
use predictive_check::{
    CheckConfig, Design, Family, ParameterDraw, PredictiveCheck, Prior, PriorModel, Statistic,
    replicate,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn main() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let n = 120;
    let x = DMatrix::from_fn(n, 1, |i, _| (i as f64 / n as f64) * 2.0 - 1.0);
    let design = Design::with_covariates(x);

    let truth = ParameterDraw::new()
        .with_vector("beta", vec![0.8])
        .with_scalar("intercept", 1.2);
    let observed = replicate(&truth, Family::Poisson, &design, &mut rng).expect("valid parameters");
    let zeros = Statistic::ProportionBelow(0.5);

    // ---- prior predictive ----
    let priors = PriorModel::new()
        .vector("beta", 1, Prior::Normal { mean: 0.0, sd: 1.0 })
        .scalar("intercept", Prior::Normal { mean: 1.0, sd: 0.5 });
    let prior_draws = priors.sample_batch(2000, &mut rng).expect("valid priors");
    let config = CheckConfig::new(Family::Poisson, 2000)
        .with_statistic(Statistic::Max)
        .with_design(design.clone())
        .with_seed(1);
    let prior_check = PredictiveCheck::new(config)
        .and_then(|check| check.run(&prior_draws, &observed))
        .expect("prior predictive check failed");
    println!("Prior predictive check");
    println!("{}", prior_check.result);

    // ---- posterior predictive ----
    let posterior = PriorModel::new()
        .vector("beta", 1, Prior::Normal { mean: 0.8, sd: 0.05 })
        .scalar("intercept", Prior::Normal { mean: 1.2, sd: 0.05 });
    let posterior_draws = posterior.sample_batch(2000, &mut rng).expect("valid posterior");
    for statistic in [Statistic::Mean, Statistic::StdDev, zeros] {
        let config = CheckConfig::new(Family::Poisson, 2000)
            .with_statistic(statistic)
            .with_design(design.clone())
            .with_seed(2);
        let outcome = PredictiveCheck::new(config)
            .and_then(|check| check.run(&posterior_draws, &observed))
            .expect("posterior predictive check failed");
        println!("\nPosterior predictive check");
        println!("{}", outcome.result);

        let direct = outcome.direct(&observed).expect("replicas mirror the observations");
        if let Some(pairs) = direct.pairs(0) {
            let head: Vec<(f64, f64)> = pairs.take(5).collect();
            println!("first replicated draw vs observed: {head:?}");
        }
    }
}
