//! Comparing two proportions with binomial predictive checks.
//!
//! Two groups report successes out of a varying number of trials. A pooled model (one success
//! probability for both groups) is checked against the data with a custom statistic: the
//! difference between the groups' observed success rates. A pooled model that cannot
//! reproduce the observed gap puts that statistic in a tail.

use predictive_check::{CheckConfig, Design, Family, PredictiveCheck, Prior, PriorModel, Statistic};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn main() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    // rows 0..5 are group A, rows 5..10 group B
    let trials: Vec<u64> = vec![40, 35, 50, 45, 30, 42, 38, 47, 33, 41];
    let observed = vec![12.0, 9.0, 16.0, 13.0, 8.0, 21.0, 19.0, 25.0, 17.0, 20.0];

    let weights = trials.clone();
    let rate_gap = Statistic::custom("rate_gap", move |successes| {
        let rate = |range: std::ops::Range<usize>| {
            let s: f64 = successes[range.clone()].iter().sum();
            let n: u64 = weights[range].iter().sum();
            s / n as f64
        };
        rate(5..10) - rate(0..5)
    });

    // Posterior of a pooled Beta(1, 1)-binomial model: Beta(1 + successes, 1 + failures).
    let successes: f64 = observed.iter().sum();
    let total: u64 = trials.iter().sum();
    let pooled = PriorModel::new().scalar(
        "theta",
        Prior::Beta {
            alpha: 1.0 + successes,
            beta: 1.0 + total as f64 - successes,
        },
    );
    let draws = pooled.sample_batch(4000, &mut rng).expect("valid posterior");

    let design = Design::rows(trials.len())
        .with_trials(trials)
        .expect("one trial count per row");
    let config = CheckConfig::new(Family::Binomial, 4000)
        .with_statistic(rate_gap)
        .with_design(design)
        .with_seed(3);
    let outcome = PredictiveCheck::new(config)
        .and_then(|check| check.run(&draws, &observed))
        .expect("predictive check failed");

    println!("Pooled model, group rate gap");
    println!("{}", outcome.result);
    println!("upper tail: {:.4}", outcome.result.upper_tail());
}
