// ABOUTME: Monte Carlo simulation for dice formulas.
// ABOUTME: Runs many trials to compute distributions, crit rates, and fumble rates.

use crate::error::Result;
use crate::lexer;
use crate::roller::{FastRng, Rng};
use crate::token::RollOptions;
use std::collections::HashMap;

/// Result of a Monte Carlo simulation.
#[derive(Debug, Clone)]
pub struct SimResult {
    /// Distribution of totals: value -> count.
    pub distribution: HashMap<i64, usize>,
    /// Minimum total observed.
    pub min: i64,
    /// Maximum total observed.
    pub max: i64,
    /// Mean total.
    pub mean: f64,
    /// Standard deviation of totals.
    pub std_dev: f64,
    /// Fraction of trials that scored at least one critical hit.
    pub crit_rate: f64,
    /// Fraction of trials that fumbled.
    pub fumble_rate: f64,
    /// Number of trials run.
    pub n: usize,
}

impl SimResult {
    /// Returns outcomes sorted by value for iteration.
    pub fn sorted_outcomes(&self) -> Vec<(i64, usize)> {
        let mut outcomes: Vec<_> = self.distribution.iter().map(|(&k, &v)| (k, v)).collect();
        outcomes.sort_by_key(|(k, _)| *k);
        outcomes
    }

    /// Returns the probability of each outcome.
    pub fn probabilities(&self) -> HashMap<i64, f64> {
        self.distribution
            .iter()
            .map(|(&k, &v)| (k, v as f64 / self.n as f64))
            .collect()
    }

    /// Returns the mode (most common outcome).
    pub fn mode(&self) -> Option<i64> {
        self.distribution
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(&value, _)| value)
    }
}

/// Run a Monte Carlo simulation of a formula under the given options.
///
/// # Examples
///
/// ```
/// use rollforge::{simulate, RollOptions};
///
/// let sim = simulate("2d6", RollOptions::default(), 10_000).unwrap();
/// assert!((sim.mean - 7.0).abs() < 0.5);
/// ```
pub fn simulate(formula: &str, options: RollOptions, n: usize) -> Result<SimResult> {
    simulate_with_rng(formula, options, n, &mut FastRng::new())
}

/// Run a simulation with a seeded RNG for reproducibility.
pub fn simulate_seeded(formula: &str, options: RollOptions, n: usize, seed: u64) -> Result<SimResult> {
    simulate_with_rng(formula, options, n, &mut FastRng::with_seed(seed))
}

fn simulate_with_rng(
    formula: &str,
    options: RollOptions,
    n: usize,
    rng: &mut impl Rng,
) -> Result<SimResult> {
    let tokens = lexer::tokenize(formula)?;

    let mut distribution: HashMap<i64, usize> = HashMap::new();
    let mut sum: i64 = 0;
    let mut sum_sq: i64 = 0;
    let mut min = i64::MAX;
    let mut max = i64::MIN;
    let mut crits = 0usize;
    let mut fumbles = 0usize;

    for _ in 0..n {
        let result = crate::roll_tokens_with_rng(&tokens, options, rng)?;
        let total = result.total;

        *distribution.entry(total).or_insert(0) += 1;
        sum += total;
        sum_sq += total * total;
        min = min.min(total);
        max = max.max(total);
        if result.criticals > 0 {
            crits += 1;
        }
        if result.fumble {
            fumbles += 1;
        }
    }

    let mean = sum as f64 / n as f64;
    let variance = (sum_sq as f64 / n as f64) - (mean * mean);
    let std_dev = variance.sqrt();

    Ok(SimResult {
        distribution,
        min,
        max,
        mean,
        std_dev,
        crit_rate: crits as f64 / n as f64,
        fumble_rate: fumbles as f64 / n as f64,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_basic() {
        let result = simulate("1d6", RollOptions::default(), 1000).unwrap();

        assert!(result.min >= 1);
        assert!(result.max <= 6);
        assert_eq!(result.n, 1000);
        assert!((result.mean - 3.5).abs() < 0.5);
        assert_eq!(result.crit_rate, 0.0);
    }

    #[test]
    fn test_simulate_constant() {
        let result = simulate("5", RollOptions::default(), 100).unwrap();

        assert_eq!(result.min, 5);
        assert_eq!(result.max, 5);
        assert_eq!(result.mean, 5.0);
        assert_eq!(result.std_dev, 0.0);
        assert_eq!(result.distribution.len(), 1);
        assert_eq!(result.distribution[&5], 100);
    }

    #[test]
    fn test_simulate_seeded_reproducible() {
        let opts = RollOptions {
            criticals: true,
            ..RollOptions::default()
        };
        let result1 = simulate_seeded("2d6!", opts, 1000, 42).unwrap();
        let result2 = simulate_seeded("2d6!", opts, 1000, 42).unwrap();

        assert_eq!(result1.distribution, result2.distribution);
        assert_eq!(result1.mean, result2.mean);
        assert_eq!(result1.crit_rate, result2.crit_rate);
    }

    #[test]
    fn test_simulate_crit_rate() {
        let opts = RollOptions {
            criticals: true,
            ..RollOptions::default()
        };
        let result = simulate_seeded("1d6", opts, 10_000, 7).unwrap();

        // First die crits on a 6: about 1 in 6 trials.
        assert!((result.crit_rate - 1.0 / 6.0).abs() < 0.02);
        // Explosions push the maximum past a plain d6.
        assert!(result.max > 6);
    }

    #[test]
    fn test_simulate_fumble_rate() {
        let opts = RollOptions {
            fumbles: true,
            ..RollOptions::default()
        };
        let result = simulate_seeded("1d20", opts, 10_000, 7).unwrap();

        assert!((result.fumble_rate - 1.0 / 20.0).abs() < 0.01);
        // Fumbled trials collapse to 0.
        assert_eq!(result.min, 0);
    }

    #[test]
    fn test_simulate_advantage_shifts_mean() {
        let plain = simulate_seeded("1d20", RollOptions::default(), 10_000, 9).unwrap();
        let opts = RollOptions {
            advantage: 1,
            ..RollOptions::default()
        };
        let advantaged = simulate_seeded("1d20", opts, 10_000, 9).unwrap();

        assert!(advantaged.mean > plain.mean);
    }

    #[test]
    fn test_simulate_double_digit_range() {
        let result = simulate_seeded("d66", RollOptions::default(), 5000, 3).unwrap();

        assert!(result.min >= 11);
        assert!(result.max <= 66);
    }

    #[test]
    fn test_sorted_outcomes() {
        let result = simulate_seeded("1d6", RollOptions::default(), 600, 123).unwrap();
        let sorted = result.sorted_outcomes();

        for i in 1..sorted.len() {
            assert!(sorted[i - 1].0 < sorted[i].0);
        }
    }

    #[test]
    fn test_probabilities() {
        let result = simulate("5", RollOptions::default(), 100).unwrap();
        let probs = result.probabilities();

        assert_eq!(probs[&5], 1.0);
    }

    #[test]
    fn test_mode() {
        let result = simulate("5", RollOptions::default(), 100).unwrap();
        assert_eq!(result.mode(), Some(5));
    }
}
