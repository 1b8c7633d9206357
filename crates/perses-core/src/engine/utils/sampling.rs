use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Input weights list is empty, cannot perform sampling")]
    EmptyWeights,
    #[error("All log-weights are -inf or NaN, resulting in zero total weight for sampling")]
    ZeroTotalWeight,
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// `ln(sum(exp(values)))`, computed without overflow. Returns `-inf` for an empty slice
/// or when every value is `-inf`.
pub fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// Shifts log-weights so that their exponentials sum to one.
pub fn normalize_log_weights(log_weights: &[f64]) -> Vec<f64> {
    let total = logsumexp(log_weights);
    log_weights.iter().map(|&w| w - total).collect()
}

/// Draws an index with probability proportional to `exp(log_weights[i])`.
#[instrument(level = "trace", skip_all, fields(n = log_weights.len()))]
pub fn sample_log_weights<R: Rng + ?Sized>(
    log_weights: &[f64],
    rng: &mut R,
) -> Result<usize, SamplingError> {
    if log_weights.is_empty() {
        return Err(SamplingError::EmptyWeights);
    }
    let max = log_weights
        .iter()
        .copied()
        .filter(|w| !w.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Err(SamplingError::ZeroTotalWeight);
    }

    let weights: Vec<f64> = log_weights
        .iter()
        .map(|&w| if w.is_nan() { 0.0 } else { (w - max).exp() })
        .collect();

    let dist = WeightedIndex::new(&weights)?;
    Ok(dist.sample(rng))
}

/// `ln(n!)` as a sum of logarithms.
pub fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;

    #[test]
    fn logsumexp_is_stable_for_large_values() {
        assert_relative_eq!(logsumexp(&[1000.0, 1000.0]), 1000.0 + 2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(logsumexp(&[0.0, f64::NEG_INFINITY]), 0.0);
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn normalized_weights_exponentiate_to_one() {
        let normalized = normalize_log_weights(&[-3.0, 0.5, 2.0]);
        let total: f64 = normalized.iter().map(|w| w.exp()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn sample_log_weights_never_picks_impossible_entries() {
        let mut rng = StdRng::seed_from_u64(7);
        let log_weights = [f64::NEG_INFINITY, 0.0, f64::NAN, -1e6];
        for _ in 0..200 {
            assert_eq!(sample_log_weights(&log_weights, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn sample_log_weights_follows_the_distribution() {
        let mut rng = StdRng::seed_from_u64(11);
        let log_weights = [0.0, 3f64.ln()];
        let hits = (0..20_000)
            .filter(|_| sample_log_weights(&log_weights, &mut rng).unwrap() == 1)
            .count();
        let fraction = hits as f64 / 20_000.0;
        assert!((fraction - 0.75).abs() < 0.02, "fraction = {}", fraction);
    }

    #[test]
    fn sample_log_weights_rejects_degenerate_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_log_weights(&[], &mut rng),
            Err(SamplingError::EmptyWeights)
        ));
        assert!(matches!(
            sample_log_weights(&[f64::NEG_INFINITY, f64::NAN], &mut rng),
            Err(SamplingError::ZeroTotalWeight)
        ));
    }

    #[test]
    fn ln_factorial_matches_direct_product() {
        assert_eq!(ln_factorial(0), 0.0);
        assert_eq!(ln_factorial(1), 0.0);
        assert_relative_eq!(ln_factorial(5), 120f64.ln(), epsilon = 1e-12);
    }
}
