use std::collections::HashMap;

/// Fuses a collection of per-belief confidences into a single scalar.
///
/// Implementations must stay monotonically non-decreasing in each input and
/// return a value in `[0, 1]`; an empty input must return `0.0`.
pub trait UncertaintyAggregator: Send + Sync {
    /// Aggregates the given confidences.
    fn aggregate(&self, confidences: &[f64]) -> f64;
}

/// Default strategy: arithmetic mean.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanAggregator;

impl UncertaintyAggregator for MeanAggregator {
    fn aggregate(&self, confidences: &[f64]) -> f64 {
        if confidences.is_empty() {
            return 0.0;
        }
        let sum: f64 = confidences.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let count = confidences.len() as f64;
        (sum / count).clamp(0.0, 1.0)
    }
}

/// Conservative alternative: geometric mean weighted toward lower confidences,
/// scaled by `risk_tolerance`. Still monotonic in each input.
#[derive(Debug, Clone, Copy)]
pub struct GeometricAggregator {
    risk_tolerance: f64,
}

impl GeometricAggregator {
    /// Builds a geometric aggregator with the given risk tolerance in `[0, 1]`.
    #[must_use]
    pub fn new(risk_tolerance: f64) -> Self {
        Self {
            risk_tolerance: risk_tolerance.clamp(0.0, 1.0),
        }
    }
}

impl UncertaintyAggregator for GeometricAggregator {
    fn aggregate(&self, confidences: &[f64]) -> f64 {
        if confidences.is_empty() {
            return 0.0;
        }
        let epsilon = 1e-6;
        let product: f64 = confidences
            .iter()
            .map(|c| c.clamp(0.0, 1.0).max(epsilon))
            .product();
        #[allow(clippy::cast_precision_loss)]
        let count = confidences.len() as f64;
        let geo_mean = product.powf(1.0 / count);
        (geo_mean * (1.0 - self.risk_tolerance * 0.5)).clamp(0.0, 1.0)
    }
}

/// Posterior distribution keyed by outcome label, as produced by a belief
/// network walking a piece of evidence.
pub type PosteriorDistribution = HashMap<String, f64>;

/// Interface to an externally supplied Bayesian-style belief network.
///
/// Left as an interface; the core only requires posterior propagation over
/// evidence tokens. No default implementation is provided since any concrete
/// network is domain-specific.
pub trait BeliefNetwork: Send + Sync {
    /// Propagates a single evidence token, returning a posterior distribution
    /// over outcome labels.
    fn propagate(&self, evidence: &str) -> PosteriorDistribution;
}

/// Extracts the posterior maximum for each evidence token via `network`.
#[must_use]
pub fn posterior_maxima(network: &dyn BeliefNetwork, evidence: &[String]) -> Vec<f64> {
    evidence
        .iter()
        .map(|token| {
            network
                .propagate(token)
                .values()
                .copied()
                .fold(0.0_f64, f64::max)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert!((MeanAggregator.aggregate(&[]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_is_monotonic() {
        let low = MeanAggregator.aggregate(&[0.2, 0.4]);
        let high = MeanAggregator.aggregate(&[0.3, 0.4]);
        assert!(high >= low);
    }

    #[test]
    fn geometric_stays_in_bounds() {
        let aggregator = GeometricAggregator::new(0.5);
        let value = aggregator.aggregate(&[0.9, 0.95, 1.0]);
        assert!((0.0..=1.0).contains(&value));
    }

    struct FixedNetwork;

    impl BeliefNetwork for FixedNetwork {
        fn propagate(&self, evidence: &str) -> PosteriorDistribution {
            let mut dist = PosteriorDistribution::new();
            dist.insert("true".into(), if evidence == "smoke" { 0.8 } else { 0.2 });
            dist.insert("false".into(), 0.1);
            dist
        }
    }

    #[test]
    fn posterior_maxima_picks_highest_per_token() {
        let maxima = posterior_maxima(&FixedNetwork, &["smoke".to_string(), "quiet".to_string()]);
        assert!((maxima[0] - 0.8).abs() < f64::EPSILON);
        assert!((maxima[1] - 0.2).abs() < f64::EPSILON);
    }
}
