use crate::error::CausalError;
use chrono::Utc;
use core_types::{CorrelationEdge, CorrelationReport, Observation};
use itertools::Itertools;
use std::collections::HashMap;

pub const DEFAULT_EDGE_THRESHOLD: f64 = 0.3;

/// Sample size at which the naive confidence score saturates.
const CONFIDENCE_SATURATION: f64 = 100.0;

/// Computes pairwise Pearson correlations between metric series.
#[derive(Debug, Clone)]
pub struct CorrelationEngine {
    edge_threshold: f64,
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
        }
    }
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(edge_threshold: f64) -> Result<Self, CausalError> {
        if !(0.0..1.0).contains(&edge_threshold) {
            return Err(CausalError::InvalidThreshold(edge_threshold));
        }
        Ok(Self { edge_threshold })
    }

    pub fn edge_threshold(&self) -> f64 {
        self.edge_threshold
    }

    /// Groups observations by metric and scores every unordered pair of metrics.
    ///
    /// Values are paired by position within each metric's arrival order, not by
    /// timestamp; the longer series is truncated. All pairs are returned, and
    /// `edge_count` only summarizes how many clear the threshold. Within a pair,
    /// `metric_a` is the metric that was observed first.
    pub fn correlate(
        &self,
        observations: &[Observation],
    ) -> Result<CorrelationReport, CausalError> {
        for observation in observations {
            observation.validate()?;
        }

        let series = group_by_metric(observations);

        let correlations: Vec<CorrelationEdge> = series
            .iter()
            .tuple_combinations()
            .map(|((key_a, values_a), (key_b, values_b))| {
                let samples = values_a.len().min(values_b.len());
                CorrelationEdge {
                    metric_a: key_a.to_string(),
                    metric_b: key_b.to_string(),
                    correlation: pearson(values_a, values_b),
                    confidence: (samples as f64 / CONFIDENCE_SATURATION).clamp(0.0, 1.0),
                }
            })
            .collect();

        let edge_count = correlations
            .iter()
            .filter(|edge| edge.correlation.abs() > self.edge_threshold)
            .count();

        tracing::debug!(
            observations = observations.len(),
            nodes = series.len(),
            pairs = correlations.len(),
            edges = edge_count,
            "Correlation graph computed."
        );

        Ok(CorrelationReport {
            correlations,
            node_count: series.len(),
            edge_count,
            computed_at: Utc::now(),
        })
    }
}

/// Groups values by metric key, keeping metrics in first-arrival order and values
/// in arrival order.
fn group_by_metric(observations: &[Observation]) -> Vec<(&str, Vec<f64>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut series: Vec<(&str, Vec<f64>)> = Vec::new();
    for observation in observations {
        let key = observation.metric_key.as_str();
        let slot = *index.entry(key).or_insert_with(|| {
            series.push((key, Vec::new()));
            series.len() - 1
        });
        series[slot].1.push(observation.value);
    }
    series
}

/// Pearson correlation over the common prefix of `a` and `b`.
///
/// Returns 0 when fewer than two pairs are available or either side has zero
/// variance. Each side is scaled by its largest magnitude first, so sums of
/// squares stay finite for any finite input.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (Some(a), Some(b)) = (normalized(&a[..n]), normalized(&b[..n])) else {
        return 0.0;
    };
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let (mut covariance, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(&b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denominator = var_a.sqrt() * var_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (covariance / denominator).clamp(-1.0, 1.0)
}

/// `values` divided by their largest magnitude. `None` for all-zero or
/// non-finite input.
fn normalized(values: &[f64]) -> Option<Vec<f64>> {
    let scale = values.iter().fold(0.0_f64, |max, v| max.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    Some(values.iter().map(|v| v / scale).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(key: &str, value: f64, timestamp: i64) -> Observation {
        Observation {
            metric_key: key.to_string(),
            value,
            timestamp,
            features: Default::default(),
        }
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let mut observations = Vec::new();
        for (i, v) in [1.0, 4.0, 2.0, 8.0, 5.0].iter().enumerate() {
            observations.push(obs("visits", *v, i as i64));
            observations.push(obs("signups", *v, i as i64));
        }
        let report = CorrelationEngine::new().correlate(&observations).unwrap();
        assert_eq!(report.node_count, 2);
        assert_eq!(report.correlations.len(), 1);
        assert!((report.correlations[0].correlation - 1.0).abs() < 1e-12);
        assert_eq!(report.edge_count, 1);
    }

    #[test]
    fn mirrored_series_correlate_negatively() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn extreme_magnitudes_keep_their_correlation() {
        let huge = [1e300, 3e300, 2e300, 5e300];
        let mirrored: Vec<f64> = huge.iter().map(|v| -v).collect();
        assert!((pearson(&huge, &huge) - 1.0).abs() < 1e-12);
        assert!((pearson(&huge, &mirrored) + 1.0).abs() < 1e-12);

        let tiny = [1e-300, 3e-300, 2e-300, 5e-300];
        assert!((pearson(&tiny, &tiny) - 1.0).abs() < 1e-12);
        assert!((pearson(&huge, &tiny) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_yield_zero() {
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
    }

    #[test]
    fn unequal_lengths_are_truncated_positionally() {
        // Only the first three values of `a` take part.
        let a = [1.0, 2.0, 3.0, -100.0, 55.0];
        let b = [2.0, 4.0, 6.0];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn every_pair_reported_once_in_arrival_order() {
        let observations = vec![
            obs("c", 1.0, 0),
            obs("a", 1.0, 0),
            obs("b", 5.0, 0),
            obs("c", 2.0, 1),
            obs("a", 3.0, 1),
            obs("b", 5.0, 1),
        ];
        let report = CorrelationEngine::new().correlate(&observations).unwrap();
        let pairs: Vec<(&str, &str)> = report
            .correlations
            .iter()
            .map(|e| (e.metric_a.as_str(), e.metric_b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("c", "a"), ("c", "b"), ("a", "b")]);
        // `b` is constant, so only the c/a pair is an edge.
        assert_eq!(report.edge_count, 1);
        assert_eq!(report.edges(0.3).count(), 1);
    }

    #[test]
    fn confidence_scales_with_sample_size() {
        let mut observations = Vec::new();
        for i in 0..150 {
            observations.push(obs("x", i as f64, i));
            if i < 40 {
                observations.push(obs("y", (i * 2) as f64, i));
            }
        }
        let report = CorrelationEngine::new().correlate(&observations).unwrap();
        assert!((report.correlations[0].confidence - 0.4).abs() < 1e-12);

        let observations: Vec<Observation> =
            (0..150).flat_map(|i| [obs("x", i as f64, i), obs("y", i as f64, i)]).collect();
        let report = CorrelationEngine::new().correlate(&observations).unwrap();
        assert_eq!(report.correlations[0].confidence, 1.0);
    }

    #[test]
    fn single_metric_has_no_pairs() {
        let report = CorrelationEngine::new().correlate(&[obs("x", 1.0, 0)]).unwrap();
        assert_eq!(report.node_count, 1);
        assert!(report.correlations.is_empty());
        assert_eq!(report.edge_count, 0);
    }

    #[test]
    fn rejects_invalid_threshold_and_observations() {
        assert!(CorrelationEngine::with_threshold(1.5).is_err());
        let err = CorrelationEngine::new()
            .correlate(&[obs("x", f64::INFINITY, 0)])
            .unwrap_err();
        assert!(matches!(err, CausalError::InvalidObservation(_)));
    }
}
