use crate::error::ForecastError;
use core_types::{BlendPoint, BlendResult, ModelForecast};
use std::collections::{BTreeMap, HashSet};

/// Running weighted sums for one output timestamp.
#[derive(Default)]
struct Accumulator {
    value_sum: f64,
    weight_sum: f64,
    lower_sum: f64,
    lower_weight: f64,
    upper_sum: f64,
    upper_weight: f64,
}

impl Accumulator {
    fn add(&mut self, point: &BlendPoint, weight: f64) {
        self.value_sum += weight * point.value;
        self.weight_sum += weight;
        if let Some(lower) = point.lower_bound {
            self.lower_sum += weight * lower;
            self.lower_weight += weight;
        }
        if let Some(upper) = point.upper_bound {
            self.upper_sum += weight * upper;
            self.upper_weight += weight;
        }
    }

    fn finish(&self, timestamp: i64) -> Option<BlendPoint> {
        if self.weight_sum <= 0.0 {
            return None;
        }
        let value = self.value_sum / self.weight_sum;
        // Bounds may be averaged over a different subset of models than the value,
        // so they are widened to keep `lower <= value <= upper`.
        let lower_bound = (self.lower_weight > 0.0)
            .then(|| (self.lower_sum / self.lower_weight).min(value));
        let upper_bound = (self.upper_weight > 0.0)
            .then(|| (self.upper_sum / self.upper_weight).max(value));
        Some(BlendPoint {
            timestamp,
            value,
            lower_bound,
            upper_bound,
        })
    }
}

/// Combines several model forecasts into one weighted series.
///
/// Output timestamps are the union of every model's timestamps. At each instant
/// only models with a point at exactly that timestamp take part; there is no
/// interpolation between a model's points.
#[derive(Debug, Default)]
pub struct ForecastBlender {}

impl ForecastBlender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blends `models` for `metric_key`, keeping at most `horizon` points
    /// (`0` keeps all of them).
    ///
    /// An empty model list, or one whose weights are all zero, produces an empty
    /// series rather than an error. Model ids must be unique.
    pub fn blend(
        &self,
        models: &[ModelForecast],
        metric_key: &str,
        horizon: usize,
    ) -> Result<BlendResult, ForecastError> {
        let mut seen = HashSet::with_capacity(models.len());
        for model in models {
            if !seen.insert(model.model_id.as_str()) {
                return Err(ForecastError::DuplicateModel(model.model_id.clone()));
            }
            if !model.weight.is_finite() || model.weight < 0.0 {
                return Err(ForecastError::InvalidWeight {
                    model_id: model.model_id.clone(),
                    weight: model.weight,
                });
            }
        }

        let total_weight: f64 = models.iter().map(|m| m.weight).sum();
        let weights = models
            .iter()
            .map(|m| {
                let share = if total_weight > 0.0 { m.weight / total_weight } else { 0.0 };
                (m.model_id.clone(), share)
            })
            .collect();

        let mut by_timestamp: BTreeMap<i64, Accumulator> = BTreeMap::new();
        for model in models {
            for point in &model.points {
                by_timestamp
                    .entry(point.timestamp)
                    .or_default()
                    .add(point, model.weight);
            }
        }

        let limit = if horizon == 0 { usize::MAX } else { horizon };
        let points: Vec<BlendPoint> = by_timestamp
            .iter()
            .filter_map(|(timestamp, acc)| acc.finish(*timestamp))
            .take(limit)
            .collect();

        tracing::debug!(
            metric_key,
            models = models.len(),
            points = points.len(),
            "Blended model forecasts."
        );

        Ok(BlendResult {
            metric_key: metric_key.to_string(),
            points,
            weights,
            model_count: models.len(),
        })
    }
}
