use crate::enums::{AdjustmentType, InterventionKind};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single observation of a metric at a point in time.
///
/// Within one series timestamps are expected to be non-decreasing. Duplicate
/// timestamps are tolerated; their relative order carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.value.is_finite() {
            return Err(CoreError::InvalidInput(
                format!("series point at {}", self.timestamp),
                format!("value {} is not finite", self.value),
            ));
        }
        Ok(())
    }
}

/// A projected value with its confidence interval.
///
/// Invariant: `lower_bound <= value <= upper_bound`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: i64,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Builds a symmetric interval around `value` with both bounds floored at
    /// `floor` when one is given. The value itself is never moved; if it sits
    /// below the floor, the lower bound is the value.
    pub fn from_half_width(
        timestamp: i64,
        value: f64,
        half_width: f64,
        floor: Option<f64>,
    ) -> Self {
        let half_width = half_width.abs();
        let (lower_bound, upper_bound) = match floor {
            Some(floor) => ((value - half_width).max(floor), (value + half_width).max(floor)),
            None => (value - half_width, value + half_width),
        };
        Self {
            timestamp,
            value,
            lower_bound: lower_bound.min(value),
            upper_bound: upper_bound.max(value),
        }
    }

    /// Distance from the value to the upper bound.
    pub fn half_width(&self) -> f64 {
        self.upper_bound - self.value
    }
}

/// A point inside a model forecast or a blended series. Bounds are optional
/// because not every model reports an interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendPoint {
    pub timestamp: i64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
}

impl From<ForecastPoint> for BlendPoint {
    fn from(point: ForecastPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            value: point.value,
            lower_bound: Some(point.lower_bound),
            upper_bound: Some(point.upper_bound),
        }
    }
}

/// One model's contribution to a blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelForecast {
    pub model_id: String,
    pub points: Vec<BlendPoint>,
    pub weight: f64,
}

/// The blended series together with each model's normalized weight share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlendResult {
    pub metric_key: String,
    pub points: Vec<BlendPoint>,
    pub weights: BTreeMap<String, f64>,
    pub model_count: usize,
}

/// A raw metric observation fed to the correlation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub metric_key: String,
    pub value: f64,
    pub timestamp: i64,
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl Observation {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.metric_key.is_empty() {
            return Err(CoreError::InvalidInput(
                "observation".to_string(),
                "metric_key must not be empty".to_string(),
            ));
        }
        if !self.value.is_finite() {
            return Err(CoreError::InvalidInput(
                format!("observation '{}'", self.metric_key),
                format!("value {} is not finite", self.value),
            ));
        }
        Ok(())
    }
}

/// Pearson correlation between two metrics. Each unordered pair appears once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEdge {
    pub metric_a: String,
    pub metric_b: String,
    pub correlation: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// Every computed pair, regardless of strength.
    pub correlations: Vec<CorrelationEdge>,
    pub node_count: usize,
    /// Number of pairs whose absolute correlation exceeds the edge threshold.
    pub edge_count: usize,
    pub computed_at: DateTime<Utc>,
}

impl CorrelationReport {
    /// The pairs that would be drawn as graph edges at the given threshold.
    pub fn edges(&self, threshold: f64) -> impl Iterator<Item = &CorrelationEdge> {
        self.correlations
            .iter()
            .filter(move |edge| edge.correlation.abs() > threshold)
    }
}

/// A hypothetical change applied during scenario simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    #[serde(rename = "type")]
    pub kind: InterventionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_type: Option<AdjustmentType>,
}

impl Intervention {
    pub fn metric_shift(
        metric_key: &str,
        adjustment: f64,
        adjustment_type: AdjustmentType,
    ) -> Self {
        Self {
            kind: InterventionKind::MetricShift,
            metric_key: Some(metric_key.to_string()),
            adjustment: Some(adjustment),
            adjustment_type: Some(adjustment_type),
        }
    }

    /// Whether this intervention directly shifts `metric_key`.
    pub fn targets(&self, metric_key: &str) -> bool {
        self.kind == InterventionKind::MetricShift && self.metric_key.as_deref() == Some(metric_key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricProjection {
    pub baseline: f64,
    pub projected: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub projected_metrics: BTreeMap<String, MetricProjection>,
    pub intervention_count: usize,
    pub seed: String,
    pub computed_at: DateTime<Utc>,
}
