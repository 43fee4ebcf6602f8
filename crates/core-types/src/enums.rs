use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scheduling priority attached to every submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    fn weight(&self) -> u8 {
        match self {
            Priority::High => 2,
            Priority::Medium => 1,
            Priority::Low => 0,
        }
    }
}

// `High > Medium > Low`, so a max-heap pops high priority work first.
impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight().cmp(&other.weight())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The smoothing family requested for a single-series forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ForecastMethod {
    #[default]
    #[serde(alias = "exponential", alias = "ses")]
    Simple,
    #[serde(alias = "holt_winters")]
    HoltWinters,
}

/// How a `metric_shift` adjustment is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    /// `adjustment` is a percentage of the baseline (10.0 means +10%).
    Percentage,
    #[default]
    Absolute,
}

/// The `type` field of an intervention.
///
/// Only `metric_shift` has a direct effect; every other value is carried through
/// verbatim and treated as an indirect perturbation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    MetricShift,
    #[serde(untagged)]
    Other(String),
}
