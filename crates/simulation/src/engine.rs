use crate::error::SimulationError;
use crate::rng::SeededRng;
use chrono::Utc;
use core_types::{AdjustmentType, Intervention, MetricProjection, SimulationReport};
use std::collections::BTreeMap;

/// Confidence multiplier for an intervention that targets the metric directly.
pub const DIRECT_CONFIDENCE_DECAY: f64 = 0.9;
/// Confidence multiplier for any other intervention.
pub const INDIRECT_CONFIDENCE_DECAY: f64 = 0.7;
/// Confidence never compounds below this.
pub const CONFIDENCE_FLOOR: f64 = 0.1;
/// Indirect effects move a metric by at most this fraction of its baseline.
pub const INDIRECT_EFFECT_SCALE: f64 = 0.1;

/// Projects baseline metrics through an ordered list of interventions.
///
/// Output depends only on the inputs and the seed: metrics are processed in
/// key order and share one generator, so identical calls produce identical
/// projections.
#[derive(Debug, Default)]
pub struct SimulationEngine {}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the scenario and wraps the projections in a timestamped report.
    pub fn simulate(
        &self,
        baseline: &BTreeMap<String, f64>,
        interventions: &[Intervention],
        seed: &str,
    ) -> Result<SimulationReport, SimulationError> {
        let projected_metrics = self.project(baseline, interventions, seed)?;
        Ok(SimulationReport {
            projected_metrics,
            intervention_count: interventions.len(),
            seed: seed.to_string(),
            computed_at: Utc::now(),
        })
    }

    /// The deterministic core of [`simulate`](Self::simulate).
    pub fn project(
        &self,
        baseline: &BTreeMap<String, f64>,
        interventions: &[Intervention],
        seed: &str,
    ) -> Result<BTreeMap<String, MetricProjection>, SimulationError> {
        for (index, intervention) in interventions.iter().enumerate() {
            if intervention.adjustment.is_some_and(|a| !a.is_finite()) {
                return Err(SimulationError::InvalidAdjustment { index });
            }
        }

        let mut rng = SeededRng::from_seed(seed);
        let mut projections = BTreeMap::new();

        for (metric_key, &base) in baseline {
            if !base.is_finite() {
                return Err(SimulationError::InvalidBaseline(metric_key.clone()));
            }

            let mut projected = base;
            let mut confidence: f64 = 1.0;

            for intervention in interventions {
                if intervention.targets(metric_key) {
                    let adjustment = intervention.adjustment.unwrap_or(0.0);
                    projected += match intervention.adjustment_type.unwrap_or_default() {
                        AdjustmentType::Percentage => base * adjustment / 100.0,
                        AdjustmentType::Absolute => adjustment,
                    };
                    confidence *= DIRECT_CONFIDENCE_DECAY;
                } else {
                    projected += rng.next_signed() * INDIRECT_EFFECT_SCALE * base;
                    confidence *= INDIRECT_CONFIDENCE_DECAY;
                }
            }

            projections.insert(
                metric_key.clone(),
                MetricProjection {
                    baseline: base,
                    projected,
                    confidence: confidence.max(CONFIDENCE_FLOOR),
                },
            );
        }

        tracing::debug!(
            metrics = projections.len(),
            interventions = interventions.len(),
            seed,
            "Scenario projected."
        );

        Ok(projections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::InterventionKind;

    fn baseline(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn other(kind: &str) -> Intervention {
        Intervention {
            kind: InterventionKind::Other(kind.to_string()),
            metric_key: None,
            adjustment: None,
            adjustment_type: None,
        }
    }

    #[test]
    fn percentage_shift_is_relative_to_baseline() {
        let engine = SimulationEngine::new();
        let interventions = [Intervention::metric_shift(
            "revenue",
            10.0,
            AdjustmentType::Percentage,
        )];
        let result = engine
            .project(&baseline(&[("revenue", 200.0)]), &interventions, "s")
            .unwrap();
        let revenue = result["revenue"];
        assert!((revenue.projected - 220.0).abs() < 1e-12);
        assert!((revenue.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn absolute_shifts_accumulate_against_baseline() {
        let engine = SimulationEngine::new();
        let interventions = [
            Intervention::metric_shift("revenue", 10.0, AdjustmentType::Percentage),
            Intervention::metric_shift("revenue", -5.0, AdjustmentType::Absolute),
            Intervention::metric_shift("revenue", 10.0, AdjustmentType::Percentage),
        ];
        let result = engine
            .project(&baseline(&[("revenue", 100.0)]), &interventions, "s")
            .unwrap();
        let revenue = result["revenue"];
        assert!((revenue.projected - 115.0).abs() < 1e-12);
        assert!((revenue.confidence - 0.729).abs() < 1e-12);
    }

    #[test]
    fn indirect_effects_stay_within_ten_percent_each() {
        let engine = SimulationEngine::new();
        let interventions = [other("campaign_launch")];
        let result = engine
            .project(&baseline(&[("visits", 1_000.0)]), &interventions, "seed-1")
            .unwrap();
        let visits = result["visits"];
        assert!((visits.projected - 1_000.0).abs() <= 100.0);
        assert!((visits.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn shifts_for_other_metrics_count_as_indirect() {
        let engine = SimulationEngine::new();
        let interventions = [Intervention::metric_shift("revenue", 50.0, AdjustmentType::Absolute)];
        let result = engine
            .project(&baseline(&[("revenue", 10.0), ("visits", 10.0)]), &interventions, "x")
            .unwrap();
        assert!((result["revenue"].confidence - 0.9).abs() < 1e-12);
        assert!((result["visits"].confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn confidence_is_floored() {
        let engine = SimulationEngine::new();
        let interventions: Vec<Intervention> = (0..20).map(|_| other("noise")).collect();
        let result = engine
            .project(&baseline(&[("m", 5.0)]), &interventions, "floor")
            .unwrap();
        assert_eq!(result["m"].confidence, CONFIDENCE_FLOOR);
    }

    #[test]
    fn no_interventions_leaves_baseline_untouched() {
        let engine = SimulationEngine::new();
        let report = engine.simulate(&baseline(&[("m", 42.0)]), &[], "seed").unwrap();
        assert_eq!(report.projected_metrics["m"].projected, 42.0);
        assert_eq!(report.projected_metrics["m"].confidence, 1.0);
        assert_eq!(report.intervention_count, 0);
        assert_eq!(report.seed, "seed");
    }

    #[test]
    fn rejects_non_finite_inputs() {
        let engine = SimulationEngine::new();
        assert!(matches!(
            engine.project(&baseline(&[("m", f64::NAN)]), &[], "s"),
            Err(SimulationError::InvalidBaseline(_))
        ));
        let bad = [Intervention::metric_shift("m", f64::INFINITY, AdjustmentType::Absolute)];
        assert!(matches!(
            engine.project(&baseline(&[("m", 1.0)]), &bad, "s"),
            Err(SimulationError::InvalidAdjustment { index: 0 })
        ));
    }
}
