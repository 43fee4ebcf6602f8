use crate::error::EngineError;
use causal::CorrelationEngine;
use configuration::Settings;
use core_types::{BlendPoint, ModelForecast};
use events::{
    CausalRecomputePayload, ForecastBlendPayload, SimulationProjectionPayload, TaskOutput,
    TaskPayload,
};
use forecasting::{ForecastBlender, ForecastEngine, ForecastOptions};
use simulation::SimulationEngine;

/// The seam between the runner and the calculators.
///
/// Implementations run on the blocking pool, one call per task. They must not
/// assume anything about which thread they run on or what else is running.
pub trait TaskExecutor: Send + Sync + 'static {
    fn execute(&self, payload: TaskPayload) -> Result<TaskOutput, EngineError>;
}

/// Runs each task kind through its engine, applying the configured input caps.
#[derive(Debug, Clone)]
pub struct AnalyticsExecutor {
    settings: Settings,
}

impl AnalyticsExecutor {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn recompute_correlations(
        &self,
        payload: CausalRecomputePayload,
    ) -> Result<TaskOutput, EngineError> {
        let limits = &self.settings.correlation;
        check_limit("observations", payload.observations.len(), limits.max_observations)?;

        let engine = CorrelationEngine::with_threshold(limits.edge_threshold)?;
        Ok(TaskOutput::CausalRecompute(engine.correlate(&payload.observations)?))
    }

    fn blend_forecasts(&self, payload: ForecastBlendPayload) -> Result<TaskOutput, EngineError> {
        let limits = &self.settings.forecast;
        let horizon = payload.horizon.min(limits.max_horizon);
        if horizon < payload.horizon {
            tracing::debug!(
                requested = payload.horizon,
                horizon,
                "Clamped forecast horizon to the configured maximum."
            );
        }

        let engine = ForecastEngine::with_defaults(limits.alpha, limits.beta, limits.gamma)
            .with_floor(limits.value_floor);

        let mut models = payload.model_forecasts;
        for spec in payload.models {
            let options = ForecastOptions {
                method: spec.method,
                alpha: spec.alpha,
                beta: spec.beta,
                gamma: spec.gamma,
                season_length: spec.season_length,
            };
            let points = engine.forecast(&payload.history, horizon, &options)?;
            models.push(ModelForecast {
                model_id: spec.model_id,
                points: points.into_iter().map(BlendPoint::from).collect(),
                weight: spec.weight,
            });
        }

        let blended = ForecastBlender::new().blend(&models, &payload.metric_key, horizon)?;
        Ok(TaskOutput::ForecastBlend(blended))
    }

    fn project_scenario(
        &self,
        payload: SimulationProjectionPayload,
    ) -> Result<TaskOutput, EngineError> {
        check_limit(
            "interventions",
            payload.interventions.len(),
            self.settings.simulation.max_interventions,
        )?;

        let report = SimulationEngine::new().simulate(
            &payload.baseline_metrics,
            &payload.interventions,
            &payload.seed,
        )?;
        Ok(TaskOutput::SimulationProjection(report))
    }
}

impl TaskExecutor for AnalyticsExecutor {
    fn execute(&self, payload: TaskPayload) -> Result<TaskOutput, EngineError> {
        match payload {
            TaskPayload::CausalRecompute(p) => self.recompute_correlations(p),
            TaskPayload::ForecastBlend(p) => self.blend_forecasts(p),
            TaskPayload::SimulationProjection(p) => self.project_scenario(p),
        }
    }
}

fn check_limit(what: &'static str, actual: usize, limit: usize) -> Result<(), EngineError> {
    if actual > limit {
        return Err(EngineError::LimitExceeded { what, actual, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ForecastMethod, Observation, TimeSeriesPoint};
    use events::ModelSpec;
    use std::collections::BTreeMap;

    fn history(len: usize) -> Vec<TimeSeriesPoint> {
        (0..len)
            .map(|i| TimeSeriesPoint::new(i as i64 * 86_400, 100.0 + (i % 7) as f64))
            .collect()
    }

    fn model(id: &str, weight: f64) -> ModelSpec {
        ModelSpec {
            model_id: id.to_string(),
            weight,
            method: ForecastMethod::Simple,
            alpha: None,
            beta: None,
            gamma: None,
            season_length: None,
        }
    }

    #[test]
    fn blend_fits_models_on_history_and_clamps_horizon() {
        let mut settings = Settings::default();
        settings.forecast.max_horizon = 5;
        let executor = AnalyticsExecutor::new(settings);

        let payload = ForecastBlendPayload {
            metric_key: "revenue".to_string(),
            horizon: 30,
            model_forecasts: Vec::new(),
            history: history(28),
            models: vec![model("ses-fast", 1.0), model("ses-slow", 1.0)],
        };
        let output = executor.execute(TaskPayload::ForecastBlend(payload)).unwrap();
        let TaskOutput::ForecastBlend(blend) = output else {
            panic!("expected a blend result");
        };
        assert_eq!(blend.metric_key, "revenue");
        assert_eq!(blend.model_count, 2);
        assert_eq!(blend.points.len(), 5);
        assert!((blend.weights["ses-fast"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn too_many_observations_is_rejected() {
        let mut settings = Settings::default();
        settings.correlation.max_observations = 2;
        let executor = AnalyticsExecutor::new(settings);

        let observations: Vec<Observation> = (0..3)
            .map(|i| Observation {
                metric_key: "visits".to_string(),
                value: i as f64,
                timestamp: i,
                features: BTreeMap::new(),
            })
            .collect();
        let err = executor
            .execute(TaskPayload::CausalRecompute(CausalRecomputePayload { observations }))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::LimitExceeded { what: "observations", actual: 3, limit: 2 }
        ));
    }

    #[test]
    fn simulation_runs_through_the_engine() {
        let executor = AnalyticsExecutor::new(Settings::default());
        let payload = SimulationProjectionPayload {
            baseline_metrics: BTreeMap::from([("revenue".to_string(), 100.0)]),
            interventions: Vec::new(),
            seed: "q3".to_string(),
        };
        let output = executor.execute(TaskPayload::SimulationProjection(payload)).unwrap();
        let TaskOutput::SimulationProjection(report) = output else {
            panic!("expected a simulation report");
        };
        assert_eq!(report.projected_metrics["revenue"].projected, 100.0);
        assert_eq!(report.seed, "q3");
    }
}
