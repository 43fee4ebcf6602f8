use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use core_types::{
    BlendResult, CorrelationReport, Intervention, ModelForecast, Observation, Priority,
    SimulationReport, TimeSeriesPoint,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Opaque correlation token linking a result back to its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// The closed set of work the execution context knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    CausalRecompute,
    ForecastBlend,
    SimulationProjection,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::CausalRecompute => "causal_recompute",
            TaskKind::ForecastBlend => "forecast_blend",
            TaskKind::SimulationProjection => "simulation_projection",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "causal_recompute" => Ok(TaskKind::CausalRecompute),
            "forecast_blend" => Ok(TaskKind::ForecastBlend),
            "simulation_projection" => Ok(TaskKind::SimulationProjection),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalRecomputePayload {
    pub observations: Vec<Observation>,
}

/// A model to be fitted on `history` inside the worker before blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_id: String,
    pub weight: f64,
    #[serde(default)]
    pub method: core_types::ForecastMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_length: Option<usize>,
}

/// Blend request. Precomputed `model_forecasts` are blended as-is; each entry in
/// `models` is first forecast from `history` and then joins the blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBlendPayload {
    pub metric_key: String,
    pub horizon: usize,
    #[serde(default)]
    pub model_forecasts: Vec<ModelForecast>,
    #[serde(default)]
    pub history: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProjectionPayload {
    pub baseline_metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    pub seed: String,
}

/// Strongly-typed payload, one variant per task kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    CausalRecompute(CausalRecomputePayload),
    ForecastBlend(ForecastBlendPayload),
    SimulationProjection(SimulationProjectionPayload),
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::CausalRecompute(_) => TaskKind::CausalRecompute,
            TaskPayload::ForecastBlend(_) => TaskKind::ForecastBlend,
            TaskPayload::SimulationProjection(_) => TaskKind::SimulationProjection,
        }
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            TaskPayload::CausalRecompute(p) => serde_json::to_value(p),
            TaskPayload::ForecastBlend(p) => serde_json::to_value(p),
            TaskPayload::SimulationProjection(p) => serde_json::to_value(p),
        }
    }

    fn from_json(kind: TaskKind, value: serde_json::Value) -> Result<Self, ProtocolError> {
        let mismatch = |source| ProtocolError::PayloadMismatch {
            kind: kind.to_string(),
            source,
        };
        Ok(match kind {
            TaskKind::CausalRecompute => {
                TaskPayload::CausalRecompute(serde_json::from_value(value).map_err(mismatch)?)
            }
            TaskKind::ForecastBlend => {
                TaskPayload::ForecastBlend(serde_json::from_value(value).map_err(mismatch)?)
            }
            TaskKind::SimulationProjection => {
                TaskPayload::SimulationProjection(serde_json::from_value(value).map_err(mismatch)?)
            }
        })
    }
}

/// A unit of work. Once submitted, the execution context owns it exclusively.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub payload: TaskPayload,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
}

impl Task {
    pub fn new(payload: TaskPayload, priority: Priority) -> Self {
        Self {
            id: TaskId::new(),
            payload,
            priority,
            submitted_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn to_envelope(&self) -> Result<TaskEnvelope, ProtocolError> {
        Ok(TaskEnvelope {
            id: Some(self.id),
            kind: self.kind().to_string(),
            payload: self.payload.to_json()?,
            priority: self.priority,
            timestamp: Some(self.submitted_at),
        })
    }
}

/// The loosely-typed wire form of a task: `{id, kind, payload, priority, timestamp}`.
///
/// Converting it into a [`Task`] is where unknown kinds and mismatched payloads
/// are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<TaskEnvelope> for Task {
    type Error = ProtocolError;

    fn try_from(envelope: TaskEnvelope) -> Result<Self, Self::Error> {
        let kind: TaskKind = envelope.kind.parse()?;
        let payload = TaskPayload::from_json(kind, envelope.payload)?;
        Ok(Task {
            id: envelope.id.unwrap_or_default(),
            payload,
            priority: envelope.priority,
            submitted_at: envelope.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

impl FromStr for Task {
    type Err = ProtocolError;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        let envelope: TaskEnvelope = serde_json::from_str(json)?;
        Task::try_from(envelope)
    }
}

/// The successful output of a task, tagged with the kind that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TaskOutput {
    CausalRecompute(CorrelationReport),
    ForecastBlend(BlendResult),
    SimulationProjection(SimulationReport),
}

impl TaskOutput {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskOutput::CausalRecompute(_) => TaskKind::CausalRecompute,
            TaskOutput::ForecastBlend(_) => TaskKind::ForecastBlend,
            TaskOutput::SimulationProjection(_) => TaskKind::SimulationProjection,
        }
    }
}

/// Outcome of one task: `{task_id, success, result | error, processing_time_ms}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: f64,
}

impl TaskResult {
    pub fn success(task_id: TaskId, output: TaskOutput, elapsed: Duration) -> Self {
        Self {
            task_id,
            success: true,
            result: Some(output),
            error: None,
            processing_time_ms: elapsed.as_micros() as f64 / 1_000.0,
        }
    }

    pub fn failure(task_id: TaskId, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            task_id,
            success: false,
            result: None,
            error: Some(error.into()),
            processing_time_ms: elapsed.as_micros() as f64 / 1_000.0,
        }
    }
}
