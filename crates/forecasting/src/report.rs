use core_types::{ForecastMethod, ForecastPoint};
use serde::{Deserialize, Serialize};

/// The projected points together with diagnostics about the fit that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// The method that actually ran, which may differ from the one requested.
    pub method: ForecastMethod,
    pub points: Vec<ForecastPoint>,
    /// In-sample fitted values, aligned with the input series.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fitted: Vec<f64>,
    pub residual_std_dev: f64,
    pub mean_absolute_error: f64,
}

impl ForecastReport {
    pub fn new(
        method: ForecastMethod,
        points: Vec<ForecastPoint>,
        fitted: Vec<f64>,
        residual_std_dev: f64,
        mean_absolute_error: f64,
    ) -> Self {
        Self {
            method,
            points,
            fitted,
            residual_std_dev,
            mean_absolute_error,
        }
    }

    /// A report with no points, used when there is not enough history.
    pub fn empty(method: ForecastMethod) -> Self {
        Self::new(method, Vec::new(), Vec::new(), 0.0, 0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
