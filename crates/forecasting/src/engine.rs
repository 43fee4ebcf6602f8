use crate::error::ForecastError;
use crate::report::ForecastReport;
use core_types::{ForecastMethod, ForecastPoint, TimeSeriesPoint};
use serde::{Deserialize, Serialize};

/// Series shorter than this produce an empty forecast.
pub const MIN_SERIES_LEN: usize = 8;
/// Holt-Winters is only considered for seasons at least this long.
pub const MIN_SEASON_LENGTH: usize = 5;
/// Two-sided 95% normal quantile used for every confidence interval.
pub const CONFIDENCE_Z: f64 = 1.96;

pub const DEFAULT_ALPHA: f64 = 0.3;
pub const DEFAULT_BETA: f64 = 0.1;
pub const DEFAULT_GAMMA: f64 = 0.1;

/// Per-call forecasting options. Unset constants fall back to the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastOptions {
    pub method: ForecastMethod,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub season_length: Option<usize>,
}

impl ForecastOptions {
    pub fn holt_winters(season_length: usize) -> Self {
        Self {
            method: ForecastMethod::HoltWinters,
            season_length: Some(season_length),
            ..Self::default()
        }
    }
}

/// A stateless calculator for single-series forecasts.
///
/// Two algorithms are available: simple exponential smoothing (a flat projection
/// of the last smoothed level) and additive Holt-Winters (level, trend and a
/// seasonal component). Holt-Winters is used only when it was requested *and* the
/// series holds more than two full seasons; otherwise the engine quietly falls
/// back to simple smoothing.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    alpha: f64,
    beta: f64,
    gamma: f64,
    floor: Option<f64>,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            floor: Some(0.0),
        }
    }
}

/// Output of a smoothing pass over the observed series.
struct Fit {
    fitted: Vec<f64>,
    residual_std_dev: f64,
    mean_absolute_error: f64,
}

impl Fit {
    fn into_report(self, method: ForecastMethod, points: Vec<ForecastPoint>) -> ForecastReport {
        ForecastReport::new(
            method,
            points,
            self.fitted,
            self.residual_std_dev,
            self.mean_absolute_error,
        )
    }
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default smoothing constants used when a call leaves them unset.
    pub fn with_defaults(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            ..Self::default()
        }
    }

    /// Sets the domain minimum applied to projected values and lower bounds.
    /// `None` disables clamping for metrics that may legitimately go negative.
    pub fn with_floor(mut self, floor: Option<f64>) -> Self {
        self.floor = floor;
        self
    }

    /// Projects `horizon` future points.
    ///
    /// Returns an empty vector when the series is shorter than [`MIN_SERIES_LEN`]
    /// or `horizon` is zero; insufficient history is not an error.
    pub fn forecast(
        &self,
        series: &[TimeSeriesPoint],
        horizon: usize,
        options: &ForecastOptions,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        Ok(self.forecast_with_fit(series, horizon, options)?.points)
    }

    /// Same as [`forecast`](Self::forecast) but also reports which method ran
    /// and how well it fit the observed history.
    pub fn forecast_with_fit(
        &self,
        series: &[TimeSeriesPoint],
        horizon: usize,
        options: &ForecastOptions,
    ) -> Result<ForecastReport, ForecastError> {
        let alpha = checked("alpha", options.alpha.unwrap_or(self.alpha))?;
        let beta = checked("beta", options.beta.unwrap_or(self.beta))?;
        let gamma = checked("gamma", options.gamma.unwrap_or(self.gamma))?;

        if series.len() < MIN_SERIES_LEN || horizon == 0 {
            tracing::debug!(
                points = series.len(),
                horizon,
                "Not enough history to forecast; returning empty result."
            );
            return Ok(ForecastReport::empty(ForecastMethod::Simple));
        }
        for point in series {
            point.validate()?;
        }

        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        let step = timestamp_step(series);
        let last_timestamp = series[series.len() - 1].timestamp;

        let season = options
            .season_length
            .filter(|m| *m >= MIN_SEASON_LENGTH && values.len() > 2 * m);

        let report = match (options.method, season) {
            (ForecastMethod::HoltWinters, Some(m)) => {
                let (fit, points) = self.holt_winters(
                    &values,
                    m,
                    horizon,
                    alpha,
                    beta,
                    gamma,
                    last_timestamp,
                    step,
                );
                fit.into_report(ForecastMethod::HoltWinters, points)
            }
            (method, _) => {
                if method == ForecastMethod::HoltWinters {
                    tracing::debug!(
                        season_length = ?options.season_length,
                        points = values.len(),
                        "Holt-Winters preconditions not met; using simple exponential smoothing."
                    );
                }
                let (fit, points) = self.simple(&values, horizon, alpha, last_timestamp, step);
                fit.into_report(ForecastMethod::Simple, points)
            }
        };

        Ok(report)
    }

    /// Simple exponential smoothing with a flat projection and constant-width bounds.
    fn simple(
        &self,
        values: &[f64],
        horizon: usize,
        alpha: f64,
        last_timestamp: i64,
        step: i64,
    ) -> (Fit, Vec<ForecastPoint>) {
        let mut smoothed = Vec::with_capacity(values.len());
        smoothed.push(values[0]);
        for value in &values[1..] {
            let previous = smoothed[smoothed.len() - 1];
            smoothed.push(alpha * value + (1.0 - alpha) * previous);
        }

        let fit = summarize(values, smoothed);
        let level = fit.fitted[fit.fitted.len() - 1];
        let half_width = CONFIDENCE_Z * fit.residual_std_dev;

        let points = (1..=horizon)
            .map(|h| {
                ForecastPoint::from_half_width(
                    future_timestamp(last_timestamp, step, h),
                    level,
                    half_width,
                    self.floor,
                )
            })
            .collect();

        (fit, points)
    }

    /// Additive Holt-Winters. Bounds widen with `sqrt(h)`.
    #[allow(clippy::too_many_arguments)]
    fn holt_winters(
        &self,
        values: &[f64],
        m: usize,
        horizon: usize,
        alpha: f64,
        beta: f64,
        gamma: f64,
        last_timestamp: i64,
        step: i64,
    ) -> (Fit, Vec<ForecastPoint>) {
        let mut level = values[0];
        let mut trend = (values[m] - values[0]) / m as f64;
        let mut seasonal: Vec<f64> = values[..m].iter().map(|v| v - level).collect();

        let mut fitted = Vec::with_capacity(values.len());
        for (i, &value) in values.iter().enumerate() {
            let s = i % m;
            fitted.push(level + trend + seasonal[s]);

            let previous_level = level;
            level = alpha * (value - seasonal[s]) + (1.0 - alpha) * (level + trend);
            trend = beta * (level - previous_level) + (1.0 - beta) * trend;
            seasonal[s] = gamma * (value - level) + (1.0 - gamma) * seasonal[s];
        }

        let fit = summarize(values, fitted);
        let n = values.len();

        let points = (1..=horizon)
            .map(|h| {
                let value = level + h as f64 * trend + seasonal[(n + h - 1) % m];
                let value = self.floor.map_or(value, |floor| value.max(floor));
                let half_width = CONFIDENCE_Z * fit.residual_std_dev * (h as f64).sqrt();
                ForecastPoint::from_half_width(
                    future_timestamp(last_timestamp, step, h),
                    value,
                    half_width,
                    self.floor,
                )
            })
            .collect();

        (fit, points)
    }
}

fn checked(name: &'static str, value: f64) -> Result<f64, ForecastError> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ForecastError::InvalidParameter { name, value })
    }
}

fn summarize(values: &[f64], fitted: Vec<f64>) -> Fit {
    let residuals: Vec<f64> = values.iter().zip(&fitted).map(|(v, f)| v - f).collect();
    let mean_absolute_error =
        residuals.iter().map(|r| r.abs()).sum::<f64>() / residuals.len() as f64;
    Fit {
        fitted,
        residual_std_dev: sample_std_dev(&residuals),
        mean_absolute_error,
    }
}

/// Sample standard deviation (n - 1 denominator). Zero for fewer than two values.
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    let variance = squares / (values.len() - 1) as f64;
    variance.sqrt()
}

/// The median positive gap between consecutive timestamps, or 1 when the series
/// has no forward progress.
fn timestamp_step(series: &[TimeSeriesPoint]) -> i64 {
    let mut gaps: Vec<i64> = series
        .windows(2)
        .map(|w| w[1].timestamp.saturating_sub(w[0].timestamp))
        .filter(|gap| *gap > 0)
        .collect();
    if gaps.is_empty() {
        return 1;
    }
    gaps.sort_unstable();
    gaps[gaps.len() / 2]
}

fn future_timestamp(last: i64, step: i64, h: usize) -> i64 {
    last.saturating_add(step.saturating_mul(h as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<TimeSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint::new(1_000 + i as i64 * 60, *v))
            .collect()
    }

    fn seasonal_series(seasons: usize, m: usize) -> Vec<TimeSeriesPoint> {
        let values: Vec<f64> = (0..seasons * m)
            .map(|i| 100.0 + i as f64 * 0.5 + [0.0, 8.0, 15.0, 8.0, 0.0, -6.0][i % m])
            .collect();
        series(&values)
    }

    #[test]
    fn short_series_yields_empty_forecast() {
        let engine = ForecastEngine::new();
        let data = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(engine.forecast(&data, 5, &ForecastOptions::default()).unwrap().is_empty());
        assert!(engine.forecast(&data, 5, &ForecastOptions::holt_winters(5)).unwrap().is_empty());
    }

    #[test]
    fn simple_smoothing_matches_hand_computation() {
        let engine = ForecastEngine::new();
        let data = series(&[10.0, 12.0, 11.0, 13.0, 12.0, 14.0, 13.0, 15.0]);
        let points = engine.forecast(&data, 3, &ForecastOptions::default()).unwrap();

        let mut level = 10.0;
        let mut residuals = vec![0.0];
        for v in [12.0, 11.0, 13.0, 12.0, 14.0, 13.0, 15.0] {
            level = 0.3 * v + 0.7 * level;
            residuals.push(v - level);
        }
        let half_width = 1.96 * sample_std_dev(&residuals);

        assert_eq!(points.len(), 3);
        for point in &points {
            assert!((point.value - level).abs() < 1e-9);
            assert!((point.half_width() - half_width).abs() < 1e-9);
        }
    }

    #[test]
    fn simple_forecast_timestamps_follow_series_spacing() {
        let engine = ForecastEngine::new();
        let data = series(&[5.0; 10]);
        let points = engine.forecast(&data, 2, &ForecastOptions::default()).unwrap();
        let last = data[data.len() - 1].timestamp;
        assert_eq!(points[0].timestamp, last + 60);
        assert_eq!(points[1].timestamp, last + 120);
        // A constant series has no residual spread.
        assert_eq!(points[0].lower_bound, points[0].upper_bound);
    }

    #[test]
    fn holt_winters_used_only_with_enough_seasons() {
        let engine = ForecastEngine::new();

        let long = seasonal_series(4, 6);
        let report = engine
            .forecast_with_fit(&long, 6, &ForecastOptions::holt_winters(6))
            .unwrap();
        assert_eq!(report.method, ForecastMethod::HoltWinters);

        // Exactly two seasons is not "more than twice" the season length.
        let short = seasonal_series(2, 6);
        let report = engine
            .forecast_with_fit(&short, 6, &ForecastOptions::holt_winters(6))
            .unwrap();
        assert_eq!(report.method, ForecastMethod::Simple);

        // A season shorter than five falls back as well.
        let report = engine.forecast_with_fit(&long, 6, &ForecastOptions::holt_winters(4)).unwrap();
        assert_eq!(report.method, ForecastMethod::Simple);
    }

    #[test]
    fn holt_winters_bounds_widen_with_horizon() {
        let engine = ForecastEngine::new();
        let data = seasonal_series(5, 6);
        let points = engine.forecast(&data, 12, &ForecastOptions::holt_winters(6)).unwrap();
        assert_eq!(points.len(), 12);
        for pair in points.windows(2) {
            assert!(pair[1].half_width() >= pair[0].half_width() - 1e-12);
        }
        let ratio = points[3].half_width() / points[0].half_width();
        assert!((ratio - 2.0).abs() < 1e-9, "half width should scale with sqrt(h)");
    }

    #[test]
    fn holt_winters_follows_trend() {
        let engine = ForecastEngine::new();
        let data = seasonal_series(6, 6);
        let points = engine.forecast(&data, 6, &ForecastOptions::holt_winters(6)).unwrap();
        let last_season_mean: f64 =
            data[data.len() - 6..].iter().map(|p| p.value).sum::<f64>() / 6.0;
        let projected_mean: f64 = points.iter().map(|p| p.value).sum::<f64>() / 6.0;
        assert!(projected_mean > last_season_mean);
    }

    #[test]
    fn forecasts_are_clamped_at_floor() {
        let engine = ForecastEngine::new();
        let data = series(&[50.0, 40.0, 30.0, 20.0, 10.0, 5.0, 1.0, 0.5, 0.1, 0.0, 0.0, 0.0]);
        let points = engine.forecast(&data, 4, &ForecastOptions::default()).unwrap();
        for point in points {
            assert!(point.lower_bound >= 0.0);
            assert!(point.lower_bound <= point.value && point.value <= point.upper_bound);
        }
    }

    #[test]
    fn simple_smoothing_keeps_a_negative_level() {
        let engine = ForecastEngine::new();
        let data = series(&[-10.0, -12.0, -9.0, -11.0, -10.0, -13.0, -8.0, -10.0]);
        let report = engine.forecast_with_fit(&data, 3, &ForecastOptions::default()).unwrap();
        let level = report.fitted[report.fitted.len() - 1];
        assert!(level < 0.0);
        for point in &report.points {
            assert_eq!(point.value, level);
            assert!(point.lower_bound <= point.value && point.value <= point.upper_bound);
            assert!(point.upper_bound >= 0.0);
        }
    }

    #[test]
    fn holt_winters_projection_is_lifted_to_floor() {
        let engine = ForecastEngine::new();
        let values: Vec<f64> = (0..30)
            .map(|i| 50.0 - 3.0 * i as f64 + [0.0, 1.0, -1.0, 2.0, -2.0][i % 5])
            .collect();
        let report = engine
            .forecast_with_fit(&series(&values), 20, &ForecastOptions::holt_winters(5))
            .unwrap();
        assert_eq!(report.method, ForecastMethod::HoltWinters);
        assert!(report.points.iter().all(|p| p.value >= 0.0 && p.lower_bound >= 0.0));
        assert_eq!(report.points[report.points.len() - 1].value, 0.0);
    }

    #[test]
    fn rejects_out_of_range_alpha() {
        let engine = ForecastEngine::new();
        let data = series(&[1.0; 10]);
        let options = ForecastOptions {
            alpha: Some(1.5),
            ..ForecastOptions::default()
        };
        let err = engine.forecast(&data, 2, &options).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter { name: "alpha", .. }));
    }

    #[test]
    fn rejects_non_finite_values() {
        let engine = ForecastEngine::new();
        let mut data = series(&[1.0; 10]);
        data[4].value = f64::NAN;
        assert!(matches!(
            engine.forecast(&data, 2, &ForecastOptions::default()),
            Err(ForecastError::InvalidInput(_))
        ));
    }
}
