use core_types::{BlendPoint, ForecastMethod, ModelForecast, TimeSeriesPoint};
use forecasting::{ForecastBlender, ForecastEngine, ForecastOptions, MIN_SERIES_LEN};
use proptest::prelude::*;

const TOL: f64 = 1e-9;

fn to_series(values: &[f64]) -> Vec<TimeSeriesPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| TimeSeriesPoint::new(i as i64 * 3_600, *v))
        .collect()
}

fn method_strategy() -> impl Strategy<Value = ForecastOptions> {
    prop_oneof![
        Just(ForecastOptions::default()),
        (5usize..9).prop_map(ForecastOptions::holt_winters),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn short_series_always_forecast_empty(
        values in prop::collection::vec(-1e6f64..1e6, 0..MIN_SERIES_LEN),
        horizon in 0usize..50,
        options in method_strategy(),
    ) {
        let engine = ForecastEngine::new();
        let points = engine.forecast(&to_series(&values), horizon, &options).unwrap();
        prop_assert!(points.is_empty());
    }

    #[test]
    fn bounds_always_bracket_the_value(
        values in prop::collection::vec(-1e4f64..1e4, MIN_SERIES_LEN..60),
        horizon in 1usize..30,
        options in method_strategy(),
        floor in prop_oneof![Just(None), Just(Some(0.0))],
    ) {
        let engine = ForecastEngine::new().with_floor(floor);
        let points = engine.forecast(&to_series(&values), horizon, &options).unwrap();
        prop_assert_eq!(points.len(), horizon);
        for point in points {
            prop_assert!(point.lower_bound <= point.value);
            prop_assert!(point.value <= point.upper_bound);
            if let Some(floor) = floor {
                prop_assert!(point.lower_bound >= floor.min(point.value));
                prop_assert!(point.upper_bound >= floor);
            }
        }
    }

    #[test]
    fn holt_winters_half_width_never_shrinks(
        season in 5usize..8,
        seasons in 3usize..6,
        noise in prop::collection::vec(-5.0f64..5.0, 48),
        horizon in 2usize..24,
    ) {
        let values: Vec<f64> = (0..season * seasons)
            .map(|i| 200.0 + (i % season) as f64 * 10.0 + noise[i % noise.len()])
            .collect();
        let engine = ForecastEngine::new().with_floor(None);
        let report = engine
            .forecast_with_fit(&to_series(&values), horizon, &ForecastOptions::holt_winters(season))
            .unwrap();
        prop_assert_eq!(report.method, ForecastMethod::HoltWinters);
        for pair in report.points.windows(2) {
            prop_assert!(pair[1].half_width() + TOL >= pair[0].half_width());
        }
    }

    #[test]
    fn equal_weight_blend_is_simple_average(
        a_values in prop::collection::vec(-1e3f64..1e3, 1..20),
        b_values in prop::collection::vec(-1e3f64..1e3, 20),
    ) {
        let points = |values: &[f64]| -> Vec<BlendPoint> {
            values
                .iter()
                .enumerate()
                .map(|(i, v)| BlendPoint {
                    timestamp: i as i64,
                    value: *v,
                    lower_bound: None,
                    upper_bound: None,
                })
                .collect()
        };
        let b_values = &b_values[..a_values.len()];
        let models = [
            ModelForecast { model_id: "a".into(), points: points(&a_values[..]), weight: 1.0 },
            ModelForecast { model_id: "b".into(), points: points(b_values), weight: 1.0 },
        ];
        let result = ForecastBlender::new().blend(&models, "m", 0).unwrap();
        prop_assert_eq!(result.points.len(), a_values.len());
        for (i, point) in result.points.iter().enumerate() {
            let expected = (a_values[i] + b_values[i]) / 2.0;
            prop_assert!((point.value - expected).abs() <= TOL * (1.0 + expected.abs()));
        }
    }
}
