use serde::Serialize;

/// Point-forecast accuracy against held-out observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, `None` when any actual value is zero
    pub mape: Option<f64>,
}

/// Mean absolute error over the common prefix of both slices
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Root mean squared error over the common prefix of both slices
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n as f64;
    mse.sqrt()
}

pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let n = actual.len().min(predicted.len());
    if n == 0 || actual.iter().take(n).any(|a| *a == 0.0) {
        return None;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    Some(100.0 * total / n as f64)
}

pub fn compute_metrics(actual: &[f64], predicted: &[f64]) -> ForecastMetrics {
    ForecastMetrics {
        mae: mean_absolute_error(actual, predicted),
        rmse: root_mean_squared_error(actual, predicted),
        mape: mean_absolute_percentage_error(actual, predicted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_known_values() {
        let actual = [100.0, 110.0, 120.0];
        let predicted = [101.0, 108.0, 120.0];
        let m = compute_metrics(&actual, &predicted);

        assert!((m.mae - 1.0).abs() < 1e-12);
        assert!((m.rmse - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        let expected_mape = 100.0 * (0.01 + 2.0 / 110.0) / 3.0;
        assert!((m.mape.unwrap() - expected_mape).abs() < 1e-9);
    }

    #[test]
    fn test_mape_undefined_for_zero_actual() {
        assert!(mean_absolute_percentage_error(&[0.0, 1.0], &[1.0, 1.0]).is_none());
    }
}
