// Internal imports
use crate::constants::MIN_KPSS_OBSERVATIONS;

/// Differences a series `d` times; each pass shortens it by one
pub fn difference(data: &[f64], d: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..d {
        if result.len() < 2 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Last value of every intermediate differenced series, level 0 first.
///
/// These anchor the integration of forecasts back to the original scale.
pub fn integration_anchors(data: &[f64], d: usize) -> Vec<f64> {
    (0..d)
        .filter_map(|level| difference(data, level).last().copied())
        .collect()
}

/// Undoes `anchors.len()` rounds of differencing on a forecast path
pub fn integrate(forecast: &[f64], anchors: &[f64]) -> Vec<f64> {
    let mut result = forecast.to_vec();
    for &anchor in anchors.iter().rev() {
        let mut level = anchor;
        result = result
            .iter()
            .map(|delta| {
                level += delta;
                level
            })
            .collect();
    }
    result
}

pub fn is_constant(data: &[f64]) -> bool {
    match data.first() {
        Some(first) => data.iter().all(|v| (v - first).abs() <= f64::EPSILON * first.abs().max(1.0)),
        None => true,
    }
}

/// KPSS level-stationarity statistic with a Newey-West long-run variance.
///
/// Returns `None` for series that are too short or have no variance.
pub fn kpss_statistic(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < MIN_KPSS_OBSERVATIONS {
        return None;
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = data.iter().map(|y| y - mean).collect();

    let mut cumsum = 0.0;
    let partial_sq: f64 = residuals
        .iter()
        .map(|r| {
            cumsum += r;
            cumsum * cumsum
        })
        .sum();

    let lag = (4.0 * (n as f64 / 100.0).powf(0.25)) as usize;
    let mut long_run_var = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for l in 1..=lag.min(n - 1) {
        let weight = 1.0 - l as f64 / (lag + 1) as f64;
        let gamma: f64 = residuals[l..]
            .iter()
            .zip(&residuals[..n - l])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run_var += 2.0 * weight * gamma;
    }

    if long_run_var <= 0.0 || !long_run_var.is_finite() {
        return None;
    }
    Some(partial_sq / (n * n) as f64 / long_run_var)
}

/// Chooses the differencing order by repeated KPSS tests.
///
/// A constant series is stationary. A non-constant series too short to test
/// is differenced once.
pub fn select_differencing_order(data: &[f64], max_d: usize, critical_value: f64) -> usize {
    let mut current = data.to_vec();
    for d in 0..max_d {
        if is_constant(&current) {
            return d;
        }
        let stationary = match kpss_statistic(&current) {
            Some(statistic) => statistic <= critical_value,
            None => d > 0,
        };
        if stationary {
            return d;
        }
        current = difference(&current, 1);
    }
    max_d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::KPSS_CRITICAL_5PCT;

    #[test]
    fn test_difference() {
        let data = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&data, 1), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(difference(&data, 2), vec![1.0, 1.0, 1.0]);
        assert!(difference(&[1.0], 1).is_empty());
    }

    #[test]
    fn test_integrate_inverts_difference() {
        let data = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        // next two second differences of 1.0 continue the pattern 21, 28
        let anchors = integration_anchors(&data, 2);
        assert_eq!(anchors, vec![15.0, 5.0]);
        assert_eq!(integrate(&[1.0, 1.0], &anchors), vec![21.0, 28.0]);
    }

    #[test]
    fn test_constant_series_needs_no_differencing() {
        assert_eq!(select_differencing_order(&[5.0; 40], 2, KPSS_CRITICAL_5PCT), 0);
    }

    #[test]
    fn test_random_walk_is_differenced() {
        let mut level = 100.0;
        let walk: Vec<f64> = (0..200)
            .map(|i| {
                level += if (i * 7919) % 13 < 7 { 1.0 } else { -0.5 };
                level
            })
            .collect();
        assert!(select_differencing_order(&walk, 2, KPSS_CRITICAL_5PCT) >= 1);
    }

    #[test]
    fn test_kpss_rejects_short_series() {
        assert!(kpss_statistic(&[1.0, 2.0, 3.0]).is_none());
    }
}
