// External imports
use chrono::NaiveDate;
use log::info;

// Internal imports
use super::step_1_differencing::{difference, integrate, integration_anchors, is_constant};
use super::step_2_estimation::ArimaOrder;
use super::step_3_order_search::{OrderSearch, ScoredFit, StepwiseSearch};
use crate::config::StatisticalConfig;
use crate::constants::MIN_STATISTICAL_OBSERVATIONS;
use crate::error::{ForecastError, ForecastResult};
use crate::forecast::{ForecastSeries, ModelSource};

/// An order-selected ARIMA model bound to the series it was fitted on
#[derive(Debug, Clone)]
pub struct ArimaModel {
    scored: ScoredFit,
    series: Vec<f64>,
}

impl ArimaModel {
    pub fn order(&self) -> ArimaOrder {
        self.scored.order()
    }

    pub fn criterion_value(&self) -> f64 {
        self.scored.score
    }

    /// Point forecasts for the `horizon` steps after the fitted series
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let d = self.order().d;
        let differenced = difference(&self.series, d);
        let path = self.scored.fit.forecast_differenced(&differenced, horizon);
        integrate(&path, &integration_anchors(&self.series, d))
    }
}

/// Automatically ordered ARIMA forecaster; the order search is pluggable
pub struct StatisticalForecaster<S: OrderSearch = StepwiseSearch> {
    config: StatisticalConfig,
    search: S,
}

impl StatisticalForecaster<StepwiseSearch> {
    pub fn new(config: StatisticalConfig) -> Self {
        Self::with_search(config, StepwiseSearch)
    }
}

impl<S: OrderSearch> StatisticalForecaster<S> {
    pub fn with_search(config: StatisticalConfig, search: S) -> Self {
        Self { config, search }
    }

    /// Selects and fits a model; fails on short or constant series
    pub fn fit(&self, prices: &[f64]) -> ForecastResult<ArimaModel> {
        if prices.len() < MIN_STATISTICAL_OBSERVATIONS {
            return Err(ForecastError::ModelFit(format!(
                "{} observations, need at least {}",
                prices.len(),
                MIN_STATISTICAL_OBSERVATIONS
            )));
        }
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(ForecastError::ModelFit("series contains non-finite values".into()));
        }
        if is_constant(prices) {
            return Err(ForecastError::ModelFit(
                "constant series, estimation is singular".into(),
            ));
        }

        let scored = self.search.search(prices, &self.config)?;
        Ok(ArimaModel {
            scored,
            series: prices.to_vec(),
        })
    }

    /// Fits on `prices` and forecasts `horizon` business days after `last_date`
    pub fn forecast(
        &self,
        prices: &[f64],
        last_date: NaiveDate,
        horizon: usize,
    ) -> ForecastResult<ForecastSeries> {
        let model = self.fit(prices)?;
        info!(
            "Selected {} ({:?} = {:.3})",
            model.order(),
            self.config.criterion,
            model.criterion_value()
        );

        let values = model.forecast(horizon);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "{} produced non-finite forecasts",
                model.order()
            )));
        }
        Ok(ForecastSeries::from_values(ModelSource::Statistical, last_date, &values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::step_3_order_search::GridSearch;

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_linear_series_continues_trend() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let forecaster = StatisticalForecaster::new(StatisticalConfig::default());
        let series = forecaster.forecast(&prices, friday(), 5).unwrap();

        assert_eq!(series.len(), 5);
        for (i, value) in series.values().iter().enumerate() {
            assert!((value - (140.0 + i as f64)).abs() < 1e-6, "step {} = {}", i, value);
        }
        assert_eq!(series.points()[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn test_constant_series_fails() {
        let forecaster = StatisticalForecaster::new(StatisticalConfig::default());
        let result = forecaster.forecast(&[7.0; 50], friday(), 5);
        assert!(matches!(result, Err(ForecastError::ModelFit(_))));
    }

    #[test]
    fn test_short_series_fails() {
        let forecaster = StatisticalForecaster::new(StatisticalConfig::default());
        assert!(forecaster.fit(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_search_strategy_is_replaceable() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 100.0 + i as f64 * 0.5 + ((i * 37) % 11) as f64 * 0.3)
            .collect();
        let forecaster = StatisticalForecaster::with_search(StatisticalConfig::default(), GridSearch);
        let series = forecaster.forecast(&prices, friday(), 10).unwrap();
        assert_eq!(series.len(), 10);
        assert!(series.values().iter().all(|v| v.is_finite()));
    }
}
