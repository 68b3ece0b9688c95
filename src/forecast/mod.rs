/// # Forecast Assembly
///
/// Shared forecast types plus the stages that combine model output:
///
/// 1. **merger**: outer-joins per-model forecast series into one table
/// 2. **pipeline**: per-instrument and batch drivers with per-model error capture
/// 3. **evaluation**: holdout accuracy of both forecasters
pub mod evaluation;
pub mod merger;
pub mod pipeline;

// External crates
use chrono::NaiveDate;
use std::fmt;

// Local modules
use crate::constants::{ARIMA_FORECAST_COLUMN, LSTM_FORECAST_COLUMN};
use crate::util::calendar::next_business_days;

/// Which model produced a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelSource {
    Statistical,
    Neural,
}

impl ModelSource {
    pub const ALL: [ModelSource; 2] = [ModelSource::Statistical, ModelSource::Neural];

    /// Column name used in forecast tables
    pub fn column_name(&self) -> &'static str {
        match self {
            ModelSource::Statistical => ARIMA_FORECAST_COLUMN,
            ModelSource::Neural => LSTM_FORECAST_COLUMN,
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Statistical => write!(f, "ARIMA"),
            ModelSource::Neural => write!(f, "LSTM"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub source: ModelSource,
}

/// Forecasts of one model on consecutive business days
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    source: ModelSource,
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Dates the values on the business days following `last_date`
    pub fn from_values(source: ModelSource, last_date: NaiveDate, values: &[f64]) -> Self {
        let points = next_business_days(last_date, values.len())
            .into_iter()
            .zip(values)
            .map(|(date, &value)| ForecastPoint { date, value, source })
            .collect();
        Self { source, points }
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_dates_follow_last_date() {
        let thursday = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let series = ForecastSeries::from_values(ModelSource::Neural, thursday, &[1.0, 2.0, 3.0]);

        let dates: Vec<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            ]
        );
        assert!(series.points().iter().all(|p| p.source == ModelSource::Neural));
    }
}
