/// Scenario tests for the forecasting pipeline
///
/// * `scenario_tests` - end-to-end behaviour on small synthetic series
/// * `csv_pipeline_tests` - batch runs over CSV directories, including export
pub mod csv_pipeline_tests;

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use crate::config::{NeuralConfig, PipelineConfig};
use crate::util::calendar::next_business_days;
use crate::util::pre_processor::{price_points_to_frame, PricePoint};

/// First trading day used by all generated series (a Monday)
pub fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Consecutive business days starting at `first_day()`
pub fn trading_days(len: usize) -> Vec<NaiveDate> {
    let mut dates = vec![first_day()];
    dates.extend(next_business_days(first_day(), len.saturating_sub(1)));
    dates.truncate(len);
    dates
}

pub fn frame_from_prices(symbol: &str, prices: &[f64]) -> DataFrame {
    let points: Vec<PricePoint> = trading_days(prices.len())
        .into_iter()
        .zip(prices)
        .map(|(date, price)| PricePoint::new(symbol, date, *price))
        .collect();
    price_points_to_frame(&points).unwrap()
}

/// Small network and short training so tests stay fast
pub fn quick_config(instruments: &[&str], horizon: usize) -> PipelineConfig {
    PipelineConfig {
        instruments: instruments.iter().map(|s| s.to_string()).collect(),
        horizon,
        parallel: false,
        neural: NeuralConfig {
            lookback: 5,
            epochs: 3,
            batch_size: 4,
            hidden_size: 8,
            learning_rate: 0.01,
            seed: 42,
        },
        ..PipelineConfig::default()
    }
}
