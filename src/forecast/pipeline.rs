// External crates
use log::{info, warn};
use polars::prelude::DataFrame;
use rayon::prelude::*;

// Local modules
use super::merger::{merge_forecasts, ForecastTable};
use super::{ForecastSeries, ModelSource};
use crate::arima::step_4_forecast::StatisticalForecaster;
use crate::config::PipelineConfig;
use crate::constants::MIN_USABLE_ROWS;
use crate::error::{ForecastError, ForecastResult};
use crate::lstm::step_5_prediction::{NeuralSequenceForecaster, TrainingBackend};
use crate::util::feature_engineering::{build_processed_series, ProcessedSeries};
use crate::util::file_utils::RawSeriesSource;

/// A model that produced no forecast for an instrument, and why
#[derive(Debug)]
pub struct ModelFailure {
    pub source: ModelSource,
    pub error: ForecastError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentStatus {
    /// Every model forecast successfully
    Complete,
    /// At least one model failed, at least one succeeded
    Partial,
    /// No model produced a forecast
    NoForecast,
}

/// Everything the pipeline produced for one instrument
#[derive(Debug)]
pub struct InstrumentReport {
    pub symbol: String,
    pub processed: ProcessedSeries,
    pub table: ForecastTable,
    pub failures: Vec<ModelFailure>,
}

impl InstrumentReport {
    pub fn status(&self) -> InstrumentStatus {
        match self.failures.len() {
            0 => InstrumentStatus::Complete,
            n if n < ModelSource::ALL.len() => InstrumentStatus::Partial,
            _ => InstrumentStatus::NoForecast,
        }
    }
}

/// Both forecasters on one processed series, run side by side.
///
/// Model failures are recorded on the report; the merged table always has
/// one column per model.
pub fn forecast_processed(processed: ProcessedSeries, config: &PipelineConfig) -> InstrumentReport {
    let symbol = processed.symbol().to_string();

    let last_date = match processed.last_date() {
        Some(date) if !processed.is_empty() => date,
        _ => {
            warn!("{}: insufficient history, skipping forecasts", symbol);
            let failures = ModelSource::ALL
                .iter()
                .map(|&source| ModelFailure {
                    source,
                    error: ForecastError::InsufficientHistory {
                        available: processed.usable_rows(),
                        required: MIN_USABLE_ROWS,
                    },
                })
                .collect();
            return InstrumentReport {
                symbol,
                processed,
                table: merge_forecasts(&ModelSource::ALL, &[]),
                failures,
            };
        }
    };

    let prices = processed.prices();
    let horizon = config.horizon;
    info!("{}: forecasting {} steps from {} rows", symbol, horizon, prices.len());

    let (statistical, neural) = rayon::join(
        || {
            StatisticalForecaster::new(config.statistical.clone()).forecast(prices, last_date, horizon)
        },
        || {
            NeuralSequenceForecaster::<TrainingBackend>::new(config.neural.clone())
                .forecast(prices, last_date, horizon)
        },
    );

    let mut series: Vec<ForecastSeries> = Vec::new();
    let mut failures = Vec::new();
    for (source, result) in [(ModelSource::Statistical, statistical), (ModelSource::Neural, neural)] {
        match result {
            Ok(forecast) => series.push(forecast),
            Err(error) => {
                warn!("{}: {} forecast failed: {}", symbol, source, error);
                failures.push(ModelFailure { source, error });
            }
        }
    }

    InstrumentReport {
        symbol,
        table: merge_forecasts(&ModelSource::ALL, &series),
        processed,
        failures,
    }
}

/// Feature engineering and forecasting for one instrument's raw records.
///
/// Only a frame without usable date or price columns fails the instrument;
/// model-level problems end up in `InstrumentReport::failures`.
pub fn run_instrument(
    symbol: &str,
    raw: &DataFrame,
    config: &PipelineConfig,
) -> ForecastResult<InstrumentReport> {
    let processed = build_processed_series(symbol, raw, config.start_date, config.end_date)?;
    Ok(forecast_processed(processed, config))
}

fn for_each_instrument<T, F>(config: &PipelineConfig, task: F) -> Vec<(String, ForecastResult<T>)>
where
    T: Send,
    F: Fn(&str) -> ForecastResult<T> + Sync,
{
    let run = |symbol: &String| {
        let result = task(symbol);
        if let Err(e) = &result {
            warn!("{}: failed: {}", symbol, e);
        }
        (symbol.clone(), result)
    };

    if config.parallel {
        config.instruments.par_iter().map(run).collect()
    } else {
        config.instruments.iter().map(run).collect()
    }
}

/// Runs every configured instrument; one instrument's failure never stops the others
pub fn run_batch(
    source: &dyn RawSeriesSource,
    config: &PipelineConfig,
) -> Vec<(String, ForecastResult<InstrumentReport>)> {
    info!(
        "Forecasting {} instruments ({})",
        config.instruments.len(),
        if config.parallel { "parallel" } else { "sequential" }
    );
    let results = for_each_instrument(config, |symbol| {
        let raw = source.load(symbol)?;
        run_instrument(symbol, &raw, config)
    });
    log_batch_summary(&results);
    results
}

/// Feature engineering only, for every configured instrument
pub fn process_batch(
    source: &dyn RawSeriesSource,
    config: &PipelineConfig,
) -> Vec<(String, ForecastResult<ProcessedSeries>)> {
    for_each_instrument(config, |symbol| {
        let raw = source.load(symbol)?;
        build_processed_series(symbol, &raw, config.start_date, config.end_date)
    })
}

fn log_batch_summary(results: &[(String, ForecastResult<InstrumentReport>)]) {
    let mut complete = 0;
    let mut degraded = Vec::new();
    for (symbol, result) in results {
        match result {
            Ok(report) if report.status() == InstrumentStatus::Complete => complete += 1,
            _ => degraded.push(symbol.as_str()),
        }
    }
    if degraded.is_empty() {
        info!("Batch finished: all {} instruments complete", complete);
    } else {
        warn!(
            "Batch finished: {} complete, {} with failures ({})",
            complete,
            degraded.len(),
            degraded.join(", ")
        );
    }
}

/// True when no instrument produced any forecast at all
pub fn batch_failed(results: &[(String, ForecastResult<InstrumentReport>)]) -> bool {
    !results.is_empty()
        && results.iter().all(|(_, result)| match result {
            Ok(report) => report.status() == InstrumentStatus::NoForecast,
            Err(_) => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NeuralConfig;
    use crate::util::file_utils::InMemorySource;
    use crate::util::pre_processor::{price_points_to_frame, PricePoint};
    use chrono::NaiveDate;

    fn linear_frame(symbol: &str, len: usize) -> DataFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points: Vec<PricePoint> = (0..len)
            .map(|i| PricePoint::new(symbol, start + chrono::Duration::days(i as i64), 100.0 + i as f64))
            .collect();
        price_points_to_frame(&points).unwrap()
    }

    fn quick_config(instruments: &[&str]) -> PipelineConfig {
        PipelineConfig {
            instruments: instruments.iter().map(|s| s.to_string()).collect(),
            horizon: 5,
            parallel: false,
            neural: NeuralConfig {
                lookback: 5,
                epochs: 2,
                batch_size: 4,
                hidden_size: 8,
                ..NeuralConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_short_history_records_both_models() {
        let config = quick_config(&["SHORT"]);
        let report = run_instrument("SHORT", &linear_frame("SHORT", 20), &config).unwrap();

        assert!(report.processed.is_empty());
        assert!(report.table.is_empty());
        assert_eq!(report.status(), InstrumentStatus::NoForecast);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| matches!(
            f.error,
            ForecastError::InsufficientHistory { available: 20, required: 30 }
        )));
        assert!(report.failures[0].error.to_string().contains("20 usable rows"));
    }

    #[test]
    fn test_lookback_too_long_only_fails_neural_model() {
        let mut config = quick_config(&["LONG"]);
        config.neural.lookback = 60;
        let report = run_instrument("LONG", &linear_frame("LONG", 45), &config).unwrap();

        assert_eq!(report.status(), InstrumentStatus::Partial);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, ModelSource::Neural);
        assert!(matches!(report.failures[0].error, ForecastError::ModelFit(_)));
        assert_eq!(report.table.len(), 5);
        assert_eq!(report.table.column(ModelSource::Neural), Some(vec![None; 5]));
    }

    #[test]
    fn test_batch_isolates_missing_instrument() {
        let mut source = InMemorySource::new();
        source.insert("GOOD", linear_frame("GOOD", 45));
        let config = quick_config(&["GOOD", "MISSING"]);

        let results = run_batch(&source, &config);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "GOOD");
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(!batch_failed(&results));
    }

    #[test]
    fn test_batch_failed_when_nothing_forecast() {
        let source = InMemorySource::new();
        let results = run_batch(&source, &quick_config(&["A", "B"]));
        assert!(batch_failed(&results));
    }
}
