// External crates
use log::{info, warn};
use serde::Serialize;

// Local modules
use super::ModelSource;
use crate::arima::step_4_forecast::StatisticalForecaster;
use crate::config::PipelineConfig;
use crate::constants::MIN_USABLE_ROWS;
use crate::error::{ForecastError, ForecastResult};
use crate::lstm::step_5_prediction::{NeuralSequenceForecaster, TrainingBackend};
use crate::util::feature_engineering::ProcessedSeries;
use crate::util::metrics::{compute_metrics, ForecastMetrics};

/// Holdout accuracy of one model, or the reason it has none
#[derive(Debug)]
pub struct ModelEvaluation {
    pub source: ModelSource,
    pub result: ForecastResult<ForecastMetrics>,
}

#[derive(Debug)]
pub struct EvaluationReport {
    pub symbol: String,
    pub train_len: usize,
    pub test_len: usize,
    pub models: Vec<ModelEvaluation>,
}

/// Flat view of a report for JSON output
#[derive(Debug, Serialize)]
pub struct EvaluationSummary {
    pub symbol: String,
    pub model: String,
    pub train_len: usize,
    pub test_len: usize,
    pub metrics: Option<ForecastMetrics>,
    pub error: Option<String>,
}

impl EvaluationReport {
    pub fn metrics(&self, source: ModelSource) -> Option<&ForecastMetrics> {
        self.models
            .iter()
            .find(|m| m.source == source)
            .and_then(|m| m.result.as_ref().ok())
    }

    pub fn summaries(&self) -> Vec<EvaluationSummary> {
        self.models
            .iter()
            .map(|m| EvaluationSummary {
                symbol: self.symbol.clone(),
                model: m.source.to_string(),
                train_len: self.train_len,
                test_len: self.test_len,
                metrics: m.result.as_ref().ok().cloned(),
                error: m.result.as_ref().err().map(|e| e.to_string()),
            })
            .collect()
    }
}

/// Index of the first holdout row for `len` rows
pub fn split_index(len: usize, test_split: f64) -> ForecastResult<usize> {
    let split = (len as f64 * (1.0 - test_split)).floor() as usize;
    if split == 0 || split >= len {
        return Err(ForecastError::InvalidInput(format!(
            "test split {} leaves no train or test rows out of {}",
            test_split, len
        )));
    }
    Ok(split)
}

/// Fits both forecasters on the leading part of the series and scores their
/// forecasts against the held-out tail
pub fn evaluate_holdout(series: &ProcessedSeries, config: &PipelineConfig) -> ForecastResult<EvaluationReport> {
    if series.is_empty() {
        return Err(ForecastError::InsufficientHistory {
            available: series.usable_rows(),
            required: MIN_USABLE_ROWS,
        });
    }

    let split = split_index(series.len(), config.test_split)?;
    let (train, test) = series.prices().split_at(split);
    let last_train_date = series.dates()[split - 1];
    info!(
        "{}: evaluating on {} train / {} test rows",
        series.symbol(),
        train.len(),
        test.len()
    );

    let (statistical, neural) = rayon::join(
        || {
            StatisticalForecaster::new(config.statistical.clone()).forecast(train, last_train_date, test.len())
        },
        || {
            NeuralSequenceForecaster::<TrainingBackend>::new(config.neural.clone())
                .forecast(train, last_train_date, test.len())
        },
    );

    let models = [(ModelSource::Statistical, statistical), (ModelSource::Neural, neural)]
        .into_iter()
        .map(|(source, result)| {
            let result = result.map(|forecast| compute_metrics(test, &forecast.values()));
            match &result {
                Ok(metrics) => info!(
                    "{} {}: MAE {:.4}, RMSE {:.4}",
                    series.symbol(),
                    source,
                    metrics.mae,
                    metrics.rmse
                ),
                Err(e) => warn!("{} {}: evaluation failed: {}", series.symbol(), source, e),
            }
            ModelEvaluation { source, result }
        })
        .collect();

    Ok(EvaluationReport {
        symbol: series.symbol().to_string(),
        train_len: train.len(),
        test_len: test.len(),
        models,
    })
}
