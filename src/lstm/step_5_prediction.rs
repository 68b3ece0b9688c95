// External imports
use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use chrono::NaiveDate;
use log::info;
use std::collections::VecDeque;

// Internal imports
use super::step_1_tensor_preparation::{build_windows, window_tensor, ScalingParameters};
use super::step_3_lstm_model_arch::SequenceLstm;
use super::step_4_train_model::train_model;
use crate::config::NeuralConfig;
use crate::error::{ForecastError, ForecastResult};
use crate::forecast::{ForecastSeries, ModelSource};

/// Backend used for training; inference runs on its inner backend
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Anything that maps a chronological window of scaled values to the next one
pub trait StepPredictor {
    fn predict_next(&self, window: &[f64]) -> ForecastResult<f64>;
}

/// Fixed-capacity window over the most recent values, oldest first
#[derive(Debug, Clone)]
pub struct ForecastBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl ForecastBuffer {
    /// Seeds the buffer with the last `capacity` values of `history`
    pub fn from_history(history: &[f64], capacity: usize) -> ForecastResult<Self> {
        if capacity == 0 {
            return Err(ForecastError::InvalidInput("lookback must be at least 1".into()));
        }
        if history.len() < capacity {
            return Err(ForecastError::EmptyDataset {
                len: history.len(),
                lookback: capacity,
            });
        }
        let values = history[history.len() - capacity..].iter().copied().collect();
        Ok(Self { values, capacity })
    }

    /// Drops the oldest value and appends `value`
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn window(&mut self) -> &[f64] {
        self.values.make_contiguous()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Autoregressive multi-step forecast.
///
/// Each step predicts from the current window, emits the prediction, then
/// slides it into the window. Only the last `lookback` values of `history`
/// are ever read; everything after that is the model's own output.
pub fn recursive_forecast<P: StepPredictor + ?Sized>(
    predictor: &P,
    history: &[f64],
    lookback: usize,
    horizon: usize,
) -> ForecastResult<Vec<f64>> {
    let mut buffer = ForecastBuffer::from_history(history, lookback)?;
    let mut predictions = Vec::with_capacity(horizon);

    for step in 0..horizon {
        let next = predictor.predict_next(buffer.window())?;
        if !next.is_finite() {
            return Err(ForecastError::ModelFit(format!(
                "non-finite prediction at step {}",
                step + 1
            )));
        }
        predictions.push(next);
        buffer.push(next);
    }

    Ok(predictions)
}

/// Repeats one scaled value; stands in for a model on a constant series
#[derive(Debug, Clone, Copy)]
pub struct ConstantPredictor(pub f64);

impl StepPredictor for ConstantPredictor {
    fn predict_next(&self, _window: &[f64]) -> ForecastResult<f64> {
        Ok(self.0)
    }
}

/// Trained network used for inference only
pub struct LstmStepPredictor<B: Backend> {
    model: SequenceLstm<B>,
    device: B::Device,
}

impl<B: Backend> LstmStepPredictor<B> {
    pub fn new(model: SequenceLstm<B>, device: B::Device) -> Self {
        Self { model, device }
    }
}

impl<B: Backend> StepPredictor for LstmStepPredictor<B> {
    fn predict_next(&self, window: &[f64]) -> ForecastResult<f64> {
        let input = window_tensor::<B>(window, &self.device);
        let output = self
            .model
            .forward(input)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ForecastError::ModelFit(format!("reading prediction: {:?}", e)))?;
        output
            .first()
            .map(|v| *v as f64)
            .ok_or_else(|| ForecastError::ModelFit("model returned no output".into()))
    }
}

fn as_model_fit(error: ForecastError) -> ForecastError {
    match error {
        ForecastError::EmptyDataset { .. } | ForecastError::InvalidInput(_) => {
            ForecastError::ModelFit(error.to_string())
        }
        other => other,
    }
}

/// Scales, trains and recursively forecasts one price series.
///
/// Every call fits its own scaling and model; nothing is shared between calls.
pub struct NeuralSequenceForecaster<B: AutodiffBackend = TrainingBackend> {
    config: NeuralConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> NeuralSequenceForecaster<B> {
    pub fn new(config: NeuralConfig) -> Self {
        Self::with_device(config, B::Device::default())
    }

    pub fn with_device(config: NeuralConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    pub fn config(&self) -> &NeuralConfig {
        &self.config
    }

    /// Forecasts `horizon` business days after `last_date`
    pub fn forecast(
        &self,
        prices: &[f64],
        last_date: NaiveDate,
        horizon: usize,
    ) -> ForecastResult<ForecastSeries> {
        let lookback = self.config.lookback;
        let scaling = ScalingParameters::fit(prices).map_err(as_model_fit)?;
        let scaled = scaling.scale_all(prices);
        let dataset = build_windows(&scaled, lookback).map_err(as_model_fit)?;

        let scaled_forecast = if scaling.is_degenerate() {
            info!("Constant series at {:.4}; skipping training", scaling.min);
            recursive_forecast(&ConstantPredictor(0.0), &scaled, lookback, horizon)?
        } else {
            info!(
                "Training LSTM on {} windows (lookback {}, {} epochs)",
                dataset.len(),
                lookback,
                self.config.epochs
            );
            let outcome = train_model::<B>(&dataset, &self.config, &self.device).map_err(as_model_fit)?;
            if let Some(loss) = outcome.loss_history.last() {
                info!("Final training loss {:.6}", loss);
            }
            let predictor = LstmStepPredictor::new(outcome.model.valid(), self.device.clone());
            recursive_forecast(&predictor, &scaled, lookback, horizon)?
        };

        let values = scaling.inverse_all(&scaled_forecast);
        Ok(ForecastSeries::from_values(ModelSource::Neural, last_date, &values))
    }
}
