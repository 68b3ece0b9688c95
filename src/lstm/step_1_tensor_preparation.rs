// External crates
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::{Array1, Array2, ArrayView1};

// Internal modules
use crate::error::{ForecastError, ForecastResult};

/// Min-max bounds fit once on a training series.
///
/// Any value produced by a model trained under these bounds must be inverted
/// with the same instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingParameters {
    pub min: f64,
    pub max: f64,
}

impl ScalingParameters {
    pub fn fit(values: &[f64]) -> ForecastResult<Self> {
        if values.is_empty() {
            return Err(ForecastError::InvalidInput("cannot fit scaling on an empty series".into()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput("series contains non-finite values".into()));
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    /// True when every training value was identical
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Maps into [0, 1] for values inside the fitted range; 0 for a degenerate fit
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * (self.max - self.min) + self.min
    }

    pub fn scale_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.scale(*v)).collect()
    }

    pub fn inverse_all(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|v| self.inverse(*v)).collect()
    }
}

/// Supervised (window, next value) pairs in temporal order
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedDataset {
    /// One row per window, `lookback` columns, oldest value first
    pub inputs: Array2<f64>,
    pub targets: Array1<f64>,
}

impl WindowedDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn window(&self, index: usize) -> ArrayView1<'_, f64> {
        self.inputs.row(index)
    }
}

/// Slices a series into `len - lookback` (window, target) pairs.
///
/// Pair i holds `series[i..i + lookback]` as input and `series[i + lookback]`
/// as target.
pub fn build_windows(series: &[f64], lookback: usize) -> ForecastResult<WindowedDataset> {
    if lookback == 0 {
        return Err(ForecastError::InvalidInput("lookback must be at least 1".into()));
    }
    if series.len() <= lookback {
        return Err(ForecastError::EmptyDataset {
            len: series.len(),
            lookback,
        });
    }

    let num_windows = series.len() - lookback;
    let mut flat = Vec::with_capacity(num_windows * lookback);
    for window in series.windows(lookback).take(num_windows) {
        flat.extend_from_slice(window);
    }
    let inputs = Array2::from_shape_vec((num_windows, lookback), flat)
        .map_err(|e| ForecastError::InvalidInput(format!("window shape: {}", e)))?;
    let targets = Array1::from_vec(series[lookback..].to_vec());

    Ok(WindowedDataset { inputs, targets })
}

/// Builds `[batch, lookback, 1]` features and `[batch, 1]` targets for the given rows
pub fn batch_tensors<B: Backend>(
    dataset: &WindowedDataset,
    indices: &[usize],
    device: &B::Device,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let lookback = dataset.lookback();
    let mut features = Vec::with_capacity(indices.len() * lookback);
    let mut targets = Vec::with_capacity(indices.len());
    for &index in indices {
        features.extend(dataset.window(index).iter().map(|v| *v as f32));
        targets.push(dataset.targets[index] as f32);
    }

    let features = Tensor::<B, 3>::from_data(
        TensorData::new(features, [indices.len(), lookback, 1]),
        device,
    );
    let targets = Tensor::<B, 2>::from_data(TensorData::new(targets, [indices.len(), 1]), device);
    (features, targets)
}

/// A single `[1, lookback, 1]` input for one-step prediction
pub fn window_tensor<B: Backend>(window: &[f64], device: &B::Device) -> Tensor<B, 3> {
    let values: Vec<f32> = window.iter().map(|v| *v as f32).collect();
    Tensor::<B, 3>::from_data(TensorData::new(values, [1, window.len(), 1]), device)
}
