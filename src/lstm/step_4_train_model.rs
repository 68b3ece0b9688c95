// External imports
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

// Internal imports
use super::step_1_tensor_preparation::{batch_tensors, WindowedDataset};
use super::step_3_lstm_model_arch::{SequenceLstm, SequenceLstmConfig};
use crate::config::NeuralConfig;
use crate::error::{ForecastError, ForecastResult};

/// A trained model and its mean training loss per epoch
pub struct TrainingOutcome<B: AutodiffBackend> {
    pub model: SequenceLstm<B>,
    pub loss_history: Vec<f64>,
}

pub fn mse_loss<B: AutodiffBackend>(predictions: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let diff = predictions - targets;
    (diff.clone() * diff).mean()
}

/// Trains a fresh model on already scaled windows.
///
/// Parameter initialisation and batch order both derive from `config.seed`,
/// so a run on one thread is reproducible.
pub fn train_model<B: AutodiffBackend>(
    dataset: &WindowedDataset,
    config: &NeuralConfig,
    device: &B::Device,
) -> ForecastResult<TrainingOutcome<B>> {
    if dataset.is_empty() {
        return Err(ForecastError::EmptyDataset {
            len: 0,
            lookback: dataset.lookback(),
        });
    }

    B::seed(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut model: SequenceLstm<B> = SequenceLstmConfig::new()
        .with_hidden_size(config.hidden_size)
        .init(device);
    let mut optimizer = AdamConfig::new().init::<B, SequenceLstm<B>>();

    let batch_size = config.batch_size.max(1);
    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    let mut loss_history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        indices.shuffle(&mut rng);

        let mut epoch_loss = 0.0;
        let mut num_batches = 0usize;
        for batch in indices.chunks(batch_size) {
            let (features, targets) = batch_tensors::<B>(dataset, batch, device);
            let loss = mse_loss(model.forward(features), targets);
            epoch_loss += loss.clone().into_scalar().elem::<f64>();
            num_batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        let avg_loss = epoch_loss / num_batches as f64;
        if !avg_loss.is_finite() {
            return Err(ForecastError::ModelFit(format!(
                "training loss diverged at epoch {}",
                epoch
            )));
        }
        debug!("Epoch {}/{}: loss {:.6}", epoch, config.epochs, avg_loss);
        loss_history.push(avg_loss);
    }

    Ok(TrainingOutcome { model, loss_history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lstm::step_1_tensor_preparation::build_windows;
    use burn_autodiff::Autodiff;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn small_config() -> NeuralConfig {
        NeuralConfig {
            lookback: 4,
            epochs: 15,
            batch_size: 8,
            hidden_size: 8,
            learning_rate: 0.01,
            seed: 7,
        }
    }

    fn sine_series() -> Vec<f64> {
        (0..60).map(|i| 0.5 + 0.4 * (i as f64 * 0.3).sin()).collect()
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let dataset = WindowedDataset {
            inputs: ndarray::Array2::zeros((0, 4)),
            targets: ndarray::Array1::zeros(0),
        };
        let result = train_model::<TestBackend>(&dataset, &small_config(), &NdArrayDevice::Cpu);
        assert!(matches!(result, Err(ForecastError::EmptyDataset { lookback: 4, .. })));
    }

    #[test]
    fn test_loss_history_has_one_entry_per_epoch() {
        let dataset = build_windows(&sine_series(), 4).unwrap();
        let outcome = train_model::<TestBackend>(&dataset, &small_config(), &NdArrayDevice::Cpu).unwrap();

        assert_eq!(outcome.loss_history.len(), 15);
        assert!(outcome.loss_history.iter().all(|l| l.is_finite() && *l >= 0.0));
        let first = outcome.loss_history[0];
        let last = outcome.loss_history[outcome.loss_history.len() - 1];
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
    }
}
