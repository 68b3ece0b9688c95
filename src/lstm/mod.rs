/// # LSTM Sequence Forecaster
///
/// Single-feature recurrent model over min-max scaled prices.
///
/// ## Pipeline
///
/// 1. **Tensor preparation**: scaling parameters and (window, target) pairs
/// 2. **LSTM cell**: fused-gate recurrent layer
/// 3. **Model architecture**: LSTM layer followed by a linear head
/// 4. **Training**: seeded mini-batch MSE training with Adam
/// 5. **Prediction**: recursive multi-step loop and the forecaster entry point
///
/// ## Usage
///
/// ```rust,no_run
/// use chrono::NaiveDate;
/// use price_forecaster::config::NeuralConfig;
/// use price_forecaster::lstm::step_5_prediction::NeuralSequenceForecaster;
///
/// let prices: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
/// let last_date = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
/// let forecaster: NeuralSequenceForecaster = NeuralSequenceForecaster::new(NeuralConfig::default());
/// let forecast = forecaster.forecast(&prices, last_date, 30).unwrap();
/// ```
pub mod step_1_tensor_preparation;
pub mod step_2_lstm_cell;
pub mod step_3_lstm_model_arch;
pub mod step_4_train_model;
pub mod step_5_prediction;
