// External crates
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Local modules
use crate::constants;
use crate::error::{ForecastError, ForecastResult};

/// Information criterion minimised by the ARIMA order search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    Aic,
    Aicc,
    Bic,
}

/// Hyperparameters for the recurrent sequence model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub lookback: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub hidden_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            lookback: constants::DEFAULT_LOOKBACK,
            epochs: constants::DEFAULT_EPOCHS,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            hidden_size: constants::DEFAULT_HIDDEN_SIZE,
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            seed: constants::DEFAULT_SEED,
        }
    }
}

/// Bounds and criterion for the automatic ARIMA order search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    pub criterion: InformationCriterion,
    pub max_steps: usize,
    pub kpss_critical_value: f64,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            max_p: constants::DEFAULT_MAX_P,
            max_d: constants::DEFAULT_MAX_D,
            max_q: constants::DEFAULT_MAX_Q,
            criterion: InformationCriterion::Aic,
            max_steps: constants::DEFAULT_MAX_SEARCH_STEPS,
            kpss_critical_value: constants::KPSS_CRITICAL_5PCT,
        }
    }
}

/// Configuration passed into every pipeline entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub instruments: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub horizon: usize,
    pub test_split: f64,
    pub parallel: bool,
    pub neural: NeuralConfig,
    pub statistical: StatisticalConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            instruments: constants::DEFAULT_INSTRUMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            start_date: None,
            end_date: None,
            horizon: constants::DEFAULT_HORIZON,
            test_split: constants::DEFAULT_TEST_SPLIT,
            parallel: true,
            neural: NeuralConfig::default(),
            statistical: StatisticalConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> ForecastResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ForecastResult<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidConfig("horizon must be at least 1".into()));
        }
        if self.neural.lookback == 0 {
            return Err(ForecastError::InvalidConfig("lookback must be at least 1".into()));
        }
        if self.neural.epochs == 0 || self.neural.batch_size == 0 {
            return Err(ForecastError::InvalidConfig(
                "epochs and batch_size must be at least 1".into(),
            ));
        }
        if self.neural.hidden_size == 0 || self.neural.learning_rate <= 0.0 {
            return Err(ForecastError::InvalidConfig(
                "hidden_size and learning_rate must be positive".into(),
            ));
        }
        if !(self.test_split > 0.0 && self.test_split < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "test_split must be in (0, 1), got {}",
                self.test_split
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ForecastError::InvalidConfig(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}
