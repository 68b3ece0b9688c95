// Canonical column names
pub const DATE_COLUMN: &str = "date";
pub const SYMBOL_COLUMN: &str = "symbol";
pub const PRICE_COLUMN: &str = "adjusted_close"; // every derived feature reads this column
pub const CLOSE_COLUMN: &str = "close";

// Derived feature columns, in output order
pub const FEATURE_COLUMNS: [&str; 11] = [
    "return",
    "log_return",
    "rolling_volatility_30",
    "rolling_mean_7",
    "rolling_mean_30",
    "momentum_7",
    "momentum_30",
    "rate_of_change_7",
    "ema_12",
    "ema_26",
    "macd",
];

// Feature windows
pub const SHORT_WINDOW: usize = 7;
pub const LONG_WINDOW: usize = 30;
pub const VOLATILITY_WINDOW: usize = 30;
pub const EMA_FAST_SPAN: usize = 12;
pub const EMA_SLOW_SPAN: usize = 26;

/// Rows needed before the longest rolling window produces a value
pub const MIN_USABLE_ROWS: usize = 30;

// Forecast table columns
pub const ARIMA_FORECAST_COLUMN: &str = "forecast_arima";
pub const LSTM_FORECAST_COLUMN: &str = "forecast_lstm";

// Pipeline defaults
pub const DEFAULT_HORIZON: usize = 30;
pub const DEFAULT_TEST_SPLIT: f64 = 0.2; // 20% of data held out for evaluation
pub const DEFAULT_INSTRUMENTS: [&str; 4] = ["TSLA", "SPY", "BND", "GLD"];

// Neural model defaults
pub const DEFAULT_LOOKBACK: usize = 60;
pub const DEFAULT_EPOCHS: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_HIDDEN_SIZE: usize = 50;
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
pub const DEFAULT_SEED: u64 = 42;

// Statistical model defaults
pub const DEFAULT_MAX_P: usize = 5;
pub const DEFAULT_MAX_D: usize = 2;
pub const DEFAULT_MAX_Q: usize = 5;
pub const DEFAULT_MAX_SEARCH_STEPS: usize = 100;
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;
pub const MIN_KPSS_OBSERVATIONS: usize = 10;
pub const MIN_STATISTICAL_OBSERVATIONS: usize = 8;
pub const SIGMA2_FLOOR: f64 = 1e-12;
