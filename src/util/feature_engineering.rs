// External crates
use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;

// Local modules
use crate::constants::{
    DATE_COLUMN, EMA_FAST_SPAN, EMA_SLOW_SPAN, FEATURE_COLUMNS, LONG_WINDOW, MIN_USABLE_ROWS,
    PRICE_COLUMN, SHORT_WINDOW, VOLATILITY_WINDOW,
};
use crate::error::ForecastResult;
use crate::util::pre_processor::{parse_date_column, prepare_price_frame};

/// Feature-augmented price history of one instrument.
///
/// Every retained row has all derived fields defined. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ProcessedSeries {
    symbol: String,
    frame: DataFrame,
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
    usable_rows: usize,
}

impl ProcessedSeries {
    fn from_frame(symbol: &str, frame: DataFrame, usable_rows: usize) -> ForecastResult<Self> {
        let dates = parse_date_column(frame.column(DATE_COLUMN)?)?
            .into_iter()
            .flatten()
            .collect();
        let prices = frame
            .column(PRICE_COLUMN)?
            .f64()?
            .into_no_null_iter()
            .collect();
        Ok(Self {
            symbol: symbol.to_string(),
            frame,
            dates,
            prices,
            usable_rows,
        })
    }

    fn empty(symbol: &str, usable_rows: usize) -> ForecastResult<Self> {
        let mut columns = vec![
            Series::new_empty(DATE_COLUMN.into(), &DataType::Date).into_column(),
            Series::new_empty(PRICE_COLUMN.into(), &DataType::Float64).into_column(),
        ];
        for name in FEATURE_COLUMNS {
            columns.push(Series::new_empty(name.into(), &DataType::Float64).into_column());
        }
        Self::from_frame(symbol, DataFrame::new(columns)?, usable_rows)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The canonical price column, oldest first
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Cleaned input rows before the warm-up drop
    pub fn usable_rows(&self) -> usize {
        self.usable_rows
    }

    /// An empty series means the raw history was too short to forecast
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Values of one feature column; nulls never occur in a processed series
    pub fn feature(&self, name: &str) -> ForecastResult<Vec<f64>> {
        Ok(self
            .frame
            .column(name)?
            .f64()?
            .into_no_null_iter()
            .collect())
    }
}

fn fixed_window(window: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: window,
        min_periods: window,
        center: false,
        weights: None,
        fn_params: None,
    }
}

/// Simple moving average over a trailing window
pub fn calculate_sma(price: &Series, window: usize) -> PolarsResult<Series> {
    price.rolling_mean(fixed_window(window))
}

/// Sample standard deviation over a trailing window
pub fn calculate_rolling_std(series: &Series, window: usize) -> PolarsResult<Series> {
    series.rolling_std(fixed_window(window))
}

/// Exponential moving average with α = 2 / (span + 1), seeded with the first price
pub fn calculate_ema(prices: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut ema = Vec::with_capacity(prices.len());
    let mut previous: Option<f64> = None;
    for &price in prices {
        let value = match previous {
            Some(prev) => alpha * price + (1.0 - alpha) * prev,
            None => price,
        };
        ema.push(value);
        previous = Some(value);
    }
    ema
}

/// Fractional change over `periods` rows; the first `periods` values are null
pub fn calculate_pct_change(price: &Series, periods: usize) -> PolarsResult<Series> {
    let shifted = price.shift(periods as i64);
    let diff = (price - &shifted)?;
    &diff / &shifted
}

/// ln(1 + r) for every defined return
pub fn calculate_log_returns(returns: &Series) -> PolarsResult<Series> {
    let log_returns: Float64Chunked = returns
        .f64()?
        .into_iter()
        .map(|r| r.map(f64::ln_1p))
        .collect();
    Ok(log_returns.into_series())
}

/// Derives the full feature set from a prepared `(date, adjusted_close)` frame
pub fn add_price_features(df: &DataFrame) -> PolarsResult<DataFrame> {
    let price = df.column(PRICE_COLUMN)?.as_materialized_series().clone();
    let price_values: Vec<f64> = price.f64()?.into_no_null_iter().collect();

    let returns = calculate_pct_change(&price, 1)?;
    let log_returns = calculate_log_returns(&returns)?;
    let volatility = calculate_rolling_std(&returns, VOLATILITY_WINDOW)?;
    let mean_short = calculate_sma(&price, SHORT_WINDOW)?;
    let mean_long = calculate_sma(&price, LONG_WINDOW)?;
    let momentum_short = (&price - &mean_short)?;
    let momentum_long = (&price - &mean_long)?;
    let roc_short = calculate_pct_change(&price, SHORT_WINDOW)?;

    let ema_fast = Series::new("ema_fast".into(), calculate_ema(&price_values, EMA_FAST_SPAN));
    let ema_slow = Series::new("ema_slow".into(), calculate_ema(&price_values, EMA_SLOW_SPAN));
    let macd = (&ema_fast - &ema_slow)?;

    let features = [
        returns,
        log_returns,
        volatility,
        mean_short,
        mean_long,
        momentum_short,
        momentum_long,
        roc_short,
        ema_fast,
        ema_slow,
        macd,
    ];
    let columns: Vec<Column> = features
        .into_iter()
        .zip(FEATURE_COLUMNS)
        .map(|(series, name)| series.with_name(name.into()).into_column())
        .collect();

    df.hstack(&columns)
}

/// Replaces NaN and infinite feature values with nulls.
///
/// Non-positive prices make returns and their rolling statistics undefined;
/// masking lets the null drop remove those rows with the warm-up rows.
fn mask_non_finite(mut df: DataFrame) -> PolarsResult<DataFrame> {
    for name in FEATURE_COLUMNS {
        let masked: Float64Chunked = df
            .column(name)?
            .f64()?
            .into_iter()
            .map(|value| value.filter(|v| v.is_finite()))
            .collect();
        df.with_column(masked.with_name(name.into()).into_series())?;
    }
    Ok(df)
}

/// Builds the processed series for one instrument from its raw records.
///
/// Fails only when no usable price column exists. Fewer than the warm-up
/// minimum of usable rows yields an empty series rather than an error;
/// callers skip forecasting for it.
pub fn build_processed_series(
    symbol: &str,
    raw: &DataFrame,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> ForecastResult<ProcessedSeries> {
    let prices = prepare_price_frame(raw, start_date, end_date)?;
    if prices.height() < MIN_USABLE_ROWS {
        info!(
            "{}: only {} usable rows, need {} for the warm-up window",
            symbol,
            prices.height(),
            MIN_USABLE_ROWS
        );
        return ProcessedSeries::empty(symbol, prices.height());
    }

    let with_features = mask_non_finite(add_price_features(&prices)?)?;
    let processed = with_features.drop_nulls::<String>(None)?;
    debug!(
        "{}: {} rows after dropping {} warm-up rows",
        symbol,
        processed.height(),
        with_features.height() - processed.height()
    );

    ProcessedSeries::from_frame(symbol, processed, prices.height())
}
