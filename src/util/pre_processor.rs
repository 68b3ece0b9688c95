// External crates
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use polars::prelude::*;

// Local modules
use crate::constants::{CLOSE_COLUMN, DATE_COLUMN, PRICE_COLUMN, SYMBOL_COLUMN};
use crate::error::{ForecastError, ForecastResult};

/// A single raw daily price record for one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub adjusted_close: Option<f64>,
    pub volume: Option<f64>,
    pub symbol: String,
}

impl PricePoint {
    pub fn new(symbol: &str, date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            open: None,
            high: None,
            low: None,
            adjusted_close: None,
            volume: None,
            symbol: symbol.to_string(),
        }
    }
}

/// Builds a raw record frame from typed price points.
///
/// The adjusted close column is only emitted when every point carries one,
/// so that the close column is used as the fallback otherwise.
pub fn price_points_to_frame(points: &[PricePoint]) -> PolarsResult<DataFrame> {
    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let symbols: Vec<String> = points.iter().map(|p| p.symbol.clone()).collect();

    let mut columns = vec![
        Series::new(DATE_COLUMN.into(), dates).into_column(),
        Series::new(CLOSE_COLUMN.into(), closes).into_column(),
        Series::new(SYMBOL_COLUMN.into(), symbols).into_column(),
    ];

    let optional: [(&str, Vec<Option<f64>>); 4] = [
        ("open", points.iter().map(|p| p.open).collect()),
        ("high", points.iter().map(|p| p.high).collect()),
        ("low", points.iter().map(|p| p.low).collect()),
        ("volume", points.iter().map(|p| p.volume).collect()),
    ];
    for (name, values) in optional {
        if values.iter().any(|v| v.is_some()) {
            columns.push(Series::new(name.into(), values).into_column());
        }
    }
    if !points.is_empty() && points.iter().all(|p| p.adjusted_close.is_some()) {
        let adjusted: Vec<Option<f64>> = points.iter().map(|p| p.adjusted_close).collect();
        columns.push(Series::new(PRICE_COLUMN.into(), adjusted).into_column());
    }

    DataFrame::new(columns)
}

/// Maps a raw column name onto the canonical lowercase name, if recognised
fn standard_column_name(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    let standard = match lower.as_str() {
        "open" | "open_price" => "open",
        "high" | "high_price" => "high",
        "low" | "low_price" => "low",
        "close" | "close_price" | "closeprice" => CLOSE_COLUMN,
        "adj close" | "adj_close" | "adjusted close" | "adjusted_close" | "adjclose" => PRICE_COLUMN,
        "volume" | "vol" => "volume",
        "date" | "timestamp" | "time" | "datetime" | "day" => DATE_COLUMN,
        "ticker" | "symbol" => SYMBOL_COLUMN,
        _ => return None,
    };
    Some(standard)
}

/// Looks a name up on the live columns; the cached schema can lag behind a rename
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|column| column.as_str() == name)
}

/// Renames recognised columns to their canonical lowercase names in place
pub fn standardize_column_names(df: &mut DataFrame) -> PolarsResult<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut renamed = false;
    for name in names {
        if let Some(standard) = standard_column_name(&name) {
            if name != standard && !has_column(df, standard) {
                df.rename(&name, standard.into())?;
                renamed = true;
            }
        }
    }

    // rebuild so later schema lookups see the new names
    if renamed {
        *df = DataFrame::new(std::mem::take(df).take_columns())?;
    }
    Ok(())
}

/// Chooses the price column: adjusted close when present, else close
pub fn select_price_column(df: &DataFrame) -> ForecastResult<&'static str> {
    if has_column(df, PRICE_COLUMN) {
        Ok(PRICE_COLUMN)
    } else if has_column(df, CLOSE_COLUMN) {
        Ok(CLOSE_COLUMN)
    } else {
        Err(ForecastError::MissingField(format!(
            "neither '{}' nor '{}' found in {:?}",
            PRICE_COLUMN,
            CLOSE_COLUMN,
            df.get_column_names()
        )))
    }
}

fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Reads a date column of any supported dtype; unparseable entries become `None`
pub fn parse_date_column(column: &Column) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let series = column.as_materialized_series();
    match series.dtype() {
        DataType::Date => Ok(series.date()?.as_date_iter().collect()),
        DataType::Datetime(_, _) => Ok(series
            .datetime()?
            .as_datetime_iter()
            .map(|dt| dt.map(|dt| dt.date()))
            .collect()),
        _ => {
            let as_str = series.cast(&DataType::String)?;
            Ok(as_str
                .str()?
                .into_iter()
                .map(|value| value.and_then(parse_date_str))
                .collect())
        }
    }
}

/// Cleans raw records into an ascending `(date, adjusted_close)` frame.
///
/// Rows whose price does not coerce to a float, or whose date does not parse,
/// are dropped. When the price came from the close column it is renamed to the
/// canonical adjusted close name. Optional bounds filter dates inclusively.
pub fn prepare_price_frame(
    raw: &DataFrame,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> ForecastResult<DataFrame> {
    let mut df = raw.clone();
    standardize_column_names(&mut df)?;

    let price_column = select_price_column(&df)?;
    if !has_column(&df, DATE_COLUMN) {
        return Err(ForecastError::MissingField(format!(
            "'{}' column not found",
            DATE_COLUMN
        )));
    }

    let prices = df
        .column(price_column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let prices = prices.f64()?;
    let dates = parse_date_column(df.column(DATE_COLUMN)?)?;

    let mut rows: Vec<(NaiveDate, f64)> = dates
        .into_iter()
        .zip(prices.into_iter())
        .filter_map(|(date, price)| match (date, price) {
            (Some(date), Some(price)) if !price.is_nan() => Some((date, price)),
            _ => None,
        })
        .filter(|(date, _)| start_date.map_or(true, |start| *date >= start))
        .filter(|(date, _)| end_date.map_or(true, |end| *date <= end))
        .collect();

    let dropped = raw.height() - rows.len();
    if dropped > 0 {
        warn!(
            "Dropped {} of {} raw rows (unparseable or out of range)",
            dropped,
            raw.height()
        );
    }

    rows.sort_by_key(|(date, _)| *date);
    if let Some(pair) = rows.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(ForecastError::InvalidInput(format!(
            "duplicate date {} in price series",
            pair[0].0
        )));
    }

    debug!(
        "Prepared {} price rows from column '{}'",
        rows.len(),
        price_column
    );

    let (dates, prices): (Vec<NaiveDate>, Vec<f64>) = rows.into_iter().unzip();
    let frame = DataFrame::new(vec![
        Series::new(DATE_COLUMN.into(), dates).into_column(),
        Series::new(PRICE_COLUMN.into(), prices).into_column(),
    ])?;
    Ok(frame)
}
