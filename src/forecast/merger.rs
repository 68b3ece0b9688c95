// External crates
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

// Local modules
use super::{ForecastSeries, ModelSource};
use crate::constants::DATE_COLUMN;

/// One date of the merged table; `values` follows the table's column order
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Forecasts of several models outer-joined on date
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    sources: Vec<ModelSource>,
    rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn sources(&self) -> &[ModelSource] {
        &self.sources
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    /// Values of one model column, `None` where the model has no forecast
    pub fn column(&self, source: ModelSource) -> Option<Vec<Option<f64>>> {
        let index = self.sources.iter().position(|s| *s == source)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }

    /// Date column followed by one nullable float column per model
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![Series::new(DATE_COLUMN.into(), self.dates()).into_column()];
        for (index, source) in self.sources.iter().enumerate() {
            let values: Vec<Option<f64>> = self.rows.iter().map(|row| row.values[index]).collect();
            columns.push(Series::new(source.column_name().into(), values).into_column());
        }
        DataFrame::new(columns)
    }
}

/// Outer-joins forecast series on date.
///
/// Every source in `expected` gets a column even if no series was supplied for
/// it, so a model that failed shows up as an all-missing column. Series from
/// sources not listed in `expected` are appended as extra columns. Rows are
/// in ascending date order with no duplicates.
pub fn merge_forecasts(expected: &[ModelSource], series: &[ForecastSeries]) -> ForecastTable {
    let mut sources: Vec<ModelSource> = Vec::new();
    for source in expected.iter().copied().chain(series.iter().map(|s| s.source())) {
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for forecast in series {
        let Some(index) = sources.iter().position(|s| *s == forecast.source()) else {
            continue;
        };
        for point in forecast.points() {
            let row = by_date
                .entry(point.date)
                .or_insert_with(|| vec![None; sources.len()]);
            row[index] = Some(point.value);
        }
    }

    let rows = by_date
        .into_iter()
        .map(|(date, values)| ForecastRow { date, values })
        .collect();
    ForecastTable { sources, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn test_two_full_series_merge_row_per_date() {
        let arima = ForecastSeries::from_values(ModelSource::Statistical, monday(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let lstm = ForecastSeries::from_values(ModelSource::Neural, monday(), &[1.5, 2.5, 3.5, 4.5, 5.5]);
        let table = merge_forecasts(&ModelSource::ALL, &[arima, lstm]);

        assert_eq!(table.len(), 5);
        let dates = table.dates();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert!(table.rows().iter().all(|row| row.values.iter().all(|v| v.is_some())));
    }

    #[test]
    fn test_failed_model_contributes_missing_column() {
        let lstm = ForecastSeries::from_values(ModelSource::Neural, monday(), &[10.0, 11.0]);
        let table = merge_forecasts(&ModelSource::ALL, &[lstm]);

        assert_eq!(table.sources(), &ModelSource::ALL);
        assert_eq!(table.column(ModelSource::Statistical), Some(vec![None, None]));
        assert_eq!(table.column(ModelSource::Neural), Some(vec![Some(10.0), Some(11.0)]));
    }

    #[test]
    fn test_misaligned_horizons_leave_gaps() {
        let arima = ForecastSeries::from_values(ModelSource::Statistical, monday(), &[1.0, 2.0, 3.0]);
        let lstm = ForecastSeries::from_values(ModelSource::Neural, monday(), &[9.0]);
        let table = merge_forecasts(&ModelSource::ALL, &[arima, lstm]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.column(ModelSource::Neural), Some(vec![Some(9.0), None, None]));
    }

    #[test]
    fn test_no_series_gives_empty_table_with_columns() {
        let table = merge_forecasts(&ModelSource::ALL, &[]);
        assert!(table.is_empty());

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn test_dataframe_has_nulls_for_missing() {
        let arima = ForecastSeries::from_values(ModelSource::Statistical, monday(), &[1.0, 2.0]);
        let df = merge_forecasts(&ModelSource::ALL, &[arima]).to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column(ModelSource::Neural.column_name()).unwrap().null_count(), 2);
    }
}
