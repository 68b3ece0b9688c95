use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use super::{quick_config, trading_days};
use crate::forecast::pipeline::{batch_failed, process_batch, run_batch, InstrumentStatus};
use crate::forecast::ModelSource;
use crate::util::file_utils::{read_csv_file, write_csv_file, CsvDirectorySource};

/// Writes a provider-style CSV with mixed-case headers and one bad row
fn write_raw_csv(dir: &Path, symbol: &str, len: usize) -> Result<()> {
    let mut body = String::from("Date,Open,Close,Adj Close,Volume\n");
    for (i, date) in trading_days(len).iter().enumerate() {
        let close = 50.0 + i as f64 * 0.5;
        body.push_str(&format!("{},{},{},{},1000\n", date, close, close + 1.0, close));
    }
    body.push_str("2030-01-01,1.0,n/a,null,1000\n");
    fs::write(dir.join(format!("{}.csv", symbol)), body)?;
    Ok(())
}

#[test]
fn test_batch_over_csv_directory() -> Result<()> {
    let data = tempdir()?;
    write_raw_csv(data.path(), "AAA", 45)?;
    write_raw_csv(data.path(), "SHORT", 12)?;

    let source = CsvDirectorySource::new(data.path());
    let config = quick_config(&["AAA", "SHORT", "NOPE"], 3);
    let results = run_batch(&source, &config);

    assert_eq!(results.len(), 3);
    let aaa = results[0].1.as_ref().unwrap();
    assert_eq!(aaa.processed.len(), 15);
    // Adj Close wins over Close
    assert_eq!(aaa.processed.prices()[0], 50.0 + 30.0 * 0.5);
    assert_eq!(aaa.table.len(), 3);

    let short = results[1].1.as_ref().unwrap();
    assert_eq!(short.status(), InstrumentStatus::NoForecast);
    assert!(results[2].1.is_err());
    assert!(!batch_failed(&results));
    Ok(())
}

#[test]
fn test_parallel_batch_keeps_instrument_order() -> Result<()> {
    let data = tempdir()?;
    for symbol in ["A", "B", "C"] {
        write_raw_csv(data.path(), symbol, 40)?;
    }
    let mut config = quick_config(&["A", "B", "C"], 2);
    config.parallel = true;

    let results = run_batch(&CsvDirectorySource::new(data.path()), &config);
    let symbols: Vec<&str> = results.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(symbols, vec!["A", "B", "C"]);
    for (_, result) in &results {
        let report = result.as_ref().unwrap();
        assert_eq!(report.table.len(), 2);
        assert!(report.table.column(ModelSource::Neural).unwrap().iter().all(Option::is_some));
    }
    Ok(())
}

#[test]
fn test_forecast_and_processed_export() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    write_raw_csv(data.path(), "AAA", 45)?;
    let source = CsvDirectorySource::new(data.path());
    let config = quick_config(&["AAA"], 4);

    let results = run_batch(&source, &config);
    let report = results[0].1.as_ref().unwrap();
    let mut table = report.table.to_dataframe()?;
    let path = write_csv_file(&mut table, out.path().join("AAA_forecast.csv"))?;

    let written = read_csv_file(&path)?;
    assert_eq!(written.height(), 4);
    assert_eq!(written.get_column_names_str(), vec!["date", "forecast_arima", "forecast_lstm"]);

    let processed = process_batch(&source, &config);
    let series = processed[0].1.as_ref().unwrap();
    let mut frame = series.frame().clone();
    let path = write_csv_file(&mut frame, out.path().join("nested").join("AAA_processed.csv"))?;
    let written = read_csv_file(&path)?;
    assert_eq!(written.height(), 15);
    assert_eq!(written.width(), 13);
    Ok(())
}
