// External crates
use log::info;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

// Local modules
use crate::error::{ForecastError, ForecastResult};
use crate::util::pre_processor::standardize_column_names;

/// Supplies the raw price records of one instrument.
///
/// Implementations own all I/O and credentials; the pipeline only sees the
/// returned frame, which must hold a date column and a close or adjusted
/// close column.
pub trait RawSeriesSource: Sync {
    fn load(&self, symbol: &str) -> ForecastResult<DataFrame>;
}

/// Reads `<SYMBOL>.csv` files from one directory
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }
}

impl RawSeriesSource for CsvDirectorySource {
    fn load(&self, symbol: &str) -> ForecastResult<DataFrame> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(ForecastError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Data for {} not found at {}", symbol, path.display()),
            )));
        }
        read_csv_file(&path)
    }
}

/// Holds raw frames in memory, keyed by symbol
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    frames: HashMap<String, DataFrame>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, frame: DataFrame) {
        self.frames.insert(symbol.to_string(), frame);
    }
}

impl RawSeriesSource for InMemorySource {
    fn load(&self, symbol: &str) -> ForecastResult<DataFrame> {
        self.frames
            .get(symbol)
            .cloned()
            .ok_or_else(|| ForecastError::MissingField(format!("no records for symbol {}", symbol)))
    }
}

/// Reads a CSV file and standardises its column names.
///
/// Every column is read as text so that price coercion happens in one place.
pub fn read_csv_file<P: AsRef<Path>>(file_path: P) -> ForecastResult<DataFrame> {
    let path = file_path.as_ref();
    info!("Loading data from: {}", path.display());

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    standardize_column_names(&mut df)?;
    Ok(df)
}

/// Writes a frame to CSV, creating parent directories as needed
pub fn write_csv_file<P: AsRef<Path>>(df: &mut DataFrame, file_path: P) -> ForecastResult<PathBuf> {
    let path = file_path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(path.to_path_buf())
}
