// External crates
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

// Local modules
use price_forecaster::config::PipelineConfig;
use price_forecaster::forecast::evaluation::evaluate_holdout;
use price_forecaster::forecast::pipeline::{batch_failed, process_batch, run_batch};
use price_forecaster::util::file_utils::{write_csv_file, CsvDirectorySource};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "price_forecaster")]
#[command(about = "Feature engineering and ARIMA + LSTM price forecasts for daily series")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Directory holding one <SYMBOL>.csv per instrument
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for generated CSV files
    #[arg(long, global = true, default_value = "forecasts")]
    output_dir: PathBuf,

    /// JSON pipeline configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Instruments to run, overriding the configuration
    #[arg(short, long, global = true, value_delimiter = ',')]
    symbols: Vec<String>,

    #[arg(long, global = true)]
    horizon: Option<usize>,

    #[arg(long, global = true)]
    lookback: Option<usize>,

    #[arg(long, global = true)]
    epochs: Option<usize>,

    /// Run instruments one after another (reproducible training)
    #[arg(long, global = true)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast every instrument and write <SYMBOL>_forecast.csv
    Forecast,
    /// Score both models on a holdout split of each instrument
    Evaluate,
    /// Write the feature-engineered series as <SYMBOL>_processed.csv
    Process,
}

fn load_config(args: &CommonArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if !args.symbols.is_empty() {
        config.instruments = args.symbols.clone();
    }
    if let Some(horizon) = args.horizon {
        config.horizon = horizon;
    }
    if let Some(lookback) = args.lookback {
        config.neural.lookback = lookback;
    }
    if let Some(epochs) = args.epochs {
        config.neural.epochs = epochs;
    }
    if args.sequential {
        config.parallel = false;
    }

    config.validate()?;
    Ok(config)
}

fn run_forecast(source: &CsvDirectorySource, config: &PipelineConfig, output_dir: &Path) -> Result<()> {
    let results = run_batch(source, config);

    for (symbol, result) in &results {
        let Ok(report) = result else {
            continue;
        };
        for failure in &report.failures {
            warn!("{}: no {} column: {}", symbol, failure.source, failure.error);
        }
        if report.table.is_empty() {
            continue;
        }
        let mut df = report.table.to_dataframe()?;
        write_csv_file(&mut df, output_dir.join(format!("{}_forecast.csv", symbol)))?;
    }

    if batch_failed(&results) {
        bail!("no instrument produced a forecast");
    }
    Ok(())
}

fn run_evaluate(source: &CsvDirectorySource, config: &PipelineConfig, output_dir: &Path) -> Result<()> {
    let mut summaries = Vec::new();

    for (symbol, processed) in process_batch(source, config) {
        let report = match processed.and_then(|series| evaluate_holdout(&series, config)) {
            Ok(report) => report,
            Err(e) => {
                warn!("{}: evaluation skipped: {}", symbol, e);
                continue;
            }
        };
        summaries.extend(report.summaries());
    }

    if summaries.is_empty() {
        bail!("no instrument could be evaluated");
    }

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join("evaluation.json");
    std::fs::write(&path, serde_json::to_string_pretty(&summaries)?)?;
    info!("Saved evaluation of {} models to {}", summaries.len(), path.display());
    Ok(())
}

fn run_process(source: &CsvDirectorySource, config: &PipelineConfig, output_dir: &Path) -> Result<()> {
    let mut written = 0;

    for (symbol, processed) in process_batch(source, config) {
        let series = match processed {
            Ok(series) if !series.is_empty() => series,
            Ok(_) => {
                warn!("{}: insufficient history, nothing written", symbol);
                continue;
            }
            Err(e) => {
                warn!("{}: processing failed: {}", symbol, e);
                continue;
            }
        };
        let mut df = series.frame().clone();
        write_csv_file(&mut df, output_dir.join(format!("{}_processed.csv", symbol)))?;
        written += 1;
    }

    if written == 0 {
        bail!("no instrument could be processed");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!(
        "{} v{} ({}, {} build)",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::PROFILE
    );

    let cli = Cli::parse();
    let config = load_config(&cli.common)?;
    let source = CsvDirectorySource::new(&cli.common.data_dir);
    let output_dir = &cli.common.output_dir;

    match cli.command {
        Commands::Forecast => run_forecast(&source, &config, output_dir),
        Commands::Evaluate => run_evaluate(&source, &config, output_dir),
        Commands::Process => run_process(&source, &config, output_dir),
    }
}
