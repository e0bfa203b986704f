//! CLI entry point for nearest-neighbor imputation of CSV files.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_impute::{
    FittedImputer, ImputerConfig, IndexKind, Metric, NeighborOverflow, Strategy, frame_to_matrix,
    impute_frame,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// CLI-compatible similarity metric enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMetric {
    /// Squared Euclidean distance
    L2,
    /// Inner product (larger is more similar)
    Ip,
}

impl From<CliMetric> for Metric {
    fn from(cli: CliMetric) -> Self {
        match cli {
            CliMetric::L2 => Metric::Euclidean,
            CliMetric::Ip => Metric::InnerProduct,
        }
    }
}

/// CLI-compatible aggregation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStrategy {
    /// Mean of the neighbor values
    Mean,
    /// Median of the neighbor values
    Median,
}

impl From<CliStrategy> for Strategy {
    fn from(cli: CliStrategy) -> Self {
        match cli {
            CliStrategy::Mean => Strategy::Mean,
            CliStrategy::Median => Strategy::Median,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Nearest-neighbor imputation of missing numeric values",
    long_about = "Fills missing numeric cells from the most similar fully-observed rows.\n\n\
                  EXAMPLES:\n  \
                  # Impute a file in place of its own reference rows\n  \
                  lex-impute -i data.csv\n\n  \
                  # Fit on one file, repair another\n  \
                  lex-impute --fit-input train.csv -i test.csv -o test_filled.csv\n\n  \
                  # Approximate search with 16 partitions, probing 4\n  \
                  lex-impute -i data.csv --index IVF16,Flat --n-probe 4"
)]
struct Args {
    /// Path to the CSV file to impute
    #[arg(short, long)]
    input: PathBuf,

    /// CSV file to fit the model on (defaults to the input file)
    #[arg(long)]
    fit_input: Option<PathBuf>,

    /// Output CSV path
    ///
    /// If not specified, writes "<input_stem>_imputed.csv" next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file; command-line options override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of neighbors consulted per incomplete row
    #[arg(short = 'k', long)]
    neighbors: Option<usize>,

    /// Similarity metric
    #[arg(long, value_enum)]
    metric: Option<CliMetric>,

    /// Aggregation strategy for placeholders and neighbor values
    #[arg(long, value_enum)]
    strategy: Option<CliStrategy>,

    /// Index description: "Flat" or "IVF<n_lists>,Flat"
    #[arg(long)]
    index: Option<String>,

    /// Number of IVF partitions scanned per query
    #[arg(long)]
    n_probe: Option<usize>,

    /// Fail instead of clamping when --neighbors exceeds the complete rows
    #[arg(long)]
    strict_neighbors: bool,

    /// Repair rows on a single thread
    #[arg(long)]
    sequential: bool,

    /// Comma-separated numeric columns to impute (defaults to all numeric columns)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final summary)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Outcome of one imputation run.
#[derive(Debug)]
struct RunSummary {
    filled: usize,
    rows: usize,
    columns: usize,
    reference_rows: usize,
    fit_rows: usize,
    neighbors: usize,
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    let summary = run(&args)?;

    println!(
        "Filled {} missing values in {} rows x {} columns using {} of {} reference rows (k={})",
        summary.filled,
        summary.rows,
        summary.columns,
        summary.reference_rows,
        summary.fit_rows,
        summary.neighbors
    );
    println!("Output: {}", summary.output.display());

    Ok(())
}

/// Load, fit, impute and write as described by `args`.
fn run(args: &Args) -> Result<RunSummary> {
    for path in std::iter::once(&args.input).chain(args.fit_input.as_ref()) {
        if !path.exists() {
            return Err(anyhow!("Input file not found: {}", path.display()));
        }
    }

    let config = build_config(args)?;
    debug!("Effective configuration: {:?}", config);

    info!("Loading dataset from: {}", args.input.display());
    let data = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let fit_data = match &args.fit_input {
        Some(path) => {
            info!("Loading fit dataset from: {}", path.display());
            load_csv(path)?
        }
        None => data.clone(),
    };

    let (train, columns) = frame_to_matrix(&fit_data, args.columns.as_deref())?;
    if columns.is_empty() {
        return Err(anyhow!("No numeric columns to impute"));
    }
    info!("Imputing columns: {}", columns.join(", "));

    let model = FittedImputer::fit(&config, train.view())?;
    let filled = count_nulls(&data, &columns)?;
    let mut result = impute_frame(&model, &data, Some(&columns))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    write_csv(&mut result, &output)?;
    info!("Imputed dataset saved: {}", output.display());

    Ok(RunSummary {
        filled,
        rows: result.height(),
        columns: columns.len(),
        reference_rows: model.n_reference_rows(),
        fit_rows: fit_data.height(),
        neighbors: model.effective_neighbors(),
        output,
    })
}

/// Merge the optional JSON configuration with command-line overrides.
fn build_config(args: &Args) -> Result<ImputerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            ImputerConfig::from_json_file(path)?
        }
        None => ImputerConfig::default(),
    };

    if let Some(k) = args.neighbors {
        config.n_neighbors = k;
    }
    if let Some(metric) = args.metric {
        config.metric = metric.into();
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(ref index) = args.index {
        config.index_kind = index.parse()?;
    }
    if let Some(n_probe) = args.n_probe {
        match config.index_kind {
            IndexKind::Ivf { n_lists, .. } => {
                config.index_kind = IndexKind::Ivf { n_lists, n_probe };
            }
            IndexKind::Flat => warn!("--n-probe has no effect on a Flat index"),
        }
    }
    if args.strict_neighbors {
        config.neighbor_overflow = NeighborOverflow::Error;
    }
    if args.sequential {
        config.parallel = false;
    }

    config.validate()?;
    Ok(config)
}

fn count_nulls(df: &DataFrame, columns: &[String]) -> Result<usize> {
    let mut total = 0;
    for name in columns {
        let column = df.column(name)?;
        let nan_count = match column.dtype() {
            DataType::Float32 | DataType::Float64 => column
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .filter(|v| v.is_some_and(f64::is_nan))
                .count(),
            _ => 0,
        };
        total += column.null_count() + nan_count;
    }
    Ok(total)
}

/// "<dir>/<stem>_imputed.csv" for an input at "<dir>/<stem>.csv".
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_imputed.csv"))
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("data/train.csv")),
            PathBuf::from("data/train_imputed.csv")
        );
    }

    #[test]
    fn test_build_config_overrides() {
        let args = Args::parse_from([
            "lex-impute",
            "-i",
            "data.csv",
            "-k",
            "5",
            "--metric",
            "ip",
            "--strategy",
            "median",
            "--index",
            "IVF8,Flat",
            "--n-probe",
            "2",
            "--strict-neighbors",
        ]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.n_neighbors, 5);
        assert_eq!(config.metric, Metric::InnerProduct);
        assert_eq!(config.strategy, Strategy::Median);
        assert_eq!(
            config.index_kind,
            IndexKind::Ivf {
                n_lists: 8,
                n_probe: 2
            }
        );
        assert_eq!(config.neighbor_overflow, NeighborOverflow::Error);
    }

    #[test]
    fn test_build_config_rejects_bad_index() {
        let args = Args::parse_from(["lex-impute", "-i", "data.csv", "--index", "HNSW32"]);
        assert!(build_config(&args).is_err());
    }

    fn parse(argv: &[&OsStr]) -> Args {
        Args::parse_from(argv.iter().copied())
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn column_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_run_with_json_config_and_fit_input() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(
            dir.path(),
            "train.csv",
            "a,b\n1.0,1.0\n2.0,2.0\n3.0,3.0\n10.0,10.0\n",
        );
        let input = write_file(dir.path(), "input.csv", "a,b\n2.0,\n9.0,\n");
        let config = write_file(
            dir.path(),
            "config.json",
            r#"{"n_neighbors": 1, "metric": "l2", "strategy": "median"}"#,
        );
        let output = dir.path().join("out/filled.csv");

        let args = parse(&[
            OsStr::new("lex-impute"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("--fit-input"),
            train.as_os_str(),
            OsStr::new("--config"),
            config.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
        ]);
        let summary = run(&args).unwrap();

        assert_eq!(summary.filled, 2);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.reference_rows, 4);
        assert_eq!(summary.fit_rows, 4);
        assert_eq!(summary.neighbors, 1);
        assert_eq!(summary.output, output);

        let written = load_csv(&output).unwrap();
        assert_eq!(column_values(&written, "a"), vec![Some(2.0), Some(9.0)]);
        assert_eq!(column_values(&written, "b"), vec![Some(2.0), Some(10.0)]);
    }

    #[test]
    fn test_run_defaults_output_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "sensors.csv",
            "id,x,y\nr1,1.0,1.0\nr2,2.0,2.0\nr3,3.0,\n",
        );

        let args = parse(&[
            OsStr::new("lex-impute"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-k"),
            OsStr::new("1"),
            OsStr::new("--sequential"),
        ]);
        let summary = run(&args).unwrap();

        assert_eq!(summary.output, dir.path().join("sensors_imputed.csv"));
        assert_eq!(summary.filled, 1);

        let written = load_csv(&summary.output).unwrap();
        assert_eq!(
            column_values(&written, "y"),
            vec![Some(1.0), Some(2.0), Some(2.0)]
        );
        assert_eq!(written.column("id").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_run_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.csv");
        let args = parse(&[OsStr::new("lex-impute"), OsStr::new("-i"), missing.as_os_str()]);

        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }

    #[test]
    fn test_count_nulls_counts_nan_and_null() {
        let df = df![
            "a" => [Some(1.0), None, Some(f64::NAN)],
            "b" => [None::<&str>, None, None],
        ]
        .unwrap();
        let columns = vec!["a".to_string(), "b".to_string()];
        assert_eq!(count_nulls(&df, &columns).unwrap(), 5);
    }

    #[test]
    fn test_columns_split_on_commas() {
        let args = Args::parse_from(["lex-impute", "-i", "data.csv", "--columns", "a,b,c"]);
        assert_eq!(
            args.columns,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }
}
