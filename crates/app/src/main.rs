use std::path::{Path, PathBuf};

use audio_align_core::{AlignError, CorrelationAlgorithm, MatchReport, MatchScanner, ScanConfig};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod source;

fn main() -> audio_align_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            reference,
            target,
            scan,
            output,
        } => run_match(&reference, &target, &scan, output.as_deref()),
        Commands::Inspect { input } => run_inspect(&input),
    }
}

fn run_match(
    reference: &Path,
    target: &Path,
    options: &ScanOptions,
    output: Option<&Path>,
) -> audio_align_core::Result<()> {
    let config = options.resolve()?;
    let scanner = MatchScanner::new(config)?;
    tracing::info!(?reference, ?target, config = ?scanner.config(), "starting scan");

    let reference = source::load_wav(reference)?;
    let target = source::load_wav(target)?;
    let report = MatchReport::generate(&scanner, &reference, &target)?;

    tracing::info!(windows = report.table.window_count(), "scan finished");
    println!("{report}");
    if report.similar {
        println!(
            "The recordings are similar (score above {}).",
            report.config.similarity_threshold
        );
    } else {
        println!("The recordings differ significantly.");
    }

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|err| AlignError::msg(format!("failed to serialise report: {err}")))?;
        std::fs::write(output, json)?;
        tracing::info!(?output, "report written");
    }

    Ok(())
}

fn run_inspect(input: &Path) -> audio_align_core::Result<()> {
    let signal = source::load_wav(input)?;
    let stats = signal.stats();

    tracing::info!(
        ?input,
        duration_seconds = stats.duration_seconds,
        sample_rate = stats.sample_rate,
        mean = stats.mean,
        std_dev = stats.std_dev,
        peak = stats.peak,
        "loaded signal"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Locate a reference clip inside a longer recording", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a target recording against a reference and report the best match.
    Match {
        /// WAV file the target windows are correlated against.
        reference: PathBuf,
        /// WAV file that is cut into overlapping windows.
        target: PathBuf,
        #[command(flatten)]
        scan: ScanOptions,
        /// Write the full report as JSON to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print duration, rate and amplitude statistics of a WAV file.
    Inspect {
        input: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct ScanOptions {
    /// JSON file with scan settings; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Window length in seconds.
    #[arg(long)]
    window_seconds: Option<f64>,
    /// Fraction of overlap between consecutive windows, in [0, 1).
    #[arg(long)]
    overlap: Option<f64>,
    /// Algorithm to run; repeat to run several. Order sets tie-break priority.
    #[arg(short, long = "algorithm", value_parser = parse_algorithm)]
    algorithms: Vec<CorrelationAlgorithm>,
    /// Score above which the recordings are reported as similar.
    #[arg(long)]
    threshold: Option<f64>,
}

impl ScanOptions {
    fn resolve(&self) -> audio_align_core::Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::from_json_file(path)?,
            None => ScanConfig::default(),
        };

        if let Some(window_seconds) = self.window_seconds {
            config.window_seconds = window_seconds;
        }
        if let Some(overlap) = self.overlap {
            config.overlap_fraction = overlap;
        }
        if !self.algorithms.is_empty() {
            config.algorithms = self.algorithms.clone();
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_algorithm(value: &str) -> Result<CorrelationAlgorithm, String> {
    value.parse().map_err(|err: AlignError| err.to_string())
}
