use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{debug, error, info, warn};
use orb_cli::visualize::save_matches;
use orb_cli::{Classification, Classifier, ClassifierConfig, Manifest, OrbResult};

/// Classify an image against a labeled reference corpus using ORB features.
#[derive(Parser, Debug)]
#[command(name = "orb-classify", version, about = "Classify an image against a labeled corpus with ORB features")]
struct CliArgs {
    /// Query image to classify.
    #[arg(value_name = "QUERY")]
    query: PathBuf,
    /// Directory of reference images named `<label>_<id>.<ext>`.
    #[arg(long, value_name = "DIR")]
    corpus: PathBuf,
    /// Path to TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// TOML manifest mapping corpus file names to labels.
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
    /// Canonical image width.
    #[arg(long)]
    width: Option<u32>,
    /// Canonical image height.
    #[arg(long)]
    height: Option<u32>,
    /// Nearest neighbours per query descriptor.
    #[arg(long)]
    k: Option<usize>,
    /// Size of the best-match window.
    #[arg(long)]
    top_n: Option<usize>,
    /// Accept matches with a Hamming distance below this.
    #[arg(long)]
    max_distance: Option<u32>,
    /// Comma-separated label allow-list.
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,
    /// Worker threads.
    #[arg(long)]
    threads: Option<usize>,
    /// Output format for results.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write a side-by-side image of the winning matches.
    #[arg(long, value_name = "FILE")]
    matches_out: Option<PathBuf>,
    /// Log verbosity level.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn main() -> ExitCode {
    let cli = CliArgs::parse();
    init_logger(cli.log_level);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            error!("{}", err);
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set
fn init_logger(level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stderr);
    builder.filter_level(log::LevelFilter::Info);
    builder.parse_filters(level.as_str());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(|buf, record| {
        use std::io::Write;
        let module = record.module_path().unwrap_or(record.target());
        writeln!(
            buf,
            "{} [{}] {}: {}",
            buf.timestamp_millis(),
            record.level(),
            module,
            record.args()
        )
    });

    if let Err(err) = builder.try_init() {
        eprintln!("Failed to initialize logger: {}", err);
    }
}

fn apply_overrides(config: &mut ClassifierConfig, cli: &CliArgs) -> Vec<String> {
    let mut overrides = Vec::new();

    if let Some(width) = cli.width {
        overrides.push(format!("width = {}", width));
        config.width = width;
    }
    if let Some(height) = cli.height {
        overrides.push(format!("height = {}", height));
        config.height = height;
    }
    if let Some(k) = cli.k {
        overrides.push(format!("k = {}", k));
        config.k = k;
    }
    if let Some(top_n) = cli.top_n {
        overrides.push(format!("top_n = {}", top_n));
        config.top_n = top_n;
    }
    if let Some(max_distance) = cli.max_distance {
        overrides.push(format!("max_distance = {}", max_distance));
        config.max_distance = max_distance;
    }
    if let Some(labels) = &cli.labels {
        overrides.push(format!("labels = {}", labels.join(",")));
        config.labels = labels.clone();
    }
    if let Some(threads) = cli.threads {
        overrides.push(format!("n_threads = {}", threads));
        config.detector.n_threads = threads;
    }

    overrides
}

/// Returns whether a prediction was made
fn run(cli: &CliArgs) -> OrbResult<bool> {
    let mut config = match &cli.config {
        Some(path) => ClassifierConfig::load_toml(path)?,
        None => ClassifierConfig::default(),
    };
    for o in apply_overrides(&mut config, cli) {
        debug!("override: {}", o);
    }
    config.validate()?;
    info!("configuration: {}", config.summary());

    if let Err(err) = orb_core::init_thread_pool(config.detector.n_threads) {
        warn!("could not size the thread pool: {}", err);
    }

    let t0 = Instant::now();
    let classifier = Classifier::new(config)?;
    let query = classifier.prepare_query(&cli.query)?;
    let manifest = cli.manifest.as_deref().map(Manifest::load).transpose()?;
    let corpus = classifier.load_corpus(&cli.corpus, manifest)?;
    let classification = classifier.classify_features(&query.features, &corpus)?;
    info!("classification finished in {:.2?}", t0.elapsed());

    print_report(&classification, cli.format)?;

    let Some(prediction) = classification.prediction() else {
        return Ok(false);
    };

    if let Some(path) = &cli.matches_out {
        if let Some(entry) = corpus.get(prediction.entry_index) {
            save_matches(
                path,
                &query.image.color,
                &query.features.keypoints,
                &entry.image,
                &entry.features.keypoints,
                &prediction.matches,
                classifier.config().max_distance,
            )?;
            info!("match visualisation written to {}", path.display());
        }
    }

    Ok(true)
}

fn print_report(classification: &Classification, format: OutputFormat) -> OrbResult<()> {
    match format {
        OutputFormat::Text => {
            for line in classification.report_lines() {
                println!("{}", line);
            }
        }
        OutputFormat::Json => println!("{}", classification.to_json()?),
    }
    Ok(())
}
