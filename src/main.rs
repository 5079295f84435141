use clap::Parser;
use fsmatch::{CsvSink, LinkageConfig, Pipeline};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Probabilistic record linkage between two record files
#[derive(Parser, Debug)]
#[command(name = "fsmatch")]
#[command(about = "Fellegi-Sunter record linkage", long_about = None)]
struct Args {
    /// Path to the JSON linkage configuration
    config: PathBuf,

    /// Write matches to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the configured score cutoff
    #[arg(long)]
    cutoff: Option<f64>,

    /// Override the configured EM seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run<W: Write>(pipeline: &Pipeline, writer: W) -> anyhow::Result<()> {
    let mut sink = CsvSink::new(writer, pipeline.comparator());
    let report = pipeline.run(&mut sink)?;
    sink.into_inner()?.flush()?;

    info!(
        "Linked {} left and {} right records: {} training pairs, {} patterns",
        report.left_records, report.right_records, report.pairs, report.distinct_patterns
    );
    if let Some(fit) = report.fit {
        info!(
            "EM finished after {} iterations, log-likelihood {:.6}, converged: {}",
            fit.iterations, fit.log_likelihood, fit.converged
        );
    }
    info!("Wrote {} matches", report.written);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Matches may go to stdout, so logs go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting fsmatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", args.config);

    let mut config = LinkageConfig::from_file(&args.config)?;
    if let Some(cutoff) = args.cutoff {
        config.cutoff = cutoff;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let pipeline = Pipeline::from_config(config)?;

    match &args.output {
        Some(path) => {
            info!("Writing matches to {:?}", path);
            run(&pipeline, BufWriter::new(File::create(path)?))
        }
        None => run(&pipeline, io::stdout().lock()),
    }
}
