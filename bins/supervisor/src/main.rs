use anyhow::{Context, Result};
use chroma_icc::{ResourceNames, RingConfig, interrupt};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use supervisor_config::SupervisorConfig;
use supervisor_engine::{SupervisorEngine, SupervisorSettings};
use tracing_subscriber::EnvFilter;

/// Owns the solution ring and keeps the best 3-coloring reported by the
/// generators.
#[derive(Parser, Debug)]
#[command(name = "supervisor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Stop after reading this many solutions.
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Seconds to wait before reading the first solution.
    #[arg(short = 'w', long, value_parser = parse_delay, default_value = "0")]
    delay: Duration,

    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix for the shared memory and semaphore names.
    #[arg(long)]
    namespace: Option<String>,

    /// Remove names left behind by a crashed supervisor first.
    #[arg(long)]
    reclaim: bool,
}

fn parse_delay(s: &str) -> Result<Duration, String> {
    let seconds: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("'{s}' must be >= 0"))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SupervisorConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => SupervisorConfig::default(),
    };
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    config.reclaim_stale |= cli.reclaim;
    config.validate()?;

    init_logging(&config.log_level);

    // Before anything is created, so a signal cannot leave names behind.
    interrupt::install().context("failed to install signal handlers")?;

    let ring = RingConfig::try_new(config.capacity)
        .with_context(|| format!("invalid capacity {}", config.capacity))?;
    let settings = SupervisorSettings {
        names: ResourceNames::with_namespace(&config.namespace),
        ring,
        limit: cli.limit,
        startup_delay: cli.delay,
        reclaim_stale: config.reclaim_stale,
    };

    let mut engine = SupervisorEngine::new(&settings).with_context(|| {
        format!(
            "failed to create shared resources for namespace '{}'",
            config.namespace
        )
    })?;
    let report = engine.run()?;

    tracing::info!(
        stop = ?report.stop,
        solutions_read = report.solutions_read,
        corrupt_records = report.corrupt_records,
        "supervisor finished"
    );
    println!("{report}");
    Ok(())
}
