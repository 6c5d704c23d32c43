use anyhow::{Context, Result};
use chroma_icc::{ResourceError, ResourceNames, interrupt};
use clap::Parser;
use generator_config::GeneratorConfig;
use generator_core::{Graph, RandomColoring};
use generator_engine::GeneratorEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Searches random 3-colorings of a graph and reports the conflicting edges
/// to a running supervisor.
#[derive(Parser, Debug)]
#[command(name = "generator")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Graph edges as `u-v` pairs of node IDs, e.g. `0-1 1-2 2-0`.
    #[arg(required = true, value_name = "EDGE")]
    edges: Vec<String>,

    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix for the shared memory and semaphore names.
    #[arg(long)]
    namespace: Option<String>,

    /// Fixed RNG seed.
    #[arg(long)]
    seed: Option<u64>,
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
    let graph = Graph::parse(&cli.edges).context("invalid graph")?;

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    init_logging(&config.log_level);
    interrupt::install().context("failed to install signal handlers")?;

    let names = ResourceNames::with_namespace(&config.namespace);
    let source = RandomColoring::new(graph, config.seed);
    let mut engine = GeneratorEngine::attach(&names, source).map_err(|err| match err {
        ResourceError::MissingOwner { .. } => {
            anyhow::Error::new(err).context("Supervisor must be running first")
        }
        err => anyhow::Error::new(err).context("failed to attach to supervisor"),
    })?;
    tracing::info!(namespace = %config.namespace, "attached to supervisor");

    engine.run()?;
    Ok(())
}
