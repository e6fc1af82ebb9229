//! ZoomLog Ingestion
//!
//! Loads exported Zoom users into the vector collection:
//! 1. Ensures the collection exists
//! 2. Reads every *.json export in the data directory
//! 3. Flattens and chunks each meeting summary
//! 4. Upserts one document per chunk, keyed by recording id and chunk index

mod chunker;
mod errors;
mod flatten;
mod loader;
mod processor;
mod report;

use crate::processor::IngestionProcessor;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use zoomlog_common::config::{AppConfig, ChunkStrategy, ObservabilityConfig};
use zoomlog_common::store::create_store;
use zoomlog_common::VERSION;

#[derive(Debug, Parser)]
#[command(
    name = "zoomlog-ingest",
    version,
    about = "Chunk Zoom meeting summaries and upsert them into an Astra DB vector collection"
)]
struct Args {
    /// Configuration file (defaults to config/default, config/$APP_ENV, config/local)
    #[arg(long)]
    config: Option<String>,

    /// Directory containing the exported *.json files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Target collection name
    #[arg(long)]
    collection: Option<String>,

    /// Maximum chunk length in characters, also the embedding dimension
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Skip files that fail to parse instead of stopping the run
    #[arg(long)]
    continue_on_parse_error: bool,

    /// Write to an in-memory collection instead of Astra DB
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Window,
    Semantic,
}

impl From<StrategyArg> for ChunkStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Window => ChunkStrategy::Window,
            StrategyArg::Semantic => ChunkStrategy::Semantic,
        }
    }
}

impl Args {
    fn load_config(&self) -> zoomlog_common::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::load()?,
        };

        if let Some(dir) = &self.data_dir {
            config.ingest.data_dir = dir.clone();
        }
        if let Some(name) = &self.collection {
            config.collection.name = name.clone();
        }
        if let Some(size) = self.chunk_size {
            config.chunking.embedding_and_chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunking.chunk_overlap = overlap;
        }
        if let Some(strategy) = self.strategy {
            config.chunking.strategy = strategy.into();
        }
        if self.continue_on_parse_error {
            config.ingest.continue_on_parse_error = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// One-line start banner naming the version, target and mode of the run
fn start_banner(config: &AppConfig, dry_run: bool) -> String {
    format!(
        "Starting ZoomLog ingestion v{} | collection: {} | data dir: {} | mode: {}",
        VERSION,
        config.collection.name,
        config.ingest.data_dir.display(),
        if dry_run { "dry run" } else { "astra" }
    )
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load configuration
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&ObservabilityConfig::default());
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    // Initialize tracing
    init_tracing(&config.observability);

    info!("{}", start_banner(&config, args.dry_run));
    if config.langflow.flow_id.is_some() {
        info!("Langflow settings present; not used during ingestion");
    }

    // Connect to the store and provision the collection
    let store = create_store(&config, args.dry_run).map_err(|e| {
        error!(error = %e, fatal = e.is_fatal(), "Failed to initialize vector store");
        e
    })?;

    info!(
        collection = %config.collection.name,
        chunk_size = config.chunking.embedding_and_chunk_size,
        chunk_overlap = config.chunking.chunk_overlap,
        "Preparing Astra database collection..."
    );
    let processor = IngestionProcessor::provision(store.as_ref(), &config)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to provision collection");
            e
        })?;

    // Ingest
    let report = processor
        .process_directory(&config.ingest.data_dir)
        .await
        .map_err(|e| {
            error!(error = %e, "Ingestion aborted");
            e
        })?;

    println!("{}", report);

    if report.is_clean() {
        info!("Ingestion finished");
    } else {
        warn!("Ingestion finished with failures");
    }

    Ok(())
}
