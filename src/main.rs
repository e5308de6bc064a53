use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use streamscout::config::Config;
use streamscout::provider::{HttpLookupProvider, LookupProvider, StaticLookupProvider};
use streamscout::AvailabilityService;

/// Streamscout - look up where titles stream, with caching and batching
#[derive(Parser, Debug)]
#[command(name = "streamscout")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Region code (ISO 3166-1 alpha-2, e.g. us, gb, pl)
    #[arg(short, long, default_value = "us")]
    region: String,

    /// Answer from the built-in demo table instead of the availability API
    #[arg(long)]
    offline: bool,

    /// Prune the cache and exit
    #[arg(long)]
    prune: bool,

    /// Print Prometheus metrics after the results
    #[arg(long)]
    metrics: bool,

    /// Subject (movie) ids to look up
    #[arg(required_unless_present = "prune")]
    ids: Vec<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    streamscout::logging::init_subscriber(&config.logging)
        .context("Failed to initialize logging subsystem")?;

    tracing::info!(
        config_file = ?args.config,
        store = ?config.cache.store,
        offline = args.offline,
        "Configuration loaded successfully"
    );

    let provider: Arc<dyn LookupProvider> = if args.offline {
        Arc::new(StaticLookupProvider::demo())
    } else {
        let http =
            HttpLookupProvider::new(&config.provider).context("Failed to build HTTP client")?;
        tracing::info!(endpoint = http.endpoint(), "Using availability API");
        Arc::new(http)
    };

    let service = AvailabilityService::new(&config, provider)?;
    let pruned = service.init().await;

    if args.prune {
        println!("{}", serde_json::json!({ "pruned": pruned }));
        return Ok(());
    }

    let resolved = service.lookup_many(&args.ids, &args.region).await;
    service.shutdown().await;

    for item in &resolved {
        println!("{}", serde_json::to_string(item)?);
    }

    if args.metrics {
        print!("{}", service.metrics().export_prometheus());
    }

    Ok(())
}
