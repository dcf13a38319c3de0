use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use term_resolver::{
    split_terms, BatchCoordinator, BatchRequest, HttpQueryFrontProvider, InMemoryCatalog,
    QueryFrontProvider, ResolutionCache, ResolverConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "term-resolver")]
#[command(about = "Resolve free-text terms against a keyword-searchable catalog")]
struct Args {
    /// Terms to resolve, separated by ';'
    terms: String,

    /// Max number of terms resolved at once (or set TERM_RESOLVER_CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Catalog search page URL (or set TERM_RESOLVER_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds a probe may wait for results (or set TERM_RESOLVER_PROBE_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Resolve against a local JSON catalog instead of the remote page
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = ResolverConfig::from_env()?;
    if let Some(limit) = args.concurrency {
        config.concurrency_limit = limit;
    }
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if let Some(secs) = args.timeout_secs {
        config.probe_timeout = Duration::from_secs(secs);
    }
    config.validate()?;

    let terms = split_terms(&args.terms);
    if terms.is_empty() {
        warn!("No terms given");
        return Ok(());
    }

    let provider: Arc<dyn QueryFrontProvider> = match &args.catalog {
        Some(path) => {
            info!("Using local catalog {}", path.display());
            Arc::new(InMemoryCatalog::from_json_file(path)?)
        }
        None => {
            info!("Using catalog at {}", config.base_url);
            Arc::new(HttpQueryFrontProvider::new(&config.base_url)?)
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, skipping remaining lookups");
            on_interrupt.cancel();
        }
    });

    let coordinator = BatchCoordinator::from_provider(provider, config.probe_timeout);
    let request = BatchRequest::new(terms, config.concurrency_limit).with_cancel(cancel);
    let outcome = coordinator.run(request, &ResolutionCache::new()).await;

    println!("\n=== Results ===");
    for result in &outcome.results {
        println!("{}: {}", result.term, result.display);
    }
    println!("\nSearch time: {:.2} seconds", outcome.elapsed_secs);
    if let Some(error) = &outcome.first_error {
        println!("Error: {}", error);
    }

    Ok(())
}
