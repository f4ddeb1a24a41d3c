//! Historical token price resolver.
//!
//! Commands:
//! - `resolve`: USD price of a token at a past timestamp or date
//! - `backfill`: walk a token's daily history from creation through today
//! - `serve-jobs`: read backfill jobs as JSON lines from stdin and process them

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricehistory_api::UniswapV2SubgraphClient;
use pricehistory_chain::{
    BlockTimestampLocator, ChainReader, DeploymentLocator, Network, OnChainPriceOracle,
    RpcChainReader,
};
use pricehistory_core::config::{self, AppConfig, StoreConfig};
use pricehistory_core::{
    noon_of, unix_now, BackfillJob, BackfillWalker, BackfillWorker, Cache, MemoryCache,
    MemoryPriceStore, PoolDiscovery, PriceRequest, PriceResolver, PriceResponse, PriceStore,
    SqlitePriceStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to $PRICEHISTORY_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the USD price of a token at a point in time
    Resolve {
        #[arg(long)]
        token: Address,

        #[arg(long, default_value = "ethereum")]
        network: Network,

        /// Unix timestamp in seconds
        #[arg(long, conflicts_with = "date", required_unless_present = "date")]
        timestamp: Option<u64>,

        /// UTC date (YYYY-MM-DD), priced at noon
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Backfill daily prices from the token's creation through today
    Backfill {
        #[arg(long)]
        token: Address,

        #[arg(long, default_value = "ethereum")]
        network: Network,
    },
    /// Process backfill jobs read as JSON lines from stdin
    ServeJobs,
}

/// Wired-up resolver and walker.
struct Services {
    resolver: Arc<PriceResolver>,
    walker: Arc<BackfillWalker>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,pricehistory_core=debug,pricehistory_chain=debug")
        }))
        .init();

    let args = Args::parse();

    let path = config::config_path(args.config.as_deref());
    let app_config = config::load_config(&path)?;
    app_config.log_config();

    let services = build_services(&app_config).await?;

    match args.command {
        Command::Resolve {
            token,
            network,
            timestamp,
            date,
        } => {
            let timestamp = timestamp.or_else(|| date.map(noon_of));
            resolve(&services, token, network, timestamp).await
        }
        Command::Backfill { token, network } => {
            let report = services.walker.run(token, network).await;
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
        Command::ServeJobs => serve_jobs(&services, &app_config).await,
    }
}

async fn build_services(app_config: &AppConfig) -> Result<Services> {
    info!("Initializing components...");

    let retry = app_config.retry.policy();
    let networks = app_config.configured_networks()?;

    let endpoints: Vec<(Network, String)> = networks
        .iter()
        .filter_map(|(network, net_config)| {
            if config::has_unexpanded(&net_config.rpc_url) {
                warn!(network = %network, "No RPC endpoint, network disabled");
                return None;
            }
            Some((*network, net_config.rpc_url.clone()))
        })
        .collect();
    if endpoints.is_empty() {
        anyhow::bail!("No network has an RPC endpoint; set ETHEREUM_RPC_URL or POLYGON_RPC_URL");
    }

    let rpc = RpcChainReader::new(endpoints).context("Failed to create RPC providers")?;
    if let Err(e) = rpc.health_check().await {
        warn!(error = %e, "RPC health check failed");
    }
    let reader: Arc<dyn ChainReader> = Arc::new(rpc);

    let mut oracle = OnChainPriceOracle::new(reader.clone(), retry.clone())
        .with_max_staleness(app_config.resolver.max_oracle_staleness_secs);
    for (network, net_config) in &networks {
        if let Some(references) = net_config.reference_assets() {
            oracle = oracle.with_references(*network, references);
        }
    }

    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    let store: Arc<dyn PriceStore> = match &app_config.store {
        StoreConfig::Sqlite { url } => Arc::new(
            SqlitePriceStore::connect(url)
                .await
                .with_context(|| format!("Failed to open price store {}", url))?,
        ),
        StoreConfig::Memory => {
            warn!("Using in-memory price store, history is lost on exit");
            Arc::new(MemoryPriceStore::new())
        }
    };
    let locator = BlockTimestampLocator::new(reader.clone(), retry.clone());

    let mut resolver = PriceResolver::new(cache.clone(), store, locator, oracle)
        .with_settings(app_config.resolver.settings());
    for (network, net_config) in &networks {
        let pools = net_config.static_mappings();
        info!(network = %network, count = pools.len(), "Static pools loaded");
        resolver = resolver.with_static_pools(*network, pools);
    }

    if let Some(discovery) = &app_config.discovery {
        let references = app_config
            .network(discovery.network)
            .and_then(|net_config| net_config.reference_assets());
        match references {
            Some(references) if !config::has_unexpanded(&discovery.subgraph_url) => {
                let index = UniswapV2SubgraphClient::with_base_url(&discovery.subgraph_url)
                    .with_pairs_per_side(discovery.pairs_per_side);
                resolver = resolver.with_discovery(
                    PoolDiscovery::new(Arc::new(index), cache, discovery.network, references)
                        .with_retry(retry.clone())
                        .with_ttl(discovery.pool_cache_ttl()),
                );
                info!(network = %discovery.network, "Pool discovery initialized");
            }
            Some(_) => warn!("Subgraph URL not set, pool discovery disabled"),
            None => warn!(
                network = %discovery.network,
                "No reference assets for discovery network, pool discovery disabled"
            ),
        }
    }

    let resolver = Arc::new(resolver);
    let walker = Arc::new(BackfillWalker::new(
        resolver.clone(),
        Arc::new(DeploymentLocator::new(reader, retry)),
    ));

    info!("All components initialized");
    Ok(Services { resolver, walker })
}

async fn resolve(
    services: &Services,
    token: Address,
    network: Network,
    timestamp: Option<u64>,
) -> Result<()> {
    let request = PriceRequest {
        token: Some(token),
        network: Some(network),
        timestamp,
    };

    let outcome = match request.validate(unix_now()) {
        Ok((token, network, timestamp)) => {
            services.resolver.resolve(token, network, timestamp).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(point) => {
            println!("{}", serde_json::to_string(&PriceResponse::from(point))?);
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Price resolution failed");
            anyhow::bail!("{}", e.user_message())
        }
    }
}

async fn serve_jobs(services: &Services, app_config: &AppConfig) -> Result<()> {
    let (worker, queue) = BackfillWorker::new(
        services.walker.clone(),
        app_config.backfill.queue_capacity,
        app_config.backfill.max_concurrent_jobs,
    );
    let registry = queue.registry().clone();
    let worker = tokio::spawn(
        worker
            .with_status_retention(app_config.backfill.status_retention)
            .run(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ids = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let job: BackfillJob = match serde_json::from_str(line) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, line, "Ignoring malformed job");
                continue;
            }
        };
        let id = queue.enqueue(job).await?;
        ids.push(id);
    }

    drop(queue);
    worker.await.context("Backfill worker crashed")?;

    // Evicted statuses print as null
    for id in ids {
        println!(
            "{}",
            serde_json::json!({ "job": id, "result": registry.status(id) })
        );
    }
    Ok(())
}
