//! Agent Launchpad service entry point.
//!
//! Starts a background indexer task that follows the launchpad and AMM
//! contract logs and persists them to SQLite. Simultaneously exposes an Axum
//! REST API over the contract facade, the indexed events and the
//! transaction log.

use std::sync::Arc;
use std::time::Duration;

use agent_launchpad::api::{self, ApiState};
use agent_launchpad::config::Config;
use agent_launchpad::db;
use agent_launchpad::indexer::{self, IndexerState};
use agent_launchpad::rpc::{EthRpc, HttpRpc};
use agent_launchpad::txlog::TransactionLog;
use agent_launchpad::LaunchpadClient;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(
        "Network: {} (chain {}), RPC {}",
        config.network.name, config.network.chain_id, config.network.rpc_url
    );

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared by facade calls and the indexer.
    let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
    let rpc: Arc<dyn EthRpc> = Arc::new(HttpRpc::new(http, config.network.rpc_url.clone()));

    match rpc.chain_id().await {
        Ok(id) if id != config.network.chain_id => warn!(
            "RPC reports chain {id} but CHAIN_ID is {}; explorer links may not match",
            config.network.chain_id
        ),
        Ok(_) => {}
        Err(e) => warn!("Could not query chain id: {e}"),
    }

    let client = LaunchpadClient::new(
        rpc.clone(),
        config.network.clone(),
        config.wallet,
        config.tx.clone(),
    );
    match config.wallet {
        Some(wallet) => info!("Writes enabled from {wallet}"),
        None => info!("No WALLET_ADDRESS set; serving reads only"),
    }

    let shutdown = CancellationToken::new();

    // ─── Background indexer ───────────────────────────────
    let indexer_task = if config.indexer_enabled {
        let indexer_state = Arc::new(IndexerState {
            pool: pool.clone(),
            rpc,
            config: config.clone(),
        });
        Some(tokio::spawn(indexer::run(indexer_state, shutdown.clone())))
    } else {
        info!("Indexer disabled");
        None
    };

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(ApiState {
        txlog: TransactionLog::new(pool.clone()),
        pool,
        client,
    });
    let app = api::router(api_state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(task) = indexer_task {
        task.await?;
    }
    Ok(())
}
