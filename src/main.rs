mod agent;
mod bus;
mod chain;
mod config;
mod domain;
mod error;
mod lifecycle;
mod lock;
mod pricing;
mod reaper;
mod routes;
mod signature;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use bus::InMemoryMessageBus;
use chain::mock::MockChainGateway;
use config::Config;
use lifecycle::{FixedPriceOracle, LifecycleController};
use reaper::Reaper;
use store::InMemoryOrderStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    // The mock gateway and a fixed oracle are what this binary ships
    // with; swapping in `chain::evm::EvmChainGateway` /
    // `chain::near::NearChainGateway` and a real price feed behind the
    // `ChainGateway`/`PriceOracle` traits does not touch the rest of
    // the wiring below.
    let store = InMemoryOrderStore::new();
    let bus = Arc::new(InMemoryMessageBus::new());
    let chain = Arc::new(MockChainGateway::new());
    let oracle = Arc::new(FixedPriceOracle(1_000_000));

    let controller = Arc::new(LifecycleController::new(store.clone(), bus, chain, oracle, config.clone()));

    let reaper = Reaper::new(controller.clone(), Duration::from_secs(config.reaper_interval_secs));
    tokio::spawn(reaper.run());
    tokio::spawn(reaper::run_retention_sweep(store, config.retention_days));

    let app = routes::router(controller);

    info!(addr = %config.bind_addr, "starting coordinator");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
