//! Scorebook Server
//!
//! Entry point for the store-backed client record service.

use mimalloc::MiMalloc;

/// Global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scorebook::config::AppConfig;
use scorebook::server::start_server;
use scorebook::store::{RecordStore, RedisStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        name: "store.connecting",
        host = %config.store.host,
        port = config.store.port,
        "Connecting to store"
    );

    // Log what the store host resolves to before dialing it
    match tokio::net::lookup_host((config.store.host.as_str(), config.store.port)).await {
        Ok(addrs) => {
            for addr in addrs {
                info!(name: "store.resolved", address = %addr, "store host resolved");
            }
        }
        Err(e) => {
            eprintln!("Cannot resolve store host {}: {e}", config.store.host);
            std::process::exit(1);
        }
    }

    let store = match RedisStore::connect(&config.store).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot connect to store: {e:?}");
            std::process::exit(1);
        }
    };

    // Fail fast if the store doesn't answer before serving traffic
    let pong = store.ping().await?;
    info!(name: "store.connected", reply = %pong, "Connection to store is fine");

    start_server(config, Arc::new(store)).await
}
