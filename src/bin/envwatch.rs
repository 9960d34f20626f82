//! Credential integrity watcher.
//!
//! Captures the injected credentials once at startup, then re-reads them on
//! a fixed period and exits non-zero the moment they differ. Pairs with the
//! scorebook server in deployments where credentials are injected into the
//! environment and must not change for the life of the process.

use std::time::Duration;

use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scorebook::watcher::{self, CredentialSnapshot, ProcessEnv, Sha256Checksum};

/// Delay between integrity checks.
const POLL_PERIOD: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let _ = dotenv();

    let env = ProcessEnv;
    let hasher = Sha256Checksum;

    let snapshot = match CredentialSnapshot::capture(&env, &hasher) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Not all required environment variables are defined: {e}");
            std::process::exit(1);
        }
    };

    info!(
        name: "watcher.started",
        user = %snapshot.user,
        release = %snapshot.release,
        "Hello '{}' - thanks for passing along the credentials",
        snapshot.user
    );

    // Ctrl-C cancels the loop instead of killing the process mid-check
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    match watcher::watch(&env, &hasher, &snapshot, POLL_PERIOD, cancel).await {
        Ok(()) => {
            info!(name: "watcher.stopped", "watcher cancelled, exiting cleanly");
            Ok(())
        }
        Err(violation) => {
            error!(name: "watcher.violation", %violation, "credential integrity violated");
            std::process::exit(1);
        }
    }
}
