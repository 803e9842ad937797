//! Turbo session server
//!
//! # Usage
//!
//! ```bash
//! # In-memory sessions on the default port
//! turbo-server
//!
//! # Durable sessions (built with --features heavy-state)
//! turbo-server --state-path ./turbo-state
//!
//! # Clients drive every timed transition themselves
//! turbo-server --no-scheduler --config turbo.toml
//! ```

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use turbo_coordination::state::{MemoryStore, SharedSessionStore};
use turbo_coordination::{EventBus, PhaseScheduler, TurboCoordinator};
use turbo_server::{build_router, ServerArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("turbo_server=info".parse()?)
                .add_directive("turbo_coordination=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.turbo_config()?;
    info!(
        sprint_secs = config.sprint_duration_secs,
        briefing_secs = config.briefing_delay_secs,
        auto_advance = config.auto_advance,
        "Turbo config loaded"
    );

    let store = open_store(&args)?;
    let bus = EventBus::with_persistence(store.clone()).shared();
    let auto_advance = config.auto_advance;
    let coordinator = TurboCoordinator::new(store, bus, config).shared();

    let cancel = CancellationToken::new();
    let scheduler = if auto_advance {
        Some(PhaseScheduler::new(coordinator.clone(), cancel.clone()).spawn())
    } else {
        info!("Phase scheduler disabled; clients drive timed transitions");
        None
    };

    let app = build_router(coordinator);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }
    Ok(())
}

fn open_store(args: &ServerArgs) -> Result<SharedSessionStore> {
    match &args.state_path {
        #[cfg(feature = "heavy-state")]
        Some(path) => {
            info!("Session state path: {}", path.display());
            let store = turbo_coordination::state::RocksStore::open(path.clone())
                .map_err(|e| anyhow::anyhow!("Failed to open state store: {}", e))?;
            Ok(store.shared())
        }
        #[cfg(not(feature = "heavy-state"))]
        Some(path) => anyhow::bail!(
            "--state-path {} requires building with the heavy-state feature",
            path.display()
        ),
        None => Ok(MemoryStore::new().shared()),
    }
}
