//! leave-engine server.
//!
//! Reads config from env vars:
//!   LEAVE_ENGINE_CONFIG_DIR: directory holding policy.yaml and employees.yaml
//!                            (default: ./config/default)
//!   LEAVE_ENGINE_BIND_ADDR: listen address (default: 0.0.0.0:3000)

use std::sync::Arc;

use leave_engine::api::{AppState, create_router};
use leave_engine::collaborators::{LogNotifier, MemoryDirectory, SystemClock};
use leave_engine::config::ConfigLoader;
use leave_engine::service::LeaveService;
use leave_engine::store::{MemoryStore, RetryingStore};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leave_engine=debug".into()),
        )
        .init();

    let config_dir =
        std::env::var("LEAVE_ENGINE_CONFIG_DIR").unwrap_or_else(|_| "./config/default".into());
    let bind_addr =
        std::env::var("LEAVE_ENGINE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let config = ConfigLoader::load(&config_dir)?;
    tracing::info!(
        config_dir = %config_dir,
        grant_steps = config.grant_table().len(),
        employees = config.employees().len(),
        "Configuration loaded"
    );

    let store = RetryingStore::new(MemoryStore::new(), config.store().clone());
    let service = LeaveService::new(
        &config,
        Arc::new(store),
        Arc::new(MemoryDirectory::new(config.employees().to_vec())),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
    )?;

    // Catch up on grants that fell due while the server was down
    let report = service.materialize_due_grants(None)?;
    tracing::info!(
        granted = report.granted.len(),
        failures = report.failures.len(),
        "Startup accrual completed"
    );

    let app = create_router(AppState::new(service));
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("leave-engine listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
