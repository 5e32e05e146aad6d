pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{ServiceError, ServiceResult};

// Export logic types
pub use logic::{
    ApiCatalog, ApplicationRegistry, Directory, EnvironmentRegistry, ResolutionService, Services,
    VersionOrder,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use anyhow::Context;
use axum::Router;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{AppConfig, StoreBackend};

/// Router for the given services, ready to serve
pub fn build_app<S: Store + 'static>(services: Arc<Services<S>>) -> Router {
    crate::api::routes::create_router().with_state(services)
}

/// Serve `services` on an already bound listener until the server stops
pub async fn serve<S: Store + 'static>(
    listener: TcpListener,
    services: Arc<Services<S>>,
) -> anyhow::Result<()> {
    axum::serve(listener, build_app(services)).await?;
    Ok(())
}

/// Open the configured store, optionally seed it and serve until shutdown
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let load_seed = std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true";

    match config.database.backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(
                &database_url,
                config.database.max_connections.unwrap_or(20),
                config.acquire_timeout(),
            )
            .await?;

            info!("Running database migrations...");
            store.migrate().await?;

            start(Arc::new(store), &config, load_seed).await
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on shutdown");
            start(Arc::new(MemoryStore::new()), &config, load_seed).await
        }
    }
}

async fn start<S: Store + 'static>(
    store: Arc<S>,
    config: &AppConfig,
    load_seed: bool,
) -> anyhow::Result<()> {
    let services = Arc::new(Services::new(store, config));

    if load_seed {
        info!("Loading seed data...");
        seed::load_seed_data(&*services).await?;
    }

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!(
        "Environment service running on http://{} (discovery gamespace '{}')",
        bind_address, config.discovery.gamespace
    );

    serve(listener, services).await
}
