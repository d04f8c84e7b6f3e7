use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod error;
mod handlers;
mod models;
mod service;
mod store;

use crate::config::Config;
use crate::service::DeviceService;
use crate::store::DeviceStore;

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub devices: Arc<DeviceService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,device_inventory=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("Device Inventory Service starting");

    let store = DeviceStore::new(&config.devices_file);
    store.ensure_exists().await?;

    let state = AppState {
        devices: Arc::new(DeviceService::new(store)),
    };
    info!(path = %state.devices.store().path().display(), "Using device store");

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Devices CRUD ────────────────────────────────────────────────────
        .route(
            "/devices",
            get(handlers::devices::list_devices).post(handlers::devices::create_device),
        )
        .route(
            "/devices/:id",
            get(handlers::devices::get_device)
                .put(handlers::devices::update_device)
                .delete(handlers::devices::delete_device),
        )
        .route(
            "/devices/:id/transfer/:warehouse",
            put(handlers::devices::transfer_device),
        )

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
