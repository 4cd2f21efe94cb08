pub mod api;
pub mod config;
pub mod model;
pub mod store;

pub use api::routes;
pub use config::AppConfig;
pub use model::*;
pub use store::{RecordStore, StoreError};

use axum::{
    http::{header, Method},
    middleware, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

/// Assemble the router with its middleware for a connected store
pub fn build_app(store: Arc<dyn RecordStore>, config: &AppConfig) -> Router {
    let ctx = Arc::new(api::ApiContext::new(store, config));

    let mut router = routes::create_router(&config.api);

    if config.server.compress {
        router = router.layer(CompressionLayer::new());
    }

    router = router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(api::request_log::log_requests))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            ))),
    );

    if config.server.cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
                .expose_headers([header::LINK])
                .max_age(Duration::from_secs(300)),
        );
    }

    router.with_state(ctx)
}

/// Connect the configured store and serve until Ctrl-C
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    use anyhow::Context;
    use tokio::net::TcpListener;

    let store = store::connect(&config.database)
        .await
        .context("Could not create store")?;
    log::info!("Using store {}", store.description());

    store
        .check()
        .await
        .context("Could not connect to the store")?;

    let app = build_app(store.clone(), &config);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!(
        "Payments API listening on http://{}, links rendered under {}",
        bind_address,
        config.base_url()
    );
    if config.api.admin {
        log::warn!("Admin endpoints enabled under /admin");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down, closing store");
    store.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
