//! Courier API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courier_common::config::AppConfig;
use courier_common::db::create_pool;

use courier_engine::builder::MessageBuilder;
use courier_engine::credentials::{GoogleTokenProvider, ServiceAccount};
use courier_engine::dispatcher::Dispatcher;
use courier_engine::pipeline::DispatchPipeline;
use courier_engine::store::PgRecipientStore;

use courier_api::routes::create_router;
use courier_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("courier_api=debug,courier_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting courier API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config).await?;
    tracing::info!("Database pool created");

    // Load the push gateway service account
    let account = ServiceAccount::from_file(&config.service_account_path)?;
    tracing::info!(project_id = %account.project_id, "Service account loaded");

    // Wire the dispatch pipeline
    let dispatcher = Dispatcher::from_config(&config, &account.project_id)?;
    let pipeline = DispatchPipeline::new(
        Arc::new(PgRecipientStore::new(pool)),
        Arc::new(GoogleTokenProvider::new(account)),
        MessageBuilder::from_config(&config),
        dispatcher,
        config.reference_timezone,
    );

    // Build application state and router
    let state = AppState::new(Arc::new(pipeline));
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
