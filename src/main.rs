use axum::{Router, routing::get};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vault_tracker_backend::AppState;
use vault_tracker_backend::handlers::vault::{service_info, vault_routes};
use vault_tracker_backend::jobs::vault_watcher_job::{self, WatcherConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vault_tracker_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Incomplete watcher configuration is fatal: refuse to start rather
    // than run half-configured
    let config = match WatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid watcher configuration");
            std::process::exit(1);
        }
    };

    let watcher_handle = match vault_watcher_job::start_vault_watcher(db.clone(), &config).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start vault watcher");
            std::process::exit(1);
        }
    };

    let state = AppState { db };

    // Build router
    let app = Router::new()
        .route("/", get(service_info))
        .merge(vault_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind server port");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Shutting down gracefully...");
    watcher_handle.stop().await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
