/**
 * Server Initialization
 *
 * Builds the progress store, restores it from PostgreSQL when a database
 * is configured, and assembles the router.
 */

use axum::Router;

use crate::backend::progress::db::load_progress;
use crate::backend::progress::state::ProgressStore;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;

/// Create the application from environment configuration
pub async fn create_app() -> Router<()> {
    create_app_with_config(&ServerConfig::from_env()).await
}

pub async fn create_app_with_config(config: &ServerConfig) -> Router<()> {
    tracing::info!("Initializing EduFlex progress server");

    let db_pool = load_database(config.database_url.as_deref()).await;
    let store = match &db_pool {
        Some(pool) => restore_progress(pool).await,
        None => ProgressStore::new(),
    };

    create_router(AppState::new(store, db_pool))
}

async fn restore_progress(pool: &sqlx::PgPool) -> ProgressStore {
    tracing::info!("Loading progress records from database...");
    match load_progress(pool).await {
        Ok(records) => {
            tracing::info!("Loaded {} progress records from database", records.len());
            ProgressStore::from_records(records)
        }
        Err(e) => {
            tracing::warn!("Failed to load progress from database (table may not exist yet): {:?}", e);
            ProgressStore::new()
        }
    }
}
