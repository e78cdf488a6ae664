/**
 * Application State Management
 *
 * `AppState` is the central state container shared by all handlers:
 * - the in-memory progress store (runtime authority)
 * - the optional PostgreSQL pool that mirrors it
 *
 * # Example
 *
 * ```rust
 * use eduflex::backend::server::state::AppState;
 * use axum::extract::State;
 *
 * async fn handler(State(state): State<AppState>) {
 *     let records = state.progress.read().await.len();
 * }
 * ```
 */

use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::progress::state::ProgressStore;

pub type SharedProgressStore = Arc<RwLock<ProgressStore>>;

#[derive(Clone)]
pub struct AppState {
    pub progress: SharedProgressStore,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(store: ProgressStore, db_pool: Option<PgPool>) -> Self {
        Self {
            progress: Arc::new(RwLock::new(store)),
            db_pool,
        }
    }

    /// State without persistence, used by tests and local runs
    pub fn in_memory() -> Self {
        Self::new(ProgressStore::new(), None)
    }
}

impl FromRef<AppState> for SharedProgressStore {
    fn from_ref(state: &AppState) -> Self {
        state.progress.clone()
    }
}

impl FromRef<AppState> for Option<PgPool> {
    fn from_ref(state: &AppState) -> Self {
        state.db_pool.clone()
    }
}
