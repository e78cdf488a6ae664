/**
 * API Route Configuration
 *
 * # Routes
 *
 * ## Progress (require authentication)
 * - `POST /api/progress` - Update progress for one video
 * - `GET /api/progress` - All progress of the caller
 * - `GET /api/progress/playlist/{playlist_id}` - Progress for one playlist
 * - `POST /api/progress/sync` - Replay offline progress in one batch
 */

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::backend::middleware::auth_middleware;
use crate::backend::progress::handlers::{
    get_all_progress, get_playlist_progress, sync_progress, update_progress,
};
use crate::backend::server::state::AppState;

pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    let progress = Router::new()
        .route("/api/progress", post(update_progress).get(get_all_progress))
        .route("/api/progress/playlist/{playlist_id}", get(get_playlist_progress))
        .route("/api/progress/sync", post(sync_progress))
        .route_layer(middleware::from_fn(auth_middleware));

    router.merge(progress)
}
