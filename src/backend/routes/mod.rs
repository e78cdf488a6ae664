/**
 * Route Configuration
 *
 * - `router` - assembles the full application router
 * - `api_routes` - the `/api/progress` routes
 */

pub mod router;

pub mod api_routes;

// Re-export commonly used functions
pub use router::create_router;
