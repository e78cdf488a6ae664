//! Backend Module
//!
//! Server-side code: the remote authority for learner progress. It exposes
//! the `/api/progress` endpoints the offline client writes to and syncs
//! against.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`progress`** - Progress store, handlers and PostgreSQL persistence
//! - **`auth`** - JWT tokens
//! - **`middleware`** - Bearer token authentication
//! - **`error`** - Backend error types and their JSON responses
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── progress/       - Progress store and handlers
//! ├── auth/           - JWT sessions
//! ├── middleware/     - Request middleware
//! └── error/          - Error types
//! ```
//!
//! # State Management
//!
//! `AppState` holds the progress store behind `Arc<RwLock<>>` and the
//! optional PostgreSQL pool. The in-memory store answers every request;
//! writes are mirrored to PostgreSQL when it is configured and the store is
//! restored from it at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use eduflex::backend::server::create_app;
//!
//! # async fn example() -> std::io::Result<()> {
//! let app = create_app().await;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await
//! # }
//! ```

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Progress store, handlers and persistence
pub mod progress;

/// Backend error types
pub mod error;

/// Authentication tokens
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Re-export commonly used types
pub use error::BackendError;
pub use progress::ProgressStore;
pub use server::{create_app, AppState};
