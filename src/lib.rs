//! EduFlex - Main Library
//!
//! EduFlex tracks how far learners have watched each video of a playlist.
//! Progress is written to the server while online and kept in a durable
//! local queue while offline, then replayed in a single batch once the
//! connection comes back.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between client and server
//!   - Progress records, updates and sync batches
//!   - Configuration and error types
//!
//! - **`client`** - Offline-first client
//!   - SQLite local store (offline queue, catalog cache, session cache)
//!   - Network monitor and background sync service
//!   - HTTP client for the progress API
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server exposing `/api/progress`
//!   - JWT authentication
//!   - In-memory progress store with optional PostgreSQL persistence
//!
//! # Feature Flags
//!
//! - **`ssr`** - Enables the backend modules and the `eduflex-server` binary
//!
//! # Usage
//!
//! ## Server-Side
//!
//! ```rust,no_run
//! use eduflex::backend::server::init::create_app;
//!
//! # async fn example() {
//! let app = create_app().await;
//! // Serve with axum
//! # }
//! ```
//!
//! ## Client
//!
//! ```rust,no_run
//! use eduflex::client::{config::Config, OfflineManager};
//!
//! # async fn example() -> Result<(), eduflex::client::ClientError> {
//! let mut manager = OfflineManager::open(Config::from_env()?).await?;
//! manager.start()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - **Server**: progress state lives behind `Arc<RwLock<>>`
//! - **Client**: components are shared through `Arc`; connectivity and sync
//!   state are published over `tokio::sync::watch` channels
//!
//! # Error Handling
//!
//! - `shared::error::SharedError` for validation and serialization
//! - `client::ClientError` and its component errors on the client
//! - `backend::error::BackendError` on the server, rendered as
//!   `{ "success": false, "message": ... }`

/// Shared types and data structures
pub mod shared;

/// Offline-first client
pub mod client;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
