//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - bearer token authentication for the progress routes
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use eduflex::backend::middleware::auth_middleware;
//!
//! let router: Router = Router::new()
//!     .route("/api/progress", get(|| async { "ok" }))
//!     .route_layer(middleware::from_fn(auth_middleware));
//! ```

pub mod auth;

pub use auth::{auth_middleware, AuthUser, AuthenticatedUser};
