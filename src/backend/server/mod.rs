//! Server Module
//!
//! Server initialization and configuration.
//!
//! - **`state`** - `AppState` and its `FromRef` implementations
//! - **`config`** - environment configuration and database loading
//! - **`init`** - app creation
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: port, database URL, development user
//! 2. **State Restoration**: progress records loaded from PostgreSQL if available
//! 3. **Router Creation**: progress routes, auth middleware, tracing layer

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::ServerConfig;
pub use init::{create_app, create_app_with_config};
pub use state::AppState;
