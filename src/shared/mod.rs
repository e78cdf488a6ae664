//! Shared Module
//!
//! Types shared between the sync client and the backend: progress wire
//! types and their derivation rules, configuration and error types.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. All wire types are designed for
//! serialization and transmission over HTTP.

/// Progress records, updates and batch sync payloads
pub mod progress;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use progress::{
    ApiResponse, ErrorResponse, ProgressRecord, ProgressUpdate, SyncItem, SyncRequest,
};
