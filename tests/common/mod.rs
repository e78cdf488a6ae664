//! Common test utilities and helpers
//!
//! - A real progress server on an ephemeral port
//! - Token helpers
//! - Client configuration pointing at the test server

#![allow(dead_code)]

pub mod auth_helpers;
pub mod server;

pub use auth_helpers::*;
pub use server::*;
