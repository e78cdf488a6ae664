/**
 * Backend Error Module
 *
 * - `types` - `BackendError` and its status mapping
 * - `conversion` - `IntoResponse` and extractor rejection conversions
 */

pub mod types;

pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;
