//! fsapi Core Library
//!
//! Foundational pieces shared by every fsapi crate:
//!
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::ApiError;

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

/// Service version reported by the health endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
