//! Grantdesk Core Library
//!
//! This crate provides the domain models, membership state machine, error
//! types, and configuration shared across all Grantdesk components.

pub mod config;
pub mod error;
pub mod membership;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
