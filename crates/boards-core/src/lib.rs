//! Boards Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by the store implementations, the cloud limits service and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
