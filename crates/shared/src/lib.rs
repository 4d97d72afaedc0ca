//! Shared types, errors, and configuration for Ledgerline.
//!
//! This crate provides common types used across all other crates:
//! - Money type with fixed cent precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - Bearer token verification for the identity boundary

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, DatabaseConfig, JwtSettings, LedgerConfig, ServerConfig, StoreBackend};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
