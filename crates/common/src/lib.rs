//! Shared utilities, configuration, and error handling for the user center
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Salted password hashing for protected teams
//! - Request extractors and pagination

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;

pub use crypto::{hash_password, verify_password};
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use extractors::{Page, PageQuery, ValidatedJson};
