//! Userdesk Database Layer
//!
//! This crate provides the user directory for Userdesk: users, roles and
//! the uniqueness rules between them, persisted in SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{Database, DatabaseOptions};
pub use utils::normalize_email;

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
