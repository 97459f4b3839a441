//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl DbError {
    /// Classify an error raised by an INSERT or UPDATE.
    ///
    /// Constraint violations become `Conflict` / `InvalidReference`, anything
    /// else stays a connection error.
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DbError::Conflict(format!("{} violates a unique constraint", what));
            }
            if db_err.is_foreign_key_violation() {
                return DbError::InvalidReference(format!("{} references a missing row", what));
            }
        }
        DbError::Connection(err)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}
