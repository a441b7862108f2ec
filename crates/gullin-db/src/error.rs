//! Database-specific error types and conversions.

use gullin_core::error::GullinError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify a failed statement, recognising unique-index and
    /// duplicate-record violations.
    pub(crate) fn from_check(err: surrealdb::Error, entity: &str) -> Self {
        let msg = err.to_string();
        if msg.contains("already contains") || msg.contains("already exists") {
            DbError::Conflict {
                entity: entity.to_string(),
            }
        } else {
            DbError::Query(msg)
        }
    }
}

impl From<DbError> for GullinError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => GullinError::NotFound { entity, id },
            DbError::Conflict { entity } => GullinError::AlreadyExists { entity },
            other => GullinError::Database(other.to_string()),
        }
    }
}
