use thiserror::Error;

use crate::{Collection, RecordId, store::Operation};

/// Substring the hosted store uses when a payload names a column the
/// table does not have.
pub const SCHEMA_MISMATCH_MARKER: &str = "Could not find the";

/// Errors that can occur when interacting with the resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row with the given id exists in the collection.
    #[error("No row {id} in {collection}")]
    NotFound { collection: Collection, id: RecordId },

    /// A unique key (including the primary key) would be duplicated.
    #[error("duplicate key value violates unique constraint \"{constraint}\"")]
    Conflict {
        collection: Collection,
        constraint: String,
    },

    /// A row failed a check constraint.
    #[error("new row for relation \"{collection}\" violates check constraint \"{constraint}\"")]
    CheckViolation {
        collection: Collection,
        constraint: String,
    },

    /// The payload named a column the collection does not have.
    #[error("Could not find the '{column}' column of '{collection}' in the schema cache")]
    UnknownColumn {
        collection: Collection,
        column: String,
    },

    /// The store could not be reached or refused the operation.
    #[error("{operation} on {collection} failed: {reason}")]
    Unavailable {
        collection: Collection,
        operation: Operation,
        reason: String,
    },

    /// The row handed to the store is not usable (not an object, bad id,
    /// column name that is not a plain identifier).
    #[error("Invalid row for {collection}: {reason}")]
    InvalidRow {
        collection: Collection,
        reason: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the store rejected a payload because of a column the
    /// schema does not know, whether reported structurally or only in the
    /// backend's message text.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, StoreError::UnknownColumn { .. })
            || self.to_string().contains(SCHEMA_MISMATCH_MARKER)
    }

    /// True when the error is a violation of the named check constraint.
    pub fn violates_check(&self, name: &str) -> bool {
        match self {
            StoreError::CheckViolation { constraint, .. } => constraint == name,
            other => other.to_string().contains(name),
        }
    }

    /// True for unique/primary key violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
