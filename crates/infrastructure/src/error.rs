use thiserror::Error;
use todo_domain::TodoError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported schema version {found} (latest supported {supported})")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("Corrupt row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

impl From<StoreError> for TodoError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Store error");
        TodoError::Store(e.to_string())
    }
}
