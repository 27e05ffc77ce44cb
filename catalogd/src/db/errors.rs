use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        table: Option<String>,
        column: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation: {message}")]
    CheckViolation { table: Option<String>, message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                // SQLite reports neither table nor constraint name, only "<KIND> constraint failed: table.column"
                let (table, column) = constraint_target(db_err.message());
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        table: db_err.table().map(str::to_string).or(table),
                        column,
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        table: db_err.table().map(str::to_string).or(table),
                        message: db_err.message().to_string(),
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Extract `(table, column)` from a SQLite constraint message such as
/// `UNIQUE constraint failed: accounts.username`.
fn constraint_target(message: &str) -> (Option<String>, Option<String>) {
    let Some((_, target)) = message.split_once("failed: ") else {
        return (None, None);
    };
    // Composite constraints list several columns; the first one names the table
    let first = target.split(',').next().unwrap_or(target).trim();
    match first.split_once('.') {
        Some((table, column)) => (Some(table.to_string()), Some(column.to_string())),
        None => (None, None),
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
