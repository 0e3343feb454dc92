use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {op}: {source}")]
    Sqlite {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error(
        "database schema version mismatch (found {found}, expected {expected}); please run with --reset option"
    )]
    SchemaMismatch { found: i64, expected: i64 },

    #[error("failed to reset database: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when SQLite rejected the statement because of a UNIQUE, FOREIGN KEY
    /// or CHECK constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite {
                source: rusqlite::Error::SqliteFailure(err, _),
                ..
            } if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub(crate) trait OpContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T> OpContext<T> for rusqlite::Result<T> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| StoreError::Sqlite { op, source })
    }
}
