use std::time::Duration;

use rusqlite::ffi;
use thiserror::Error;

use marquee_types::filters::{UnsafePagingError, UnsafeSortError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("record not found")]
    RecordNotFound,

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("a user with this email address already exists")]
    DuplicateEmail,

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error(transparent)]
    UnsafeSort(#[from] UnsafeSortError),

    #[error(transparent)]
    UnsafePaging(#[from] UnsafePagingError),

    #[error("user has no password hash")]
    MissingPasswordHash,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database worker failed: {0}")]
    Task(String),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl DataError {
    /// Outcomes a caller is expected to handle and report to its client,
    /// as opposed to server-side failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound | Self::EditConflict | Self::DuplicateEmail
        )
    }
}

/// Whether `err` is a UNIQUE violation on `column` (written `table.column`).
///
/// SQLite reports the offending columns after the colon in
/// `UNIQUE constraint failed: users.email`; the extended result code, not the
/// wording, decides that it is a uniqueness failure at all.
pub(crate) fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            msg.rsplit_once(": ")
                .is_some_and(|(_, cols)| cols.split(", ").any(|c| c == column))
        }
        _ => false,
    }
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

pub(crate) fn is_interrupted(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted)
}
