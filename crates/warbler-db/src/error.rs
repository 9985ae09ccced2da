use rusqlite::ErrorCode;
use thiserror::Error;

/// A write collided with a UNIQUE column (username or email).
///
/// Travels inside `anyhow::Error`; callers `downcast_ref` to tell it apart
/// from real failures.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{column} already taken")]
pub struct UniqueViolation {
    pub column: String,
}

/// Convert a UNIQUE constraint failure into [`UniqueViolation`], passing
/// every other error through untouched.
pub(crate) fn unique_or(err: rusqlite::Error) -> anyhow::Error {
    if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
        if e.code == ErrorCode::ConstraintViolation && msg.starts_with("UNIQUE constraint failed") {
            // "UNIQUE constraint failed: users.username"
            let column = msg
                .rsplit('.')
                .next()
                .unwrap_or("value")
                .trim()
                .to_string();
            return UniqueViolation { column }.into();
        }
    }
    err.into()
}
