use campus_core::errors::{CampusError, ErrorKind};

/// Classify a driver error: rejected writes become `ConstraintViolation`,
/// pool exhaustion `Unavailable`, everything else `StorageFailure`.
pub(crate) fn storage_error(err: sqlx::Error, context: &str) -> anyhow::Error {
    let kind = match &err {
        sqlx::Error::Database(db) => match db.kind() {
            sqlx::error::ErrorKind::UniqueViolation
            | sqlx::error::ErrorKind::ForeignKeyViolation
            | sqlx::error::ErrorKind::NotNullViolation
            | sqlx::error::ErrorKind::CheckViolation => ErrorKind::ConstraintViolation,
            _ if db.message().contains("constraint failed") => ErrorKind::ConstraintViolation,
            _ => ErrorKind::StorageFailure,
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => ErrorKind::Unavailable,
        _ => ErrorKind::StorageFailure,
    };

    let message = format!("{context}: {err}");
    CampusError::new(kind, message)
        .with_source(anyhow::Error::new(err))
        .into_anyhow()
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
