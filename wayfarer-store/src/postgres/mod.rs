mod booking_repo;
mod catalog_repo;

pub use booking_repo::PgBookingStore;
pub use catalog_repo::PgCatalogRepository;

use wayfarer_core::StoreError;

/// Classify a driver error. Lock timeouts, serialization failures and
/// deadlocks are contention and may be retried; unique violations on the
/// booking reference get their own kind so admission can regenerate it.
pub(crate) fn db_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut => StoreError::Contention(err.to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("55P03") | Some("40001") | Some("40P01") => StoreError::Contention(db.message().to_string()),
            Some("23505") if db.constraint().is_some_and(|c| c.contains("reference")) => {
                StoreError::DuplicateReference(db.message().to_string())
            }
            Some("23505") | Some("23503") => StoreError::Conflict(db.message().to_string()),
            _ => StoreError::Backend(err.to_string()),
        },
        _ => StoreError::Backend(err.to_string()),
    }
}

pub(crate) fn to_i32(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Conflict(format!("{} out of range: {}", field, value)))
}

pub(crate) fn to_u32(value: i32, field: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("Negative {}: {}", field, value)))
}

/// `%term%` for ILIKE, with LIKE wildcards in the term taken literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
