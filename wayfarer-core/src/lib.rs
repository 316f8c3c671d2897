pub mod booking;
pub mod query;
pub mod reference;
pub mod repository;

pub use booking::{Booking, BookingStatus, PaymentStatus, TransitionError};
pub use query::BookingFilter;
pub use reference::ReferenceGenerator;
pub use repository::{BookingStore, PackageCapacity, PackageTerms, PackageUnitOfWork};

/// Failures reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Booking reference already in use: {0}")]
    DuplicateReference(String),
    #[error("Storage contention: {0}")]
    Contention(String),
    #[error("Storage conflict: {0}")]
    Conflict(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Errors that may succeed when the whole unit of work is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Contention(_) | StoreError::DuplicateReference(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(StoreError::Contention("lock timeout".into()).is_transient());
        assert!(StoreError::DuplicateReference("BK-1".into()).is_transient());
        assert!(!StoreError::Conflict("fk".into()).is_transient());
        assert!(!StoreError::Backend("down".into()).is_transient());
    }
}
