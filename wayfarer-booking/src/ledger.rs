use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;
use wayfarer_core::{BookingStore, PackageTerms, PackageUnitOfWork, StoreError};

pub use wayfarer_core::PackageCapacity;

/// Proof that participants were admitted within a ledger session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub package_id: Uuid,
    pub participants: u32,
}

/// Sole authority on package capacity.
///
/// Committed capacity is derived from the package's capacity-holding
/// bookings. A [`LedgerSession`] holds the package's admission lock, so the
/// check in [`LedgerSession::try_reserve`] and the booking write that realizes
/// it are indivisible for concurrent callers on the same package.
#[derive(Clone)]
pub struct CapacityLedger {
    store: Arc<dyn BookingStore>,
}

impl CapacityLedger {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Lock `package_id` for admission and read its current capacity.
    pub async fn open(&self, package_id: Uuid) -> Result<LedgerSession, LedgerError> {
        let mut uow = self.store.begin_package(package_id).await?;
        let package = uow
            .package()
            .await?
            .ok_or(LedgerError::PackageNotFound(package_id))?;
        let committed = uow.committed_participants().await?;

        debug!(
            "Ledger session opened for package {}: {}/{} committed",
            package_id, committed, package.max_participants
        );

        Ok(LedgerSession {
            capacity: PackageCapacity {
                package_id,
                max_participants: package.max_participants,
                committed_participants: committed,
            },
            package,
            uow,
        })
    }

    /// Current capacity of a package, as of the latest committed write.
    /// Does not wait for in-flight admissions on the package.
    pub async fn available_space(&self, package_id: Uuid) -> Result<PackageCapacity, LedgerError> {
        self.store
            .package_capacity(package_id)
            .await?
            .ok_or(LedgerError::PackageNotFound(package_id))
    }
}

/// A locked view of one package's capacity plus the unit of work that
/// persists whatever the session admits or releases.
pub struct LedgerSession {
    package: PackageTerms,
    capacity: PackageCapacity,
    uow: Box<dyn PackageUnitOfWork>,
}

impl LedgerSession {
    pub fn package(&self) -> &PackageTerms {
        &self.package
    }

    pub fn capacity(&self) -> PackageCapacity {
        self.capacity
    }

    pub fn uow(&mut self) -> &mut dyn PackageUnitOfWork {
        self.uow.as_mut()
    }

    /// Admit `participants` if they fit in the remaining space. On rejection
    /// nothing changes.
    pub fn try_reserve(&mut self, participants: u32) -> Result<Reservation, LedgerError> {
        let available = self.capacity.available();
        if participants > available {
            return Err(LedgerError::CapacityExceeded {
                package_id: self.capacity.package_id,
                requested: participants,
                available,
            });
        }

        self.capacity.committed_participants += participants;
        Ok(Reservation {
            package_id: self.capacity.package_id,
            participants,
        })
    }

    /// Give back capacity held by a booking leaving a capacity-holding status.
    pub fn release(&mut self, participants: u32) -> Result<(), LedgerError> {
        let committed = self.capacity.committed_participants;
        if participants > committed {
            error!(
                "Refusing to release {} participants on package {}: only {} committed",
                participants, self.capacity.package_id, committed
            );
            return Err(LedgerError::ReleaseUnderflow {
                package_id: self.capacity.package_id,
                requested: participants,
                committed,
            });
        }

        self.capacity.committed_participants = committed - participants;
        Ok(())
    }

    pub async fn commit(self) -> Result<(), LedgerError> {
        self.uow.commit().await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Package not found: {0}")]
    PackageNotFound(Uuid),

    #[error("Capacity exceeded on package {package_id}: requested {requested}, available {available}")]
    CapacityExceeded {
        package_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("Release underflow on package {package_id}: requested {requested}, committed {committed}")]
    ReleaseUnderflow {
        package_id: Uuid,
        requested: u32,
        committed: u32,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
