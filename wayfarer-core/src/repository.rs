use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Booking;
use crate::query::BookingFilter;
use crate::StoreResult;

/// The package fields admission needs, resolved once per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageTerms {
    pub id: Uuid,
    pub max_participants: u32,
    pub unit_price_amount: i64,
    pub currency: String,
    pub is_active: bool,
}

/// Capacity snapshot for one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCapacity {
    pub package_id: Uuid,
    pub max_participants: u32,
    pub committed_participants: u32,
}

impl PackageCapacity {
    /// Remaining room. Zero, never negative, when the maximum was lowered
    /// below what is already committed.
    pub fn available(&self) -> u32 {
        self.max_participants.saturating_sub(self.committed_participants)
    }
}

/// Storage for bookings.
///
/// Every write goes through a [`PackageUnitOfWork`], which serializes all
/// writers of one package and commits all of its changes together or not at
/// all. Reads outside a unit of work see committed state only.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Start a unit of work holding the admission lock of `package_id`.
    /// Waits for any other unit of work on the same package.
    async fn begin_package(&self, package_id: Uuid) -> StoreResult<Box<dyn PackageUnitOfWork>>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Booking>>;

    /// Bookings matching `filter`, oldest booking date first.
    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;

    /// Maximum and committed participants of a package as of the latest
    /// commit, read in one snapshot without taking the admission lock.
    /// `None` when the package does not exist.
    async fn package_capacity(&self, package_id: Uuid) -> StoreResult<Option<PackageCapacity>>;
}

/// Writes scoped to a single package. Dropping without [`commit`] discards
/// everything staged.
///
/// [`commit`]: PackageUnitOfWork::commit
#[async_trait]
pub trait PackageUnitOfWork: Send {
    fn package_id(&self) -> Uuid;

    /// `None` when the package does not exist.
    async fn package(&mut self) -> StoreResult<Option<PackageTerms>>;

    /// Participant sum over this package's capacity-holding bookings,
    /// including changes staged in this unit of work.
    async fn committed_participants(&mut self) -> StoreResult<u32>;

    async fn bookings(&mut self) -> StoreResult<Vec<Booking>>;

    async fn booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Runs inside the unit of work, so admission never needs a second
    /// connection while it holds the package lock.
    async fn user_exists(&mut self, user_id: Uuid) -> StoreResult<bool>;

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn delete_booking(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Remove the package row itself. Its bookings must already be gone.
    async fn delete_package(&mut self) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
