use async_trait::async_trait;
use uuid::Uuid;
use wayfarer_core::StoreResult;

use crate::destination::Destination;
use crate::package::TravelPackage;
use crate::search::{DestinationSearch, PackageSearch};

/// Repository trait for destination and package data access.
///
/// Packages are removed only through a package unit of work, so that their
/// bookings go with them.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_destination(&self, destination: &Destination) -> StoreResult<()>;

    async fn get_destination(&self, id: Uuid) -> StoreResult<Option<Destination>>;

    async fn update_destination(&self, destination: &Destination) -> StoreResult<()>;

    /// Fails with a conflict while packages still reference the destination.
    async fn delete_destination(&self, id: Uuid) -> StoreResult<bool>;

    /// Matching destinations ordered by name
    async fn list_destinations(&self, search: &DestinationSearch) -> StoreResult<Vec<Destination>>;

    async fn insert_package(&self, package: &TravelPackage) -> StoreResult<()>;

    async fn get_package(&self, id: Uuid) -> StoreResult<Option<TravelPackage>>;

    async fn update_package(&self, package: &TravelPackage) -> StoreResult<()>;

    /// Matching packages ordered by start date
    async fn list_packages(&self, search: &PackageSearch) -> StoreResult<Vec<TravelPackage>>;
}
