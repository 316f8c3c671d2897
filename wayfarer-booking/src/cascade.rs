use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use wayfarer_catalog::{CatalogError, CatalogService, PackageSearch, TravelPackage};

use crate::manager::{BookingError, BookingManager};

/// A package together with its remaining room
#[derive(Debug, Clone, Serialize)]
pub struct PackageAvailability {
    #[serde(flatten)]
    pub package: TravelPackage,
    pub available_participants: u32,
}

/// Catalog operations that reach into bookings: deletes that take bookings
/// with them and listings that depend on capacity.
#[derive(Clone)]
pub struct CatalogCascade {
    catalog: CatalogService,
    bookings: Arc<BookingManager>,
}

impl CatalogCascade {
    pub fn new(catalog: CatalogService, bookings: Arc<BookingManager>) -> Self {
        Self { catalog, bookings }
    }

    /// Delete a package and every booking on it in one unit of work.
    /// Returns the number of bookings removed.
    pub async fn delete_package(&self, package_id: Uuid) -> Result<usize, CascadeError> {
        self.catalog.get_package(package_id).await?;
        Ok(self.bookings.purge_package(package_id).await?)
    }

    /// Delete a destination after cascading over each of its packages.
    pub async fn delete_destination(&self, destination_id: Uuid) -> Result<(), CascadeError> {
        let destination = self.catalog.get_destination(destination_id).await?;
        let packages = self.catalog.packages_for_destination(destination_id).await?;

        let mut removed = 0;
        for package in &packages {
            removed += self.bookings.purge_package(package.id).await?;
        }
        self.catalog.remove_destination(destination_id).await?;

        info!(
            "Destination {} ({}) deleted with {} packages and {} bookings",
            destination_id,
            destination.name,
            packages.len(),
            removed
        );
        Ok(())
    }

    /// Active packages that can still admit at least one participant.
    pub async fn packages_with_space(&self) -> Result<Vec<PackageAvailability>, CascadeError> {
        let search = PackageSearch {
            active_only: true,
            ..Default::default()
        };
        let packages = self.catalog.search_packages(&search).await?;

        let mut open = Vec::new();
        for package in packages {
            match self.bookings.availability(package.id).await {
                Ok(capacity) if capacity.available() > 0 => open.push(PackageAvailability {
                    available_participants: capacity.available(),
                    package,
                }),
                Ok(_) => {}
                // Deleted since it was listed
                Err(BookingError::NotFound(_)) => {
                    warn!("Package {} vanished while checking availability", package.id)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(open)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{AdmissionPolicy, CreateBooking};
    use chrono::NaiveDate;
    use wayfarer_catalog::{DestinationDraft, PackageDraft};
    use wayfarer_core::ReferenceGenerator;
    use wayfarer_store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        catalog: CatalogService,
        bookings: Arc<BookingManager>,
        cascade: CatalogCascade,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let catalog = CatalogService::new(store.clone());
        let bookings = Arc::new(BookingManager::new(
            store.clone(),
            ReferenceGenerator::new("TST"),
            AdmissionPolicy::default(),
            16,
        ));
        let cascade = CatalogCascade::new(catalog.clone(), bookings.clone());
        Fixture {
            store,
            catalog,
            bookings,
            cascade,
        }
    }

    async fn package(f: &Fixture, destination_id: Uuid, name: &str, max: u32) -> TravelPackage {
        f.catalog
            .create_package(PackageDraft::new(
                name,
                destination_id,
                NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 9, 10).unwrap(),
                50_000,
                max,
            ))
            .await
            .unwrap()
    }

    async fn book(f: &Fixture, package_id: Uuid, participants: u32) {
        let user_id = f.store.add_user().await;
        f.bookings
            .create_booking(CreateBooking {
                user_id,
                package_id,
                participants,
                special_requests: None,
                booking_date: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_destination_cascades() {
        let f = fixture();
        let destination = f
            .catalog
            .create_destination(DestinationDraft::new("Queenstown", "New Zealand", "Queenstown", 200_000))
            .await
            .unwrap();
        let hiking = package(&f, destination.id, "Hiking", 8).await;
        let rafting = package(&f, destination.id, "Rafting", 8).await;
        book(&f, hiking.id, 3).await;
        book(&f, rafting.id, 2).await;

        f.cascade.delete_destination(destination.id).await.unwrap();

        assert!(f.bookings.all_bookings().await.unwrap().is_empty());
        assert!(matches!(
            f.catalog.get_package(hiking.id).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            f.catalog.get_destination(destination.id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_package() {
        let f = fixture();
        let err = f.cascade.delete_package(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CascadeError::Catalog(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_packages_with_space() {
        let f = fixture();
        let destination = f
            .catalog
            .create_destination(DestinationDraft::new("Marrakesh", "Morocco", "Marrakesh", 60_000))
            .await
            .unwrap();
        let full = package(&f, destination.id, "Desert Camp", 2).await;
        let open = package(&f, destination.id, "Medina Walk", 5).await;
        let closed = package(&f, destination.id, "Atlas Trek", 5).await;
        f.catalog.toggle_package(closed.id).await.unwrap();

        book(&f, full.id, 2).await;
        book(&f, open.id, 1).await;

        let with_space = f.cascade.packages_with_space().await.unwrap();
        assert_eq!(with_space.len(), 1);
        assert_eq!(with_space[0].package.id, open.id);
        assert_eq!(with_space[0].available_participants, 4);
    }
}
