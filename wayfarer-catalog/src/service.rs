use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::destination::{Destination, DestinationDraft};
use crate::package::{PackageDraft, TravelPackage};
use crate::repository::CatalogRepository;
use crate::search::{DestinationSearch, PackageSearch};
use crate::CatalogError;

/// Destination and package management
#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    // Destinations

    pub async fn create_destination(&self, draft: DestinationDraft) -> Result<Destination, CatalogError> {
        draft.validate()?;
        let destination = Destination::from_draft(draft);
        self.repo.insert_destination(&destination).await?;
        info!("Destination {} created: {}", destination.id, destination.name);
        Ok(destination)
    }

    pub async fn get_destination(&self, id: Uuid) -> Result<Destination, CatalogError> {
        self.repo
            .get_destination(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Destination {}", id)))
    }

    pub async fn update_destination(
        &self,
        id: Uuid,
        draft: DestinationDraft,
    ) -> Result<Destination, CatalogError> {
        draft.validate()?;
        let mut destination = self.get_destination(id).await?;
        destination.apply(draft);
        self.repo.update_destination(&destination).await?;
        info!("Destination {} updated", id);
        Ok(destination)
    }

    pub async fn toggle_destination(&self, id: Uuid) -> Result<Destination, CatalogError> {
        let mut destination = self.get_destination(id).await?;
        destination.is_active = !destination.is_active;
        destination.touch();
        self.repo.update_destination(&destination).await?;
        info!("Destination {} active = {}", id, destination.is_active);
        Ok(destination)
    }

    /// Remove a destination that no longer has packages.
    pub async fn remove_destination(&self, id: Uuid) -> Result<(), CatalogError> {
        if !self.repo.delete_destination(id).await? {
            return Err(CatalogError::NotFound(format!("Destination {}", id)));
        }
        info!("Destination {} deleted", id);
        Ok(())
    }

    pub async fn search_destinations(
        &self,
        search: &DestinationSearch,
    ) -> Result<Vec<Destination>, CatalogError> {
        Ok(self.repo.list_destinations(&search.clone().normalized()).await?)
    }

    // Packages

    pub async fn create_package(&self, draft: PackageDraft) -> Result<TravelPackage, CatalogError> {
        draft.validate()?;
        self.get_destination(draft.destination_id).await?;
        let package = TravelPackage::from_draft(draft);
        self.repo.insert_package(&package).await?;
        info!(
            "Package {} created: {} ({} seats at {} {})",
            package.id, package.name, package.max_participants, package.unit_price_amount, package.currency
        );
        Ok(package)
    }

    pub async fn get_package(&self, id: Uuid) -> Result<TravelPackage, CatalogError> {
        self.repo
            .get_package(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Travel package {}", id)))
    }

    /// Replace a package's fields. New terms apply to later admissions and
    /// updates only; existing booking totals are left as they are.
    pub async fn update_package(&self, id: Uuid, draft: PackageDraft) -> Result<TravelPackage, CatalogError> {
        draft.validate()?;
        let mut package = self.get_package(id).await?;
        if package.destination_id != draft.destination_id {
            self.get_destination(draft.destination_id).await?;
        }
        package.apply(draft);
        self.repo.update_package(&package).await?;
        info!("Package {} updated", id);
        Ok(package)
    }

    pub async fn toggle_package(&self, id: Uuid) -> Result<TravelPackage, CatalogError> {
        let mut package = self.get_package(id).await?;
        package.is_active = !package.is_active;
        package.touch();
        self.repo.update_package(&package).await?;
        info!("Package {} active = {}", id, package.is_active);
        Ok(package)
    }

    pub async fn search_packages(&self, search: &PackageSearch) -> Result<Vec<TravelPackage>, CatalogError> {
        Ok(self.repo.list_packages(&search.clone().normalized()).await?)
    }

    pub async fn packages_for_destination(&self, destination_id: Uuid) -> Result<Vec<TravelPackage>, CatalogError> {
        let search = PackageSearch {
            destination_id: Some(destination_id),
            ..Default::default()
        };
        self.search_packages(&search).await
    }
}
