pub mod destination;
pub mod package;
pub mod repository;
pub mod search;
pub mod service;

pub use destination::{Destination, DestinationDraft};
pub use package::{PackageDraft, PackageType, TravelPackage};
pub use repository::CatalogRepository;
pub use search::{DestinationSearch, PackageSearch};
pub use service::CatalogService;

use wayfarer_core::StoreError;

/// Catalog-related errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) fn require(value: &str, field: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub(crate) fn default_currency() -> String {
    "USD".to_string()
}

pub(crate) fn default_true() -> bool {
    true
}
