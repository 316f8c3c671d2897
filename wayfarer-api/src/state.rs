use std::sync::Arc;
use wayfarer_booking::{AdmissionPolicy, BookingManager, CatalogCascade};
use wayfarer_catalog::{CatalogRepository, CatalogService};
use wayfarer_core::{BookingStore, ReferenceGenerator};
use wayfarer_store::app_config::BookingRules;
use wayfarer_store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub catalog: CatalogService,
    pub cascade: CatalogCascade,
}

impl AppState {
    pub fn new(
        booking_store: Arc<dyn BookingStore>,
        catalog_repo: Arc<dyn CatalogRepository>,
        rules: &BookingRules,
        event_capacity: usize,
    ) -> Self {
        let policy = AdmissionPolicy {
            max_attempts: rules.admission_max_attempts,
            backoff: rules.admission_backoff(),
        };
        let bookings = Arc::new(BookingManager::new(
            booking_store,
            ReferenceGenerator::new(rules.reference_prefix.clone()),
            policy,
            event_capacity,
        ));
        let catalog = CatalogService::new(catalog_repo);
        let cascade = CatalogCascade::new(catalog.clone(), bookings.clone());
        Self {
            bookings,
            catalog,
            cascade,
        }
    }

    /// State over a single process-local store
    pub fn in_memory(store: Arc<MemoryStore>, rules: &BookingRules, event_capacity: usize) -> Self {
        Self::new(store.clone(), store, rules, event_capacity)
    }
}
