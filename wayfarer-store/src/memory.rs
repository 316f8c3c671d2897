use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;
use wayfarer_catalog::{
    CatalogRepository, Destination, DestinationDraft, DestinationSearch, PackageDraft,
    PackageSearch, TravelPackage,
};
use wayfarer_core::{
    Booking, BookingFilter, BookingStore, PackageCapacity, PackageTerms, PackageUnitOfWork,
    StoreError, StoreResult,
};

type PackageLocks = Arc<StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>>;

#[derive(Default)]
struct MemoryState {
    users: HashSet<Uuid>,
    destinations: HashMap<Uuid, Destination>,
    packages: HashMap<Uuid, TravelPackage>,
    bookings: HashMap<Uuid, Booking>,
}

impl MemoryState {
    fn reference_taken(&self, reference: &str, except: Uuid) -> bool {
        self.bookings
            .values()
            .any(|b| b.booking_reference == reference && b.id != except)
    }
}

/// Process-local backend for tests and single-node deployments.
///
/// Each package has its own admission mutex; units of work on different
/// packages never wait on each other. A mutex lives only while some unit of
/// work holds or waits for it. Writes are staged in the unit of work and
/// applied in one step on commit.
#[derive(Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    package_locks: PackageLocks,
    open_user_registry: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat every user id as registered. For local runs with no user
    /// directory behind the store.
    pub fn with_open_user_registry() -> Self {
        Self {
            open_user_registry: true,
            ..Self::default()
        }
    }

    pub async fn insert_user(&self, user_id: Uuid) {
        self.state.write().await.users.insert(user_id);
    }

    /// Register a fresh user and return its id.
    pub async fn add_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.insert_user(id).await;
        id
    }

    /// Insert a destination without validation.
    pub async fn seed_destination(&self, draft: DestinationDraft) -> Destination {
        let destination = Destination::from_draft(draft);
        self.state
            .write()
            .await
            .destinations
            .insert(destination.id, destination.clone());
        destination
    }

    /// Insert a package without validation.
    pub async fn seed_package(&self, draft: PackageDraft) -> TravelPackage {
        let package = TravelPackage::from_draft(draft);
        self.state
            .write()
            .await
            .packages
            .insert(package.id, package.clone());
        package
    }

    fn package_lock(&self, package_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .package_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(package_id).or_default().clone()
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.package_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin_package(&self, package_id: Uuid) -> StoreResult<Box<dyn PackageUnitOfWork>> {
        let guard = self.package_lock(package_id).lock_owned().await;
        debug!("Acquired admission lock for package {}", package_id);
        Ok(Box::new(MemoryUnitOfWork {
            package_id,
            state: self.state.clone(),
            staged: HashMap::new(),
            delete_package: false,
            open_user_registry: self.open_user_registry,
            locks: self.package_locks.clone(),
            guard,
        }))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .find(|b| b.booking_reference == reference)
            .cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.booking_date, b.created_at));
        Ok(bookings)
    }

    async fn package_capacity(&self, package_id: Uuid) -> StoreResult<Option<PackageCapacity>> {
        let state = self.state.read().await;
        let Some(package) = state.packages.get(&package_id) else {
            return Ok(None);
        };
        let committed = state
            .bookings
            .values()
            .filter(|b| b.package_id == package_id && b.holds_capacity())
            .try_fold(0u32, |sum, b| sum.checked_add(b.participants))
            .ok_or_else(|| {
                StoreError::Corrupt(format!("Participant sum overflows on package {}", package_id))
            })?;
        Ok(Some(PackageCapacity {
            package_id,
            max_participants: package.max_participants,
            committed_participants: committed,
        }))
    }
}

/// Staged writes for one package. `None` marks a deleted booking.
struct MemoryUnitOfWork {
    package_id: Uuid,
    state: Arc<RwLock<MemoryState>>,
    staged: HashMap<Uuid, Option<Booking>>,
    delete_package: bool,
    open_user_registry: bool,
    locks: PackageLocks,
    guard: OwnedMutexGuard<()>,
}

impl MemoryUnitOfWork {
    async fn view(&self) -> Vec<Booking> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.package_id == self.package_id && !self.staged.contains_key(&b.id))
            .cloned()
            .collect();
        bookings.extend(self.staged.values().flatten().cloned());
        bookings.sort_by_key(|b| (b.booking_date, b.created_at));
        bookings
    }

    fn check_package(&self, booking: &Booking) -> StoreResult<()> {
        if booking.package_id != self.package_id {
            return Err(StoreError::Conflict(format!(
                "Booking {} belongs to package {}, not {}",
                booking.id, booking.package_id, self.package_id
            )));
        }
        Ok(())
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let held = OwnedMutexGuard::mutex(&self.guard);
        // Only the map and this guard still refer to the mutex: nobody is queued
        if Arc::strong_count(held) == 2
            && locks
                .get(&self.package_id)
                .is_some_and(|entry| Arc::ptr_eq(entry, held))
        {
            locks.remove(&self.package_id);
        }
    }
}

#[async_trait]
impl PackageUnitOfWork for MemoryUnitOfWork {
    fn package_id(&self) -> Uuid {
        self.package_id
    }

    async fn package(&mut self) -> StoreResult<Option<PackageTerms>> {
        if self.delete_package {
            return Ok(None);
        }
        let state = self.state.read().await;
        Ok(state.packages.get(&self.package_id).map(TravelPackage::terms))
    }

    async fn committed_participants(&mut self) -> StoreResult<u32> {
        self.view()
            .await
            .iter()
            .filter(|b| b.holds_capacity())
            .try_fold(0u32, |sum, b| sum.checked_add(b.participants))
            .ok_or_else(|| {
                StoreError::Corrupt(format!("Participant sum overflows on package {}", self.package_id))
            })
    }

    async fn bookings(&mut self) -> StoreResult<Vec<Booking>> {
        Ok(self.view().await)
    }

    async fn booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(staged.clone());
        }
        let state = self.state.read().await;
        Ok(state
            .bookings
            .get(&id)
            .filter(|b| b.package_id == self.package_id)
            .cloned())
    }

    async fn user_exists(&mut self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.open_user_registry || self.state.read().await.users.contains(&user_id))
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.check_package(booking)?;
        let taken_here = self.staged.values().flatten().any(|b| {
            b.booking_reference == booking.booking_reference && b.id != booking.id
        });
        {
            let state = self.state.read().await;
            if state.bookings.contains_key(&booking.id) || self.staged.contains_key(&booking.id) {
                return Err(StoreError::Conflict(format!("Booking {} already exists", booking.id)));
            }
            if taken_here || state.reference_taken(&booking.booking_reference, booking.id) {
                return Err(StoreError::DuplicateReference(booking.booking_reference.clone()));
            }
        }
        self.staged.insert(booking.id, Some(booking.clone()));
        Ok(())
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.check_package(booking)?;
        if self.booking(booking.id).await?.is_none() {
            return Err(StoreError::Conflict(format!("Booking {} does not exist", booking.id)));
        }
        self.staged.insert(booking.id, Some(booking.clone()));
        Ok(())
    }

    async fn delete_booking(&mut self, id: Uuid) -> StoreResult<bool> {
        if self.booking(id).await?.is_none() {
            return Ok(false);
        }
        self.staged.insert(id, None);
        Ok(true)
    }

    async fn delete_package(&mut self) -> StoreResult<bool> {
        if !self.view().await.is_empty() {
            return Err(StoreError::Conflict(format!(
                "Package {} still has bookings",
                self.package_id
            )));
        }
        let exists = self.package().await?.is_some();
        self.delete_package = exists;
        Ok(exists)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut state = self.state.write().await;

        // References are unique across packages, which commit independently
        for booking in self.staged.values().flatten() {
            if state.reference_taken(&booking.booking_reference, booking.id) {
                return Err(StoreError::DuplicateReference(booking.booking_reference.clone()));
            }
        }

        for (id, staged) in &self.staged {
            match staged {
                Some(booking) => {
                    state.bookings.insert(*id, booking.clone());
                }
                None => {
                    state.bookings.remove(id);
                }
            }
        }
        if self.delete_package {
            state.packages.remove(&self.package_id);
        }
        debug!(
            "Committed {} booking changes on package {}",
            self.staged.len(),
            self.package_id
        );
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn insert_destination(&self, destination: &Destination) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.destinations.contains_key(&destination.id) {
            return Err(StoreError::Conflict(format!("Destination {} already exists", destination.id)));
        }
        state.destinations.insert(destination.id, destination.clone());
        Ok(())
    }

    async fn get_destination(&self, id: Uuid) -> StoreResult<Option<Destination>> {
        Ok(self.state.read().await.destinations.get(&id).cloned())
    }

    async fn update_destination(&self, destination: &Destination) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.destinations.get_mut(&destination.id) {
            Some(existing) => {
                *existing = destination.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!("Destination {} does not exist", destination.id))),
        }
    }

    async fn delete_destination(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.packages.values().any(|p| p.destination_id == id) {
            return Err(StoreError::Conflict(format!("Destination {} still has packages", id)));
        }
        Ok(state.destinations.remove(&id).is_some())
    }

    async fn list_destinations(&self, search: &DestinationSearch) -> StoreResult<Vec<Destination>> {
        let state = self.state.read().await;
        let mut destinations: Vec<Destination> = state
            .destinations
            .values()
            .filter(|d| search.matches(d))
            .cloned()
            .collect();
        destinations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(destinations)
    }

    async fn insert_package(&self, package: &TravelPackage) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.destinations.contains_key(&package.destination_id) {
            return Err(StoreError::Conflict(format!(
                "Destination {} does not exist",
                package.destination_id
            )));
        }
        if state.packages.contains_key(&package.id) {
            return Err(StoreError::Conflict(format!("Package {} already exists", package.id)));
        }
        state.packages.insert(package.id, package.clone());
        Ok(())
    }

    async fn get_package(&self, id: Uuid) -> StoreResult<Option<TravelPackage>> {
        Ok(self.state.read().await.packages.get(&id).cloned())
    }

    async fn update_package(&self, package: &TravelPackage) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.destinations.contains_key(&package.destination_id) {
            return Err(StoreError::Conflict(format!(
                "Destination {} does not exist",
                package.destination_id
            )));
        }
        match state.packages.get_mut(&package.id) {
            Some(existing) => {
                *existing = package.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!("Package {} does not exist", package.id))),
        }
    }

    async fn list_packages(&self, search: &PackageSearch) -> StoreResult<Vec<TravelPackage>> {
        let state = self.state.read().await;
        let mut packages: Vec<TravelPackage> = state
            .packages
            .values()
            .filter(|p| search.matches(p, state.destinations.get(&p.destination_id)))
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.name.cmp(&b.name)));
        Ok(packages)
    }
}
