use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;
use wayfarer_core::booking::total_price;
use wayfarer_core::{
    Booking, BookingFilter, BookingStatus, BookingStore, PaymentStatus, ReferenceGenerator,
    StoreError, TransitionError,
};
use wayfarer_shared::{BookingEvent, BookingEventKind};

use crate::ledger::{CapacityLedger, LedgerError, LedgerSession, PackageCapacity};

/// Retry budget for the admission critical section
#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub participants: u32,
    pub special_requests: Option<String>,
    pub booking_date: Option<DateTime<Utc>>,
}

/// Partial update. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingChanges {
    pub participants: Option<u32>,
    pub special_requests: Option<String>,
}

/// Owns booking creation, mutation and the booking/payment state machine.
pub struct BookingManager {
    store: Arc<dyn BookingStore>,
    ledger: CapacityLedger,
    references: ReferenceGenerator,
    policy: AdmissionPolicy,
    events: broadcast::Sender<BookingEvent>,
}

impl BookingManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        references: ReferenceGenerator,
        policy: AdmissionPolicy,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            ledger: CapacityLedger::new(store.clone()),
            store,
            references,
            policy,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    pub fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }


    pub async fn create_booking(&self, request: CreateBooking) -> Result<Booking, BookingError> {
        if request.participants == 0 {
            return Err(BookingError::Validation(
                "Number of participants must be positive".to_string(),
            ));
        }

        let booking = self
            .with_admission_retry(|| self.admit(&request))
            .await
            .inspect_err(|e| {
                if matches!(
                    e,
                    BookingError::CapacityExceeded { .. } | BookingError::PackageUnavailable(_)
                ) {
                    warn!("Admission rejected on package {}: {}", request.package_id, e);
                }
            })?;

        info!(
            "Booking {} admitted on package {}: {} participants, {} {}",
            booking.booking_reference,
            booking.package_id,
            booking.participants,
            booking.total_price_amount,
            booking.total_price_currency
        );
        self.publish(BookingEventKind::Created, &booking);
        Ok(booking)
    }

    async fn admit(&self, request: &CreateBooking) -> Result<Booking, BookingError> {
        let mut session = self.open(request.package_id).await?;

        let package = session.package().clone();
        if !package.is_active {
            return Err(BookingError::PackageUnavailable(package.id));
        }

        session.try_reserve(request.participants)?;

        let total = total_price(package.unit_price_amount, request.participants)
            .ok_or_else(|| BookingError::Validation("Total price overflows".to_string()))?;

        if !session.uow().user_exists(request.user_id).await? {
            return Err(BookingError::NotFound(format!("User {}", request.user_id)));
        }

        let booking = Booking::new(
            request.user_id,
            package.id,
            request.participants,
            total,
            package.currency.clone(),
            request.special_requests.clone(),
            self.references.next_reference(),
            request.booking_date,
        );

        session.uow().insert_booking(&booking).await?;
        session.commit().await?;
        Ok(booking)
    }

    /// Re-run `attempt` while it fails on transient storage errors, up to the
    /// policy's budget. Each attempt is a fresh unit of work.
    async fn with_admission_retry<T, F, Fut>(&self, mut attempt: F) -> Result<T, BookingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BookingError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(BookingError::Store(e)) if e.is_transient() && tries < max_attempts => {
                    warn!(
                        "Admission attempt {}/{} failed, retrying: {}",
                        tries, max_attempts, e
                    );
                    tokio::time::sleep(self.policy.backoff * tries).await;
                    tries += 1;
                }
                other => return other,
            }
        }
    }


    pub async fn update_booking(
        &self,
        id: Uuid,
        changes: BookingChanges,
    ) -> Result<Booking, BookingError> {
        if changes.participants == Some(0) {
            return Err(BookingError::Validation(
                "Number of participants must be positive".to_string(),
            ));
        }

        let package_id = self.package_of(id).await?;
        let booking = self
            .with_admission_retry(|| self.apply_changes(package_id, id, &changes))
            .await?;

        info!(
            "Booking {} updated: {} participants, {} {}",
            booking.booking_reference,
            booking.participants,
            booking.total_price_amount,
            booking.total_price_currency
        );
        self.publish(BookingEventKind::Updated, &booking);
        Ok(booking)
    }

    async fn apply_changes(
        &self,
        package_id: Uuid,
        id: Uuid,
        changes: &BookingChanges,
    ) -> Result<Booking, BookingError> {
        let mut session = self.open(package_id).await?;
        let mut booking = Self::locked_booking(&mut session, id).await?;

        if booking.booking_status.is_terminal() {
            return Err(BookingError::InvalidTransition(format!(
                "Booking {} is {} and can no longer be modified",
                booking.booking_reference, booking.booking_status
            )));
        }

        if let Some(participants) = changes.participants {
            if participants != booking.participants {
                // Non-terminal bookings always hold capacity
                if participants > booking.participants {
                    session.try_reserve(participants - booking.participants)?;
                } else {
                    session.release(booking.participants - participants)?;
                }

                let package = session.package();
                booking.total_price_amount = total_price(package.unit_price_amount, participants)
                    .ok_or_else(|| BookingError::Validation("Total price overflows".to_string()))?;
                booking.total_price_currency = package.currency.clone();
                booking.participants = participants;
            }
        }

        if let Some(requests) = &changes.special_requests {
            booking.special_requests = Some(requests.clone());
        }

        booking.touch();
        session.uow().update_booking(&booking).await?;
        session.commit().await?;
        Ok(booking)
    }

    pub async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let booking = self.apply_status(id, status, false).await?;
        let kind = if status == BookingStatus::Cancelled {
            BookingEventKind::Cancelled
        } else {
            BookingEventKind::StatusChanged
        };
        self.publish(kind, &booking);
        Ok(booking)
    }

    /// Cancel a booking, releasing its capacity. A second cancel is reported
    /// as [`BookingError::AlreadyCancelled`].
    pub async fn cancel_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        let booking = self.apply_status(id, BookingStatus::Cancelled, true).await?;
        self.publish(BookingEventKind::Cancelled, &booking);
        Ok(booking)
    }

    async fn apply_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        guard_cancelled: bool,
    ) -> Result<Booking, BookingError> {
        let package_id = self.package_of(id).await?;
        let mut session = self.open(package_id).await?;
        let mut booking = Self::locked_booking(&mut session, id).await?;

        if guard_cancelled && booking.booking_status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking.booking_reference));
        }

        let previous = booking.booking_status;
        let held = booking.holds_capacity();
        booking.transition_status(status).map_err(|e| {
            warn!("Rejected status change on {}: {}", booking.booking_reference, e);
            BookingError::from(e)
        })?;

        if held && !booking.holds_capacity() {
            session.release(booking.participants)?;
        }

        session.uow().update_booking(&booking).await?;
        session.commit().await?;

        info!(
            "Booking {} status {} -> {}",
            booking.booking_reference, previous, booking.booking_status
        );
        Ok(booking)
    }

    pub async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Booking, BookingError> {
        let package_id = self.package_of(id).await?;
        let mut session = self.open(package_id).await?;
        let mut booking = Self::locked_booking(&mut session, id).await?;

        let previous = booking.payment_status;
        let auto_confirmed = booking.transition_payment(status).map_err(|e| {
            warn!("Rejected payment change on {}: {}", booking.booking_reference, e);
            BookingError::from(e)
        })?;

        session.uow().update_booking(&booking).await?;
        session.commit().await?;

        info!(
            "Booking {} payment {} -> {}",
            booking.booking_reference, previous, booking.payment_status
        );
        self.publish(BookingEventKind::PaymentStatusChanged, &booking);
        if auto_confirmed {
            info!("Booking {} confirmed by payment", booking.booking_reference);
            self.publish(BookingEventKind::StatusChanged, &booking);
        }
        Ok(booking)
    }

    /// Hard delete. Capacity held by the booking is released first.
    pub async fn delete_booking(&self, id: Uuid) -> Result<(), BookingError> {
        let package_id = self.package_of(id).await?;
        let mut session = self.open(package_id).await?;
        let booking = Self::locked_booking(&mut session, id).await?;

        if booking.holds_capacity() {
            session.release(booking.participants)?;
        }
        session.uow().delete_booking(id).await?;
        session.commit().await?;

        info!("Booking {} deleted", booking.booking_reference);
        self.publish(BookingEventKind::Deleted, &booking);
        Ok(())
    }

    /// Delete a package together with all of its bookings in one unit of work.
    /// Returns the number of bookings removed.
    pub async fn purge_package(&self, package_id: Uuid) -> Result<usize, BookingError> {
        let mut session = self.open(package_id).await?;
        let bookings = session.uow().bookings().await?;

        for booking in &bookings {
            if booking.holds_capacity() {
                session.release(booking.participants)?;
            }
            session.uow().delete_booking(booking.id).await?;
        }
        session.uow().delete_package().await?;
        session.commit().await?;

        info!(
            "Package {} deleted with {} bookings",
            package_id,
            bookings.len()
        );
        for booking in &bookings {
            self.publish(BookingEventKind::Deleted, booking);
        }
        Ok(bookings.len())
    }


    pub async fn availability(&self, package_id: Uuid) -> Result<PackageCapacity, BookingError> {
        Ok(self.ledger.available_space(package_id).await?)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking {}", id)))
    }

    pub async fn get_booking_by_reference(&self, reference: &str) -> Result<Booking, BookingError> {
        self.store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking reference {}", reference)))
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings(filter).await?)
    }

    pub async fn all_bookings(&self) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(&BookingFilter::all()).await
    }

    pub async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(&BookingFilter::all().user(user_id)).await
    }

    pub async fn confirmed_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(
            &BookingFilter::all()
                .user(user_id)
                .status(BookingStatus::Confirmed),
        )
        .await
    }

    pub async fn bookings_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(&BookingFilter::all().status(status)).await
    }

    pub async fn bookings_by_payment_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(&BookingFilter::all().payment_status(status))
            .await
    }

    pub async fn bookings_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        if start > end {
            return Err(BookingError::Validation(
                "Start date must not be after end date".to_string(),
            ));
        }
        self.list_bookings(&BookingFilter::all().booked_between(start, end))
            .await
    }


    async fn open(&self, package_id: Uuid) -> Result<LedgerSession, BookingError> {
        Ok(self.ledger.open(package_id).await?)
    }

    /// The package of a booking. Package ids never change, so it is safe to
    /// read before taking the package lock.
    async fn package_of(&self, id: Uuid) -> Result<Uuid, BookingError> {
        Ok(self.get_booking(id).await?.package_id)
    }

    async fn locked_booking(session: &mut LedgerSession, id: Uuid) -> Result<Booking, BookingError> {
        session
            .uow()
            .booking(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking {}", id)))
    }

    fn publish(&self, kind: BookingEventKind, booking: &Booking) {
        let event = BookingEvent {
            kind,
            booking_id: booking.id,
            booking_reference: booking.booking_reference.clone(),
            package_id: booking.package_id,
            user_id: booking.user_id,
            participants: booking.participants,
            booking_status: booking.booking_status.to_string(),
            payment_status: booking.payment_status.to_string(),
            timestamp: Utc::now().timestamp(),
        };
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not enough space: requested {requested}, available {available}")]
    CapacityExceeded { requested: u32, available: u32 },

    #[error("Travel package is not available: {0}")]
    PackageUnavailable(Uuid),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Booking is already cancelled: {0}")]
    AlreadyCancelled(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Capacity accounting error: {0}")]
    Ledger(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::PackageNotFound(id) => BookingError::NotFound(format!("Travel package {}", id)),
            LedgerError::CapacityExceeded {
                requested,
                available,
                ..
            } => BookingError::CapacityExceeded {
                requested,
                available,
            },
            e @ LedgerError::ReleaseUnderflow { .. } => BookingError::Ledger(e.to_string()),
            LedgerError::Store(e) => BookingError::Store(e),
        }
    }
}

impl From<TransitionError> for BookingError {
    fn from(err: TransitionError) -> Self {
        BookingError::InvalidTransition(err.to_string())
    }
}
