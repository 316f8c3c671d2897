use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, PaymentStatus};

/// Read-side selection over bookings. Empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub booking_status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Inclusive on both ends.
    pub booked_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl BookingFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn package(mut self, package_id: Uuid) -> Self {
        self.package_id = Some(package_id);
        self
    }

    pub fn status(mut self, status: BookingStatus) -> Self {
        self.booking_status = Some(status);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn booked_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.booked_between = Some((start, end));
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if self.user_id.is_some_and(|id| id != booking.user_id) {
            return false;
        }
        if self.package_id.is_some_and(|id| id != booking.package_id) {
            return false;
        }
        if self.booking_status.is_some_and(|s| s != booking.booking_status) {
            return false;
        }
        if self.payment_status.is_some_and(|s| s != booking.payment_status) {
            return false;
        }
        if let Some((start, end)) = self.booked_between {
            if booking.booking_date < start || booking.booking_date > end {
                return false;
            }
        }
        true
    }
}
