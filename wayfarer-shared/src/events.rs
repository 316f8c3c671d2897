use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventKind {
    Created,
    Updated,
    StatusChanged,
    PaymentStatusChanged,
    Cancelled,
    Deleted,
}

impl BookingEventKind {
    /// Lowercase name, used as the SSE event type
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEventKind::Created => "booking_created",
            BookingEventKind::Updated => "booking_updated",
            BookingEventKind::StatusChanged => "booking_status_changed",
            BookingEventKind::PaymentStatusChanged => "payment_status_changed",
            BookingEventKind::Cancelled => "booking_cancelled",
            BookingEventKind::Deleted => "booking_deleted",
        }
    }
}

/// Emitted after a booking change has been committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub package_id: Uuid,
    pub user_id: Uuid,
    pub participants: u32,
    pub booking_status: String,
    pub payment_status: String,
    pub timestamp: i64,
}
