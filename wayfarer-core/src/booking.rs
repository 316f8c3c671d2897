use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) | (Confirmed, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Whether a booking in this status consumes package capacity.
    /// Capacity is held from admission until cancellation or deletion.
    pub fn holds_capacity(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// Statuses counted by the capacity ledger.
    pub fn capacity_holding() -> Vec<BookingStatus> {
        Self::ALL.into_iter().filter(|s| s.holds_capacity()).collect()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Payment status of a booking. Only the flag is tracked, no gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        // FAILED -> PENDING is a payment retry
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Paid, Refunded) | (Failed, Pending)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            "FAILED" => Ok(PaymentStatus::Failed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct ParseStatusError(pub String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid booking status transition from {from} to {to}")]
    Booking { from: BookingStatus, to: BookingStatus },

    #[error("Invalid payment status transition from {from} to {to}")]
    Payment { from: PaymentStatus, to: PaymentStatus },
}

/// A traveler's reservation of participant slots on a package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub participants: u32,
    pub total_price_amount: i64,
    pub total_price_currency: String,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub special_requests: Option<String>,
    pub booking_reference: String,
    pub booking_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A freshly admitted booking, PENDING on both axes.
    pub fn new(
        user_id: Uuid,
        package_id: Uuid,
        participants: u32,
        total_price_amount: i64,
        total_price_currency: String,
        special_requests: Option<String>,
        booking_reference: String,
        booking_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            package_id,
            participants,
            total_price_amount,
            total_price_currency,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            special_requests,
            booking_reference,
            booking_date: booking_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn holds_capacity(&self) -> bool {
        self.booking_status.holds_capacity()
    }

    pub fn transition_status(&mut self, next: BookingStatus) -> Result<(), TransitionError> {
        if !self.booking_status.can_transition_to(next) {
            return Err(TransitionError::Booking {
                from: self.booking_status,
                to: next,
            });
        }
        self.booking_status = next;
        self.touch();
        Ok(())
    }

    /// Apply a payment transition. Returns true when the booking was
    /// confirmed as a side effect of being paid.
    pub fn transition_payment(&mut self, next: PaymentStatus) -> Result<bool, TransitionError> {
        if !self.payment_status.can_transition_to(next) {
            return Err(TransitionError::Payment {
                from: self.payment_status,
                to: next,
            });
        }
        self.payment_status = next;

        let auto_confirmed =
            next == PaymentStatus::Paid && self.booking_status == BookingStatus::Pending;
        if auto_confirmed {
            self.booking_status = BookingStatus::Confirmed;
        }

        self.touch();
        Ok(auto_confirmed)
    }
}

/// Unit price times participants, `None` on overflow.
pub fn total_price(unit_price_amount: i64, participants: u32) -> Option<i64> {
    unit_price_amount.checked_mul(i64::from(participants))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            2,
            400,
            "USD".to_string(),
            None,
            "BK-TEST-0001".to_string(),
            None,
        )
    }

    #[test]
    fn test_booking_status_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Pending));
        for next in BookingStatus::ALL {
            assert!(!Cancelled.can_transition_to(next));
            assert!(!Completed.can_transition_to(next));
        }
    }

    #[test]
    fn test_payment_status_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Failed));
        assert!(Paid.can_transition_to(Refunded));
        assert!(Failed.can_transition_to(Pending));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Paid));
        assert!(!Refunded.can_transition_to(Pending));
        assert!(Refunded.is_terminal());
    }

    #[test]
    fn test_paid_confirms_pending_booking() {
        let mut b = booking();
        let confirmed = b.transition_payment(PaymentStatus::Paid).unwrap();
        assert!(confirmed);
        assert_eq!(b.booking_status, BookingStatus::Confirmed);
        assert_eq!(b.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_paid_leaves_confirmed_booking_alone() {
        let mut b = booking();
        b.transition_status(BookingStatus::Confirmed).unwrap();
        let confirmed = b.transition_payment(PaymentStatus::Paid).unwrap();
        assert!(!confirmed);
        assert_eq!(b.booking_status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_rejected_transition_leaves_booking_unchanged() {
        let mut b = booking();
        b.transition_status(BookingStatus::Cancelled).unwrap();
        let before = b.clone();

        let err = b.transition_status(BookingStatus::Pending).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Booking {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Pending
            }
        );
        assert_eq!(b, before);
    }

    #[test]
    fn test_capacity_holding_statuses() {
        let holding = BookingStatus::capacity_holding();
        assert_eq!(holding.len(), 3);
        assert!(!holding.contains(&BookingStatus::Cancelled));
    }

    #[test]
    fn test_updated_at_is_monotonic() {
        let mut b = booking();
        let created = b.created_at;
        b.touch();
        assert!(b.updated_at >= created);
    }

    #[test]
    fn test_total_price() {
        assert_eq!(total_price(200, 3), Some(600));
        assert_eq!(total_price(i64::MAX, 2), None);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert_eq!("PAID".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("SHIPPED".parse::<BookingStatus>().is_err());

        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }
}
