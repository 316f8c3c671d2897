pub mod cascade;
pub mod ledger;
pub mod manager;

pub use cascade::{CascadeError, CatalogCascade, PackageAvailability};
pub use ledger::{CapacityLedger, LedgerError, LedgerSession, PackageCapacity, Reservation};
pub use manager::{AdmissionPolicy, BookingChanges, BookingError, BookingManager, CreateBooking};
