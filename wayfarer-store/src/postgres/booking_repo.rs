use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;
use wayfarer_core::{
    Booking, BookingFilter, BookingStatus, BookingStore, PackageCapacity, PackageTerms,
    PackageUnitOfWork, StoreError, StoreResult,
};

use super::{db_err, to_i32, to_u32};

const BOOKING_COLUMNS: &str = "id, user_id, package_id, participants, total_price_amount, \
     total_price_currency, booking_status, payment_status, special_requests, booking_reference, \
     booking_date, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    package_id: Uuid,
    participants: i32,
    total_price_amount: i64,
    total_price_currency: String,
    booking_status: String,
    payment_status: String,
    special_requests: Option<String>,
    booking_reference: String,
    booking_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            package_id: row.package_id,
            participants: to_u32(row.participants, "participants")?,
            total_price_amount: row.total_price_amount,
            total_price_currency: row.total_price_currency,
            booking_status: row
                .booking_status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("Booking {}: {}", row.id, e)))?,
            payment_status: row
                .payment_status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("Booking {}: {}", row.id, e)))?,
            special_requests: row.special_requests,
            booking_reference: row.booking_reference,
            booking_date: row.booking_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

fn capacity_holding() -> Vec<&'static str> {
    BookingStatus::capacity_holding()
        .into_iter()
        .map(|s| s.as_str())
        .collect()
}

fn to_committed(sum: i64, package_id: Uuid) -> StoreResult<u32> {
    u32::try_from(sum).map_err(|_| {
        StoreError::Corrupt(format!("Participant sum {} on package {}", sum, package_id))
    })
}

#[derive(sqlx::FromRow)]
struct TermsRow {
    id: Uuid,
    max_participants: i32,
    unit_price_amount: i64,
    currency: String,
    is_active: bool,
}

pub struct PgBookingStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgBookingStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self { pool, lock_timeout_ms }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn begin_package(&self, package_id: Uuid) -> StoreResult<Box<dyn PackageUnitOfWork>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        // The package row lock is the admission lock
        let row: Option<TermsRow> = sqlx::query_as(
            "SELECT id, max_participants, unit_price_amount, currency, is_active \
             FROM travel_packages WHERE id = $1 FOR UPDATE",
        )
        .bind(package_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let terms = row
            .map(|r| {
                Ok::<_, StoreError>(PackageTerms {
                    id: r.id,
                    max_participants: to_u32(r.max_participants, "max_participants")?,
                    unit_price_amount: r.unit_price_amount,
                    currency: r.currency,
                    is_active: r.is_active,
                })
            })
            .transpose()?;

        debug!("Locked package {} for admission", package_id);
        Ok(Box::new(PgPackageUnitOfWork {
            package_id,
            terms,
            tx,
        }))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE booking_reference = $1",
            BOOKING_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bookings WHERE TRUE", BOOKING_COLUMNS));

        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(package_id) = filter.package_id {
            qb.push(" AND package_id = ").push_bind(package_id);
        }
        if let Some(status) = filter.booking_status {
            qb.push(" AND booking_status = ").push_bind(status.as_str());
        }
        if let Some(status) = filter.payment_status {
            qb.push(" AND payment_status = ").push_bind(status.as_str());
        }
        if let Some((start, end)) = filter.booked_between {
            qb.push(" AND booking_date BETWEEN ")
                .push_bind(start)
                .push(" AND ")
                .push_bind(end);
        }
        qb.push(" ORDER BY booking_date, created_at");

        let rows: Vec<BookingRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        into_bookings(rows)
    }

    async fn package_capacity(&self, package_id: Uuid) -> StoreResult<Option<PackageCapacity>> {
        // One statement, so both numbers come from the same snapshot
        let row: Option<(i32, i64)> = sqlx::query_as(
            "SELECT p.max_participants, \
                    COALESCE((SELECT SUM(b.participants) FROM bookings b \
                              WHERE b.package_id = p.id AND b.booking_status = ANY($2)), 0)::BIGINT \
             FROM travel_packages p WHERE p.id = $1",
        )
        .bind(package_id)
        .bind(capacity_holding())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|(max, committed)| {
            Ok(PackageCapacity {
                package_id,
                max_participants: to_u32(max, "max_participants")?,
                committed_participants: to_committed(committed, package_id)?,
            })
        })
        .transpose()
    }
}

/// One transaction holding `FOR UPDATE` on the package row until commit or
/// drop. Dropping rolls back.
pub struct PgPackageUnitOfWork {
    package_id: Uuid,
    terms: Option<PackageTerms>,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PackageUnitOfWork for PgPackageUnitOfWork {
    fn package_id(&self) -> Uuid {
        self.package_id
    }

    async fn package(&mut self) -> StoreResult<Option<PackageTerms>> {
        Ok(self.terms.clone())
    }

    async fn committed_participants(&mut self) -> StoreResult<u32> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(participants), 0)::BIGINT FROM bookings \
             WHERE package_id = $1 AND booking_status = ANY($2)",
        )
        .bind(self.package_id)
        .bind(capacity_holding())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;

        to_committed(sum, self.package_id)
    }

    async fn bookings(&mut self) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE package_id = $1 ORDER BY booking_date, created_at",
            BOOKING_COLUMNS
        ))
        .bind(self.package_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        into_bookings(rows)
    }

    async fn booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1 AND package_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(self.package_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(Booking::try_from).transpose()
    }

    async fn user_exists(&mut self, user_id: Uuid) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, package_id, participants, total_price_amount,
                total_price_currency, booking_status, payment_status, special_requests,
                booking_reference, booking_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.package_id)
        .bind(to_i32(booking.participants, "participants")?)
        .bind(booking.total_price_amount)
        .bind(&booking.total_price_currency)
        .bind(booking.booking_status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.special_requests)
        .bind(&booking.booking_reference)
        .bind(booking.booking_date)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET participants = $1, total_price_amount = $2, total_price_currency = $3,
                booking_status = $4, payment_status = $5, special_requests = $6, updated_at = $7
            WHERE id = $8 AND package_id = $9
            "#,
        )
        .bind(to_i32(booking.participants, "participants")?)
        .bind(booking.total_price_amount)
        .bind(&booking.total_price_currency)
        .bind(booking.booking_status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.special_requests)
        .bind(booking.updated_at)
        .bind(booking.id)
        .bind(self.package_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("Booking {} does not exist", booking.id)));
        }
        Ok(())
    }

    async fn delete_booking(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND package_id = $2")
            .bind(id)
            .bind(self.package_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_package(&mut self) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM travel_packages WHERE id = $1")
            .bind(self.package_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected() > 0 {
            self.terms = None;
        }
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(db_err)
    }
}
