use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use wayfarer_catalog::{
    CatalogRepository, Destination, DestinationSearch, PackageSearch, TravelPackage,
};
use wayfarer_core::{StoreError, StoreResult};

use super::{db_err, like_pattern, to_i32, to_u32};

const DESTINATION_COLUMNS: &str = "id, name, country, city, description, image_url, price_amount, \
     currency, best_time_to_visit, climate, popular_attractions, is_featured, is_active, \
     created_at, updated_at";

const PACKAGE_COLUMNS: &str = "p.id, p.name, p.description, p.destination_id, p.start_date, \
     p.end_date, p.unit_price_amount, p.currency, p.max_participants, p.package_type, p.includes, \
     p.excludes, p.itinerary, p.is_featured, p.is_active, p.created_at, p.updated_at";

// Rows map one-to-one onto destinations
#[derive(sqlx::FromRow)]
struct DestinationRow {
    id: Uuid,
    name: String,
    country: String,
    city: String,
    description: Option<String>,
    image_url: Option<String>,
    price_amount: i64,
    currency: String,
    best_time_to_visit: Option<String>,
    climate: Option<String>,
    popular_attractions: Option<String>,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DestinationRow> for Destination {
    fn from(row: DestinationRow) -> Self {
        Destination {
            id: row.id,
            name: row.name,
            country: row.country,
            city: row.city,
            description: row.description,
            image_url: row.image_url,
            price_amount: row.price_amount,
            currency: row.currency,
            best_time_to_visit: row.best_time_to_visit,
            climate: row.climate,
            popular_attractions: row.popular_attractions,
            is_featured: row.is_featured,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    destination_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    unit_price_amount: i64,
    currency: String,
    max_participants: i32,
    package_type: String,
    includes: Option<String>,
    excludes: Option<String>,
    itinerary: Option<String>,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PackageRow> for TravelPackage {
    type Error = StoreError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        Ok(TravelPackage {
            id: row.id,
            name: row.name,
            description: row.description,
            destination_id: row.destination_id,
            start_date: row.start_date,
            end_date: row.end_date,
            unit_price_amount: row.unit_price_amount,
            currency: row.currency,
            max_participants: to_u32(row.max_participants, "max_participants")?,
            package_type: row
                .package_type
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("Package {}: {}", row.id, e)))?,
            includes: row.includes,
            excludes: row.excludes,
            itinerary: row.itinerary,
            is_featured: row.is_featured,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn insert_destination(&self, d: &Destination) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO destinations (id, name, country, city, description, image_url, price_amount,
                currency, best_time_to_visit, climate, popular_attractions, is_featured, is_active,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(d.id)
        .bind(&d.name)
        .bind(&d.country)
        .bind(&d.city)
        .bind(&d.description)
        .bind(&d.image_url)
        .bind(d.price_amount)
        .bind(&d.currency)
        .bind(&d.best_time_to_visit)
        .bind(&d.climate)
        .bind(&d.popular_attractions)
        .bind(d.is_featured)
        .bind(d.is_active)
        .bind(d.created_at)
        .bind(d.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_destination(&self, id: Uuid) -> StoreResult<Option<Destination>> {
        let row: Option<DestinationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM destinations WHERE id = $1",
            DESTINATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Destination::from))
    }

    async fn update_destination(&self, d: &Destination) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE destinations
            SET name = $1, country = $2, city = $3, description = $4, image_url = $5,
                price_amount = $6, currency = $7, best_time_to_visit = $8, climate = $9,
                popular_attractions = $10, is_featured = $11, is_active = $12, updated_at = $13
            WHERE id = $14
            "#,
        )
        .bind(&d.name)
        .bind(&d.country)
        .bind(&d.city)
        .bind(&d.description)
        .bind(&d.image_url)
        .bind(d.price_amount)
        .bind(&d.currency)
        .bind(&d.best_time_to_visit)
        .bind(&d.climate)
        .bind(&d.popular_attractions)
        .bind(d.is_featured)
        .bind(d.is_active)
        .bind(d.updated_at)
        .bind(d.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("Destination {} does not exist", d.id)));
        }
        Ok(())
    }

    async fn delete_destination(&self, id: Uuid) -> StoreResult<bool> {
        // travel_packages.destination_id is ON DELETE RESTRICT
        let result = sqlx::query("DELETE FROM destinations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_destinations(&self, search: &DestinationSearch) -> StoreResult<Vec<Destination>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM destinations WHERE TRUE",
            DESTINATION_COLUMNS
        ));

        if search.active_only {
            qb.push(" AND is_active");
        }
        if search.featured_only {
            qb.push(" AND is_featured");
        }
        if let Some(country) = &search.country {
            qb.push(" AND LOWER(country) = LOWER(").push_bind(country.clone()).push(")");
        }
        if let Some(city) = &search.city {
            qb.push(" AND LOWER(city) = LOWER(").push_bind(city.clone()).push(")");
        }
        if let Some(term) = &search.term {
            let pattern = like_pattern(term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR country ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR city ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(min) = search.min_price {
            qb.push(" AND price_amount >= ").push_bind(min);
        }
        if let Some(max) = search.max_price {
            qb.push(" AND price_amount <= ").push_bind(max);
        }
        qb.push(" ORDER BY name");

        let rows: Vec<DestinationRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Destination::from).collect())
    }

    async fn insert_package(&self, p: &TravelPackage) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO travel_packages (id, name, description, destination_id, start_date, end_date,
                unit_price_amount, currency, max_participants, package_type, includes, excludes,
                itinerary, is_featured, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.description)
        .bind(p.destination_id)
        .bind(p.start_date)
        .bind(p.end_date)
        .bind(p.unit_price_amount)
        .bind(&p.currency)
        .bind(to_i32(p.max_participants, "max_participants")?)
        .bind(p.package_type.as_str())
        .bind(&p.includes)
        .bind(&p.excludes)
        .bind(&p.itinerary)
        .bind(p.is_featured)
        .bind(p.is_active)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_package(&self, id: Uuid) -> StoreResult<Option<TravelPackage>> {
        let row: Option<PackageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM travel_packages p WHERE p.id = $1",
            PACKAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(TravelPackage::try_from).transpose()
    }

    async fn update_package(&self, p: &TravelPackage) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE travel_packages
            SET name = $1, description = $2, destination_id = $3, start_date = $4, end_date = $5,
                unit_price_amount = $6, currency = $7, max_participants = $8, package_type = $9,
                includes = $10, excludes = $11, itinerary = $12, is_featured = $13, is_active = $14,
                updated_at = $15
            WHERE id = $16
            "#,
        )
        .bind(&p.name)
        .bind(&p.description)
        .bind(p.destination_id)
        .bind(p.start_date)
        .bind(p.end_date)
        .bind(p.unit_price_amount)
        .bind(&p.currency)
        .bind(to_i32(p.max_participants, "max_participants")?)
        .bind(p.package_type.as_str())
        .bind(&p.includes)
        .bind(&p.excludes)
        .bind(&p.itinerary)
        .bind(p.is_featured)
        .bind(p.is_active)
        .bind(p.updated_at)
        .bind(p.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("Package {} does not exist", p.id)));
        }
        Ok(())
    }

    async fn list_packages(&self, search: &PackageSearch) -> StoreResult<Vec<TravelPackage>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM travel_packages p JOIN destinations d ON d.id = p.destination_id WHERE TRUE",
            PACKAGE_COLUMNS
        ));

        if search.active_only {
            qb.push(" AND p.is_active");
        }
        if search.featured_only {
            qb.push(" AND p.is_featured");
        }
        if let Some(destination_id) = search.destination_id {
            qb.push(" AND p.destination_id = ").push_bind(destination_id);
        }
        if let Some(package_type) = search.package_type {
            qb.push(" AND p.package_type = ").push_bind(package_type.as_str());
        }
        if let Some(from) = search.starting_from {
            qb.push(" AND p.start_date >= ").push_bind(from);
        }
        if let Some(min) = search.min_price {
            qb.push(" AND p.unit_price_amount >= ").push_bind(min);
        }
        if let Some(max) = search.max_price {
            qb.push(" AND p.unit_price_amount <= ").push_bind(max);
        }
        if let Some(term) = &search.term {
            let pattern = like_pattern(term);
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR d.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR d.country ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY p.start_date, p.name");

        let rows: Vec<PackageRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(TravelPackage::try_from).collect()
    }
}
