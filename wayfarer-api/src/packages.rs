use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfarer_booking::{PackageAvailability, PackageCapacity};
use wayfarer_catalog::{PackageDraft, PackageSearch, PackageType, TravelPackage};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    pub active: Option<bool>,
    pub featured: Option<bool>,
    pub destination_id: Option<Uuid>,
    pub package_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub q: Option<String>,
}

impl PackageQuery {
    fn into_search(self) -> Result<PackageSearch, AppError> {
        let package_type = self
            .package_type
            .as_deref()
            .map(str::parse::<PackageType>)
            .transpose()?;
        Ok(PackageSearch {
            active_only: self.active.unwrap_or(false),
            featured_only: self.featured.unwrap_or(false),
            destination_id: self.destination_id,
            package_type,
            starting_from: self.from,
            min_price: self.min_price,
            max_price: self.max_price,
            term: self.q.filter(|q| !q.trim().is_empty()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub package_id: Uuid,
    pub max_participants: u32,
    pub committed_participants: u32,
    pub available_participants: u32,
}

impl From<PackageCapacity> for AvailabilityResponse {
    fn from(capacity: PackageCapacity) -> Self {
        Self {
            package_id: capacity.package_id,
            max_participants: capacity.max_participants,
            committed_participants: capacity.committed_participants,
            available_participants: capacity.available(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/packages", get(list_packages).post(create_package))
        .route("/v1/packages/with-space", get(packages_with_space))
        .route(
            "/v1/packages/{id}",
            get(get_package).put(update_package).delete(delete_package),
        )
        .route("/v1/packages/{id}/toggle-status", patch(toggle_package))
        .route("/v1/packages/{id}/availability", get(package_availability))
}

async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<PackageQuery>,
) -> Result<Json<Vec<TravelPackage>>, AppError> {
    let search = query.into_search()?;
    Ok(Json(state.catalog.search_packages(&search).await?))
}

async fn create_package(
    State(state): State<AppState>,
    Json(draft): Json<PackageDraft>,
) -> Result<(StatusCode, Json<TravelPackage>), AppError> {
    let package = state.catalog.create_package(draft).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TravelPackage>, AppError> {
    Ok(Json(state.catalog.get_package(id).await?))
}

async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<PackageDraft>,
) -> Result<Json<TravelPackage>, AppError> {
    Ok(Json(state.catalog.update_package(id, draft).await?))
}

/// DELETE /v1/packages/{id}
/// Removes the package and all of its bookings
async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.cascade.delete_package(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TravelPackage>, AppError> {
    Ok(Json(state.catalog.toggle_package(id).await?))
}

async fn package_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let capacity = state.bookings.availability(id).await?;
    Ok(Json(capacity.into()))
}

async fn packages_with_space(
    State(state): State<AppState>,
) -> Result<Json<Vec<PackageAvailability>>, AppError> {
    Ok(Json(state.cascade.packages_with_space().await?))
}
