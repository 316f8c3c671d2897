use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use wayfarer_catalog::{Destination, DestinationDraft, DestinationSearch};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DestinationQuery {
    pub active: Option<bool>,
    pub featured: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub q: Option<String>,
}

impl From<DestinationQuery> for DestinationSearch {
    fn from(query: DestinationQuery) -> Self {
        DestinationSearch {
            active_only: query.active.unwrap_or(false),
            featured_only: query.featured.unwrap_or(false),
            country: query.country,
            city: query.city,
            term: query.q.filter(|q| !q.trim().is_empty()),
            min_price: query.min_price,
            max_price: query.max_price,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/destinations", get(list_destinations).post(create_destination))
        .route(
            "/v1/destinations/{id}",
            get(get_destination)
                .put(update_destination)
                .delete(delete_destination),
        )
        .route("/v1/destinations/{id}/toggle-status", patch(toggle_destination))
}

async fn list_destinations(
    State(state): State<AppState>,
    Query(query): Query<DestinationQuery>,
) -> Result<Json<Vec<Destination>>, AppError> {
    let search = DestinationSearch::from(query);
    Ok(Json(state.catalog.search_destinations(&search).await?))
}

async fn create_destination(
    State(state): State<AppState>,
    Json(draft): Json<DestinationDraft>,
) -> Result<(StatusCode, Json<Destination>), AppError> {
    let destination = state.catalog.create_destination(draft).await?;
    Ok((StatusCode::CREATED, Json(destination)))
}

async fn get_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Destination>, AppError> {
    Ok(Json(state.catalog.get_destination(id).await?))
}

async fn update_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<DestinationDraft>,
) -> Result<Json<Destination>, AppError> {
    Ok(Json(state.catalog.update_destination(id, draft).await?))
}

/// DELETE /v1/destinations/{id}
/// Cascades over the destination's packages and their bookings
async fn delete_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.cascade.delete_destination(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Destination>, AppError> {
    Ok(Json(state.catalog.toggle_destination(id).await?))
}
