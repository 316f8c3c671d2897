use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;
use uuid::Uuid;
use wayfarer_booking::{BookingChanges, CreateBooking};
use wayfarer_core::{Booking, BookingStatus, PaymentStatus};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings).post(create_booking))
        .route("/v1/bookings/events", get(booking_events))
        .route("/v1/bookings/date-range", get(bookings_between))
        .route("/v1/bookings/reference/{reference}", get(get_by_reference))
        .route("/v1/bookings/user/{user_id}", get(bookings_for_user))
        .route("/v1/bookings/user/{user_id}/confirmed", get(confirmed_for_user))
        .route("/v1/bookings/status/{status}", get(bookings_by_status))
        .route("/v1/bookings/payment-status/{status}", get(bookings_by_payment_status))
        .route(
            "/v1/bookings/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/v1/bookings/{id}/status", patch(update_status))
        .route("/v1/bookings/{id}/payment-status", patch(update_payment_status))
        .route("/v1/bookings/{id}/cancel", patch(cancel_booking))
}

fn booking_status(raw: &str) -> Result<BookingStatus, AppError> {
    raw.parse::<BookingStatus>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

fn payment_status(raw: &str) -> Result<PaymentStatus, AppError> {
    raw.parse::<PaymentStatus>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings
async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.all_bookings().await?))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking(id).await?))
}

/// PUT /v1/bookings/{id}
/// Change participants and/or special requests
async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<BookingChanges>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.update_booking(id, changes).await?))
}

/// DELETE /v1/bookings/{id}
async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.bookings.delete_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /v1/bookings/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<Booking>, AppError> {
    let status = booking_status(&req.status)?;
    Ok(Json(state.bookings.update_booking_status(id, status).await?))
}

/// PATCH /v1/bookings/{id}/payment-status
async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<Booking>, AppError> {
    let status = payment_status(&req.status)?;
    Ok(Json(state.bookings.update_payment_status(id, status).await?))
}

/// PATCH /v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel_booking(id).await?))
}

async fn get_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking_by_reference(&reference).await?))
}

async fn bookings_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.bookings_for_user(user_id).await?))
}

async fn confirmed_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.confirmed_bookings_for_user(user_id).await?))
}

async fn bookings_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let status = booking_status(&status)?;
    Ok(Json(state.bookings.bookings_by_status(status).await?))
}

async fn bookings_by_payment_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let status = payment_status(&status)?;
    Ok(Json(state.bookings.bookings_by_payment_status(status).await?))
}

/// GET /v1/bookings/date-range?start=..&end=..
async fn bookings_between(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.bookings_between(range.start, range.end).await?))
}

/// GET /v1/bookings/events
/// Committed booking changes as server-sent events
async fn booking_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bookings.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match Event::default().event(event.kind.as_str()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    warn!("Dropping unserializable booking event: {}", e);
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Booking event subscriber lagged, {} events skipped", skipped);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
