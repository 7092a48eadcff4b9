use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::middleware::{protected, restricted, CurrentUser};
use crate::auth::repo::Role;
use crate::bookings::repo::Booking;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tours::repo::Tour;

#[derive(Debug, Serialize)]
pub struct BookingEnvelope {
    pub status: &'static str,
    pub data: BookingData,
}

#[derive(Debug, Serialize)]
pub struct BookingData {
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct BookingsEnvelope {
    pub status: &'static str,
    pub results: usize,
    pub data: BookingsData,
}

#[derive(Debug, Serialize)]
pub struct BookingsData {
    pub bookings: Vec<Booking>,
}

pub fn router(state: AppState) -> Router<AppState> {
    let mine = protected(
        Router::new()
            .route("/tours/:id/bookings", post(create_booking))
            .route("/bookings/me", get(my_bookings)),
        state.clone(),
    );

    let managed = restricted(
        Router::new().route("/bookings", get(list_bookings)),
        &[Role::Admin, Role::LeadGuide],
        state,
    );

    mine.merge(managed)
}

fn bookings_envelope(bookings: Vec<Booking>) -> Json<BookingsEnvelope> {
    Json(BookingsEnvelope {
        status: "success",
        results: bookings.len(),
        data: BookingsData { bookings },
    })
}

#[instrument(skip(state, current))]
pub async fn create_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(tour_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BookingEnvelope>), ApiError> {
    let CurrentUser(user) = current;
    let tour = Tour::find_by_id(&state.db, tour_id)
        .await?
        .ok_or(ApiError::NotFound("Tour"))?;

    let booking = Booking::create(&state.db, tour.id, user.id, tour.price).await?;
    info!(booking_id = %booking.id, tour_id = %tour.id, user_id = %user.id, "tour booked");

    Ok((
        StatusCode::CREATED,
        Json(BookingEnvelope {
            status: "success",
            data: BookingData { booking },
        }),
    ))
}

#[instrument(skip(state, current))]
pub async fn my_bookings(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<BookingsEnvelope>, ApiError> {
    let CurrentUser(user) = current;
    let bookings = Booking::list_by_user(&state.db, user.id).await?;
    Ok(bookings_envelope(bookings))
}

#[instrument(skip(state))]
pub async fn list_bookings(
    State(state): State<AppState>,
) -> Result<Json<BookingsEnvelope>, ApiError> {
    let bookings = Booking::list_all(&state.db).await?;
    Ok(bookings_envelope(bookings))
}
