use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::middleware::restricted;
use crate::auth::repo::Role;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tours::dto::{
    project_fields, CreateTourRequest, ListTourParams, TourData, TourEnvelope, ToursData,
    ToursEnvelope, UpdateTourRequest,
};
use crate::tours::repo::Tour;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/tours", get(list_tours))
        .route("/tours/:id", get(get_tour));

    let managed = restricted(
        Router::new()
            .route("/tours", post(create_tour))
            .route("/tours/:id", patch(update_tour))
            .route("/tours/:id", delete(delete_tour)),
        &[Role::Admin, Role::LeadGuide],
        state,
    );

    public.merge(managed)
}

fn tour_envelope(tour: &Tour) -> Result<Json<TourEnvelope>, ApiError> {
    let tour = serde_json::to_value(tour).map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(TourEnvelope {
        status: "success",
        data: TourData { tour },
    }))
}

#[instrument(skip(state))]
pub async fn list_tours(
    State(state): State<AppState>,
    Query(params): Query<ListTourParams>,
) -> Result<Json<ToursEnvelope>, ApiError> {
    let tours = Tour::list(&state.db, &params).await?;
    let fields = params.projected_fields();

    let mut rows = Vec::with_capacity(tours.len());
    for tour in &tours {
        let mut value = serde_json::to_value(tour).map_err(|e| ApiError::Internal(e.into()))?;
        if let Some(fields) = &fields {
            value = project_fields(value, fields);
        }
        rows.push(value);
    }

    Ok(Json(ToursEnvelope {
        status: "success",
        results: rows.len(),
        data: ToursData { tours: rows },
    }))
}

#[instrument(skip(state))]
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TourEnvelope>, ApiError> {
    let tour = Tour::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Tour"))?;
    tour_envelope(&tour)
}

#[instrument(skip(state, payload))]
pub async fn create_tour(
    State(state): State<AppState>,
    Json(payload): Json<CreateTourRequest>,
) -> Result<(StatusCode, Json<TourEnvelope>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("A tour must have a name".into()));
    }
    if payload.price <= 0.0 {
        return Err(ApiError::Validation("A tour price must be positive".into()));
    }
    let tour = Tour::create(&state.db, &payload).await?;
    info!(tour_id = %tour.id, name = %tour.name, "tour created");
    Ok((StatusCode::CREATED, tour_envelope(&tour)?))
}

#[instrument(skip(state, payload))]
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTourRequest>,
) -> Result<Json<TourEnvelope>, ApiError> {
    if matches!(payload.price, Some(p) if p <= 0.0) {
        return Err(ApiError::Validation("A tour price must be positive".into()));
    }
    let tour = Tour::update(&state.db, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("Tour"))?;
    info!(tour_id = %tour.id, "tour updated");
    tour_envelope(&tour)
}

#[instrument(skip(state))]
pub async fn delete_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !Tour::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Tour"));
    }
    info!(tour_id = %id, "tour deleted");
    Ok(StatusCode::NO_CONTENT)
}
