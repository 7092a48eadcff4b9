use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::middleware::{restricted, CurrentUser};
use crate::auth::repo::Role;
use crate::error::ApiError;
use crate::reviews::repo::Review;
use crate::state::AppState;
use crate::tours::repo::Tour;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i16,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewEnvelope {
    pub status: &'static str,
    pub data: ReviewData,
}

#[derive(Debug, Serialize)]
pub struct ReviewData {
    pub review: Review,
}

#[derive(Debug, Serialize)]
pub struct ReviewsEnvelope {
    pub status: &'static str,
    pub results: usize,
    pub data: ReviewsData,
}

#[derive(Debug, Serialize)]
pub struct ReviewsData {
    pub reviews: Vec<Review>,
}

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/tours/:id/reviews", get(list_reviews));

    // Only plain customers review tours; guides and admins manage them.
    let reviewers = restricted(
        Router::new().route("/tours/:id/reviews", post(create_review)),
        &[Role::User],
        state,
    );

    public.merge(reviewers)
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ReviewsEnvelope>, ApiError> {
    if Tour::find_by_id(&state.db, tour_id).await?.is_none() {
        return Err(ApiError::NotFound("Tour"));
    }
    let reviews = Review::list_by_tour(&state.db, tour_id).await?;
    Ok(Json(ReviewsEnvelope {
        status: "success",
        results: reviews.len(),
        data: ReviewsData { reviews },
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(tour_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewEnvelope>), ApiError> {
    let CurrentUser(user) = current;

    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::Validation("Rating must be between 1 and 5".into()));
    }
    if payload.body.trim().is_empty() {
        return Err(ApiError::Validation("A review cannot be empty".into()));
    }

    if Tour::find_by_id(&state.db, tour_id).await?.is_none() {
        return Err(ApiError::NotFound("Tour"));
    }

    let review = Review::create(&state.db, tour_id, user.id, payload.rating, payload.body.trim())
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                warn!(user_id = %user.id, tour_id = %tour_id, "duplicate review");
                ApiError::Validation("You have already reviewed this tour".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    info!(review_id = %review.id, tour_id = %tour_id, "review created");
    Ok((
        StatusCode::CREATED,
        Json(ReviewEnvelope {
            status: "success",
            data: ReviewData { review },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn review_envelope_serializes_with_counts() {
        let review = Review {
            id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            rating: 5,
            body: "Unforgettable".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let envelope = ReviewsEnvelope {
            status: "success",
            results: 1,
            data: ReviewsData {
                reviews: vec![review],
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["results"], 1);
        assert_eq!(json["data"]["reviews"][0]["rating"], 5);
    }
}
