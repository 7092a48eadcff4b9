use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub body: String,
    pub created_at: OffsetDateTime,
}

impl Review {
    pub async fn create(
        db: &PgPool,
        tour_id: Uuid,
        user_id: Uuid,
        rating: i16,
        body: &str,
    ) -> sqlx::Result<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (tour_id, user_id, rating, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tour_id, user_id, rating, body, created_at
            "#,
        )
        .bind(tour_id)
        .bind(user_id)
        .bind(rating)
        .bind(body)
        .fetch_one(db)
        .await
    }

    pub async fn list_by_tour(db: &PgPool, tour_id: Uuid) -> sqlx::Result<Vec<Review>> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT id, tour_id, user_id, rating, body, created_at
            FROM reviews
            WHERE tour_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tour_id)
        .fetch_all(db)
        .await
    }
}
