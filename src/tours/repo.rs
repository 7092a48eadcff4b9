use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tours::dto::{CreateTourRequest, ListTourParams, UpdateTourRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tour_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub duration_days: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub price: f64,
    pub summary: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Tour {
    pub async fn list(db: &PgPool, params: &ListTourParams) -> sqlx::Result<Vec<Tour>> {
        // Column and direction come from the params whitelist, never from
        // raw client input.
        let (col, dir) = params.order_by();
        let sql = format!(
            r#"
            SELECT id, name, duration_days, max_group_size, difficulty, price,
                   summary, description, created_at
            FROM tours
            WHERE ($1::tour_difficulty IS NULL OR difficulty = $1)
              AND ($2::float8 IS NULL OR price >= $2)
              AND ($3::float8 IS NULL OR price <= $3)
            ORDER BY {col} {dir}
            LIMIT $4 OFFSET $5
            "#
        );
        sqlx::query_as::<_, Tour>(&sql)
            .bind(params.difficulty)
            .bind(params.price_min)
            .bind(params.price_max)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Tour>> {
        sqlx::query_as::<_, Tour>(
            r#"
            SELECT id, name, duration_days, max_group_size, difficulty, price,
                   summary, description, created_at
            FROM tours
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(db: &PgPool, req: &CreateTourRequest) -> sqlx::Result<Tour> {
        sqlx::query_as::<_, Tour>(
            r#"
            INSERT INTO tours (name, duration_days, max_group_size, difficulty, price, summary, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, duration_days, max_group_size, difficulty, price,
                      summary, description, created_at
            "#,
        )
        .bind(&req.name)
        .bind(req.duration_days)
        .bind(req.max_group_size)
        .bind(req.difficulty)
        .bind(req.price)
        .bind(&req.summary)
        .bind(&req.description)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, id: Uuid, req: &UpdateTourRequest) -> sqlx::Result<Option<Tour>> {
        sqlx::query_as::<_, Tour>(
            r#"
            UPDATE tours
            SET name = COALESCE($2, name),
                duration_days = COALESCE($3, duration_days),
                max_group_size = COALESCE($4, max_group_size),
                difficulty = COALESCE($5, difficulty),
                price = COALESCE($6, price),
                summary = COALESCE($7, summary),
                description = COALESCE($8, description)
            WHERE id = $1
            RETURNING id, name, duration_days, max_group_size, difficulty, price,
                      summary, description, created_at
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(req.duration_days)
        .bind(req.max_group_size)
        .bind(req.difficulty)
        .bind(req.price)
        .bind(&req.summary)
        .bind(&req.description)
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM tours WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
