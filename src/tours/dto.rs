use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tours::repo::Difficulty;

fn default_limit() -> i64 {
    20
}
fn default_page() -> i64 {
    1
}

/// Query-string surface of a tour listing: filter, sort, paginate and
/// sparse field selection. Sort keys and projected fields both go through
/// whitelists; anything else falls back to the default ordering or is
/// dropped from the projection.
#[derive(Debug, Deserialize)]
pub struct ListTourParams {
    pub difficulty: Option<Difficulty>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub sort: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
    pub fields: Option<String>,
}

const SORTABLE: &[(&str, &str)] = &[
    ("name", "name"),
    ("price", "price"),
    ("duration_days", "duration_days"),
    ("created_at", "created_at"),
];

pub const PROJECTABLE: &[&str] = &[
    "id",
    "name",
    "duration_days",
    "max_group_size",
    "difficulty",
    "price",
    "summary",
    "description",
    "created_at",
];

impl ListTourParams {
    /// Whitelisted ORDER BY pieces; both halves are static strings, never
    /// client input.
    pub fn order_by(&self) -> (&'static str, &'static str) {
        if let Some(sort) = self.sort.as_deref() {
            let (key, dir) = match sort.strip_prefix('-') {
                Some(key) => (key, "DESC"),
                None => (sort, "ASC"),
            };
            if let Some((_, col)) = SORTABLE.iter().find(|(k, _)| *k == key) {
                return (col, dir);
            }
        }
        ("created_at", "DESC")
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn projected_fields(&self) -> Option<Vec<&str>> {
        let raw = self.fields.as_deref()?;
        let fields: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|f| PROJECTABLE.contains(f))
            .collect();
        (!fields.is_empty()).then_some(fields)
    }
}

/// Keeps only the requested keys of a serialized tour.
pub fn project_fields(value: Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .collect(),
        ),
        other => other,
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTourRequest {
    pub name: String,
    pub duration_days: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub price: f64,
    pub summary: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTourRequest {
    pub name: Option<String>,
    pub duration_days: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub price: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToursEnvelope {
    pub status: &'static str,
    pub results: usize,
    pub data: ToursData,
}

#[derive(Debug, Serialize)]
pub struct ToursData {
    pub tours: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct TourEnvelope {
    pub status: &'static str,
    pub data: TourData,
}

#[derive(Debug, Serialize)]
pub struct TourData {
    pub tour: Value,
}
