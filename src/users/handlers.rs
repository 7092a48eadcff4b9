use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::middleware::{protected, restricted, CurrentUser};
use crate::auth::repo::{is_valid_email, normalize_email, Role, User};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    // Present only to reject password changes on this route.
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub status: &'static str,
    pub data: UserData,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UsersEnvelope {
    pub status: &'static str,
    pub results: usize,
    pub data: UsersData,
}

#[derive(Debug, Serialize)]
pub struct UsersData {
    pub users: Vec<PublicUser>,
}

fn user_envelope(user: &User) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        status: "success",
        data: UserData {
            user: PublicUser::from(user),
        },
    })
}

pub fn router(state: AppState) -> Router<AppState> {
    let me = protected(
        Router::new()
            .route("/users/me", get(get_me))
            .route("/users/me", patch(update_me))
            .route("/users/me", delete(delete_me)),
        state.clone(),
    );

    let admin = restricted(
        Router::new()
            .route("/users", get(list_users))
            .route("/users/:id", get(get_user))
            .route("/users/:id", patch(update_user))
            .route("/users/:id", delete(delete_user)),
        &[Role::Admin],
        state,
    );

    me.merge(admin)
}

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserEnvelope> {
    user_envelope(&user)
}

#[instrument(skip(state, current, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let CurrentUser(user) = current;

    if payload.password.is_some() || payload.password_confirm.is_some() {
        warn!(user_id = %user.id, "password change posted to profile route");
        return Err(ApiError::Validation(
            "This route is not for password updates. Please use /auth/update-password".into(),
        ));
    }

    let email = match payload.email.as_deref() {
        Some(raw) => {
            let normalized = normalize_email(raw);
            if !is_valid_email(&normalized) {
                return Err(ApiError::Validation("Please provide a valid email".into()));
            }
            Some(normalized)
        }
        None => None,
    };

    let updated =
        User::update_profile(&state.db, user.id, payload.name.as_deref(), email.as_deref()).await?;

    info!(user_id = %updated.id, "profile updated");
    Ok(user_envelope(&updated))
}

#[instrument(skip(state, current))]
pub async fn delete_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, ApiError> {
    let CurrentUser(user) = current;
    User::mark_inactive(&state.db, user.id).await?;
    info!(user_id = %user.id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersEnvelope>, ApiError> {
    let users = User::list_active(&state.db).await?;
    let users: Vec<PublicUser> = users.iter().map(PublicUser::from).collect();
    Ok(Json(UsersEnvelope {
        status: "success",
        results: users.len(),
        data: UsersData { users },
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = User::find_active_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(user_envelope(&user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    if User::find_active_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }
    let user = User::set_role(&state.db, id, payload.role).await?;
    info!(user_id = %user.id, role = ?user.role, "role changed");
    Ok(user_envelope(&user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if User::find_active_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }
    User::mark_inactive(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
