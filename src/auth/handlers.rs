use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::auth::dto::{
    ForgotPasswordRequest, LoginRequest, MessageBody, ResetPasswordRequest, SignupRequest,
    UpdatePasswordRequest,
};
use crate::auth::middleware::{protected, CurrentUser};
use crate::auth::password::{hash_password, validate_new_password, verify_password};
use crate::auth::repo::{normalize_email, run_before_persist, SignupDraft, User};
use crate::auth::reset::{self, RESET_TOKEN_TTL};
use crate::auth::session::{deliver_session, logged_out_cookie};
use crate::error::ApiError;
use crate::mailer::OutgoingEmail;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:token", patch(reset_password));

    let authed = protected(
        Router::new().route("/auth/update-password", patch(update_password)),
        state,
    );

    public.merge(authed)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    let mut draft = SignupDraft {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        password_confirm: payload.password_confirm,
    };
    run_before_persist(&mut draft)?;

    if User::find_active_by_email(&state.db, &draft.email)
        .await?
        .is_some()
    {
        warn!(email = %draft.email, "email already registered");
        return Err(ApiError::EmailTaken);
    }

    let hash = hash_password(&draft.password)?;
    let user = User::create(&state.db, &draft, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    deliver_session(&user, StatusCode::CREATED, &state)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email);

    // Unknown email and wrong password take the same exit so responses
    // cannot be used to probe which addresses have accounts.
    let user = match User::find_active_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login with unknown email");
            return Err(ApiError::BadCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::BadCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    deliver_session(&user, StatusCode::OK, &state)
}

pub async fn logout() -> (axum_extra::extract::cookie::CookieJar, Json<MessageBody>) {
    let jar = axum_extra::extract::cookie::CookieJar::new().add(logged_out_cookie());
    (
        jar,
        Json(MessageBody {
            status: "success",
            message: "Logged out",
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = User::find_active_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    // Persist only the digest; the raw token exists in the email alone.
    let raw_token = reset::generate_token();
    let digest = reset::digest(&raw_token);
    let expires_at = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(&state.db, user.id, &digest, expires_at).await?;

    let reset_url = format!(
        "{}/api/v1/auth/reset-password/{}",
        state.config.public_base_url, raw_token
    );
    let mail = OutgoingEmail {
        to: user.email.clone(),
        subject: "Your password reset token (valid for 10 minutes)".into(),
        text: format!(
            "Forgot your password? Submit a PATCH request with your new password \
             and password confirmation to: {reset_url}\n\
             If you didn't forget your password, please ignore this email."
        ),
    };

    if let Err(e) = state.mailer.send(&mail).await {
        error!(error = %e, user_id = %user.id, "reset email delivery failed");
        // The token must not stay redeemable if the user never received it.
        if let Err(rollback) = User::clear_reset_token(&state.db, user.id).await {
            error!(error = %rollback, user_id = %user.id, "reset rollback failed");
        }
        return Err(ApiError::EmailDelivery);
    }

    info!(user_id = %user.id, "reset token sent");
    Ok(Json(MessageBody {
        status: "success",
        message: "Token sent to email",
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let digest = reset::digest(&token);
    let user = User::find_by_reset_digest(&state.db, &digest)
        .await?
        .ok_or(ApiError::InvalidResetToken)?;

    validate_new_password(&payload.password, &payload.password_confirm)
        .map_err(ApiError::Validation)?;

    let hash = hash_password(&payload.password)?;
    // Clears the reset fields in the same write: the token is single-use.
    let user = User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset redeemed");
    deliver_session(&user, StatusCode::OK, &state)
}

#[instrument(skip(state, current, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    let CurrentUser(user) = current;

    if !verify_password(&payload.password_current, &user.password_hash)? {
        warn!(user_id = %user.id, "password update with wrong current password");
        return Err(ApiError::BadCredentials);
    }

    validate_new_password(&payload.password, &payload.password_confirm)
        .map_err(ApiError::Validation)?;

    let hash = hash_password(&payload.password)?;
    let user = User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password updated");
    deliver_session(&user, StatusCode::OK, &state)
}
