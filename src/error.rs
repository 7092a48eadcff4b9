use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::Environment;

/// Failure taxonomy for every operation the API performs. Each variant maps
/// to exactly one status code in [`IntoResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("You are not logged in. Please log in to get access")]
    Unauthenticated,
    #[error("Invalid token. Please log in again")]
    InvalidToken,
    #[error("Your token has expired. Please log in again")]
    ExpiredToken,
    #[error("The user belonging to this token no longer exists")]
    SubjectGone,
    #[error("Password was changed recently. Please log in again")]
    StalePassword,
    #[error("Incorrect email or password")]
    BadCredentials,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("There is no user with that email address")]
    UserNotFound,
    #[error("Token is invalid or has expired")]
    InvalidResetToken,
    #[error("{0}")]
    Validation(String),
    #[error("Email already registered")]
    EmailTaken,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("There was an error sending the email. Try again later")]
    EmailDelivery,
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use ApiError::*;
        match self {
            Unauthenticated | InvalidToken | ExpiredToken | SubjectGone | StalePassword
            | BadCredentials => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            UserNotFound | NotFound(_) => StatusCode::NOT_FOUND,
            InvalidResetToken | Validation(_) => StatusCode::BAD_REQUEST,
            EmailTaken => StatusCode::CONFLICT,
            EmailDelivery | Database(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Unexpected failures get their detail suppressed in production; the
    /// rest carry messages written for the client.
    fn is_operational(&self) -> bool {
        !matches!(self, ApiError::Database(_) | ApiError::Internal(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

/// Error verbosity mode, captured once from [`crate::config::AppConfig`]
/// during state construction. Tests that never build an `AppState` fall
/// back to development verbosity.
static REPORT_ENV: OnceLock<Environment> = OnceLock::new();

pub fn set_environment(env: Environment) {
    let _ = REPORT_ENV.set(env);
}

fn environment() -> Environment {
    REPORT_ENV.get().copied().unwrap_or(Environment::Development)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let status_word = if status.is_client_error() { "fail" } else { "error" };

        if status.is_server_error() {
            match &self {
                ApiError::Database(e) => error!(error = %e, "database failure"),
                ApiError::Internal(e) => error!(error = %e, "internal failure"),
                other => error!(error = %other, "request failed"),
            }
        }

        let message = if self.is_operational() || !environment().is_production() {
            match &self {
                ApiError::Database(e) => format!("database error: {e}"),
                ApiError::Internal(e) => format!("{e:#}"),
                other => other.to_string(),
            }
        } else {
            "Something went very wrong".to_string()
        };

        (
            status,
            Json(ErrorBody {
                status: status_word,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::SubjectGone.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::StalePassword.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::BadCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidResetToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Validation("passwords are not the same".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::EmailTaken.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::EmailDelivery.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn client_errors_use_fail_envelope() {
        let res = ApiError::BadCredentials.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["message"], "Incorrect email or password");
    }

    #[tokio::test]
    async fn server_errors_use_error_envelope() {
        let res = ApiError::EmailDelivery.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        // EmailDelivery is operational, so the message survives either mode.
        assert_eq!(
            json["message"],
            "There was an error sending the email. Try again later"
        );
    }

    #[tokio::test]
    async fn validation_message_reaches_client() {
        let res = ApiError::Validation("Passwords are not the same".into()).into_response();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Passwords are not the same");
    }
}
