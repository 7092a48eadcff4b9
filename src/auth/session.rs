use axum::{
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::auth::dto::{PublicUser, SessionBody, SessionData};
use crate::auth::jwt::JwtKeys;
use crate::auth::repo::User;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "jwt";

/// The session cookie mirrors the token's transport requirements: never
/// script-readable, and only sent over TLS outside development.
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.environment.is_production())
        .max_age(Duration::days(config.jwt.cookie_ttl_days))
        .build()
}

/// Short-lived replacement cookie used by logout.
pub fn logged_out_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "loggedout"))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(10))
        .build()
}

/// Mints a fresh token for the user and delivers it both in the response
/// envelope and as the session cookie. The user's hash never leaves the
/// process: only [`PublicUser`] is serialized.
pub fn deliver_session(user: &User, status: StatusCode, state: &AppState) -> Result<Response, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id)?;

    let jar = CookieJar::new().add(session_cookie(token.clone(), &state.config));
    let body = SessionBody {
        status: "success",
        token,
        data: SessionData {
            user: PublicUser::from(user),
        },
    };

    Ok((status, jar, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn cookie_is_httponly_lax_and_scoped_to_root() {
        let state = AppState::fake();
        let cookie = session_cookie("tok".into(), &state.config);
        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::days(14)));
        // Development: plain http must still carry the cookie.
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn cookie_is_secure_in_production() {
        let state = AppState::fake();
        let mut config = (*state.config).clone();
        config.environment = Environment::Production;
        let cookie = session_cookie("tok".into(), &config);
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn logout_cookie_expires_almost_immediately() {
        let cookie = logged_out_cookie();
        assert_eq!(cookie.value(), "loggedout");
        assert_eq!(cookie.max_age(), Some(Duration::seconds(10)));
    }
}
