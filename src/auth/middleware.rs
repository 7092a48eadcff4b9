use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::{self, Next},
    response::Response,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{Role, User};
use crate::auth::session::SESSION_COOKIE;
use crate::error::ApiError;
use crate::state::AppState;

/// Identity resolved for the lifetime of one request. Populated by
/// [`authenticate`], consumed by the role gate and by handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|t| t.to_string())
}

/// Access-control chain: extract -> verify -> resolve -> freshness. Each
/// step rejects with its own error kind; on success the identity rides the
/// request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = JwtKeys::from_ref(&state).verify(&token)?;

    let user = User::find_active_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::SubjectGone)?;

    if user.changed_password_after(claims.iat) {
        warn!(user_id = %user.id, "token predates password change");
        return Err(ApiError::StalePassword);
    }

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

fn role_allowed(allowed: &[Role], role: Role) -> bool {
    allowed.contains(&role)
}

async fn role_gate(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let CurrentUser(user) = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("role gate ran without an authenticated identity")))?;

    if !role_allowed(allowed, user.role) {
        warn!(user_id = %user.id, role = ?user.role, "role not permitted");
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Routes that only require a logged-in user.
pub fn protected(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, authenticate))
}

/// Routes restricted to an allow-list of roles. The gate is applied inside
/// the authentication layer here, so it can never observe a request whose
/// identity has not been resolved.
pub fn restricted(
    router: Router<AppState>,
    allowed: &'static [Role],
    state: AppState,
) -> Router<AppState> {
    router
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            role_gate(allowed, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("handler used CurrentUser outside an authenticated route")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    #[test]
    fn bearer_token_parses_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_accepts_lowercase_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn role_gate_allow_list() {
        let allowed = [Role::Admin, Role::LeadGuide];
        assert!(role_allowed(&allowed, Role::Admin));
        assert!(role_allowed(&allowed, Role::LeadGuide));
        assert!(!role_allowed(&allowed, Role::User));
        assert!(!role_allowed(&allowed, Role::Guide));
    }
}
