use axum::Router;

use crate::state::AppState;

pub mod handlers;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::router(state)
}
