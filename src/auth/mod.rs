use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repo;
pub mod reset;
pub mod session;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::router(state)
}
