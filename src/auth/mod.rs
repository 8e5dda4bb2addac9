use crate::state::AppState;
use axum::Router;

mod dto;
mod error;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
