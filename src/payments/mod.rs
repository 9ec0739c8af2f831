mod dto;
pub mod error;
pub mod gateway;
pub mod handlers;
mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::checkout_routes())
        .merge(handlers::webhook_routes())
}
