pub mod dto;
pub mod handlers;
pub mod normalize;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::ingredient_routes()
}
