pub mod claude;
pub mod dto;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod preference;
pub mod workers;

use crate::state::AppState;
use axum::Router;

pub use dto::{GenerationOutput, ProviderKind, ProviderPreference};
pub use error::ProviderError;
pub use gateway::ProviderGateway;

pub fn router() -> Router<AppState> {
    handlers::provider_routes()
}
