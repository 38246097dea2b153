pub mod combination;
mod dto;
pub mod handlers;
pub mod proximity;
pub mod ranking;
mod services;

use crate::state::AppState;
use axum::Router;

pub use combination::{RecipeCombinationResolver, RecipeMatch};
pub use proximity::{MatchTarget, MatchType, ProximityMatch};
pub use services::{CallerMatches, MatchingEngine};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::matching_routes())
}
