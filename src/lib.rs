//! Neighbourhood ingredient exchange: finds nearby users whose pantries
//! complement each other and recipes they could cook by pooling them.

pub mod app;
pub mod config;
pub mod error;
pub mod geo;
pub mod matching;
pub mod pantry;
pub mod recipes;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::MatchError;
pub use matching::{MatchTarget, MatchingEngine, ProximityMatch, RecipeMatch};
