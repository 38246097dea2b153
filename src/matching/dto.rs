use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combination::RecipeMatch;
use super::proximity::ProximityMatch;
use crate::recipes::SwapSuggestion;

/// `?offer=<pantry entry id>` or `?request=<ingredient name>`; neither means
/// everyone in range.
#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    pub offer: Option<Uuid>,
    pub request: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub matches: Vec<ProximityMatch>,
}

#[derive(Debug, Serialize)]
pub struct RecipeMatchesResponse {
    pub matches: Vec<RecipeMatch>,
}

#[derive(Debug, Serialize)]
pub struct SwapsResponse {
    pub suggestions: Vec<SwapSuggestion>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub offer_matches: Vec<ProximityMatch>,
    pub request_matches: Vec<ProximityMatch>,
    pub recipes: Vec<RecipeMatch>,
}
