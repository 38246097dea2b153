use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::dto::{
    MatchesResponse, NearbyQuery, NearbyResponse, RecipeMatchesResponse, SwapsResponse,
};
use super::proximity::MatchTarget;
use super::services::CallerMatches;
use crate::error::MatchError;
use crate::pantry::UserProfile;
use crate::state::AppState;

pub fn matching_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id/nearby", get(nearby))
        .route("/users/:id/recipes", get(recipe_matches))
        .route("/users/:id/matches", get(matches))
        .route("/users/:id/swaps/:other_id", get(swaps))
}

fn reject(e: MatchError) -> (StatusCode, String) {
    let status = match &e {
        MatchError::NotFound(_) => StatusCode::NOT_FOUND,
        MatchError::Validation(_) => StatusCode::BAD_REQUEST,
        MatchError::Connectivity { .. } => StatusCode::SERVICE_UNAVAILABLE,
        MatchError::Cancelled => StatusCode::REQUEST_TIMEOUT,
    };
    if status.is_server_error() {
        error!(error = %e, "matching request failed");
    }
    (status, e.to_string())
}

async fn load_caller(state: &AppState, user_id: Uuid) -> Result<UserProfile, (StatusCode, String)> {
    state
        .engine
        .directory()
        .find_user(user_id)
        .await
        .map_err(reject)
}

fn target_for(caller: &UserProfile, q: NearbyQuery) -> Result<MatchTarget, (StatusCode, String)> {
    match (q.offer, q.request) {
        (Some(_), Some(_)) => Err((
            StatusCode::BAD_REQUEST,
            "use either offer or request, not both".into(),
        )),
        (Some(entry_id), None) => caller
            .pantry_entry_by_id(entry_id)
            .cloned()
            .map(MatchTarget::Offering)
            .ok_or((StatusCode::NOT_FOUND, "Ingredient not found".into())),
        (None, Some(name)) if name.trim().is_empty() => {
            Err((StatusCode::BAD_REQUEST, "request must not be empty".into()))
        }
        (None, Some(name)) => Ok(MatchTarget::Requesting(name)),
        (None, None) => Ok(MatchTarget::Pool),
    }
}

#[instrument(skip(state))]
pub async fn nearby(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(q): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, (StatusCode, String)> {
    let caller = load_caller(&state, user_id).await?;
    let target = target_for(&caller, q)?;
    let matches = state.engine.find_nearby(&caller, &target).await;
    Ok(Json(NearbyResponse { matches }))
}

#[instrument(skip(state))]
pub async fn recipe_matches(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RecipeMatchesResponse>, (StatusCode, String)> {
    let caller = load_caller(&state, user_id).await?;
    // dropping the handler future (client gone) cancels outstanding lookups
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let matches = state.engine.find_recipes_nearby(&caller, &cancel).await;
    Ok(Json(RecipeMatchesResponse { matches }))
}

#[instrument(skip(state))]
pub async fn matches(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MatchesResponse>, (StatusCode, String)> {
    let caller = load_caller(&state, user_id).await?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let CallerMatches {
        offer_matches,
        request_matches,
        recipes,
    } = state.engine.find_matches(&caller, &cancel).await;
    Ok(Json(MatchesResponse {
        offer_matches,
        request_matches,
        recipes,
    }))
}

#[instrument(skip(state))]
pub async fn swaps(
    State(state): State<AppState>,
    Path((user_id, other_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SwapsResponse>, (StatusCode, String)> {
    if user_id == other_id {
        warn!(%user_id, "swap request against self");
        return Err((StatusCode::BAD_REQUEST, "cannot swap with yourself".into()));
    }
    let caller = load_caller(&state, user_id).await?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let suggestions = state
        .engine
        .suggest_swaps(&caller, other_id, &cancel)
        .await
        .map_err(reject)?;
    Ok(Json(SwapsResponse { suggestions }))
}
