use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::combination::{combine_pantries, RecipeCombinationResolver, RecipeMatch};
use super::proximity::{self, MatchTarget, ProximityMatch};
use super::ranking::rank;
use crate::config::MatchingConfig;
use crate::error::MatchError;
use crate::pantry::{Directory, UserProfile};
use crate::recipes::swaps::{split_contributions, usable_substitutes};
use crate::recipes::{RecipeSource, SwapSuggestion};

/// Everything a caller's open offers and requests currently match.
#[derive(Debug, Default, Serialize)]
pub struct CallerMatches {
    /// Neighbours who requested something the caller offers.
    pub offer_matches: Vec<ProximityMatch>,
    /// Neighbours offering something the caller requested.
    pub request_matches: Vec<ProximityMatch>,
    pub recipes: Vec<RecipeMatch>,
}

/// Entry point the rest of the system talks to.
///
/// Holds no per-call state; the only thing shared between calls is the
/// recipe-source permit pool inside the resolver.
pub struct MatchingEngine {
    directory: Arc<dyn Directory>,
    resolver: RecipeCombinationResolver,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(
        directory: Arc<dyn Directory>,
        recipes: Arc<dyn RecipeSource>,
        config: MatchingConfig,
    ) -> Self {
        let resolver = RecipeCombinationResolver::new(directory.clone(), recipes, config.clone());
        Self {
            directory,
            resolver,
            config,
        }
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    /// Nearby users complementing `target`, nearest first. Directory
    /// failures yield an empty list.
    #[instrument(skip(self, caller, target), fields(user_id = %caller.id))]
    pub async fn find_nearby(&self, caller: &UserProfile, target: &MatchTarget) -> Vec<ProximityMatch> {
        let snapshot = self.snapshot().await;
        let matches =
            proximity::find_nearby(caller, &snapshot, target, self.config.max_distance_km);
        debug!(scanned = snapshot.len(), matched = matches.len(), "proximity scan");
        matches
    }

    /// Recipes reachable with each candidate, one variant per recipe, fewest
    /// missing ingredients first.
    #[instrument(skip_all, fields(user_id = %caller.id, candidates = candidates.len()))]
    pub async fn find_matching_recipes(
        &self,
        caller: &UserProfile,
        candidates: &[ProximityMatch],
        cancel: &CancellationToken,
    ) -> Vec<RecipeMatch> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let raw = self.resolver.resolve(caller, candidates, cancel).await;
        rank(raw)
    }

    /// Pool search followed by [`Self::find_matching_recipes`].
    pub async fn find_recipes_nearby(
        &self,
        caller: &UserProfile,
        cancel: &CancellationToken,
    ) -> Vec<RecipeMatch> {
        let pool = self.find_nearby(caller, &MatchTarget::Pool).await;
        self.find_matching_recipes(caller, &pool, cancel).await
    }

    /// Proximity matches for every offer and request the caller has open,
    /// plus the recipes reachable with any of those neighbours. One
    /// directory snapshot serves all the scans.
    #[instrument(skip_all, fields(user_id = %caller.id))]
    pub async fn find_matches(
        &self,
        caller: &UserProfile,
        cancel: &CancellationToken,
    ) -> CallerMatches {
        let snapshot = self.snapshot().await;
        let max = self.config.max_distance_km;

        let offer_matches: Vec<ProximityMatch> = caller
            .offers()
            .filter_map(|offer| caller.pantry_entry_by_id(offer.ingredient_id))
            .flat_map(|entry| {
                let target = MatchTarget::Offering(entry.clone());
                proximity::find_nearby(caller, &snapshot, &target, max)
            })
            .collect();
        let request_matches: Vec<ProximityMatch> = caller
            .requested_names()
            .flat_map(|name| {
                let target = MatchTarget::Requesting(name.to_string());
                proximity::find_nearby(caller, &snapshot, &target, max)
            })
            .collect();

        // one recipe lookup per neighbour, however many ingredients they match on
        let mut seen = HashSet::new();
        let candidates: Vec<ProximityMatch> = offer_matches
            .iter()
            .chain(&request_matches)
            .filter(|m| seen.insert(m.other_user_id))
            .cloned()
            .collect();
        debug!(
            offers = offer_matches.len(),
            requests = request_matches.len(),
            candidates = candidates.len(),
            "exchange matches"
        );
        let recipes = self.find_matching_recipes(caller, &candidates, cancel).await;

        CallerMatches {
            offer_matches,
            request_matches,
            recipes,
        }
    }

    async fn snapshot(&self) -> Vec<UserProfile> {
        match self.directory.list_users_with_location().await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "directory unavailable, no nearby matches");
                Vec::new()
            }
        }
    }

    /// Recipes the caller and `other_user_id` could cook together, with
    /// substitutes for missing ingredients drawn from either pantry.
    #[instrument(skip(self, caller, cancel), fields(user_id = %caller.id))]
    pub async fn suggest_swaps(
        &self,
        caller: &UserProfile,
        other_user_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<SwapSuggestion>, MatchError> {
        let other = self.directory.find_user(other_user_id).await?;

        let mine: BTreeSet<String> = caller.pantry_names().map(str::to_string).collect();
        let theirs: BTreeSet<String> = other.pantry_names().map(str::to_string).collect();
        let combined: Vec<String> =
            combine_pantries(caller.pantry_names(), other.pantry_names()).into_iter().collect();
        if combined.is_empty() {
            return Ok(Vec::new());
        }

        let source = self.resolver.source();
        let recipes = match self
            .resolver
            .guarded(
                cancel,
                source.find_by_ingredients(&combined, self.config.recipe_count_per_query),
            )
            .await
        {
            Ok(recipes) => recipes,
            Err(MatchError::Cancelled) => return Err(MatchError::Cancelled),
            Err(e) => {
                warn!(error = %e, %other_user_id, "recipe lookup failed, no swaps");
                return Ok(Vec::new());
            }
        };

        let available: BTreeSet<String> = combined.into_iter().collect();
        let mut suggestions = Vec::with_capacity(recipes.len());
        for recipe in &recipes {
            let mut suggestion = split_contributions(recipe, &mine, &theirs);
            for missing in &suggestion.missing {
                let subs = match self.resolver.guarded(cancel, source.substitutes(missing)).await {
                    Ok(subs) => subs,
                    Err(MatchError::Cancelled) => return Err(MatchError::Cancelled),
                    Err(e) => {
                        warn!(error = %e, ingredient = %missing, "substitute lookup failed");
                        continue;
                    }
                };
                let usable = usable_substitutes(&subs, &available);
                if !usable.is_empty() {
                    suggestion.possible_swaps.insert(missing.clone(), usable);
                }
            }
            suggestions.push(suggestion);
        }

        suggestions.sort_by_key(|s| s.missing.len());
        Ok(suggestions)
    }
}
