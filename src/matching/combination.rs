use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::proximity::ProximityMatch;
use crate::config::MatchingConfig;
use crate::error::MatchError;
use crate::pantry::{normalize_name, Directory, UserProfile};
use crate::recipes::{RecipeCandidate, RecipeSource};

/// A recipe reachable by pooling the caller's pantry with one neighbour's.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeMatch {
    pub other_user_id: Uuid,
    pub distance_km: f64,
    pub recipe: RecipeCandidate,
    pub missing_ingredients: Vec<String>,
}

/// Case-insensitive union of two pantries' ingredient names.
pub fn combine_pantries<'a>(
    mine: impl IntoIterator<Item = &'a str>,
    theirs: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<String> {
    mine.into_iter()
        .chain(theirs)
        .map(normalize_name)
        .filter(|n| !n.is_empty())
        .collect()
}

/// Required ingredients of `recipe` that `available` does not cover.
pub fn missing_ingredients(recipe: &RecipeCandidate, available: &BTreeSet<String>) -> Vec<String> {
    recipe
        .required_ingredients()
        .into_iter()
        .filter(|name| !available.contains(name))
        .collect()
}

/// Asks the recipe source what each candidate pair could cook.
///
/// All recipe-source calls share one semaphore, so concurrent callers of
/// the same resolver together stay under the source's rate limit.
pub struct RecipeCombinationResolver {
    directory: Arc<dyn Directory>,
    source: Arc<dyn RecipeSource>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
    config: MatchingConfig,
}

impl RecipeCombinationResolver {
    pub fn new(
        directory: Arc<dyn Directory>,
        source: Arc<dyn RecipeSource>,
        config: MatchingConfig,
    ) -> Self {
        let permits = config.max_concurrent_recipe_queries.max(1);
        Self {
            directory,
            source,
            limiter: Arc::new(Semaphore::new(permits)),
            timeout: config.recipe_timeout(),
            config,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn source(&self) -> &dyn RecipeSource {
        self.source.as_ref()
    }

    /// Runs one recipe-source call under the shared permit, the timeout and
    /// `cancel`.
    pub(crate) async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, MatchError>>,
    ) -> Result<T, MatchError> {
        let timeout = self.timeout;
        let bounded = async {
            let _permit = self
                .limiter
                .acquire()
                .await
                .map_err(MatchError::recipe_source)?;
            tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| MatchError::recipe_source(format!("timed out after {timeout:?}")))?
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(MatchError::Cancelled),
            res = bounded => res,
        }
    }

    /// One [`RecipeMatch`] per (candidate, recipe) pair, in candidate order.
    pub async fn resolve(
        &self,
        caller: &UserProfile,
        candidates: &[ProximityMatch],
        cancel: &CancellationToken,
    ) -> Vec<RecipeMatch> {
        let caller_names: Vec<String> = caller.pantry_names().map(str::to_string).collect();
        // futures are built up front so no borrowing closure ends up in the
        // stream type, which would make the whole future !Send
        let lookups: Vec<_> = candidates
            .iter()
            .map(|candidate| self.resolve_candidate(&caller_names, candidate, cancel))
            .collect();
        let per_candidate: Vec<Vec<RecipeMatch>> = stream::iter(lookups)
            .buffered(self.config.max_concurrent_recipe_queries.max(1))
            .collect()
            .await;
        per_candidate.into_iter().flatten().collect()
    }

    async fn resolve_candidate(
        &self,
        caller_names: &[String],
        candidate: &ProximityMatch,
        cancel: &CancellationToken,
    ) -> Vec<RecipeMatch> {
        let other_id = candidate.other_user_id;
        if cancel.is_cancelled() {
            return Vec::new();
        }

        let other_pantry = match self.directory.pantry(other_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, %other_id, "candidate pantry unavailable");
                return Vec::new();
            }
        };

        let combined = combine_pantries(
            caller_names.iter().map(String::as_str),
            other_pantry.iter().map(|e| e.name.as_str()),
        );
        if combined.len() < self.config.min_ingredients_for_recipe {
            debug!(
                %other_id,
                combined = combined.len(),
                "combined pantry too small for recipes"
            );
            return Vec::new();
        }

        let names: Vec<String> = combined.iter().cloned().collect();
        let count = self.config.recipe_count_per_query;
        let recipes = match self
            .guarded(cancel, self.source.find_by_ingredients(&names, count))
            .await
        {
            Ok(recipes) => recipes,
            Err(MatchError::Cancelled) => {
                debug!(%other_id, "recipe lookup cancelled");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, %other_id, "recipe lookup failed");
                return Vec::new();
            }
        };
        if recipes.is_empty() {
            debug!(%other_id, "no recipes for combined pantry");
        }

        recipes
            .into_iter()
            .map(|recipe| RecipeMatch {
                other_user_id: other_id,
                distance_km: candidate.distance_km,
                missing_ingredients: missing_ingredients(&recipe, &combined),
                recipe,
            })
            .collect()
    }
}

#[cfg(test)]
mod combination_tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::pantry::InMemoryDirectory;
    use crate::testing::{located_user, north_of, recipe, ScriptedRecipeSource, ORIGIN};

    fn candidate(user: &UserProfile, km: f64) -> ProximityMatch {
        ProximityMatch {
            other_user_id: user.id,
            distance_km: km,
            ingredient_name: None,
            match_type: None,
        }
    }

    fn resolver(
        users: Vec<UserProfile>,
        source: Arc<ScriptedRecipeSource>,
        config: MatchingConfig,
    ) -> RecipeCombinationResolver {
        RecipeCombinationResolver::new(Arc::new(InMemoryDirectory::new(users)), source, config)
    }

    #[test]
    fn union_ignores_case_and_duplicates() {
        let combined = combine_pantries(["Flour", "eggs"], ["flour", "MILK", ""]);
        let names: Vec<&str> = combined.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["eggs", "flour", "milk"]);
    }

    #[test]
    fn missing_is_required_minus_union() {
        let available = combine_pantries(["flour", "eggs"], ["milk"]);
        let r = recipe("r", &["Flour", "eggs", "milk", "butter"]);
        assert_eq!(missing_ingredients(&r, &available), vec!["butter"]);
    }

    #[tokio::test]
    async fn pancakes_and_crepes() {
        let caller = located_user(ORIGIN, &["flour", "eggs"]);
        let neighbour = located_user(north_of(ORIGIN, 3.0), &["milk", "sugar"]);
        let source = Arc::new(ScriptedRecipeSource::new(vec![
            recipe("R1", &["flour", "eggs", "milk", "sugar"]),
            recipe("R2", &["flour", "eggs", "milk", "butter"]),
        ]));
        let r = resolver(vec![neighbour.clone()], source, MatchingConfig::default());

        let matches = r
            .resolve(&caller, &[candidate(&neighbour, 3.0)], &CancellationToken::new())
            .await;
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].recipe.recipe_id, "R1");
        assert!(matches[0].missing_ingredients.is_empty());
        assert_eq!(matches[1].missing_ingredients, vec!["butter"]);
        assert!(matches.iter().all(|m| m.other_user_id == neighbour.id));
        assert!(matches.iter().all(|m| m.distance_km == 3.0));
    }

    #[tokio::test]
    async fn resolve_runs_on_a_spawned_task() {
        let caller = located_user(ORIGIN, &["flour", "eggs"]);
        let neighbour = located_user(north_of(ORIGIN, 2.0), &["milk", "sugar"]);
        let source = Arc::new(ScriptedRecipeSource::new(vec![recipe(
            "R1",
            &["flour", "eggs", "milk", "sugar"],
        )]));
        let r = resolver(vec![neighbour.clone()], source, MatchingConfig::default());
        let candidates = vec![candidate(&neighbour, 2.0)];

        let matches = tokio::spawn(async move {
            r.resolve(&caller, &candidates, &CancellationToken::new()).await
        })
        .await
        .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].other_user_id, neighbour.id);
    }

    #[tokio::test]
    async fn small_union_skips_the_source() {
        let caller = located_user(ORIGIN, &["flour"]);
        let neighbour = located_user(north_of(ORIGIN, 1.0), &["flour", "eggs"]);
        let source = Arc::new(ScriptedRecipeSource::new(vec![recipe("R1", &["flour"])]));
        let r = resolver(vec![neighbour.clone()], source.clone(), MatchingConfig::default());

        let matches = r
            .resolve(&caller, &[candidate(&neighbour, 1.0)], &CancellationToken::new())
            .await;
        assert!(matches.is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn one_failing_candidate_does_not_sink_the_rest() {
        let caller = located_user(ORIGIN, &["flour", "eggs"]);
        let poisoned = located_user(north_of(ORIGIN, 1.0), &["milk", "anchovy"]);
        let healthy = located_user(north_of(ORIGIN, 2.0), &["milk", "sugar"]);
        let unknown = located_user(north_of(ORIGIN, 2.5), &["milk", "sugar"]);
        let source = Arc::new(ScriptedRecipeSource {
            fail_on: Some("anchovy".into()),
            ..ScriptedRecipeSource::new(vec![recipe("R1", &["flour", "eggs", "milk", "sugar"])])
        });
        // `unknown` is not in the directory, so its pantry lookup fails
        let r = resolver(
            vec![poisoned.clone(), healthy.clone()],
            source,
            MatchingConfig::default(),
        );

        let matches = r
            .resolve(
                &caller,
                &[
                    candidate(&poisoned, 1.0),
                    candidate(&healthy, 2.0),
                    candidate(&unknown, 2.5),
                ],
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].other_user_id, healthy.id);
    }

    #[tokio::test]
    async fn slow_source_times_out_to_nothing() {
        let caller = located_user(ORIGIN, &["flour", "eggs"]);
        let neighbour = located_user(north_of(ORIGIN, 1.0), &["milk", "sugar"]);
        let source = Arc::new(ScriptedRecipeSource {
            delay: Some(Duration::from_millis(500)),
            ..ScriptedRecipeSource::new(vec![recipe("R1", &["flour", "eggs", "milk", "sugar"])])
        });
        let r = resolver(vec![neighbour.clone()], source, MatchingConfig::default())
            .with_timeout(Duration::from_millis(20));

        let matches = r
            .resolve(&caller, &[candidate(&neighbour, 1.0)], &CancellationToken::new())
            .await;
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_outstanding_lookups() {
        let caller = located_user(ORIGIN, &["flour", "eggs"]);
        let neighbour = located_user(north_of(ORIGIN, 1.0), &["milk", "sugar"]);
        let source = Arc::new(ScriptedRecipeSource {
            delay: Some(Duration::from_secs(5)),
            ..ScriptedRecipeSource::new(vec![recipe("R1", &["flour", "eggs", "milk", "sugar"])])
        });
        let r = resolver(vec![neighbour.clone()], source, MatchingConfig::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let matches = r.resolve(&caller, &[candidate(&neighbour, 1.0)], &cancel).await;
        assert!(matches.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn concurrent_lookups_respect_the_permit_cap() {
        let caller = located_user(ORIGIN, &["flour", "eggs"]);
        let neighbours: Vec<UserProfile> = (0..6)
            .map(|i| located_user(north_of(ORIGIN, 0.5 + i as f64 * 0.1), &["milk", "sugar"]))
            .collect();
        let candidates: Vec<ProximityMatch> = neighbours.iter().map(|n| candidate(n, 1.0)).collect();
        let source = Arc::new(ScriptedRecipeSource {
            delay: Some(Duration::from_millis(30)),
            ..ScriptedRecipeSource::new(vec![recipe("R1", &["flour", "eggs", "milk", "sugar"])])
        });
        let config = MatchingConfig {
            max_concurrent_recipe_queries: 2,
            ..MatchingConfig::default()
        };
        let r = resolver(neighbours, source.clone(), config);

        let cancel = CancellationToken::new();
        let (a, b) = tokio::join!(
            r.resolve(&caller, &candidates, &cancel),
            r.resolve(&caller, &candidates, &cancel)
        );
        assert_eq!(a.len(), 6);
        assert_eq!(b.len(), 6);
        assert_eq!(source.calls(), 12);
        assert!(source.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }
}
