//! Test fixtures: directory builders and a scripted recipe source.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::MatchError;
use crate::geo::{Coordinate, EARTH_RADIUS_KM};
use crate::pantry::{normalize_name, Offer, PantryEntry, Request, UserProfile};
use crate::recipes::{RecipeCandidate, RecipeMeta, RecipeSource};

pub const ORIGIN: Coordinate = Coordinate::new(52.52, 13.405);

/// Point `km` kilometres due north of `c`.
pub fn north_of(c: Coordinate, km: f64) -> Coordinate {
    let km_per_degree = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
    Coordinate::new(c.latitude + km / km_per_degree, c.longitude)
}

fn entries(names: &[&str]) -> Vec<PantryEntry> {
    names
        .iter()
        .map(|n| PantryEntry::new(n, 1.0, "pcs", "other"))
        .collect()
}

pub fn located_user(at: Coordinate, pantry: &[&str]) -> UserProfile {
    UserProfile::new(Uuid::new_v4(), Some(at), entries(pantry), vec![], vec![])
}

pub fn requesting_user(at: Coordinate, wants: &str) -> UserProfile {
    trader(at, &[], &[], &[wants])
}

pub fn offering_user(at: Coordinate, gives: &str) -> UserProfile {
    trader(at, &[gives], &[gives], &[])
}

/// User holding `pantry`, offering the entries named in `gives` and
/// requesting everything in `wants`.
pub fn trader(at: Coordinate, pantry: &[&str], gives: &[&str], wants: &[&str]) -> UserProfile {
    let pantry = entries(pantry);
    let offers = pantry
        .iter()
        .filter(|e| gives.iter().any(|g| normalize_name(g) == e.name))
        .map(|e| Offer {
            ingredient_id: e.id,
            created_at: OffsetDateTime::now_utc(),
        })
        .collect();
    let requests = wants
        .iter()
        .map(|w| Request {
            ingredient_name: w.to_string(),
            amount: 1.0,
            unit: "kg".into(),
            created_at: OffsetDateTime::now_utc(),
        })
        .collect();
    UserProfile::new(Uuid::new_v4(), Some(at), pantry, offers, requests)
}

/// Catalogue recipe; every ingredient starts out as "missed".
pub fn recipe(id: &str, required: &[&str]) -> RecipeCandidate {
    RecipeCandidate {
        recipe_id: id.into(),
        title: format!("Recipe {id}"),
        used_ingredients: vec![],
        missed_ingredients: required.iter().map(|s| s.to_string()).collect(),
        meta: RecipeMeta::default(),
    }
}

/// Recipe source answering from a fixed catalogue the way a real API would:
/// recipes sharing at least one ingredient, split into used and missed.
#[derive(Default)]
pub struct ScriptedRecipeSource {
    pub catalog: Vec<RecipeCandidate>,
    /// Queries containing this ingredient fail.
    pub fail_on: Option<String>,
    pub delay: Option<Duration>,
    pub substitutes: Vec<(String, Vec<String>)>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl ScriptedRecipeSource {
    pub fn new(catalog: Vec<RecipeCandidate>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeSource for ScriptedRecipeSource {
    async fn find_by_ingredients(
        &self,
        ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeCandidate>, MatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let have: BTreeSet<String> = ingredients.iter().map(|i| normalize_name(i)).collect();
        if let Some(bad) = &self.fail_on {
            if have.contains(bad) {
                return Err(MatchError::recipe_source("scripted failure"));
            }
        }

        Ok(self
            .catalog
            .iter()
            .filter_map(|r| {
                let required = r.required_ingredients();
                let (used, missed): (Vec<String>, Vec<String>) =
                    required.into_iter().partition(|n| have.contains(n));
                (!used.is_empty()).then(|| RecipeCandidate {
                    used_ingredients: used,
                    missed_ingredients: missed,
                    ..r.clone()
                })
            })
            .take(count)
            .collect())
    }

    async fn substitutes(&self, ingredient: &str) -> Result<Vec<String>, MatchError> {
        Ok(self
            .substitutes
            .iter()
            .find(|(name, _)| name == ingredient)
            .map(|(_, subs)| subs.clone())
            .unwrap_or_default())
    }
}
