use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::geo::Coordinate;

/// Ingredient names are compared case-insensitively everywhere.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One ingredient a user holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryEntry {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub category: String,
}

impl PantryEntry {
    pub fn new(name: &str, amount: f64, unit: &str, category: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: normalize_name(name),
            amount,
            unit: unit.to_string(),
            category: category.to_string(),
        }
    }
}

/// A pantry entry made available to neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub ingredient_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An ingredient a user is looking for, independent of their pantry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Directory snapshot of one user: location, pantry, offers and requests.
///
/// Pantry and requests are keyed by normalised ingredient name and offers by
/// the pantry entry they reference, so complement checks are map lookups.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub id: Uuid,
    pub location: Option<Coordinate>,
    pantry: BTreeMap<String, PantryEntry>,
    offers: BTreeMap<Uuid, Offer>,
    requests: BTreeMap<String, Request>,
}

impl UserProfile {
    /// Builds the indexes. Offers pointing at a pantry entry the user no
    /// longer holds are dropped; duplicate names keep the last entry.
    pub fn new(
        id: Uuid,
        location: Option<Coordinate>,
        pantry: Vec<PantryEntry>,
        offers: Vec<Offer>,
        requests: Vec<Request>,
    ) -> Self {
        let pantry: BTreeMap<String, PantryEntry> = pantry
            .into_iter()
            .map(|mut e| {
                e.name = normalize_name(&e.name);
                (e.name.clone(), e)
            })
            .collect();

        let held: BTreeSet<Uuid> = pantry.values().map(|e| e.id).collect();
        let offers = offers
            .into_iter()
            .filter(|o| held.contains(&o.ingredient_id))
            .map(|o| (o.ingredient_id, o))
            .collect();

        let requests = requests
            .into_iter()
            .map(|r| (normalize_name(&r.ingredient_name), r))
            .collect();

        Self {
            id,
            location,
            pantry,
            offers,
            requests,
        }
    }

    pub fn pantry(&self) -> impl Iterator<Item = &PantryEntry> {
        self.pantry.values()
    }

    /// Normalised pantry ingredient names, sorted.
    pub fn pantry_names(&self) -> impl Iterator<Item = &str> {
        self.pantry.keys().map(String::as_str)
    }

    pub fn pantry_entry(&self, name: &str) -> Option<&PantryEntry> {
        self.pantry.get(&normalize_name(name))
    }

    pub fn pantry_entry_by_id(&self, id: Uuid) -> Option<&PantryEntry> {
        self.pantry.values().find(|e| e.id == id)
    }

    pub fn offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.values()
    }

    /// Normalised names of every open request, sorted.
    pub fn requested_names(&self) -> impl Iterator<Item = &str> {
        self.requests.keys().map(String::as_str)
    }

    pub fn has_requested(&self, name: &str) -> bool {
        self.requests.contains_key(&normalize_name(name))
    }

    /// The pantry entry named `name`, only if it is currently offered.
    pub fn offered_entry(&self, name: &str) -> Option<&PantryEntry> {
        self.pantry_entry(name)
            .filter(|entry| self.offers.contains_key(&entry.id))
    }
}
