use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::geo::distance_km;
use crate::pantry::{PantryEntry, UserProfile};

/// Which side of the exchange the caller is on, from the caller's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Caller offers, neighbour requested it.
    Offer,
    /// Caller requests, neighbour offers it.
    Request,
}

/// What the caller is looking for a counterpart to.
#[derive(Debug, Clone)]
pub enum MatchTarget {
    /// An entry of the caller's own pantry they want to give away.
    Offering(PantryEntry),
    /// An ingredient name the caller wants.
    Requesting(String),
    /// Everyone in range; used as the pool for recipe combination.
    Pool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityMatch {
    pub other_user_id: Uuid,
    pub distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
}

/// Scans `directory` for users within `max_distance_km` of `caller` who
/// complement `target`, nearest first.
///
/// Entries that are the caller, have no location, or have an invalid
/// location are skipped. Equal distances keep snapshot order.
pub fn find_nearby(
    caller: &UserProfile,
    directory: &[UserProfile],
    target: &MatchTarget,
    max_distance_km: f64,
) -> Vec<ProximityMatch> {
    let Some(origin) = caller.location else {
        debug!(user_id = %caller.id, "caller has no location");
        return Vec::new();
    };
    if let Err(e) = origin.validate() {
        warn!(error = %e, user_id = %caller.id, "caller location invalid");
        return Vec::new();
    }

    let mut matches = Vec::new();
    for other in directory {
        if other.id == caller.id {
            continue;
        }
        let Some(location) = other.location else {
            continue;
        };
        if let Err(e) = location.validate() {
            warn!(error = %e, user_id = %other.id, "skipping directory entry");
            continue;
        }

        let distance = distance_km(origin, location);
        if distance > max_distance_km {
            continue;
        }

        let (ingredient_name, match_type) = match target {
            MatchTarget::Offering(entry) => {
                if !other.has_requested(&entry.name) {
                    continue;
                }
                (Some(entry.name.clone()), Some(MatchType::Offer))
            }
            MatchTarget::Requesting(name) => {
                if other.offered_entry(name).is_none() {
                    continue;
                }
                (Some(name.clone()), Some(MatchType::Request))
            }
            MatchTarget::Pool => (None, None),
        };

        matches.push(ProximityMatch {
            other_user_id: other.id,
            distance_km: distance,
            ingredient_name,
            match_type,
        });
    }

    matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    matches
}
