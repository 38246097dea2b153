use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Offer, PantryEntry, Request};
use crate::error::MatchError;
use crate::geo::Coordinate;

/// Row of `users` as far as matching cares.
#[derive(Debug, Clone, FromRow)]
pub struct UserLocationRow {
    pub id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UserLocationRow {
    /// `Ok(None)` when no location was ever set; half a coordinate is invalid.
    pub fn location(&self) -> Result<Option<Coordinate>, MatchError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                let c = Coordinate::new(lat, lon);
                c.validate()?;
                Ok(Some(c))
            }
            (None, None) => Ok(None),
            _ => Err(MatchError::Validation(format!(
                "user {} has a partial location",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PantryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub category: String,
}

impl From<PantryRow> for PantryEntry {
    fn from(r: PantryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            amount: r.amount,
            unit: r.unit,
            category: r.category,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OfferRow {
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub created_at: OffsetDateTime,
}

impl From<OfferRow> for Offer {
    fn from(r: OfferRow) -> Self {
        Self {
            ingredient_id: r.ingredient_id,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RequestRow {
    pub user_id: Uuid,
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: String,
    pub created_at: OffsetDateTime,
}

impl From<RequestRow> for Request {
    fn from(r: RequestRow) -> Self {
        Self {
            ingredient_name: r.ingredient_name,
            amount: r.amount,
            unit: r.unit,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod row_tests {
    use super::*;

    fn row(lat: Option<f64>, lon: Option<f64>) -> UserLocationRow {
        UserLocationRow {
            id: Uuid::new_v4(),
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn location_from_row() {
        assert_eq!(
            row(Some(10.0), Some(20.0)).location().unwrap(),
            Some(Coordinate::new(10.0, 20.0))
        );
        assert_eq!(row(None, None).location().unwrap(), None);
    }

    #[test]
    fn partial_or_out_of_range_location_is_invalid() {
        assert!(matches!(
            row(Some(10.0), None).location(),
            Err(MatchError::Validation(_))
        ));
        assert!(matches!(
            row(Some(120.0), Some(0.0)).location(),
            Err(MatchError::Validation(_))
        ));
    }
}
