use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::directory::Directory;
use super::model::{Offer, PantryEntry, Request, UserProfile};
use super::repo_types::{OfferRow, PantryRow, RequestRow, UserLocationRow};
use crate::error::MatchError;

/// Postgres-backed directory.
#[derive(Clone)]
pub struct PgDirectory {
    db: PgPool,
}

impl PgDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn pantry_rows(&self, user_ids: &[Uuid]) -> Result<Vec<PantryRow>, MatchError> {
        let rows = sqlx::query_as::<_, PantryRow>(
            r#"
            SELECT id, user_id, name, amount, unit, category
              FROM pantry_items
             WHERE user_id = ANY($1)
             ORDER BY created_at ASC
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn offer_rows(&self, user_ids: &[Uuid]) -> Result<Vec<OfferRow>, MatchError> {
        let rows = sqlx::query_as::<_, OfferRow>(
            r#"
            SELECT user_id, ingredient_id, created_at
              FROM offers
             WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn request_rows(&self, user_ids: &[Uuid]) -> Result<Vec<RequestRow>, MatchError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT user_id, ingredient_name, amount, unit, created_at
              FROM requests
             WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Loads pantry, offers and requests for `users` in three queries.
    async fn assemble(&self, users: Vec<UserLocationRow>) -> Result<Vec<UserProfile>, MatchError> {
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();

        let mut pantries: HashMap<Uuid, Vec<PantryEntry>> = HashMap::new();
        for row in self.pantry_rows(&ids).await? {
            pantries.entry(row.user_id).or_default().push(row.into());
        }
        let mut offers: HashMap<Uuid, Vec<Offer>> = HashMap::new();
        for row in self.offer_rows(&ids).await? {
            offers.entry(row.user_id).or_default().push(row.into());
        }
        let mut requests: HashMap<Uuid, Vec<Request>> = HashMap::new();
        for row in self.request_rows(&ids).await? {
            requests.entry(row.user_id).or_default().push(row.into());
        }

        let mut profiles = Vec::with_capacity(users.len());
        for user in users {
            let location = match user.location() {
                Ok(loc) => loc,
                Err(e) => {
                    warn!(error = %e, user_id = %user.id, "skipping directory record");
                    continue;
                }
            };
            profiles.push(UserProfile::new(
                user.id,
                location,
                pantries.remove(&user.id).unwrap_or_default(),
                offers.remove(&user.id).unwrap_or_default(),
                requests.remove(&user.id).unwrap_or_default(),
            ));
        }
        Ok(profiles)
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn list_users_with_location(&self) -> Result<Vec<UserProfile>, MatchError> {
        let users = sqlx::query_as::<_, UserLocationRow>(
            r#"
            SELECT id, latitude, longitude
              FROM users
             WHERE latitude IS NOT NULL OR longitude IS NOT NULL
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        debug!(count = users.len(), "loaded located users");
        self.assemble(users).await
    }

    async fn find_user(&self, user_id: Uuid) -> Result<UserProfile, MatchError> {
        let user = sqlx::query_as::<_, UserLocationRow>(
            r#"SELECT id, latitude, longitude FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("user {user_id}")))?;

        // a caller with a broken location can still be served; it just matches nobody
        let location = user.location().unwrap_or_else(|e| {
            warn!(error = %e, %user_id, "ignoring caller location");
            None
        });
        let user = UserLocationRow {
            latitude: location.map(|c| c.latitude),
            longitude: location.map(|c| c.longitude),
            ..user
        };
        let mut profiles = self.assemble(vec![user]).await?;
        profiles
            .pop()
            .ok_or_else(|| MatchError::NotFound(format!("user {user_id}")))
    }

    async fn pantry(&self, user_id: Uuid) -> Result<Vec<PantryEntry>, MatchError> {
        let rows = self.pantry_rows(&[user_id]).await?;
        Ok(rows.into_iter().map(PantryEntry::from).collect())
    }
}
