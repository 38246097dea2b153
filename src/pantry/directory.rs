use async_trait::async_trait;
use uuid::Uuid;

use super::model::{PantryEntry, UserProfile};
use crate::error::MatchError;

/// Read access to the user directory.
///
/// Snapshots may be stale; matches built from them are advisory.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every user that has a location, with pantry, offers and requests.
    async fn list_users_with_location(&self) -> Result<Vec<UserProfile>, MatchError>;

    async fn find_user(&self, user_id: Uuid) -> Result<UserProfile, MatchError>;

    async fn pantry(&self, user_id: Uuid) -> Result<Vec<PantryEntry>, MatchError>;
}

/// Directory backed by a fixed snapshot held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: Vec<UserProfile>,
}

impl InMemoryDirectory {
    pub fn new(users: Vec<UserProfile>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn list_users_with_location(&self) -> Result<Vec<UserProfile>, MatchError> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.location.is_some())
            .cloned()
            .collect())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<UserProfile, MatchError> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| MatchError::NotFound(format!("user {user_id}")))
    }

    async fn pantry(&self, user_id: Uuid) -> Result<Vec<PantryEntry>, MatchError> {
        let user = self.find_user(user_id).await?;
        Ok(user.pantry().cloned().collect())
    }
}
