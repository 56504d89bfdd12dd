use std::sync::Arc;

use crate::database::storage::{KeyValueStore, PROFILE_KEY};
use crate::error::Result;
use crate::models::profile::UserProfile;

#[derive(Clone)]
pub struct ProfileService {
    storage: Arc<dyn KeyValueStore>,
}

impl ProfileService {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Empty profile when nothing (or nothing readable) is stored.
    pub async fn get(&self) -> UserProfile {
        let stored = match self.storage.get(PROFILE_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load user profile");
                return UserProfile::default();
            }
        };
        match stored.map(serde_json::from_value::<UserProfile>) {
            Some(Ok(profile)) => profile,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Stored user profile is unreadable, using an empty one");
                UserProfile::default()
            }
            None => UserProfile::default(),
        }
    }

    pub async fn save(&self, profile: UserProfile) -> Result<UserProfile> {
        self.storage
            .set(PROFILE_KEY, serde_json::to_value(&profile)?)
            .await?;
        tracing::info!("User profile saved");
        Ok(profile)
    }
}
