use crate::{
    domain::KeyValueStore,
    errors::SessionError,
    models::{Profile, ProfilePatch},
    repositories::ProfileRepository,
};
use std::sync::Arc;
use tracing::info;

/// Storage key holding the id of the logged-in profile.
pub const SESSION_KEY: &str = "currentProfileId";

/// The "current user" of the board.
///
/// Starts anonymous or, if a stored pointer names an existing profile,
/// authenticated as that profile. Only the pointer is persisted; the profile
/// itself lives in the profile collection.
pub struct ProfileSession {
    store: Arc<dyn KeyValueStore>,
    profiles: ProfileRepository,
    current: Option<Profile>,
}

impl ProfileSession {
    /// Rebuilds the session from the stored pointer.
    pub async fn restore(
        store: Arc<dyn KeyValueStore>,
        profiles: ProfileRepository,
    ) -> Result<Self, SessionError> {
        let current = match store.get(SESSION_KEY).await? {
            Some(id) => {
                let found = profiles.get(&id).await?;
                if found.is_none() {
                    tracing::warn!(profile_id = %id, "Stored session points at an unknown profile, starting anonymous");
                }
                found
            }
            None => None,
        };

        if let Some(profile) = &current {
            info!(profile_id = %profile.id, username = %profile.username, "Session restored");
        }

        Ok(Self {
            store,
            profiles,
            current,
        })
    }

    pub fn current(&self) -> Option<&Profile> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Logs in by case-insensitive username. On failure the session is unchanged.
    pub async fn login(&mut self, username: &str) -> Result<Profile, SessionError> {
        let profile = self
            .profiles
            .find_by_username(username)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(username.trim().to_string()))?;

        self.store.set(SESSION_KEY, profile.id.clone()).await?;
        info!(profile_id = %profile.id, username = %profile.username, "Logged in");
        self.current = Some(profile.clone());
        Ok(profile)
    }

    /// Creates a profile and logs in as it.
    pub async fn register(&mut self, username: &str) -> Result<Profile, SessionError> {
        let profile = self.profiles.add(username).await?;
        self.login(&profile.username).await
    }

    pub async fn logout(&mut self) -> Result<(), SessionError> {
        self.store.remove(SESSION_KEY).await?;
        if let Some(profile) = self.current.take() {
            info!(profile_id = %profile.id, "Logged out");
        }
        Ok(())
    }

    /// Applies `patch` to the logged-in profile and persists it.
    pub async fn update(&mut self, patch: ProfilePatch) -> Result<Profile, SessionError> {
        let id = self
            .current
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or(SessionError::NotAuthenticated)?;

        match self.profiles.update(&id, patch).await? {
            Some(updated) => {
                self.current = Some(updated.clone());
                Ok(updated)
            }
            None => {
                // The record vanished from storage underneath us.
                tracing::warn!(profile_id = %id, "Logged-in profile no longer stored, ending session");
                self.logout().await?;
                Err(SessionError::NotAuthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::SocialLinks, storage::MemoryKeyValueStore};

    fn setup() -> (Arc<dyn KeyValueStore>, ProfileRepository) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let profiles = ProfileRepository::new(store.clone());
        (store, profiles)
    }

    #[tokio::test]
    async fn fresh_session_is_anonymous() {
        let (store, profiles) = setup();
        let session = ProfileSession::restore(store, profiles).await.unwrap();

        assert!(!session.is_authenticated());
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn register_logs_in_and_survives_restore() {
        let (store, profiles) = setup();
        let mut session = ProfileSession::restore(store.clone(), profiles.clone())
            .await
            .unwrap();

        let profile = session.register("Vasya").await.unwrap();
        assert_eq!(session.current(), Some(&profile));

        let reloaded = ProfileSession::restore(store, profiles).await.unwrap();
        assert_eq!(reloaded.current().map(|p| p.id.as_str()), Some(profile.id.as_str()));
    }

    #[tokio::test]
    async fn login_is_case_insensitive() {
        let (store, profiles) = setup();
        profiles.add("Vasya").await.unwrap();
        let mut session = ProfileSession::restore(store, profiles).await.unwrap();

        let profile = session.login("vasya").await.unwrap();
        assert_eq!(profile.username, "Vasya");
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn unknown_login_leaves_session_unchanged() {
        let (store, profiles) = setup();
        let mut session = ProfileSession::restore(store.clone(), profiles).await.unwrap();

        let err = session.login("ghost").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownUser(ref n) if n == "ghost"));
        assert!(!session.is_authenticated());
        assert_eq!(store.get(SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn register_duplicate_username_fails() {
        let (store, profiles) = setup();
        let mut session = ProfileSession::restore(store, profiles).await.unwrap();
        session.register("Vasya").await.unwrap();
        session.logout().await.unwrap();

        let err = session.register("VASYA").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Repo(crate::errors::RepoError::DuplicateUsername(_))
        ));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_pointer_so_restore_is_anonymous() {
        let (store, profiles) = setup();
        let mut session = ProfileSession::restore(store.clone(), profiles.clone())
            .await
            .unwrap();
        session.register("Vasya").await.unwrap();

        session.logout().await.unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(store.get(SESSION_KEY).await.unwrap(), None);

        let reloaded = ProfileSession::restore(store, profiles).await.unwrap();
        assert!(!reloaded.is_authenticated());
    }

    #[tokio::test]
    async fn dangling_pointer_restores_anonymous() {
        let (store, profiles) = setup();
        store.set(SESSION_KEY, "12345".into()).await.unwrap();

        let session = ProfileSession::restore(store, profiles).await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn update_requires_login() {
        let (store, profiles) = setup();
        let mut session = ProfileSession::restore(store, profiles).await.unwrap();

        let err = session.update(ProfilePatch::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));
    }

    #[tokio::test]
    async fn update_persists_patch() {
        let (store, profiles) = setup();
        let mut session = ProfileSession::restore(store, profiles.clone())
            .await
            .unwrap();
        let profile = session.register("Vasya").await.unwrap();

        let updated = session
            .update(ProfilePatch {
                links: Some(SocialLinks {
                    telegram: Some("https://t.me/vasya".into()),
                    ..Default::default()
                }),
                card_number: Some("1234 5678".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.card_number.as_deref(), Some("1234 5678"));
        assert_eq!(session.current(), Some(&updated));
        let stored = profiles.get(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }
}
