pub mod config;
pub mod domain;
pub mod errors;
pub mod format;
pub mod handlers;
pub mod images;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod startup;
pub mod storage;

use crate::{
    domain::KeyValueStore,
    errors::AppError,
    format::TextFormatter,
    repositories::{CategoryRepository, MemeRepository, ProfileRepository},
    session::ProfileSession,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// AppState holds the repositories and the board's single session.
pub struct AppState {
    pub memes: MemeRepository,
    pub categories: CategoryRepository,
    pub profiles: ProfileRepository,
    pub session: Mutex<ProfileSession>,
    pub formatter: TextFormatter,
}

impl AppState {
    /// Wires every repository onto `store` and restores the stored session.
    pub async fn new(store: Arc<dyn KeyValueStore>) -> Result<Self, AppError> {
        let categories = CategoryRepository::new(store.clone());
        let memes = MemeRepository::new(store.clone(), categories.clone());
        let profiles = ProfileRepository::new(store.clone());
        let session = ProfileSession::restore(store, profiles.clone()).await?;
        let formatter = TextFormatter::new()
            .map_err(|e| AppError::InitError(format!("Failed to compile text formatter: {}", e)))?;

        Ok(Self {
            memes,
            categories,
            profiles,
            session: Mutex::new(session),
            formatter,
        })
    }
}
