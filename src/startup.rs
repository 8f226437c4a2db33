use crate::{errors::AppError, AppState};
use std::path::Path;
use tracing;

/// Creates the data directory if it doesn't exist.
pub async fn init_data_dir(data_dir: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
        let context = format!("Startup: Failed to create data directory '{}'", data_dir.display());
        tracing::error!("{}: {}", context, e);
        AppError::InitError(format!("{}: {}", context, e))
    })?;
    tracing::info!(data_dir = %data_dir.display(), "Startup: Data directory ready.");
    Ok(())
}

/// Reads every collection once so a corrupt store fails startup instead of the
/// first request, and logs what the board holds.
pub async fn report_collections(state: &AppState) -> Result<(), AppError> {
    let memes = state.memes.list().await?;
    let categories = state.categories.list().await?;
    let profiles = state.profiles.list().await?;
    let session_user = state
        .session
        .lock()
        .await
        .current()
        .map(|p| p.username.clone());

    tracing::info!(
        memes = memes.len(),
        categories = categories.len(),
        profiles = profiles.len(),
        session = ?session_user,
        "Startup: Collections loaded."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::KeyValueStore, repositories::MEMES_KEY, storage::FileKeyValueStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn init_data_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        init_data_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        // Idempotent on an existing directory.
        init_data_dir(&nested).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_store_fails_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileKeyValueStore::new(dir.path()));
        store.set(MEMES_KEY, "oops".into()).await.unwrap();

        let state = AppState::new(store).await.unwrap();
        assert!(matches!(
            report_collections(&state).await,
            Err(AppError::RepositoryError(_))
        ));
    }
}
