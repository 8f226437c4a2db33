use crate::{
    domain::KeyValueStore,
    errors::RepoError,
    models::{Category, CategorySummary, Meme, NewMeme, Profile, ProfilePatch},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::Mutex;
use tracing::{self, info};

pub const MEMES_KEY: &str = "mpomeme_memes";
pub const CATEGORIES_KEY: &str = "mpomeme_categories";
pub const PROFILES_KEY: &str = "mpomeme_profiles";

pub const DEFAULT_CATEGORY_ID: &str = "random";
pub const DEFAULT_CATEGORY_NAME: &str = "Random";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Picks a fresh id for a collection: the current timestamp, bumped past the
/// largest numeric id already present so ids stay unique and ordered.
fn next_id<'a>(
    now: i64,
    existing: impl IntoIterator<Item = &'a str>,
) -> Result<String, RepoError> {
    let max_existing = existing
        .into_iter()
        .filter_map(|id| id.parse::<i64>().ok())
        .max();
    match max_existing {
        Some(max) if max >= now => max
            .checked_add(1)
            .map(|id| id.to_string())
            .ok_or_else(|| RepoError::InvalidInput(format!("no id left after stored id {}", max))),
        _ => Ok(now.to_string()),
    }
}

async fn load_collection<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &'static str,
) -> Result<Option<Vec<T>>, RepoError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|source| {
            tracing::error!(%key, error = %source, "Stored collection failed to parse");
            RepoError::DataCorruption { key, source }
        }),
        None => Ok(None),
    }
}

async fn save_collection<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &'static str,
    items: &[T],
) -> Result<(), RepoError> {
    let raw = serde_json::to_string(items).map_err(|source| RepoError::DataCorruption { key, source })?;
    store.set(key, raw).await?;
    tracing::debug!(%key, count = items.len(), "Persisted collection");
    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<String, RepoError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepoError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

// --- Categories ---

#[derive(Clone)]
pub struct CategoryRepository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl CategoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        info!(key = CATEGORIES_KEY, "Initializing CategoryRepository");
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Lists categories in creation order. A board that never stored any
    /// categories has the single built-in default.
    pub async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let stored = load_collection(self.store.as_ref(), CATEGORIES_KEY).await?;
        Ok(stored.unwrap_or_else(|| {
            vec![Category {
                id: DEFAULT_CATEGORY_ID.to_string(),
                name: DEFAULT_CATEGORY_NAME.to_string(),
                created_at: now_millis(),
            }]
        }))
    }

    /// Appends a new category. Names are unique ignoring case.
    pub async fn add(&self, name: &str) -> Result<Category, RepoError> {
        let name = require(name, "name")?;

        let _guard = self.write_lock.lock().await;
        let mut categories = self.list().await?;

        let lowered = name.to_lowercase();
        if categories.iter().any(|c| c.name.to_lowercase() == lowered) {
            tracing::debug!(%name, "Rejecting duplicate category");
            return Err(RepoError::DuplicateCategory(name));
        }

        let now = now_millis();
        let category = Category {
            id: next_id(now, categories.iter().map(|c| c.id.as_str()))?,
            name,
            created_at: now,
        };
        categories.push(category.clone());
        save_collection(self.store.as_ref(), CATEGORIES_KEY, &categories).await?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Pairs every category with the number of `memes` filed under it.
    pub async fn summaries(&self, memes: &[Meme]) -> Result<Vec<CategorySummary>, RepoError> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for meme in memes {
            *counts.entry(meme.category.as_str()).or_default() += 1;
        }

        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|category| {
                let meme_count = counts.get(category.id.as_str()).copied().unwrap_or(0);
                CategorySummary {
                    category,
                    meme_count,
                }
            })
            .collect())
    }
}

// --- Memes ---

#[derive(Clone)]
pub struct MemeRepository {
    store: Arc<dyn KeyValueStore>,
    categories: CategoryRepository,
    write_lock: Arc<Mutex<()>>,
}

impl MemeRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, categories: CategoryRepository) -> Self {
        info!(key = MEMES_KEY, "Initializing MemeRepository");
        Self {
            store,
            categories,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Lists memes, newest first.
    pub async fn list(&self) -> Result<Vec<Meme>, RepoError> {
        Ok(load_collection(self.store.as_ref(), MEMES_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn list_by_category(&self, category_id: &str) -> Result<Vec<Meme>, RepoError> {
        let mut memes = self.list().await?;
        memes.retain(|m| m.category == category_id);
        Ok(memes)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Meme>, RepoError> {
        Ok(self.list().await?.into_iter().find(|m| m.id == id))
    }

    /// Stores a new meme at the front of the feed.
    ///
    /// Title and image are required. A blank author is stored as
    /// [`ANONYMOUS_AUTHOR`] and a blank category falls back to the first category.
    pub async fn add(&self, new_meme: NewMeme) -> Result<Meme, RepoError> {
        let title = require(&new_meme.title, "title")?;
        let image = require(&new_meme.image, "image")?;

        let category = match new_meme.category.trim() {
            "" => self
                .categories
                .list()
                .await?
                .into_iter()
                .next()
                .map(|c| c.id)
                .unwrap_or_default(),
            id => id.to_string(),
        };
        let author = match new_meme.author.trim() {
            "" => ANONYMOUS_AUTHOR.to_string(),
            name => name.to_string(),
        };
        let description = new_meme
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let _guard = self.write_lock.lock().await;
        let mut memes = self.list().await?;

        let now = now_millis();
        let meme = Meme {
            id: next_id(now, memes.iter().map(|m| m.id.as_str()))?,
            title,
            image,
            category,
            author,
            author_id: new_meme.author_id,
            description,
            created_at: now,
            likes: 0,
            donations: 0.0,
        };
        memes.insert(0, meme.clone());
        save_collection(self.store.as_ref(), MEMES_KEY, &memes).await?;

        info!(meme_id = %meme.id, category = %meme.category, "Meme created");
        Ok(meme)
    }

    /// Adds one like. Returns `Ok(None)` and writes nothing if `id` is unknown.
    pub async fn increment_like(&self, id: &str) -> Result<Option<Meme>, RepoError> {
        self.update_one(id, |meme| meme.likes += 1).await
    }

    /// Records a donation against a meme. Unknown ids are a no-op like
    /// [`MemeRepository::increment_like`].
    pub async fn add_donation(&self, id: &str, amount: f64) -> Result<Option<Meme>, RepoError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RepoError::InvalidInput(format!(
                "donation amount must be a positive number, got {}",
                amount
            )));
        }
        self.update_one(id, |meme| meme.donations += amount).await
    }

    async fn update_one(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Meme),
    ) -> Result<Option<Meme>, RepoError> {
        let _guard = self.write_lock.lock().await;
        let mut memes = self.list().await?;

        let Some(meme) = memes.iter_mut().find(|m| m.id == id) else {
            tracing::debug!(meme_id = %id, "No meme to update");
            return Ok(None);
        };
        mutate(meme);
        let updated = meme.clone();

        save_collection(self.store.as_ref(), MEMES_KEY, &memes).await?;
        tracing::debug!(meme_id = %id, likes = updated.likes, donations = updated.donations, "Meme updated");
        Ok(Some(updated))
    }
}

// --- Profiles ---

#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        info!(key = PROFILES_KEY, "Initializing ProfileRepository");
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list(&self) -> Result<Vec<Profile>, RepoError> {
        Ok(load_collection(self.store.as_ref(), PROFILES_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Profile>, RepoError> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    /// Case-insensitive username lookup.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError> {
        let wanted = username.trim().to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|p| p.username.to_lowercase() == wanted))
    }

    /// Registers a new profile. Usernames are unique ignoring case.
    pub async fn add(&self, username: &str) -> Result<Profile, RepoError> {
        let username = require(username, "username")?;

        let _guard = self.write_lock.lock().await;
        let mut profiles = self.list().await?;

        let lowered = username.to_lowercase();
        if profiles.iter().any(|p| p.username.to_lowercase() == lowered) {
            tracing::debug!(%username, "Rejecting duplicate username");
            return Err(RepoError::DuplicateUsername(username));
        }

        let now = now_millis();
        let profile = Profile {
            id: next_id(now, profiles.iter().map(|p| p.id.as_str()))?,
            username,
            avatar: None,
            links: Default::default(),
            card_number: None,
            created_at: now,
        };
        profiles.push(profile.clone());
        save_collection(self.store.as_ref(), PROFILES_KEY, &profiles).await?;

        info!(profile_id = %profile.id, username = %profile.username, "Profile registered");
        Ok(profile)
    }

    /// Applies `patch` to the profile with `id`. Returns `Ok(None)` if no such profile.
    pub async fn update(&self, id: &str, patch: ProfilePatch) -> Result<Option<Profile>, RepoError> {
        let _guard = self.write_lock.lock().await;
        let mut profiles = self.list().await?;

        let Some(profile) = profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        patch.apply(profile);
        let updated = profile.clone();

        save_collection(self.store.as_ref(), PROFILES_KEY, &profiles).await?;
        tracing::debug!(profile_id = %id, "Profile updated");
        Ok(Some(updated))
    }
}
