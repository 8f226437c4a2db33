use crate::{
    errors::AppError,
    images::read_image,
    models::{NewMeme, Profile, ProfilePatch},
    AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing;

#[derive(Deserialize, Debug, Default)]
pub struct MemeFilter {
    pub category: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DonationRequest {
    pub amount: f64,
}

#[derive(Deserialize, Debug)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Deserialize, Debug)]
pub struct FormatRequest {
    pub text: String,
}

#[derive(Serialize, Debug)]
pub struct FormatResponse {
    pub html: String,
}

/// An image field pulled out of a multipart form.
struct UploadedImage {
    data: Vec<u8>,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl UploadedImage {
    fn into_data_url(self) -> Result<String, AppError> {
        Ok(read_image(
            &self.data,
            self.file_name.as_deref(),
            self.content_type.as_deref(),
        )?)
    }
}

// --- Memes ---

/// Handler for GET /memes
pub async fn list_memes(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MemeFilter>,
) -> Result<impl IntoResponse, AppError> {
    let memes = match filter.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => state.memes.list_by_category(category).await?,
        None => state.memes.list().await?,
    };
    tracing::debug!(count = memes.len(), category = ?filter.category, "Listed memes");
    Ok(Json(memes))
}

/// Handler for POST /memes (multipart form).
///
/// The image comes either as an `image` file field or as an `image_url` text field.
pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut new_meme = NewMeme::default();
    let mut image_url: Option<String> = None;
    let mut upload: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "title" => new_meme.title = field.text().await?,
            "description" => new_meme.description = Some(field.text().await?),
            "category" => new_meme.category = field.text().await?,
            "author" => new_meme.author = field.text().await?,
            "image_url" => image_url = Some(field.text().await?),
            "image" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await?.to_vec();
                // An untouched file input still sends an empty part.
                if data.is_empty() {
                    tracing::debug!("Ignoring empty image part");
                    continue;
                }
                upload = Some(UploadedImage {
                    data,
                    file_name,
                    content_type,
                });
            }
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    new_meme.image = match (upload, image_url) {
        (Some(upload), _) => upload.into_data_url()?,
        (None, Some(url)) => url,
        (None, None) => return Err(AppError::MissingFormField("image".to_string())),
    };

    if let Some(profile) = state.session.lock().await.current() {
        new_meme.author_id = Some(profile.id.clone());
        if new_meme.author.trim().is_empty() {
            new_meme.author = profile.username.clone();
        }
    }

    let meme = state.memes.add(new_meme).await?;
    tracing::info!(meme_id = %meme.id, "Meme created via handler");
    Ok((StatusCode::CREATED, Json(meme)))
}

/// Handler for GET /memes/{id}
pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meme = state
        .memes
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meme with id {}", id)))?;
    Ok(Json(meme))
}

/// Handler for POST /memes/{id}/like
pub async fn like_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meme = state
        .memes
        .increment_like(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meme with id {}", id)))?;
    Ok(Json(meme))
}

/// Handler for POST /memes/{id}/donations
pub async fn donate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<DonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meme = state
        .memes
        .add_donation(&id, request.amount)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meme with id {}", id)))?;
    tracing::info!(meme_id = %id, amount = request.amount, total = meme.donations, "Donation recorded");
    Ok(Json(meme))
}

// --- Categories ---

/// Handler for GET /categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let memes = state.memes.list().await?;
    let summaries = state.categories.summaries(&memes).await?;
    Ok(Json(summaries))
}

/// Handler for POST /categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.categories.add(&request.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// --- Session & profile ---

/// Handler for GET /session
pub async fn current_session(
    State(state): State<Arc<AppState>>,
) -> Json<Option<Profile>> {
    Json(state.session.lock().await.current().cloned())
}

/// Handler for POST /session/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UsernameRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.username.trim().is_empty() {
        return Err(AppError::MissingFormField("username".to_string()));
    }
    let profile = state.session.lock().await.login(&request.username).await?;
    Ok(Json(profile))
}

/// Handler for POST /session/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UsernameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.session.lock().await.register(&request.username).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handler for POST /session/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state.session.lock().await.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PATCH /profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ProfilePatch>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.session.lock().await.update(patch).await?;
    Ok(Json(profile))
}

/// Handler for POST /profile/avatar (multipart form with an `image` field).
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    if !state.session.lock().await.is_authenticated() {
        return Err(AppError::Unauthorized("Log in to change your avatar".to_string()));
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|m| m.to_string());
        let data = field.bytes().await?.to_vec();
        upload = Some(UploadedImage {
            data,
            file_name,
            content_type,
        });
    }

    let avatar = upload
        .ok_or_else(|| AppError::MissingFormField("image".to_string()))?
        .into_data_url()?;

    let profile = state
        .session
        .lock()
        .await
        .update(ProfilePatch {
            avatar: Some(avatar),
            ..Default::default()
        })
        .await?;
    tracing::info!(profile_id = %profile.id, "Avatar updated");
    Ok(Json(profile))
}

// --- Formatting ---

/// Handler for POST /format
pub async fn format_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FormatRequest>,
) -> Json<FormatResponse> {
    Json(FormatResponse {
        html: state.formatter.to_html(&request.text),
    })
}
