use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stored collection '{key}' is corrupt")]
    DataCorruption {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("Image upload is empty")]
    Empty,

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No profile is logged in")]
    NotAuthenticated,

    #[error("User '{0}' not found")]
    UnknownUser(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Failed to read image: {0}")]
    ImageRead(#[from] ImageError),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),

    // Backend errors (mapped from RepoError/StorageError)
    #[error("Could not access meme data")]
    RepositoryError(#[source] RepoError),
    #[error("Could not perform storage operation")]
    StorageError(#[source] StorageError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::DuplicateCategory(_) | RepoError::DuplicateUsername(_) => {
                AppError::Conflict(err.to_string())
            }
            RepoError::MissingField(field) => AppError::MissingFormField(field.to_string()),
            RepoError::InvalidInput(msg) => AppError::InvalidInput(msg),
            RepoError::Storage(e) => AppError::StorageError(e),
            e @ RepoError::DataCorruption { .. } => AppError::RepositoryError(e),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::StorageError(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotAuthenticated => AppError::Unauthorized(err.to_string()),
            SessionError::UnknownUser(name) => AppError::NotFound(format!("User '{}'", name)),
            SessionError::Repo(e) => e.into(),
            SessionError::Storage(e) => e.into(),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing form field: {}", field),
            ),
            AppError::MultipartError(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart form data: {}", e),
            ),
            AppError::ImageRead(e) => (StatusCode::BAD_REQUEST, format!("Failed to read image: {}", e)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(item) => (StatusCode::NOT_FOUND, format!("{} not found", item)),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Stored data could not be read".to_string(),
                )
            }
            AppError::StorageError(e) => {
                tracing::error!(error.source = ?e, "Storage error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server initialization error".to_string(),
                )
            }
        };

        if status.is_server_error() {
            tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");
        } else {
            tracing::debug!(error.message = %error_message, %status, "Rejecting request");
        }

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_errors_map_to_conflict() {
        let err: AppError = RepoError::DuplicateCategory("Cats".into()).into();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("Cats")));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_field_maps_to_bad_request() {
        let err: AppError = RepoError::MissingField("title").into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn session_errors_map_to_client_statuses() {
        let unauth: AppError = SessionError::NotAuthenticated.into();
        assert_eq!(unauth.into_response().status(), StatusCode::UNAUTHORIZED);

        let unknown: AppError = SessionError::UnknownUser("bob".into()).into();
        assert_eq!(unknown.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failures_are_server_errors() {
        let err: AppError = StorageError::BackendError(anyhow::anyhow!("disk full")).into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
