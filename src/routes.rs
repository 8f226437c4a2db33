use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/memes", get(handlers::list_memes).post(handlers::create_meme))
        .route("/memes/{id}", get(handlers::get_meme))
        .route("/memes/{id}/like", post(handlers::like_meme))
        .route("/memes/{id}/donations", post(handlers::donate))
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/session", get(handlers::current_session))
        .route("/session/login", post(handlers::login))
        .route("/session/register", post(handlers::register))
        .route("/session/logout", post(handlers::logout))
        .route("/profile", patch(handlers::update_profile))
        .route("/profile/avatar", post(handlers::upload_avatar))
        .route("/format", post(handlers::format_text))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
