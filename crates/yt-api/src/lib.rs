//! # yt-api
//!
//! The web routing and orchestration layer for Yatube.

pub mod accounts;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod session;
pub mod state;

use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_sessions::cookie::SameSite;
use tower_sessions::{MemoryStore, SessionManagerLayer};

pub use error::WebError;
pub use state::AppState;

pub const SESSION_COOKIE: &str = "yatube_session";
/// Largest accepted request body (post illustrations included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Where the router serves files from and how it sets cookies.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub static_dir: PathBuf,
    pub media_root: PathBuf,
    pub media_url_prefix: String,
    pub secure_cookies: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("static"),
            media_root: PathBuf::from("media"),
            media_url_prefix: "/media".to_string(),
            secure_cookies: false,
        }
    }
}

/// Builds the complete application.
pub fn router(state: AppState, options: RouterOptions) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(options.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true);

    let media_prefix = format!("/{}", options.media_url_prefix.trim_matches('/'));

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/group/{slug}/", get(handlers::group_posts))
        .route("/profile/{username}/", get(handlers::profile))
        .route(
            "/profile/{username}/follow/",
            get(handlers::profile_follow).post(handlers::profile_follow_submit),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(handlers::profile_unfollow).post(handlers::profile_unfollow_submit),
        )
        .route("/posts/{post_id}/", get(handlers::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(handlers::post_edit).post(handlers::post_edit_submit),
        )
        .route(
            "/posts/{post_id}/comment/",
            get(handlers::add_comment_redirect).post(handlers::add_comment),
        )
        .route(
            "/create/",
            get(handlers::post_create).post(handlers::post_create_submit),
        )
        .route("/follow/", get(handlers::follow_index))
        .route(
            "/auth/signup/",
            get(accounts::signup).post(accounts::signup_submit),
        )
        .route(
            "/auth/login/",
            get(accounts::login).post(accounts::login_submit),
        )
        .route("/auth/logout/", post(accounts::logout))
        .route("/about/author/", get(pages::about_author))
        .route("/about/tech/", get(pages::about_tech))
        .route("/admin/cache/flush/", post(pages::flush_cache))
        .nest_service("/static", ServeDir::new(options.static_dir))
        .nest_service(&media_prefix, ServeDir::new(options.media_root))
        .fallback(pages::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(session_layer)
        .with_state(state);

    middleware::standard_layers(app)
}
