//! Static pages, the not-found fallback and the cache flush endpoint.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use secrecy::ExposeSecret;
use tracing::warn;
use yt_ui::{AboutAuthorTemplate, AboutTechTemplate};

use crate::error::{not_found_page, WebError};
use crate::handlers::render_page;
use crate::session::Visitor;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub async fn about_author(visitor: Visitor) -> Result<Response, WebError> {
    render_page(AboutAuthorTemplate {
        layout: visitor.layout().await?,
    })
}

pub async fn about_tech(visitor: Visitor) -> Result<Response, WebError> {
    render_page(AboutTechTemplate {
        layout: visitor.layout().await?,
    })
}

pub async fn not_found(uri: Uri) -> Response {
    not_found_page(&format!("The page {} does not exist.", uri.path()))
}

/// POST /admin/cache/flush/ with the configured `X-Admin-Token`.
/// Without a configured token the endpoint does not exist.
pub async fn flush_cache(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return not_found(uri).await;
    };
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if presented.is_empty() || presented != expected.expose_secret() {
        warn!("cache flush with a bad admin token");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let dropped = state.cache.flush();
    (StatusCode::OK, format!("flushed {dropped} cached pages\n")).into_response()
}
