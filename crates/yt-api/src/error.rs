//! # WebError
//!
//! Turns domain errors into HTTP responses.

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, warn};
use yt_core::error::AppError;
use yt_ui::{BadRequestTemplate, CsrfFailureTemplate, Layout, NotFoundTemplate};

pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Debug)]
pub enum WebError {
    App(AppError),
    /// Anonymous request to a page that needs an account
    LoginRequired { next: String },
    /// Request body or headers the handler could not read
    Rejected { status: StatusCode, detail: String },
}

impl WebError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        WebError::App(AppError::Internal(err.into()))
    }

    pub fn rejected(status: StatusCode, detail: impl Into<String>) -> Self {
        WebError::Rejected {
            status,
            detail: detail.into(),
        }
    }

    pub fn csrf() -> Self {
        WebError::App(AppError::Forbidden("CSRF token missing or incorrect".into()))
    }
}

impl From<AppError> for WebError {
    fn from(err: AppError) -> Self {
        WebError::App(err)
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        WebError::App(AppError::from_adapter(err))
    }
}

impl From<askama::Error> for WebError {
    fn from(err: askama::Error) -> Self {
        WebError::internal(anyhow::anyhow!("template rendering failed: {err}"))
    }
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// The login page, returning to `next` afterwards.
pub fn login_url(next: &str) -> String {
    format!(
        "{LOGIN_URL}?next={}",
        urlencoding::encode(next).replace("%2F", "/")
    )
}

/// Renders the 404 page with an anonymous header.
pub fn not_found_page(detail: &str) -> Response {
    let page = NotFoundTemplate {
        layout: anonymous_layout(),
        detail,
    };
    match page.render() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(err) => WebError::from(err).into_response(),
    }
}

// Error pages are rendered outside the session, so the header shows the
// anonymous navigation and carries no form token.
fn anonymous_layout() -> Layout<'static> {
    Layout {
        user: None,
        csrf_token: String::new(),
    }
}

fn bad_request_page(status: StatusCode, detail: &str) -> Response {
    let page = BadRequestTemplate {
        layout: anonymous_layout(),
        detail,
    };
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => WebError::from(err).into_response(),
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::LoginRequired { next } => found(&login_url(&next)),
            WebError::Rejected { status, detail } => bad_request_page(status, &detail),
            WebError::App(err) => match err {
                AppError::NotFound(..) => not_found_page(&err.to_string()),
                AppError::AuthenticationRequired => found(LOGIN_URL),
                AppError::AuthorizationDenied(post_id) => found(&format!("/posts/{post_id}/")),
                AppError::Forbidden(reason) => {
                    warn!(%reason, "request forbidden");
                    let page = CsrfFailureTemplate {
                        layout: anonymous_layout(),
                    };
                    match page.render() {
                        Ok(html) => (StatusCode::FORBIDDEN, Html(html)).into_response(),
                        Err(err) => {
                            error!(error = %err, "failed to render the forbidden page");
                            internal_error()
                        }
                    }
                }
                AppError::Conflict(what) => {
                    bad_request_page(StatusCode::CONFLICT, &format!("{what} already exists."))
                }
                AppError::Internal(err) => {
                    error!(error = ?err, "request failed");
                    internal_error()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_keeps_slashes() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url("/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn denied_edit_redirects_to_post() {
        let response = WebError::from(AppError::AuthorizationDenied(7)).into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/posts/7/");
    }

    #[test]
    fn not_found_renders_page() {
        let response =
            WebError::from(AppError::NotFound("group", "cats".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn adapter_errors_keep_their_kind() {
        let raised = anyhow::Error::from(AppError::NotFound("post", "9".into()));
        let response = WebError::from(raised).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = WebError::from(anyhow::anyhow!("disk full")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rejections_render_a_page_with_their_status() {
        let response =
            WebError::rejected(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a form").into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }
}
