//! Router harness: drives the axum app with `oneshot`, carrying the session
//! cookie between requests like a browser would.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use tempfile::TempDir;
use tower::ServiceExt;
use yt_api::{AppState, RouterOptions};
use yt_auth_simple::Argon2AuthProvider;
use yt_core::cache::ResponseCache;
use yt_core::feed::PageSizes;
use yt_core::models::{Group, NewGroup};
use yt_core::traits::ContentRepo;
use yt_db_sqlite::SqliteRepo;
use yt_storage_local::LocalMediaStore;

pub const PASSWORD: &str = "correct-horse-battery";
const BOUNDARY: &str = "yatube-test-boundary";

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

pub struct TestApp {
    router: Router,
    pub repo: Arc<SqliteRepo>,
    pub cache: ResponseCache,
    pub media_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_admin_token(token: &str) -> Self {
        Self::build(Some(SecretString::from(token.to_string()))).await
    }

    async fn build(admin_token: Option<SecretString>) -> Self {
        let repo = Arc::new(SqliteRepo::in_memory().await.unwrap());
        let media_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(LocalMediaStore::new(media_dir.path().to_path_buf(), "/media"));
        let auth = Arc::new(Argon2AuthProvider::new(8, 1, 1).unwrap());
        let cache = ResponseCache::default();
        let state = AppState::new(repo.clone(), media, auth, PageSizes::default(), cache.clone())
            .with_admin_token(admin_token);
        let router = yt_api::router(
            state,
            RouterOptions {
                static_dir: media_dir.path().join("static"),
                media_root: media_dir.path().to_path_buf(),
                media_url_prefix: "/media".to_string(),
                secure_cookies: false,
            },
        );
        Self {
            router,
            repo,
            cache,
            media_dir,
        }
    }

    pub fn client(&self) -> Client<'_> {
        Client {
            app: self,
            cookie: None,
        }
    }

    /// A client that has signed up (and so is logged in) as `username`.
    pub async fn user(&self, username: &str) -> Client<'_> {
        let mut client = self.client();
        let response = client
            .post_form(
                "/auth/signup/",
                &[
                    ("username", username),
                    ("password1", PASSWORD),
                    ("password2", PASSWORD),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::FOUND, "{}", response.body);
        client
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.repo
            .create_group(NewGroup {
                title: format!("Group {slug}"),
                slug: slug.to_string(),
                description: format!("All about {slug}"),
            })
            .await
            .unwrap()
    }

    pub async fn flush_with_token(&self, token: &str) -> TestResponse {
        let request = Request::post("/admin/cache/flush/")
            .header("x-admin-token", token)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::FOUND, "{}", self.body);
        assert_eq!(self.location(), Some(to));
    }

    pub fn csrf_token(&self) -> Option<String> {
        let marker = r#"name="csrf-token" content=""#;
        let start = self.body.find(marker)? + marker.len();
        let end = self.body[start..].find('"')? + start;
        Some(self.body[start..end].to_string())
    }
}

pub struct Client<'a> {
    app: &'a TestApp,
    cookie: Option<String>,
}

impl Client<'_> {
    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let response = self.app.send(builder.body(body).unwrap()).await;
        if let Some(set_cookie) = response
            .headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().trim();
            self.cookie = if set_cookie.contains("Max-Age=0") {
                None
            } else {
                Some(pair.to_string())
            };
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri), Body::empty()).await
    }

    /// Fetches a page to obtain the session's CSRF token.
    pub async fn csrf_token(&mut self) -> String {
        self.get("/about/tech/")
            .await
            .csrf_token()
            .expect("page carries a csrf token")
    }

    /// Urlencoded POST with this session's CSRF token added.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let token = self.csrf_token().await;
        let mut all = vec![("csrf_token", token.as_str())];
        all.extend_from_slice(fields);
        self.post_form_raw(uri, &all).await
    }

    /// Urlencoded POST exactly as given.
    pub async fn post_form_raw(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    /// POST of an arbitrary body under `content_type`.
    pub async fn post_body(&mut self, uri: &str, content_type: &str, body: &str) -> TestResponse {
        self.send(
            Request::post(uri).header(header::CONTENT_TYPE, content_type),
            Body::from(body.to_string()),
        )
        .await
    }

    /// Multipart POST with this session's CSRF token added.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
    ) -> TestResponse {
        let token = self.csrf_token().await;
        let mut body = Vec::new();
        let push_text = |body: &mut Vec<u8>, name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        push_text(&mut body, "csrf_token", &token);
        for (name, value) in fields {
            push_text(&mut body, name, value);
        }
        if let Some((filename, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Request::post(uri).header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ),
            Body::from(body),
        )
        .await
    }
}
