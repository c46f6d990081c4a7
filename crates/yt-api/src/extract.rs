//! Extractors whose failures render pages instead of axum's plain-text
//! rejections.

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::request::Parts;
use axum::http::Uri;
use axum::Form;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::WebError;

/// The raw `page` query parameter. When repeated, the last value wins;
/// unreadable query strings count as absent.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageParam(pub Option<String>);

impl PageParam {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// The last value of query parameter `name`.
pub fn last_query_value(uri: &Uri, name: &str) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    pairs
        .into_iter()
        .rev()
        .find_map(|(key, value)| (key == name).then_some(value))
}

impl<S> FromRequestParts<S> for PageParam
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PageParam(last_query_value(&parts.uri, "page")))
    }
}

/// `Form<T>` with rejections rendered as the bad request page.
#[derive(Debug)]
pub struct HtmlForm<T>(pub T);

impl<T, S> FromRequest<S> for HtmlForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(value)) => Ok(HtmlForm(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "form rejected");
                Err(WebError::rejected(rejection.status(), rejection.body_text()))
            }
        }
    }
}

/// `Multipart` with rejections rendered as the bad request page.
pub struct HtmlMultipart(pub Multipart);

impl<S> FromRequest<S> for HtmlMultipart
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Multipart::from_request(req, state).await {
            Ok(multipart) => Ok(HtmlMultipart(multipart)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "multipart body rejected");
                Err(WebError::rejected(rejection.status(), rejection.body_text()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(uri: &str) -> Option<String> {
        last_query_value(&uri.parse().unwrap(), "page")
    }

    #[test]
    fn last_page_value_wins() {
        assert_eq!(page("/"), None);
        assert_eq!(page("/?page=3"), Some("3".into()));
        assert_eq!(page("/?page=1&page=2"), Some("2".into()));
        assert_eq!(page("/?sort=new&page=abc"), Some("abc".into()));
        assert_eq!(page("/?pages=4"), None);
    }
}
