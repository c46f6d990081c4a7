//! # Sessions and CSRF
//!
//! The acting identity is the user id stored in the `tower-sessions` session.
//! Every session also carries one CSRF token; rendered forms embed it and
//! every POST must send it back.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;
use yt_core::models::{Actor, User, UserId};
use yt_ui::Layout;

use crate::error::WebError;
use crate::state::AppState;

pub const USER_ID_KEY: &str = "user_id";
pub const CSRF_TOKEN_KEY: &str = "csrf_token";

fn session_error(err: tower_sessions::session::Error) -> WebError {
    WebError::internal(anyhow::anyhow!("session store: {err}"))
}

/// The requester: who they are and their session.
pub struct Visitor {
    pub actor: Actor,
    pub session: Session,
}

impl Visitor {
    /// Header state for a full page render.
    pub async fn layout(&self) -> Result<Layout<'_>, WebError> {
        Ok(Layout {
            user: self.actor.user(),
            csrf_token: csrf_token(&self.session).await?,
        })
    }

    pub async fn verify_csrf(&self, submitted: &str) -> Result<(), WebError> {
        verify_csrf(&self.session, submitted).await
    }

    /// Starts an authenticated session for `user` under a fresh session id.
    pub async fn log_in(&self, user: &User) -> Result<(), WebError> {
        self.session.cycle_id().await.map_err(session_error)?;
        self.session
            .insert(USER_ID_KEY, user.id)
            .await
            .map_err(session_error)
    }

    pub async fn log_out(&self) -> Result<(), WebError> {
        self.session.flush().await.map_err(session_error)
    }
}

impl<S> FromRequestParts<S> for Visitor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| WebError::internal(anyhow::anyhow!(msg)))?;
        let state = AppState::from_ref(state);

        let user_id: Option<UserId> = session.get(USER_ID_KEY).await.map_err(session_error)?;
        let actor = match user_id {
            Some(id) => match state.users.get_user(id).await? {
                Some(user) => Actor::User(user),
                None => {
                    debug!(user_id = id, "session refers to a deleted user");
                    Actor::Anonymous
                }
            },
            None => Actor::Anonymous,
        };
        Ok(Visitor { actor, session })
    }
}

/// A `Visitor` known to be logged in. Anonymous requests are redirected to
/// the login page with the requested path as `next`.
pub struct SignedIn(pub Visitor);

impl<S> FromRequestParts<S> for SignedIn
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let visitor = Visitor::from_request_parts(parts, state).await?;
        if visitor.actor.is_authenticated() {
            Ok(SignedIn(visitor))
        } else {
            let next = parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
            Err(WebError::LoginRequired { next })
        }
    }
}

/// Returns the session's CSRF token, creating it on first use.
pub async fn csrf_token(session: &Session) -> Result<String, WebError> {
    if let Some(token) = session
        .get::<String>(CSRF_TOKEN_KEY)
        .await
        .map_err(session_error)?
    {
        return Ok(token);
    }
    let token = Uuid::new_v4().simple().to_string();
    session
        .insert(CSRF_TOKEN_KEY, &token)
        .await
        .map_err(session_error)?;
    Ok(token)
}

pub async fn verify_csrf(session: &Session, submitted: &str) -> Result<(), WebError> {
    let expected: Option<String> = session.get(CSRF_TOKEN_KEY).await.map_err(session_error)?;
    match expected {
        Some(expected) if !submitted.is_empty() && expected == submitted => Ok(()),
        _ => {
            warn!("CSRF verification failed");
            Err(WebError::csrf())
        }
    }
}

/// Urlencoded form body with its CSRF token split off.
#[derive(Debug, Deserialize)]
pub struct CsrfProtectedForm<T> {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(flatten)]
    pub data: T,
}

/// A form whose only field is the CSRF token.
#[derive(Debug, Default, Deserialize)]
pub struct CsrfOnly {
    #[serde(default)]
    pub csrf_token: String,
}
