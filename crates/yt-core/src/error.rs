//! # AppError
//!
//! Centralized error handling for Yatube.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

use crate::models::PostId;

/// The primary error type for all yt-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Group slug, username, Post id)
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// An anonymous identity attempted an action that needs an account
    #[error("authentication required")]
    AuthenticationRequired,

    /// An authenticated identity attempted to edit someone else's post
    #[error("not the author of post {0}")]
    AuthorizationDenied(PostId),

    /// Request rejected before reaching the domain (e.g., CSRF failure)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate username or group slug)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// A specialized Result type for Yatube logic.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Recovers an `AppError` that an adapter raised inside `anyhow`.
    /// Anything else is an infrastructure failure.
    pub fn from_adapter(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(err) => err,
            Err(err) => AppError::Internal(err),
        }
    }
}
