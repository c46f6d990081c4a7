//! # Authorization Guard
//!
//! Two rules only: write actions need an authenticated identity, and a post
//! may be edited by its author alone.

use crate::error::{AppError, Result};
use crate::models::{Actor, Post, User};

/// Create, comment, follow and unfollow need an account.
pub fn can_act(actor: &Actor) -> bool {
    actor.is_authenticated()
}

/// True iff the actor is the post's author.
pub fn can_edit(actor: &Actor, post: &Post) -> bool {
    actor
        .user()
        .is_some_and(|user| user.username == post.author.username)
}

pub fn require_user(actor: &Actor) -> Result<&User> {
    actor.user().ok_or(AppError::AuthenticationRequired)
}

/// Like `can_edit`, but distinguishes "log in first" from "not yours".
pub fn authorize_edit<'a>(actor: &'a Actor, post: &Post) -> Result<&'a User> {
    let user = require_user(actor)?;
    if can_edit(actor, post) {
        Ok(user)
    } else {
        Err(AppError::AuthorizationDenied(post.id))
    }
}
