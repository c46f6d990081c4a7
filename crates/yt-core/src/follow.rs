//! # Follow Manager
//!
//! Maintains the directed "follows" edges between users. Following is
//! idempotent, self-follows are silently ignored and unfollowing a missing
//! edge is a no-op.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::guard::require_user;
use crate::models::{Actor, User};
use crate::traits::FollowRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollowIgnored,
}

#[derive(Clone)]
pub struct FollowManager {
    repo: Arc<dyn FollowRepo>,
}

impl FollowManager {
    pub fn new(repo: Arc<dyn FollowRepo>) -> Self {
        Self { repo }
    }

    pub async fn follow(&self, actor: &Actor, author: &User) -> Result<FollowOutcome> {
        let follower = require_user(actor)?;
        if follower.id == author.id {
            return Ok(FollowOutcome::SelfFollowIgnored);
        }
        if self.repo.insert_follow(follower.id, author.id).await? {
            info!(follower = %follower.username, author = %author.username, "follow created");
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Returns whether an edge was removed.
    pub async fn unfollow(&self, actor: &Actor, author: &User) -> Result<bool> {
        let follower = require_user(actor)?;
        let removed = self.repo.delete_follow(follower.id, author.id).await?;
        if removed {
            info!(follower = %follower.username, author = %author.username, "follow removed");
        }
        Ok(removed)
    }

    pub async fn is_following(&self, actor: &Actor, author: &User) -> Result<bool> {
        match actor.user() {
            Some(follower) => Ok(self.repo.follow_exists(follower.id, author.id).await?),
            None => Ok(false),
        }
    }

    pub async fn follower_count(&self, author: &User) -> Result<u64> {
        Ok(self.repo.count_followers(author.id).await?)
    }
}
