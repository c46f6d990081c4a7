//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::models::{
    Comment, FeedScope, Group, NewComment, NewGroup, NewPost, NewUser, Post, PostId, PostUpdate,
    User, UserId,
};

/// Persistence contract for groups, posts and comments.
///
/// Every post listing is ordered newest-first.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentRepo: Send + Sync {
    // Group Operations
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>>;
    async fn list_groups(&self) -> anyhow::Result<Vec<Group>>;
    async fn create_group(&self, group: NewGroup) -> anyhow::Result<Group>;
    /// Deletes a group and detaches its posts. Returns false if the slug is unknown.
    async fn delete_group(&self, slug: &str) -> anyhow::Result<bool>;

    // Post Operations
    async fn get_post(&self, id: PostId) -> anyhow::Result<Option<Post>>;
    async fn count_posts(&self, scope: FeedScope) -> anyhow::Result<u64>;
    async fn list_posts(
        &self,
        scope: FeedScope,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Vec<Post>>;
    async fn create_post(&self, post: NewPost) -> anyhow::Result<Post>;
    async fn update_post(&self, id: PostId, update: PostUpdate) -> anyhow::Result<()>;
    async fn delete_post(&self, id: PostId) -> anyhow::Result<bool>;

    // Comment Operations
    async fn list_comments(&self, post_id: PostId) -> anyhow::Result<Vec<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> anyhow::Result<Comment>;
}

/// Identity store contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, id: UserId) -> anyhow::Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Returns the user together with the stored password hash.
    async fn get_credentials(&self, username: &str) -> anyhow::Result<Option<(User, String)>>;
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User>;
    /// Deleting a user cascades to their posts, comments and follow edges.
    async fn delete_user(&self, id: UserId) -> anyhow::Result<bool>;
}

/// Follow graph contract. Edges are directed and unique per pair.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FollowRepo: Send + Sync {
    /// Inserts the edge if missing. Returns true if a new edge was created.
    async fn insert_follow(&self, follower: UserId, author: UserId) -> anyhow::Result<bool>;
    /// Removes the edge if present. Returns true if an edge was removed.
    async fn delete_follow(&self, follower: UserId, author: UserId) -> anyhow::Result<bool>;
    async fn follow_exists(&self, follower: UserId, author: UserId) -> anyhow::Result<bool>;
    async fn count_followers(&self, author: UserId) -> anyhow::Result<u64>;
}

/// Media storage contract for post illustrations and their thumbnails.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Whether the bytes decode as a supported image.
    fn is_valid_image(&self, data: &[u8]) -> bool;
    /// Saves raw bytes and returns the media name for the Post model.
    async fn save_image(&self, data: Vec<u8>, filename: &str) -> anyhow::Result<String>;
    /// Returns the URL to the original media.
    fn url(&self, name: &str) -> String;
    /// Returns the URL to the feed thumbnail.
    fn thumbnail_url(&self, name: &str) -> String;
}

/// Credential hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}
