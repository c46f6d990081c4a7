//! # Domain Models
//!
//! These structs represent the core entities of Yatube.
//! Identifiers are the integer row ids assigned by the content store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type GroupId = i64;
pub type PostId = i64;
pub type CommentId = i64;

/// Number of characters a post shows in listings that only need a preview.
pub const POST_PREVIEW_CHARS: usize = 15;
/// Number of characters a comment shows in listings that only need a preview.
pub const COMMENT_PREVIEW_CHARS: usize = 15;

/// A registered account. The username never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the username when no name was given.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// A named category posts may be filed under. Created out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    /// The URL slug (e.g., "cats" for /group/cats/)
    pub slug: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A published post, joined with its author and (optional) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub text: String,
    /// Set once on insert, never updated
    pub pub_date: DateTime<Utc>,
    pub author: User,
    /// Cleared when the group is deleted
    pub group: Option<Group>,
    /// Media name handled by `MediaStore` (e.g., "posts/3fa9...c1.gif")
    pub image: Option<String>,
}

impl Post {
    pub fn preview(&self) -> String {
        self.text.chars().take(POST_PREVIEW_CHARS).collect()
    }

    pub fn pub_date_display(&self) -> String {
        self.pub_date.format("%d %b %Y").to_string()
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: User,
}

impl Comment {
    pub fn preview(&self) -> String {
        self.text.chars().take(COMMENT_PREVIEW_CHARS).collect()
    }

    pub fn pub_date_display(&self) -> String {
        self.pub_date.format("%d %b %Y %H:%M").to_string()
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

/// Directed edge: `follower`'s follow feed includes `author`'s posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub follower: User,
    pub author: User,
}

impl fmt::Display for Follow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.follower.username, self.author.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: UserId,
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

/// Changes applied by the edit form. `image: None` keeps the current image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUpdate {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: ImageChange,
}

/// What an edit does to the post's illustration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
}

/// The identity a request acts as. Passed explicitly to every component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(User),
}

impl Actor {
    pub fn user(&self) -> Option<&User> {
        match self {
            Actor::Anonymous => None,
            Actor::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }
}

/// The filter that defines which posts belong to a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Group(GroupId),
    Author(UserId),
    /// Posts by every author the given user follows
    Followed(UserId),
}
