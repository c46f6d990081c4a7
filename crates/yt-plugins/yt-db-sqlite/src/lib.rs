//! # yt-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `yt-core` domain models. Cascades (author → posts/comments/follows,
//! post → comments) and detach-on-delete (group → posts) are enforced by the
//! schema's foreign keys.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use yt_core::error::AppError;
use yt_core::models::{
    Comment, FeedScope, Group, ImageChange, NewComment, NewGroup, NewPost, NewUser, Post, PostId,
    PostUpdate, User, UserId,
};
use yt_core::traits::{ContentRepo, FollowRepo, UserRepo};

const POST_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, \
     u.id AS author_id, u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, u.email AS author_email, u.date_joined AS author_date_joined, \
     g.id AS group_id, g.title AS group_title, g.slug AS group_slug, g.description AS group_description \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.text, c.pub_date, \
     u.id AS author_id, u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, u.email AS author_email, u.date_joined AS author_date_joined \
     FROM comments c \
     JOIN users u ON u.id = c.author_id";

const USER_SELECT: &str =
    "SELECT id, username, first_name, last_name, email, date_joined, password_hash FROM users";

#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Connects (creating the database file if needed) and runs migrations.
    pub async fn new(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database is a fresh database,
        // so pin a single connection for its whole lifetime.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        }
        .connect_with(options)
        .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(url, in_memory, "database ready");
        Ok(Self { pool })
    }

    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::new("sqlite::memory:", 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// UNIQUE violations become `AppError::Conflict` naming `what`.
fn unique_conflict(err: sqlx::Error, what: impl FnOnce() -> String) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(what()).into(),
        _ => err.into(),
    }
}

fn user_from_row(row: &SqliteRow, prefix: &str) -> sqlx::Result<User> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(User {
        id: row.try_get(col("id").as_str())?,
        username: row.try_get(col("username").as_str())?,
        first_name: row.try_get(col("first_name").as_str())?,
        last_name: row.try_get(col("last_name").as_str())?,
        email: row.try_get(col("email").as_str())?,
        date_joined: row.try_get(col("date_joined").as_str())?,
    })
}

fn group_from_row(row: &SqliteRow) -> sqlx::Result<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
    })
}

fn post_from_row(row: &SqliteRow) -> sqlx::Result<Post> {
    let group = match row.try_get::<Option<i64>, _>("group_id")? {
        Some(id) => Some(Group {
            id,
            title: row.try_get("group_title")?,
            slug: row.try_get("group_slug")?,
            description: row.try_get("group_description")?,
        }),
        None => None,
    };
    Ok(Post {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        author: user_from_row(row, "author_")?,
        group,
        image: row.try_get("image")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> sqlx::Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        author: user_from_row(row, "author_")?,
    })
}

fn push_scope(query: &mut QueryBuilder<'_, Sqlite>, scope: FeedScope) {
    match scope {
        FeedScope::All => {}
        FeedScope::Group(group_id) => {
            query.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        FeedScope::Author(author_id) => {
            query.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        FeedScope::Followed(user_id) => {
            query
                .push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

#[async_trait]
impl ContentRepo for SqliteRepo {
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(group_from_row).transpose()?)
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, title, slug, description FROM post_groups ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(group_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_group(&self, group: NewGroup) -> anyhow::Result<Group> {
        let id = sqlx::query("INSERT INTO post_groups (title, slug, description) VALUES (?, ?, ?)")
            .bind(&group.title)
            .bind(&group.slug)
            .bind(&group.description)
            .execute(&self.pool)
            .await
            .map_err(|err| unique_conflict(err, || format!("group slug {}", group.slug)))?
            .last_insert_rowid();
        Ok(Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        })
    }

    async fn delete_group(&self, slug: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM post_groups WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_post(&self, id: PostId) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(&format!("{POST_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn count_posts(&self, scope: FeedScope) -> anyhow::Result<u64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
        push_scope(&mut query, scope);
        let count: i64 = query.build().fetch_one(&self.pool).await?.try_get(0)?;
        Ok(count.try_into()?)
    }

    async fn list_posts(
        &self,
        scope: FeedScope,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Vec<Post>> {
        let mut query = QueryBuilder::<Sqlite>::new(POST_SELECT);
        push_scope(&mut query, scope);
        query
            .push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
            .push_bind(i64::try_from(limit)?)
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset)?);
        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(post_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_post(&self, post: NewPost) -> anyhow::Result<Post> {
        let id = sqlx::query(
            "INSERT INTO posts (text, pub_date, author_id, group_id, image) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&post.text)
        .bind(Utc::now())
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_post(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post {id} vanished after insert"))
    }

    async fn update_post(&self, id: PostId, update: PostUpdate) -> anyhow::Result<()> {
        let (touch_image, image) = match update.image {
            ImageChange::Keep => (false, None),
            ImageChange::Replace(name) => (true, Some(name)),
            ImageChange::Clear => (true, None),
        };
        sqlx::query(
            "UPDATE posts SET text = ?, group_id = ?, image = CASE WHEN ? THEN ? ELSE image END \
             WHERE id = ?",
        )
        .bind(&update.text)
        .bind(update.group_id)
        .bind(touch_image)
        .bind(image)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_post(&self, id: PostId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, post_id: PostId) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.pub_date DESC, c.id DESC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(comment_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_comment(&self, comment: NewComment) -> anyhow::Result<Comment> {
        let id = sqlx::query(
            "INSERT INTO comments (text, pub_date, author_id, post_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&comment.text)
        .bind(Utc::now())
        .bind(comment.author_id)
        .bind(comment.post_id)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let row = sqlx::query(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(comment_from_row(&row)?)
    }
}

#[async_trait]
impl UserRepo for SqliteRepo {
    async fn get_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| user_from_row(&r, "")).transpose()?)
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self.get_credentials(username).await?.map(|(user, _)| user))
    }

    async fn get_credentials(&self, username: &str) -> anyhow::Result<Option<(User, String)>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some((user_from_row(&row, "")?, row.try_get("password_hash")?))),
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: NewUser) -> anyhow::Result<User> {
        let date_joined = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, email, password_hash, date_joined) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(date_joined)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_conflict(err, || format!("username {}", user.username)))?
        .last_insert_rowid();

        Ok(User {
            id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            date_joined,
        })
    }

    async fn delete_user(&self, id: UserId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FollowRepo for SqliteRepo {
    async fn insert_follow(&self, follower: UserId, author: UserId) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (user_id, author_id) VALUES (?, ?) \
             ON CONFLICT (user_id, author_id) DO NOTHING",
        )
        .bind(follower)
        .bind(author)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_follow(&self, follower: UserId, author: UserId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(follower)
            .bind(author)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, follower: UserId, author: UserId) -> anyhow::Result<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(follower)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn count_followers(&self, author: UserId) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = ?")
            .bind(author)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.try_into()?)
    }
}
