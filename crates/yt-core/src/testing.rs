//! Fixtures shared by unit tests here and by downstream test crates.

use chrono::{TimeZone, Utc};

use crate::models::{Post, PostId, User, UserId};

pub fn user(id: UserId, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: format!("{username}@example.com"),
        date_joined: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn post_by(id: PostId, author: &User) -> Post {
    Post {
        id,
        text: format!("Post #{id}"),
        pub_date: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(id),
        author: author.clone(),
        group: None,
        image: None,
    }
}
