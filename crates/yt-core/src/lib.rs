//! yatube/crates/yt-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Yatube.

pub mod cache;
pub mod error;
pub mod feed;
pub mod follow;
pub mod forms;
pub mod guard;
pub mod models;
pub mod pagination;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use super::testing::{post_by, user};

    #[test]
    fn display_strings() {
        let leo = user(1, "leo");
        let anna = user(2, "anna");
        let mut post = post_by(1, &leo);
        post.text = "Война и мир, том первый".to_string();
        assert_eq!(post.to_string(), "Война и мир, то");

        let group = Group {
            id: 1,
            title: "Classics".into(),
            slug: "classics".into(),
            description: String::new(),
        };
        assert_eq!(group.to_string(), "Classics");

        let follow = Follow { follower: anna, author: leo.clone() };
        assert_eq!(follow.to_string(), "anna --> leo");
        assert_eq!(leo.display_name(), "leo");
    }
}
